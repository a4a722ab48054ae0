//! GitHub REST API integration: URL parsing, payload types, and the
//! retrying HTTP client.

pub mod client;
pub mod types;
pub mod url;

pub use client::{GitHubClient, GitHubError, RetryConfig};
pub use types::{ContentsEntry, FileContent, FlatTree, FlatTreeEntry, RepoMetadata};
pub use url::{parse_repo_url, ParseError, RepoRef};
