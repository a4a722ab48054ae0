//! Payload types for the GitHub REST API responses we consume.

use serde::Deserialize;

/// Subset of `GET /repos/{owner}/{repo}` we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Absent on repositories that have never had a commit pushed.
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Size in kibibytes, as reported by GitHub.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
}

/// One entry of `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ContentsEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == "dir"
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == "file"
    }
}

/// `GET /repos/{owner}/{repo}/contents/{path}` for a single file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatTree {
    #[serde(default)]
    pub tree: Vec<FlatTreeEntry>,
    /// Set by GitHub when the listing was cut off server-side.
    #[serde(default)]
    pub truncated: bool,
}

/// One entry of the flattened tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatTreeEntry {
    pub path: String,
    /// `blob`, `tree`, or `commit` (submodule).
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl FlatTreeEntry {
    pub fn is_tree(&self) -> bool {
        self.entry_type == "tree"
    }

    pub fn is_blob(&self) -> bool {
        self.entry_type == "blob"
    }
}
