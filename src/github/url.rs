//! Repository URL parsing
//!
//! Decomposes a free-form GitHub URL into `(owner, repo)` without touching
//! the network. Anything that does not look exactly like a repository URL
//! is rejected with no partial result.

use serde::Serialize;
use thiserror::Error;

/// A parsed `(owner, repo)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

/// Errors from URL parsing. No network access has occurred when one of
/// these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("That doesn't look like a GitHub URL. Expected https://github.com/owner/repo")]
    NotGitHub,

    #[error("The URL must name both an owner and a repository, like github.com/owner/repo")]
    MissingSegments,

    #[error("Invalid {0} name in URL")]
    InvalidSegment(&'static str),
}

/// Parse a free-form string into a repository reference.
///
/// Accepts `https://github.com/owner/repo` with or without scheme, a
/// trailing slash, or a trailing `.git` suffix.
pub fn parse_repo_url(input: &str) -> Result<RepoRef, ParseError> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let rest = trimmed
        .split_once("github.com/")
        .map(|(_, rest)| rest)
        .ok_or(ParseError::NotGitHub)?;

    let mut segments = rest.split('/');
    let owner = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();
    if owner.is_empty() || repo.is_empty() || segments.next().is_some() {
        return Err(ParseError::MissingSegments);
    }

    if !is_valid_segment(owner) {
        return Err(ParseError::InvalidSegment("owner"));
    }
    if !is_valid_segment(repo) {
        return Err(ParseError::InvalidSegment("repository"));
    }

    Ok(RepoRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Conservative identifier pattern: alphanumeric plus `-`, `_`, `.`,
/// with alphanumeric first and last characters.
fn is_valid_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let first_ok = bytes.first().is_some_and(|b| b.is_ascii_alphanumeric());
    let last_ok = bytes.last().is_some_and(|b| b.is_ascii_alphanumeric());
    first_ok
        && last_ok
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
