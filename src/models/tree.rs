//! File tree model produced by the crawler and stored with each analysis.

use serde::{Deserialize, Serialize};

/// Kind of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// One node of the crawled repository tree.
///
/// The synthetic root carries the repository name and no `path`. Folders
/// always have `children` (empty when `truncated`); files never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub kind: NodeKind,
    /// Slash-separated path relative to the repository root; absent on
    /// the synthetic root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    /// Byte count, files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Raw-content URL, files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Crawl depth at which this node was produced (root = 0).
    pub depth_reached: u32,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation_reason: Option<String>,
    /// Set when this folder's listing failed without failing the crawl.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TreeNode {
    pub fn file(
        name: String,
        path: String,
        size: u64,
        download_url: Option<String>,
        depth: u32,
    ) -> Self {
        Self {
            name,
            kind: NodeKind::File,
            path: Some(path),
            children: None,
            size: Some(size),
            download_url,
            depth_reached: depth,
            truncated: false,
            truncation_reason: None,
            error: None,
        }
    }

    pub fn folder(name: String, path: Option<String>, children: Vec<TreeNode>, depth: u32) -> Self {
        Self {
            name,
            kind: NodeKind::Folder,
            path,
            children: Some(children),
            size: None,
            download_url: None,
            depth_reached: depth,
            truncated: false,
            truncation_reason: None,
            error: None,
        }
    }

    /// A folder the depth bound stopped us from expanding. Always empty.
    pub fn truncated_folder(name: String, path: String, depth: u32, max_depth: u32) -> Self {
        Self {
            name,
            kind: NodeKind::Folder,
            path: Some(path),
            children: Some(Vec::new()),
            size: None,
            download_url: None,
            depth_reached: depth,
            truncated: true,
            truncation_reason: Some(format!("depth limit of {max_depth} reached")),
            error: None,
        }
    }

    /// A folder whose listing failed; the rest of the crawl continues.
    pub fn error_folder(name: String, path: String, depth: u32, error: String) -> Self {
        Self {
            name,
            kind: NodeKind::Folder,
            path: Some(path),
            children: Some(Vec::new()),
            size: None,
            download_url: None,
            depth_reached: depth,
            truncated: false,
            truncation_reason: None,
            error: Some(error),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Number of file nodes in this subtree.
    pub fn count_files(&self) -> u64 {
        match self.kind {
            NodeKind::File => 1,
            NodeKind::Folder => self
                .children
                .iter()
                .flatten()
                .map(TreeNode::count_files)
                .sum(),
        }
    }

    /// Number of folder nodes in this subtree, excluding the synthetic root.
    pub fn count_folders(&self) -> u64 {
        match self.kind {
            NodeKind::File => 0,
            NodeKind::Folder => {
                let own = if self.path.is_some() { 1 } else { 0 };
                own + self
                    .children
                    .iter()
                    .flatten()
                    .map(TreeNode::count_folders)
                    .sum::<u64>()
            }
        }
    }

    /// Deepest `depth_reached` present in this subtree.
    pub fn max_depth(&self) -> u32 {
        self.children
            .iter()
            .flatten()
            .map(TreeNode::max_depth)
            .max()
            .unwrap_or(self.depth_reached)
    }

    /// Sum of file sizes in this subtree.
    pub fn total_size(&self) -> u64 {
        match self.kind {
            NodeKind::File => self.size.unwrap_or(0),
            NodeKind::Folder => self
                .children
                .iter()
                .flatten()
                .map(TreeNode::total_size)
                .sum(),
        }
    }
}
