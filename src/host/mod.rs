//! Repository host boundary
//!
//! The agent talks to the hosting service (branch listing, file
//! content, commit + pull-request creation) exclusively through the
//! [`RepoHost`] trait. `content_hash` values give the applier its
//! optimistic-concurrency staleness check.

pub mod github;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::HostError;

pub use github::GitHubHost;

/// A file reachable in the repository tree
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Path within the repository
    pub path: String,

    /// Host identifier for the file's current content
    pub blob_id: String,
}

/// Decoded file content with its content hash
#[derive(Debug, Clone)]
pub struct FileContent {
    pub text: String,
    pub content_hash: String,
}

/// A file to write in a fix commit
#[derive(Debug, Clone, Serialize)]
pub struct CommitFile {
    pub path: String,
    pub content: String,
}

/// Title and body for a published change request
#[derive(Debug, Clone)]
pub struct ChangeSummary {
    pub title: String,
    pub body: String,
}

/// Reference to an opened change request
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRequest {
    pub url: String,
    pub number: u64,
}

/// Trait for repository hosts
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Branch names of a repository
    async fn list_branches(&self, repo: &str) -> Result<Vec<String>, HostError>;

    /// Every file in the repository tree at a branch
    async fn list_files(&self, repo: &str, branch: &str) -> Result<Vec<RemoteFile>, HostError>;

    /// Text and content hash of one file
    async fn get_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<FileContent, HostError>;

    /// Commit the given files on a new branch off `base_branch` and
    /// open a change request against it
    async fn commit_and_open_request(
        &self,
        repo: &str,
        base_branch: &str,
        files: &[CommitFile],
        summary: &ChangeSummary,
    ) -> Result<ChangeRequest, HostError>;
}

/// Normalize a repository reference to `owner/name` form.
///
/// Accepts full host URLs and plain `owner/name` strings.
pub fn normalize_repository(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('/');

    if let Some(rest) = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
    {
        return rest.trim_end_matches(".git").to_string();
    }

    trimmed.to_string()
}
