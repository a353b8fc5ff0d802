//! GitHub implementation of the repository host boundary

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;

use crate::config::HostConfig;
use crate::detect::decode_source;
use crate::errors::HostError;

use super::{ChangeRequest, ChangeSummary, CommitFile, FileContent, RemoteFile, RepoHost};

const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const OBJECT_MEDIA_TYPE: &str = "application/vnd.github.object+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";

#[derive(Deserialize)]
struct BranchInfo {
    name: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ObjectInfo {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct RefInfo {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct CommitInfo {
    tree: ShaRef,
}

#[derive(Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Deserialize)]
struct PullInfo {
    html_url: String,
    number: u64,
}

/// GitHub repository host client
pub struct GitHubHost {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubHost {
    /// Build a client from host settings; the token falls back to the
    /// `GITHUB_TOKEN` environment variable
    pub fn new(config: &HostConfig) -> Result<Self, HostError> {
        let token = config
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        headers.insert(USER_AGENT, HeaderValue::from_static("mender-agent/0.1"));
        if let Some(token) = token {
            if let Ok(value) = HeaderValue::from_str(&format!("token {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        accept: &'static str,
    ) -> Result<T, HostError> {
        let response = self.client.get(url).header(ACCEPT, accept).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, HostError> {
        let response = self.client.post(url).json(body).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Head commit sha of a branch
    async fn branch_sha(&self, repo: &str, branch: &str) -> Result<String, HostError> {
        let info: RefInfo = self
            .get_json(
                &self.url(&format!("/repos/{}/git/ref/heads/{}", repo, branch)),
                JSON_MEDIA_TYPE,
            )
            .await?;
        Ok(info.object.sha)
    }

    /// Upload one blob and return its sha; content goes up as UTF-8,
    /// so no transfer encoding is involved
    async fn create_blob(&self, repo: &str, content: &str) -> Result<String, HostError> {
        let created: ShaRef = self
            .post_json(
                &self.url(&format!("/repos/{}/git/blobs", repo)),
                &json!({ "content": content, "encoding": "utf-8" }),
            )
            .await?;
        Ok(created.sha)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect();
    Err(HostError::Status {
        status: status.as_u16(),
        message,
    })
}

fn publish_err(stage: &str, err: impl std::fmt::Display) -> HostError {
    HostError::Publish {
        stage: stage.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl RepoHost for GitHubHost {
    async fn list_branches(&self, repo: &str) -> Result<Vec<String>, HostError> {
        let branches: Vec<BranchInfo> = self
            .get_json(
                &self.url(&format!("/repos/{}/branches", repo)),
                JSON_MEDIA_TYPE,
            )
            .await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn list_files(&self, repo: &str, branch: &str) -> Result<Vec<RemoteFile>, HostError> {
        let response: TreeResponse = self
            .get_json(
                &self.url(&format!(
                    "/repos/{}/git/trees/{}?recursive=1",
                    repo, branch
                )),
                JSON_MEDIA_TYPE,
            )
            .await?;

        Ok(response
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| RemoteFile {
                path: entry.path,
                blob_id: entry.sha,
            })
            .collect())
    }

    async fn get_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<FileContent, HostError> {
        let url = self.url(&format!("/repos/{}/contents/{}?ref={}", repo, path, branch));

        let meta: ObjectInfo = self.get_json(&url, OBJECT_MEDIA_TYPE).await?;
        if meta.kind != "file" {
            return Err(HostError::Decode(format!(
                "'{}' is a {}, not a file",
                path, meta.kind
            )));
        }

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, RAW_MEDIA_TYPE)
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;

        let text =
            decode_source(path, &bytes).map_err(|err| HostError::Decode(err.to_string()))?;

        Ok(FileContent {
            text,
            content_hash: meta.sha,
        })
    }

    async fn commit_and_open_request(
        &self,
        repo: &str,
        base_branch: &str,
        files: &[CommitFile],
        summary: &ChangeSummary,
    ) -> Result<ChangeRequest, HostError> {
        // Branch head and its tree
        let base_sha = self
            .branch_sha(repo, base_branch)
            .await
            .map_err(|err| publish_err("resolve base branch", err))?;
        let base_commit: CommitInfo = self
            .get_json(
                &self.url(&format!("/repos/{}/git/commits/{}", repo, base_sha)),
                JSON_MEDIA_TYPE,
            )
            .await
            .map_err(|err| publish_err("read base commit", err))?;

        // One blob per rewritten file
        let mut tree_entries = Vec::with_capacity(files.len());
        for file in files {
            let blob_sha = self
                .create_blob(repo, &file.content)
                .await
                .map_err(|err| publish_err("create blob", err))?;
            tree_entries.push(json!({
                "path": file.path,
                "mode": "100644",
                "type": "blob",
                "sha": blob_sha,
            }));
        }

        let tree: ShaRef = self
            .post_json(
                &self.url(&format!("/repos/{}/git/trees", repo)),
                &json!({ "base_tree": base_commit.tree.sha, "tree": tree_entries }),
            )
            .await
            .map_err(|err| publish_err("create tree", err))?;

        let commit: ShaRef = self
            .post_json(
                &self.url(&format!("/repos/{}/git/commits", repo)),
                &json!({
                    "message": summary.title,
                    "tree": tree.sha,
                    "parents": [base_sha],
                }),
            )
            .await
            .map_err(|err| publish_err("create commit", err))?;

        let fix_branch = format!("mender-fixes-{}", Utc::now().timestamp());
        self.post_json::<serde_json::Value>(
            &self.url(&format!("/repos/{}/git/refs", repo)),
            &json!({
                "ref": format!("refs/heads/{}", fix_branch),
                "sha": commit.sha,
            }),
        )
        .await
        .map_err(|err| publish_err("create branch", err))?;

        let pull: PullInfo = self
            .post_json(
                &self.url(&format!("/repos/{}/pulls", repo)),
                &json!({
                    "title": summary.title,
                    "body": summary.body,
                    "head": fix_branch,
                    "base": base_branch,
                    "maintainer_can_modify": true,
                }),
            )
            .await
            .map_err(|err| publish_err("open pull request", err))?;

        Ok(ChangeRequest {
            url: pull.html_url,
            number: pull.number,
        })
    }
}
