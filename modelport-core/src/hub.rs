//! Model hub seam — fetch a repository's full file set to local disk.
//!
//! `HuggingFaceHub` talks to the hub's REST surface: the tree listing
//! endpoint (paginated through `Link: rel="next"` headers) and the resolve
//! endpoint for file content, streamed straight to disk. Existing local
//! files are clobbered.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::HubConfig;
use crate::error::HubError;

/// The download surface the stager consumes from a model hub.
#[async_trait]
pub trait ModelHub: Send + Sync {
    /// Download every file of `repo_id` at `revision` into `dest`,
    /// preserving the repository's relative layout. Returns the local
    /// paths written.
    async fn snapshot(
        &self,
        repo_id: &str,
        revision: &str,
        dest: &Path,
    ) -> Result<Vec<PathBuf>, HubError>;
}

/// One entry of the repository tree listing.
#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    size: u64,
}

/// `ModelHub` backed by the Hugging Face REST API.
pub struct HuggingFaceHub {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HuggingFaceHub {
    /// Build a hub client from configuration. The access token is read
    /// from the environment variable named in the config; anonymous
    /// access is used when it is unset.
    pub fn new(config: &HubConfig) -> Self {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list_tree(&self, repo_id: &str, revision: &str) -> Result<Vec<TreeEntry>, HubError> {
        let mut url = format!(
            "{}/api/models/{}/tree/{}?recursive=true",
            self.endpoint, repo_id, revision
        );
        let mut entries = Vec::new();

        loop {
            let response = self.authorize(self.client.get(&url)).send().await?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(HubError::RepoNotFound {
                    repo: repo_id.to_string(),
                });
            }
            if !status.is_success() {
                return Err(HubError::Status {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let next = next_link(response.headers());
            let page: Vec<TreeEntry> =
                response.json().await.map_err(|e| HubError::ResponseParse {
                    message: e.to_string(),
                })?;
            debug!(repo = repo_id, page_len = page.len(), "listed tree page");
            entries.extend(page);

            match next {
                Some(next_url) => url = next_url,
                None => break,
            }
        }

        Ok(entries)
    }

    async fn download_file(
        &self,
        repo_id: &str,
        revision: &str,
        file_path: &str,
        dest: &Path,
    ) -> Result<(), HubError> {
        let url = format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint, repo_id, revision, file_path
        );
        let response = self.authorize(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(HubError::Download {
                path: file_path.to_string(),
                message: format!("status {}", response.status()),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| HubError::Download {
                path: file_path.to_string(),
                message: e.to_string(),
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ModelHub for HuggingFaceHub {
    async fn snapshot(
        &self,
        repo_id: &str,
        revision: &str,
        dest: &Path,
    ) -> Result<Vec<PathBuf>, HubError> {
        let entries = self.list_tree(repo_id, revision).await?;
        let files: Vec<&TreeEntry> = entries
            .iter()
            // Security: prevent path traversal
            .filter(|e| e.kind == "file" && !e.path.contains(".."))
            .collect();
        let total_bytes: u64 = files.iter().map(|e| e.size).sum();
        info!(
            repo = repo_id,
            revision,
            files = files.len(),
            total_bytes,
            "downloading repository snapshot"
        );

        let mut written = Vec::with_capacity(files.len());
        for entry in files {
            let target = dest.join(&entry.path);
            debug!(path = %entry.path, bytes = entry.size, "downloading file");
            self.download_file(repo_id, revision, &entry.path, &target)
                .await?;
            written.push(target);
        }
        Ok(written)
    }
}

/// Extract the `rel="next"` target from a `Link` header, if any.
fn next_link(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let value = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    value.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        if params.contains("rel=\"next\"") {
            Some(
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            )
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::{HeaderMap, HeaderValue, LINK};

    #[test]
    fn test_tree_entry_parse() {
        let json = r#"[
            {"type": "file", "oid": "abc123", "size": 524288000, "path": "model-00001-of-000002.safetensors"},
            {"type": "directory", "oid": "def456", "size": 0, "path": "figures"},
            {"type": "file", "oid": "789abc", "size": 1519, "path": "figures/benchmark.png"}
        ]"#;
        let entries: Vec<TreeEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, "file");
        assert_eq!(entries[0].size, 524_288_000);
        assert_eq!(entries[2].path, "figures/benchmark.png");
    }

    #[test]
    fn test_next_link_parse() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://huggingface.co/api/models/org/repo/tree/main?cursor=xyz>; rel=\"next\"",
            ),
        );
        assert_eq!(
            next_link(&headers).as_deref(),
            Some("https://huggingface.co/api/models/org/repo/tree/main?cursor=xyz")
        );

        let empty = HeaderMap::new();
        assert_eq!(next_link(&empty), None);

        let mut other = HeaderMap::new();
        other.insert(
            LINK,
            HeaderValue::from_static("<https://example.com/prev>; rel=\"prev\""),
        );
        assert_eq!(next_link(&other), None);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let hub = HuggingFaceHub::new(&HubConfig {
            endpoint: "https://huggingface.co/".to_string(),
            token_env: "MODELPORT_TEST_ABSENT_TOKEN".to_string(),
        });
        assert_eq!(hub.endpoint, "https://huggingface.co");
        assert!(hub.token.is_none());
    }
}
