//! GitHub contents API adapter.
//!
//! `get` maps to `GET /repos/{repo}/contents/{path}`, `put` and `create` to
//! `PUT` on the same URL. The revision token is the blob sha GitHub
//! returns; file content travels base64-encoded.

use super::{BlobStore, RemoteBlob, RemoteError};
use crate::config::RemoteConfig;
use crate::error::{Result, StoreError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const ACCEPT_JSON: &str = "application/vnd.github+json";
const AGENT: &str = concat!("service-orders/", env!("CARGO_PKG_VERSION"));
const COMMIT_MESSAGE: &str = "Atualização das ordens de serviço";

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: String,
    sha: String,
    #[serde(default)]
    size: u64,
}

impl ContentResponse {
    /// Decoded file bytes.
    ///
    /// Files above 1 MB come back with empty `content`; that is an error
    /// rather than an empty file.
    fn decode(&self, path: &str) -> std::result::Result<Vec<u8>, RemoteError> {
        // The API wraps base64 at 60 columns.
        let packed: String = self.content.split_whitespace().collect();
        if packed.is_empty() && self.size > 0 {
            return Err(RemoteError::Transport(format!(
                "{path} is {} bytes but the API returned no content",
                self.size
            )));
        }
        STANDARD
            .decode(packed)
            .map_err(|e| RemoteError::Transport(format!("invalid base64 content: {e}")))
    }
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

/// Blob store backed by a file in a GitHub repository.
pub struct GitHubBlobStore {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    token: String,
    branch: Option<String>,
}

impl GitHubBlobStore {
    /// Build from configuration. Fails if the mirror is not fully configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let target = config
            .target()
            .ok_or_else(|| StoreError::Config("remote mirror is not configured".into()))?;
        let (owner, repo) = target.repository.split_once('/').ok_or_else(|| {
            StoreError::Config(format!(
                "repository must look like owner/name, got {}",
                target.repository
            ))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base().to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: target.token.to_string(),
            branch: config.branch.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> std::result::Result<Url, RemoteError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| RemoteError::Transport(format!("invalid API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport("API base cannot hold a path".into()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn send_put(
        &self,
        path: &str,
        content: &[u8],
        sha: Option<&str>,
    ) -> std::result::Result<String, RemoteError> {
        let mut body = json!({
            "message": COMMIT_MESSAGE,
            "content": STANDARD.encode(content),
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        if let Some(branch) = &self.branch {
            body["branch"] = json!(branch);
        }

        let res = self
            .client
            .put(self.contents_url(path)?)
            .bearer_auth(&self.token)
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, AGENT)
            .json(&body)
            .send()
            .map_err(|e| RemoteError::Transport(format!("PUT {path} failed: {e}")))?;

        let res = check_status(res, path)?;
        let parsed: PutResponse = res
            .json()
            .map_err(|e| RemoteError::Transport(format!("unexpected PUT response: {e}")))?;
        Ok(parsed.content.sha)
    }
}

impl BlobStore for GitHubBlobStore {
    fn get(&self, path: &str) -> std::result::Result<RemoteBlob, RemoteError> {
        let mut req = self
            .client
            .get(self.contents_url(path)?)
            .bearer_auth(&self.token)
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, AGENT);
        if let Some(branch) = &self.branch {
            req = req.query(&[("ref", branch)]);
        }

        let res = req
            .send()
            .map_err(|e| RemoteError::Transport(format!("GET {path} failed: {e}")))?;
        let res = check_status(res, path)?;
        let parsed: ContentResponse = res
            .json()
            .map_err(|e| RemoteError::Transport(format!("unexpected GET response: {e}")))?;

        let content = parsed.decode(path)?;

        Ok(RemoteBlob {
            content,
            revision: parsed.sha,
        })
    }

    fn put(
        &self,
        path: &str,
        content: &[u8],
        expected_revision: &str,
    ) -> std::result::Result<String, RemoteError> {
        self.send_put(path, content, Some(expected_revision))
    }

    fn create(&self, path: &str, content: &[u8]) -> std::result::Result<String, RemoteError> {
        match self.send_put(path, content, None) {
            // Without a sha the API refuses to replace an existing file;
            // read the current sha and write over it.
            Err(RemoteError::Conflict(_)) => {
                debug!(path, "remote file exists, overwriting at current revision");
                let current = self.get(path)?;
                self.send_put(path, content, Some(&current.revision))
            }
            other => other,
        }
    }
}

fn check_status(res: Response, path: &str) -> std::result::Result<Response, RemoteError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let detail = res.text().unwrap_or_default();
    Err(classify(status, path, detail.trim()))
}

fn classify(status: StatusCode, path: &str, detail: &str) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Auth(format!("{status} for {path}: {detail}"))
        }
        StatusCode::NOT_FOUND => RemoteError::NotFound(path.to_string()),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::Conflict(format!("{status} for {path}: {detail}"))
        }
        _ => RemoteError::Transport(format!("{status} for {path}: {detail}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig::new("acme/manutencao", "data/ordens servico.csv", "tok")
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let store = GitHubBlobStore::from_config(&config()).unwrap();
        let url = store.contents_url("data/ordens servico.csv").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/manutencao/contents/data/ordens%20servico.csv"
        );
    }

    #[test]
    fn test_from_config_requires_owner_and_name() {
        let config = RemoteConfig::new("manutencao", "ordens.csv", "tok");
        assert!(matches!(
            GitHubBlobStore::from_config(&config),
            Err(StoreError::Config(_))
        ));
        assert!(GitHubBlobStore::from_config(&RemoteConfig::default()).is_err());
    }

    #[test]
    fn test_decode_content() {
        let wrapped = ContentResponse {
            content: "SUQsU3Rh\ndHVzCg==\n".into(),
            sha: "abc".into(),
            size: 10,
        };
        assert_eq!(wrapped.decode("p").unwrap(), b"ID,Status\n");

        let empty = ContentResponse {
            content: String::new(),
            sha: "abc".into(),
            size: 0,
        };
        assert!(empty.decode("p").unwrap().is_empty());

        let oversized = ContentResponse {
            content: String::new(),
            sha: "abc".into(),
            size: 2_000_000,
        };
        assert!(matches!(
            oversized.decode("p"),
            Err(RemoteError::Transport(_))
        ));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, "p", ""),
            RemoteError::Auth(_)
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, "p", ""),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            classify(StatusCode::CONFLICT, "p", ""),
            RemoteError::Conflict(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, "p", ""),
            RemoteError::Transport(_)
        ));
    }
}
