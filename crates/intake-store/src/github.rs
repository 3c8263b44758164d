//! Hosted git repository implementation of DocumentStorage
//!
//! This implementation uses the GitHub REST contents API to read and write files
//! on a single branch, and the git-lfs batch API for large sample files.

use crate::{
    validate_path, CommitIdentity, DocumentStorage, Revision, StoreError, StoreResult,
    StoredObject,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, error, warn};

const GITHUB_JSON: &str = "application/vnd.github+json";
const LFS_JSON: &str = "application/vnd.git-lfs+json";

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    committer: &'a CommitIdentity,
    author: &'a CommitIdentity,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: ContentsEntry,
}

#[derive(Debug, Serialize, Deserialize)]
struct LfsObjectSpec {
    oid: String,
    size: u64,
}

#[derive(Debug, Serialize)]
struct LfsBatchRequest<'a> {
    operation: &'a str,
    transfers: Vec<&'a str>,
    objects: Vec<LfsObjectSpec>,
}

#[derive(Debug, Deserialize)]
struct LfsBatchResponse {
    objects: Vec<LfsObjectResponse>,
}

#[derive(Debug, Deserialize)]
struct LfsObjectResponse {
    oid: String,
    #[serde(default)]
    actions: Option<LfsActions>,
    #[serde(default)]
    error: Option<LfsObjectError>,
}

#[derive(Debug, Deserialize)]
struct LfsActions {
    #[serde(default)]
    upload: Option<LfsAction>,
    #[serde(default)]
    verify: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LfsObjectError {
    code: u16,
    message: String,
}

/// GitHub implementation of DocumentStorage
///
/// Every write is a commit on `branch`, authored and committed by `identity`.
/// The blob sha returned by the API is used as the revision token.
#[derive(Clone)]
pub struct GitHubDocumentStore {
    /// Repository owner
    owner: String,

    /// Repository name
    repo: String,

    /// Branch all reads and writes go to
    branch: String,

    /// Token with contents write access
    api_token: String,

    /// Base URL for the REST API
    api_base_url: String,

    /// Base URL for the git-lfs endpoint
    lfs_base_url: String,

    identity: CommitIdentity,

    /// HTTP client
    client: Client,
}

// Keep the token out of logs
impl Debug for GitHubDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubDocumentStore")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base_url", &self.api_base_url)
            .field("lfs_base_url", &self.lfs_base_url)
            .field("identity", &self.identity)
            .finish()
    }
}

impl GitHubDocumentStore {
    /// Create a store for `repository` given as `owner/name`
    pub fn new(
        repository: &str,
        api_token: String,
        branch: String,
        identity: CommitIdentity,
    ) -> StoreResult<Self> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| {
                StoreError::ConfigurationError(format!(
                    "Repository must be given as owner/name, got '{}'",
                    repository
                ))
            })?;

        // Create a reqwest client with reasonable defaults
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("workflow-intake/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch,
            api_token,
            api_base_url: "https://api.github.com".to_string(),
            lfs_base_url: "https://github.com".to_string(),
            identity,
            client,
        })
    }

    /// Point the REST client somewhere else (GitHub Enterprise, tests)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_lfs_base_url(mut self, url: impl Into<String>) -> Self {
        self.lfs_base_url = url.into();
        self
    }

    fn base_url(raw: &str) -> StoreResult<Url> {
        let url = Url::parse(raw)
            .map_err(|e| StoreError::ConfigurationError(format!("Invalid base URL {}: {}", raw, e)))?;
        if url.cannot_be_a_base() {
            return Err(StoreError::ConfigurationError(format!("Invalid base URL {}", raw)));
        }
        Ok(url)
    }

    /// Format the contents endpoint URL for a path
    fn contents_url(&self, path: &str) -> StoreResult<Url> {
        let mut url = Self::base_url(&self.api_base_url)?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        Ok(url)
    }

    /// Contents URL pinned to the configured branch, for reads
    fn contents_read_url(&self, path: &str) -> StoreResult<Url> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    /// Format the git-lfs batch endpoint URL
    fn lfs_batch_url(&self) -> StoreResult<Url> {
        let mut url = Self::base_url(&self.lfs_base_url)?;
        let repo_git = format!("{}.git", self.repo);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                self.owner.as_str(),
                repo_git.as_str(),
                "info",
                "lfs",
                "objects",
                "batch",
            ]);
        }
        Ok(url)
    }

    /// Calculate the git-lfs object id (hex SHA-256) of content
    fn calculate_oid(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Pointer file committed in place of a large file
    fn lfs_pointer(oid: &str, size: usize) -> String {
        format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize {}\n",
            oid, size
        )
    }

    /// Turn an unexpected response into a backend error
    async fn failure(context: &str, response: Response) -> StoreError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("{}: {}", context, error_text);
        StoreError::Unavailable(anyhow::anyhow!(
            "{}: Status {}, Error: {}",
            context,
            status,
            error_text
        ))
    }

    fn decode_content(path: &str, entry: &ContentsEntry) -> StoreResult<Vec<u8>> {
        if entry.encoding.as_deref() == Some("none") {
            return Err(StoreError::Unavailable(anyhow::anyhow!(
                "{} is too large to be read through the contents API",
                path
            )));
        }
        let encoded: String = entry
            .content
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect();
        base64::decode(encoded)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("Invalid content encoding for {}: {}", path, e)))
    }

    /// Push content to LFS storage and return its oid
    async fn upload_lfs_object(&self, content: &[u8]) -> StoreResult<String> {
        let oid = Self::calculate_oid(content);
        let request = LfsBatchRequest {
            operation: "upload",
            transfers: vec!["basic"],
            objects: vec![LfsObjectSpec {
                oid: oid.clone(),
                size: content.len() as u64,
            }],
        };

        debug!("Requesting LFS upload for object {}", oid);
        let response = self
            .client
            .post(self.lfs_batch_url()?)
            .basic_auth(&self.owner, Some(&self.api_token))
            .header(ACCEPT, LFS_JSON)
            .header(CONTENT_TYPE, LFS_JSON)
            .json(&request)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))?;

        if !response.status().is_success() {
            return Err(Self::failure("LFS batch request failed", response).await);
        }

        let batch: LfsBatchResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))?;

        let object = batch
            .objects
            .into_iter()
            .find(|object| object.oid == oid)
            .ok_or_else(|| StoreError::Unavailable(anyhow::anyhow!("LFS batch response did not include object {}", oid)))?;

        if let Some(err) = object.error {
            return Err(StoreError::Unavailable(anyhow::anyhow!(
                "LFS rejected object {}: {} {}",
                oid,
                err.code,
                err.message
            )));
        }

        // No actions means the server already has the object
        let Some(actions) = object.actions else {
            debug!("LFS object {} already present", oid);
            return Ok(oid);
        };

        if let Some(upload) = actions.upload {
            let mut request = self.client.put(&upload.href).body(content.to_vec());
            for (name, value) in &upload.header {
                request = request.header(name.as_str(), value.as_str());
            }
            let response = request
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.into()))?;
            if !response.status().is_success() {
                return Err(Self::failure("LFS upload failed", response).await);
            }
        }

        if let Some(verify) = actions.verify {
            let mut request = self
                .client
                .post(&verify.href)
                .header(ACCEPT, LFS_JSON)
                .header(CONTENT_TYPE, LFS_JSON)
                .json(&LfsObjectSpec {
                    oid: oid.clone(),
                    size: content.len() as u64,
                });
            for (name, value) in &verify.header {
                request = request.header(name.as_str(), value.as_str());
            }
            let response = request
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.into()))?;
            if !response.status().is_success() {
                return Err(Self::failure("LFS verify failed", response).await);
            }
        }

        Ok(oid)
    }
}

#[async_trait]
impl DocumentStorage for GitHubDocumentStore {
    async fn fetch(&self, path: &str) -> StoreResult<Option<StoredObject>> {
        validate_path(path)?;
        debug!("Fetching {} from {}/{}@{}", path, self.owner, self.repo, self.branch);

        let response = self
            .client
            .get(self.contents_read_url(path)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_token))
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))?;

        match response.status() {
            StatusCode::OK => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Unavailable(e.into()))?;
                if body.is_array() {
                    return Err(StoreError::InvalidPath(format!("{} is a directory", path)));
                }

                let entry: ContentsEntry = serde_json::from_value(body)?;
                let content = Self::decode_content(path, &entry)?;
                Ok(Some(StoredObject {
                    path: path.to_string(),
                    content,
                    revision: Revision::new(entry.sha),
                }))
            }
            StatusCode::NOT_FOUND => {
                // Missing objects are a normal outcome
                debug!("Nothing stored at {}", path);
                Ok(None)
            }
            _ => Err(Self::failure("Failed to fetch file", response).await),
        }
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        validate_path(path)?;
        debug!(
            "Writing {} ({} bytes, {})",
            path,
            content.len(),
            if expected.is_some() { "update" } else { "create" }
        );

        let body = PutContentsRequest {
            message,
            content: base64::encode(content),
            branch: &self.branch,
            sha: expected.map(Revision::as_str),
            committer: &self.identity,
            author: &self.identity,
        };

        let response = self
            .client
            .put(self.contents_url(path)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_token))
            .header(ACCEPT, GITHUB_JSON)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let written: PutContentsResponse = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Unavailable(e.into()))?;
                debug!("Wrote {} at revision {}", written.content.name, written.content.sha);
                Ok(Revision::new(written.content.sha))
            }
            // 409: sha does not match
            StatusCode::CONFLICT => {
                let error_text = response.text().await.unwrap_or_default();
                warn!("Write to {} rejected as conflicting: {}", path, error_text);
                Err(StoreError::ConcurrentModification {
                    path: path.to_string(),
                })
            }
            // 422 is a conflict only when it is about the sha (missing for an
            // existing file); other validation failures are not
            StatusCode::UNPROCESSABLE_ENTITY => {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                if error_text.contains("sha") {
                    warn!("Write to {} rejected as conflicting: {}", path, error_text);
                    return Err(StoreError::ConcurrentModification {
                        path: path.to_string(),
                    });
                }
                error!("Failed to write file: {}", error_text);
                Err(StoreError::Unavailable(anyhow::anyhow!(
                    "Failed to write file: Status {}, Error: {}",
                    status,
                    error_text
                )))
            }
            _ => Err(Self::failure("Failed to write file", response).await),
        }
    }

    async fn put_large_file(&self, path: &str, content: &[u8], message: &str) -> StoreResult<()> {
        validate_path(path)?;
        let oid = self.upload_lfs_object(content).await?;
        let pointer = Self::lfs_pointer(&oid, content.len());

        // The pointer file goes through a normal create-or-update commit
        let existing = self.fetch(path).await?;
        self.put(
            path,
            pointer.as_bytes(),
            message,
            existing.as_ref().map(|object| &object.revision),
        )
        .await?;

        debug!("Committed LFS pointer for {} (oid {})", path, oid);
        Ok(())
    }

    async fn list_children(&self, directory: &str) -> StoreResult<Vec<String>> {
        let directory = directory.trim_matches('/');
        debug!("Listing {}", directory);

        let response = self
            .client
            .get(self.contents_read_url(directory)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_token))
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))?;

        match response.status() {
            StatusCode::OK => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Unavailable(e.into()))?;

                // A file at this path has no children
                let entries = match body {
                    serde_json::Value::Array(entries) => entries,
                    _ => return Ok(Vec::new()),
                };

                Ok(entries
                    .iter()
                    .filter_map(|entry| entry["name"].as_str().map(|name| name.to_string()))
                    .collect())
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            _ => Err(Self::failure("Failed to list directory", response).await),
        }
    }
}
