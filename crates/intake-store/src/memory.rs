//! In-memory implementation of DocumentStorage
//!
//! This implementation is primarily intended for testing and development purposes.

use crate::{
    validate_path, CommitIdentity, DocumentStorage, Revision, StoreError, StoreResult,
    StoredObject,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A write recorded by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub path: String,
    pub message: String,
    pub author: CommitIdentity,
    /// Written through the large-file side channel
    pub large_file: bool,
}

/// In-memory implementation of DocumentStorage
///
/// Objects and large files are kept in separate maps, like a repository
/// with LFS-tracked paths. Every write is appended to a commit log.
/// All data is lost when the instance is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    large_files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    commits: Arc<RwLock<Vec<CommitRecord>>>,
    identity: CommitIdentity,
}

impl InMemoryDocumentStore {
    /// Create a new in-memory document store
    pub fn new() -> Self {
        Self::with_identity(CommitIdentity::default())
    }

    pub fn with_identity(identity: CommitIdentity) -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            large_files: Arc::new(RwLock::new(BTreeMap::new())),
            commits: Arc::new(RwLock::new(Vec::new())),
            identity,
        }
    }

    /// Calculate the SHA-256 revision of content
    fn calculate_revision(content: &[u8]) -> Revision {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let result = hasher.finalize();
        Revision::new(format!("sha256:{}", hex::encode(result)))
    }

    async fn record_commit(&self, path: &str, message: &str, large_file: bool) {
        self.commits.write().await.push(CommitRecord {
            path: path.to_string(),
            message: message.to_string(),
            author: self.identity.clone(),
            large_file,
        });
    }

    /// All writes so far, oldest first
    pub async fn commits(&self) -> Vec<CommitRecord> {
        self.commits.read().await.clone()
    }

    /// Content uploaded through the large-file side channel
    pub async fn large_file(&self, path: &str) -> Option<Vec<u8>> {
        self.large_files.read().await.get(path).cloned()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStorage for InMemoryDocumentStore {
    async fn fetch(&self, path: &str) -> StoreResult<Option<StoredObject>> {
        validate_path(path)?;
        let objects = self.objects.read().await;

        Ok(objects.get(path).map(|content| StoredObject {
            path: path.to_string(),
            content: content.clone(),
            revision: Self::calculate_revision(content),
        }))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        validate_path(path)?;

        // Hold the write lock across compare and swap
        let mut objects = self.objects.write().await;
        let current = objects.get(path).map(|existing| Self::calculate_revision(existing));

        let matches = match (current.as_ref(), expected) {
            (None, None) => true,
            (Some(current), Some(expected)) => current == expected,
            _ => false,
        };
        if !matches {
            warn!(
                path,
                current = ?current,
                expected = ?expected,
                "Rejecting write with stale revision"
            );
            return Err(StoreError::ConcurrentModification {
                path: path.to_string(),
            });
        }

        objects.insert(path.to_string(), content.to_vec());
        drop(objects);

        let revision = Self::calculate_revision(content);
        debug!("Stored {} at revision {}", path, revision);
        self.record_commit(path, message, false).await;

        Ok(revision)
    }

    async fn put_large_file(&self, path: &str, content: &[u8], message: &str) -> StoreResult<()> {
        validate_path(path)?;
        self.large_files
            .write()
            .await
            .insert(path.to_string(), content.to_vec());

        debug!("Stored large file {} ({} bytes)", path, content.len());
        self.record_commit(path, message, true).await;

        Ok(())
    }

    async fn list_children(&self, directory: &str) -> StoreResult<Vec<String>> {
        let directory = directory.trim_matches('/');
        let prefix = if directory.is_empty() {
            String::new()
        } else {
            format!("{}/", directory)
        };

        let objects = self.objects.read().await;
        let large_files = self.large_files.read().await;

        let children: BTreeSet<String> = objects
            .keys()
            .chain(large_files.keys())
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(|name| name.to_string())
            .collect();

        Ok(children.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_missing_is_none() {
        let store = InMemoryDocumentStore::new();
        let result = store.fetch("nobody/nothing/pipeline.json").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let store = InMemoryDocumentStore::new();
        let path = "a@b.com/net/pipeline.json";

        let first = store.put(path, b"v1", "create workflow", None).await.unwrap();
        let fetched = store.fetch(path).await.unwrap().unwrap();
        assert_eq!(fetched.content, b"v1");
        assert_eq!(fetched.revision, first);

        let second = store.put(path, b"v2", "update data", Some(&first)).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.fetch(path).await.unwrap().unwrap().content, b"v2");
    }

    #[tokio::test]
    async fn test_stale_revision_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let path = "a@b.com/net/pipeline.json";

        let original = store.put(path, b"v1", "create workflow", None).await.unwrap();
        store.put(path, b"v2", "other tab", Some(&original)).await.unwrap();

        let result = store.put(path, b"v3", "stale tab", Some(&original)).await;
        match result {
            Err(StoreError::ConcurrentModification { path: conflicted }) => assert_eq!(conflicted, path),
            other => panic!("Expected ConcurrentModification, got {:?}", other),
        }
        assert_eq!(store.fetch(path).await.unwrap().unwrap().content, b"v2");
    }

    #[tokio::test]
    async fn test_create_over_existing_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let path = "a@b.com/net/pipeline.json";
        store.put(path, b"v1", "create workflow", None).await.unwrap();

        let result = store.put(path, b"v2", "create workflow", None).await;
        assert!(matches!(result, Err(StoreError::ConcurrentModification { .. })));
    }

    #[tokio::test]
    async fn test_update_of_missing_object_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let token = Revision::new("sha256:0000");
        let result = store.put("a/b/pipeline.json", b"v1", "update", Some(&token)).await;
        assert!(matches!(result, Err(StoreError::ConcurrentModification { .. })));
        assert!(store.fetch("a/b/pipeline.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commits_carry_identity() {
        let identity = CommitIdentity::new("intake-bot", "bot@example.org");
        let store = InMemoryDocumentStore::with_identity(identity.clone());
        store.put("a/b/pipeline.json", b"{}", "create workflow", None).await.unwrap();
        store.put_large_file("a/b/data/x.csv", b"1,2", "add input data: x.csv").await.unwrap();

        let commits = store.commits().await;
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "create workflow");
        assert!(!commits[0].large_file);
        assert_eq!(commits[1].author, identity);
        assert!(commits[1].large_file);
    }

    #[tokio::test]
    async fn test_list_children() {
        let store = InMemoryDocumentStore::new();
        store.put("a@b.com/net/pipeline.json", b"{}", "create", None).await.unwrap();
        store.put("a@b.com/topics/pipeline.json", b"{}", "create", None).await.unwrap();
        store.put("a@b.com/net/data/README.md", b"x", "create", None).await.unwrap();
        store.put_large_file("a@b.com/net/data/edges.csv", b"1,2", "add").await.unwrap();

        assert_eq!(store.list_children("a@b.com").await.unwrap(), vec!["net", "topics"]);
        assert_eq!(
            store.list_children("a@b.com/net/data/").await.unwrap(),
            vec!["README.md", "edges.csv"]
        );
        assert_eq!(store.list_children("").await.unwrap(), vec!["a@b.com"]);
        assert!(store.list_children("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_paths_are_rejected() {
        let store = InMemoryDocumentStore::new();
        assert!(matches!(store.fetch("").await, Err(StoreError::InvalidPath(_))));
        assert!(matches!(
            store.put("a//b", b"", "m", None).await,
            Err(StoreError::InvalidPath(_))
        ));
    }
}
