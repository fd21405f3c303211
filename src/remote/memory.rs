//! In-process blob store.

use super::{BlobStore, RemoteBlob, RemoteError};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Blob store kept in memory. Revisions are the SHA-256 of the content.
///
/// Useful as an offline mirror and for exercising the sync paths. A failure
/// can be injected so every call returns it until cleared.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, RemoteBlob>>,
    failure: Mutex<Option<RemoteError>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<RemoteError>) {
        *self.failure.lock() = error;
    }

    /// Overwrite `path` out of band, as another writer would.
    pub fn insert(&self, path: &str, content: &[u8]) -> String {
        let revision = revision_of(content);
        self.blobs.lock().insert(
            path.to_string(),
            RemoteBlob {
                content: content.to_vec(),
                revision: revision.clone(),
            },
        );
        revision
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().get(path).map(|b| b.content.clone())
    }

    pub fn revision(&self, path: &str) -> Option<String> {
        self.blobs.lock().get(path).map(|b| b.revision.clone())
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn begin(&self, op: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().push(op);
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, path: &str) -> Result<RemoteBlob, RemoteError> {
        self.begin("get")?;
        self.blobs
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }

    fn put(
        &self,
        path: &str,
        content: &[u8],
        expected_revision: &str,
    ) -> Result<String, RemoteError> {
        self.begin("put")?;
        let mut blobs = self.blobs.lock();
        let current = blobs
            .get_mut(path)
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))?;
        if current.revision != expected_revision {
            return Err(RemoteError::Conflict(format!(
                "{path}: expected {expected_revision}, found {}",
                current.revision
            )));
        }
        current.content = content.to_vec();
        current.revision = revision_of(content);
        Ok(current.revision.clone())
    }

    fn create(&self, path: &str, content: &[u8]) -> Result<String, RemoteError> {
        self.begin("create")?;
        Ok(self.insert(path, content))
    }
}

fn revision_of(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_checks_revision() {
        let store = MemoryBlobStore::new();
        let rev = store.create("os.csv", b"v1").unwrap();

        let rev2 = store.put("os.csv", b"v2", &rev).unwrap();
        assert_ne!(rev, rev2);

        let stale = store.put("os.csv", b"v3", &rev);
        assert!(matches!(stale, Err(RemoteError::Conflict(_))));
        assert_eq!(store.content("os.csv").unwrap(), b"v2");
    }

    #[test]
    fn test_put_missing_path() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.put("os.csv", b"v1", "abc"),
            Err(RemoteError::NotFound(_))
        ));
    }

    #[test]
    fn test_injected_failure() {
        let store = MemoryBlobStore::new();
        store.set_failure(Some(RemoteError::Auth("bad token".into())));
        assert!(matches!(store.get("os.csv"), Err(RemoteError::Auth(_))));

        store.set_failure(None);
        assert!(store.create("os.csv", b"v1").is_ok());
        assert_eq!(store.calls(), vec!["get", "create"]);
    }
}
