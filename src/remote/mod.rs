//! Optional mirror of the primary file to a remote versioned blob store.
//!
//! Any backend is adapted to a three-operation contract: `get`, a
//! revision-checked `put`, and an unconditional `create`. The mirror is
//! enabled only when a repository, a file path, and a token are configured.

mod github;
mod memory;
mod sync;

pub use github::GitHubBlobStore;
pub use memory::MemoryBlobStore;
pub use sync::{RemoteSync, SyncOutcome};

use crate::error::StoreError;
use std::sync::Arc;
use thiserror::Error;

/// Content and revision held by the remote store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteBlob {
    pub content: Vec<u8>,
    /// Opaque token used for optimistic-concurrency updates.
    pub revision: String,
}

/// Errors reported by a blob store backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote file not found: {0}")]
    NotFound(String),

    #[error("revision mismatch: {0}")]
    Conflict(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<RemoteError> for StoreError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Auth(msg) => StoreError::RemoteAuth(msg),
            RemoteError::Conflict(msg) => StoreError::RemoteConflict(msg),
            RemoteError::NotFound(path) => StoreError::Remote(format!("not found: {path}")),
            RemoteError::Transport(msg) => StoreError::Remote(msg),
        }
    }
}

/// Path-addressed versioned blob store.
pub trait BlobStore: Send + Sync {
    /// Current content and revision of `path`.
    fn get(&self, path: &str) -> Result<RemoteBlob, RemoteError>;

    /// Replace `path` if its revision is still `expected_revision`.
    fn put(&self, path: &str, content: &[u8], expected_revision: &str)
        -> Result<String, RemoteError>;

    /// Write `path` regardless of what is there.
    fn create(&self, path: &str, content: &[u8]) -> Result<String, RemoteError>;
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn get(&self, path: &str) -> Result<RemoteBlob, RemoteError> {
        (**self).get(path)
    }

    fn put(
        &self,
        path: &str,
        content: &[u8],
        expected_revision: &str,
    ) -> Result<String, RemoteError> {
        (**self).put(path, content, expected_revision)
    }

    fn create(&self, path: &str, content: &[u8]) -> Result<String, RemoteError> {
        (**self).create(path, content)
    }
}
