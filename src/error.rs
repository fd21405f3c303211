//! Error types for the service order store.

use crate::types::OrderId;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The primary file or a backup could not be read as a table.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Remote authentication failed: {0}")]
    RemoteAuth(String),

    /// Revision mismatch that the create fallback did not resolve.
    #[error("Remote revision conflict: {0}")]
    RemoteConflict(String),

    #[error("Remote error: {0}")]
    Remote(String),

    /// Business-rule violation. Never mutates state.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service order not found: {0}")]
    RecordNotFound(OrderId),

    #[error("Service order {0} is closed and can no longer be updated")]
    OrderClosed(OrderId),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the error comes from the remote mirror. Remote errors never
    /// invalidate a local write.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            StoreError::RemoteAuth(_) | StoreError::RemoteConflict(_) | StoreError::Remote(_)
        )
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(e: toml::de::Error) -> Self {
        StoreError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(e: toml::ser::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
