//! # Service Orders
//!
//! Durable storage for a maintenance service-order table kept as a single
//! CSV file, with rolling local backups and an optional remote mirror.
//!
//! ## Core Concepts
//!
//! - **Table**: The ordered list of service orders, one row per order
//! - **Schema**: Column layout with in-place migration of older files
//! - **Backups**: Timestamped snapshots taken after every save, rotated
//! - **Recovery**: Load falls back to backups, then the remote mirror
//!
//! ## Example
//!
//! ```ignore
//! use service_orders::{NewOrder, OrderChanges, RecordStore, Status, StoreConfig};
//!
//! let store = RecordStore::open(StoreConfig::in_dir("./dados"))?;
//!
//! let order = store.create(NewOrder::new("Troca de lâmpada", "Ana", "Bloco B"))?;
//! store.update(
//!     order.id,
//!     OrderChanges::new()
//!         .status(Status::InProgress)
//!         .primary_executor("Ismael"),
//! )?;
//! ```

mod atomic;
pub mod backup;
pub mod clock;
pub mod config;
pub mod error;
pub mod recovery;
pub mod remote;
pub mod roster;
pub mod schema;
pub mod store;
pub mod types;

// Re-exports
pub use backup::{BackupInfo, BackupManager};
pub use clock::{parse_date_input, stamp, Clock, ManualClock, SystemClock};
pub use config::{RemoteConfig, StoreConfig};
pub use error::{Result, StoreError};
pub use recovery::{Recovered, RecoveryCoordinator, RecoverySource};
pub use remote::{
    BlobStore, GitHubBlobStore, MemoryBlobStore, RemoteBlob, RemoteError, RemoteSync, SyncOutcome,
};
pub use roster::Roster;
pub use schema::{SchemaManager, SchemaVersion};
pub use store::{RecordStore, SaveReport};
pub use types::*;
