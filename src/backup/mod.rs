//! Rotated history of primary file snapshots.
//!
//! A snapshot is taken after every successful save. Names embed a
//! `YYYYMMDD_HHMMSS` timestamp so they sort chronologically.

mod manager;

pub use manager::{BackupInfo, BackupManager};
