//! Load-time fallback chain.
//!
//! Sources are tried in order, stopping at the first that parses:
//! 1. the primary file as-is;
//! 2. backups, newest first (the winner is copied over the primary);
//! 3. the remote mirror, pulled over the primary;
//! 4. an empty table.

use crate::atomic::write_atomic;
use crate::backup::BackupManager;
use crate::error::{Result, StoreError};
use crate::remote::{RemoteSync, SyncOutcome};
use crate::schema::SchemaManager;
use crate::types::Table;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where a loaded table came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoverySource {
    Primary,
    /// Named backup, now also copied over the primary file.
    Backup(String),
    Remote,
    Empty,
}

#[derive(Clone, Debug)]
pub struct Recovered {
    pub table: Table,
    pub source: RecoverySource,
}

/// Resolves a valid table from whatever sources are usable.
pub struct RecoveryCoordinator<'a> {
    primary: &'a Path,
    schema: &'a SchemaManager,
    backups: &'a BackupManager,
    remote: &'a RemoteSync,
}

impl<'a> RecoveryCoordinator<'a> {
    pub fn new(
        primary: &'a Path,
        schema: &'a SchemaManager,
        backups: &'a BackupManager,
        remote: &'a RemoteSync,
    ) -> Self {
        Self {
            primary,
            schema,
            backups,
            remote,
        }
    }

    /// Always returns a normalized table, even when every source fails.
    pub fn resolve(&self) -> Recovered {
        if let Some(table) = self.from_primary() {
            return Recovered {
                table,
                source: RecoverySource::Primary,
            };
        }

        if let Some((name, table)) = self.from_backups() {
            return Recovered {
                table,
                source: RecoverySource::Backup(name),
            };
        }

        if let Some(table) = self.from_remote() {
            return Recovered {
                table,
                source: RecoverySource::Remote,
            };
        }

        info!("no usable table source, starting empty");
        Recovered {
            table: self.schema.empty_table(),
            source: RecoverySource::Empty,
        }
    }

    fn from_primary(&self) -> Option<Table> {
        match self.read_primary() {
            Ok(table) => Some(table),
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.primary.display(), "primary file missing");
                None
            }
            Err(e) => {
                warn!(path = %self.primary.display(), error = %e, "primary file unreadable");
                None
            }
        }
    }

    fn from_backups(&self) -> Option<(String, Table)> {
        let backups = match self.backups.list() {
            Ok(backups) => backups,
            Err(e) => {
                warn!(error = %e, "cannot list backups");
                return None;
            }
        };

        for backup in backups {
            let bytes = match fs::read(&backup.path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(backup = %backup.name, error = %e, "cannot read backup");
                    continue;
                }
            };
            let table = match self.schema.read_bytes(&bytes) {
                Ok(table) => table,
                Err(e) => {
                    warn!(backup = %backup.name, error = %e, "backup unreadable, trying older");
                    continue;
                }
            };

            // Make recovery sticky so the next load starts from the primary.
            match write_atomic(self.primary, &bytes) {
                Ok(()) => info!(backup = %backup.name, "primary file repaired from backup"),
                Err(e) => warn!(backup = %backup.name, error = %e, "could not repair primary file"),
            }
            return Some((backup.name, table));
        }
        None
    }

    fn from_remote(&self) -> Option<Table> {
        if !self.remote.is_enabled() {
            return None;
        }
        match self.remote.pull() {
            Ok(SyncOutcome::Pulled { revision, .. }) => match self.read_primary() {
                Ok(table) => {
                    info!(%revision, "primary file recovered from remote mirror");
                    Some(table)
                }
                Err(e) => {
                    warn!(%revision, error = %e, "remote copy unreadable");
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "remote pull failed");
                None
            }
        }
    }

    fn read_primary(&self) -> Result<Table> {
        let bytes = fs::read(self.primary)?;
        self.schema.read_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::remote::MemoryBlobStore;
    use crate::schema::columns::CANONICAL;
    use chrono::{Duration, FixedOffset, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    const TABLE_V1: &[u8] = b"ID,Status\n1,Pendente\n";
    const TABLE_V2: &[u8] = b"ID,Status\n1,Pendente\n2,Pausado\n";

    struct Fixture {
        _dir: TempDir,
        primary: std::path::PathBuf,
        schema: SchemaManager,
        backups: BackupManager,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("ordens_servico.csv");
        let clock = Arc::new(ManualClock::new(
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
                .unwrap(),
        ));
        let backups = BackupManager::new(
            dir.path().join("backups"),
            &primary,
            "ordens_servico",
            clock.clone(),
        )
        .unwrap();
        Fixture {
            _dir: dir,
            primary,
            schema: SchemaManager::new(),
            backups,
            clock,
        }
    }

    fn snapshot(f: &Fixture, bytes: &[u8]) {
        fs::write(&f.primary, bytes).unwrap();
        f.backups.snapshot().unwrap();
        f.clock.advance(Duration::seconds(1));
    }

    #[test]
    fn test_primary_wins() {
        let f = fixture();
        fs::write(&f.primary, TABLE_V1).unwrap();
        let remote = RemoteSync::disabled();

        let recovered = RecoveryCoordinator::new(&f.primary, &f.schema, &f.backups, &remote).resolve();
        assert_eq!(recovered.source, RecoverySource::Primary);
        assert_eq!(recovered.table.len(), 1);
    }

    #[test]
    fn test_newest_valid_backup_repairs_primary() {
        let f = fixture();
        snapshot(&f, TABLE_V1);
        snapshot(&f, TABLE_V2);
        snapshot(&f, b"\x00\x01 corrupt backup");
        fs::write(&f.primary, b"\xde\xad\xbe\xef").unwrap();
        let remote = RemoteSync::disabled();

        let recovered = RecoveryCoordinator::new(&f.primary, &f.schema, &f.backups, &remote).resolve();
        assert!(matches!(recovered.source, RecoverySource::Backup(_)));
        assert_eq!(recovered.table.len(), 2);
        assert_eq!(fs::read(&f.primary).unwrap(), TABLE_V2);
    }

    #[test]
    fn test_remote_after_backups() {
        let f = fixture();
        let store = Arc::new(MemoryBlobStore::new());
        store.insert("ordens.csv", TABLE_V2);
        let remote = RemoteSync::with_store(store, "ordens.csv", &f.primary);

        let recovered = RecoveryCoordinator::new(&f.primary, &f.schema, &f.backups, &remote).resolve();
        assert_eq!(recovered.source, RecoverySource::Remote);
        assert_eq!(recovered.table.len(), 2);
        assert_eq!(fs::read(&f.primary).unwrap(), TABLE_V2);
    }

    #[test]
    fn test_total_failure_yields_empty_table() {
        let f = fixture();
        fs::write(&f.primary, b"garbage").unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        let remote = RemoteSync::with_store(store, "ordens.csv", &f.primary);

        let recovered = RecoveryCoordinator::new(&f.primary, &f.schema, &f.backups, &remote).resolve();
        assert_eq!(recovered.source, RecoverySource::Empty);
        assert!(recovered.table.is_empty());

        let raw = f.schema.encode(&recovered.table);
        assert_eq!(raw.headers, CANONICAL.map(String::from).to_vec());
    }
}
