//! Timestamped snapshots of the primary file.

use crate::atomic::write_atomic;
use crate::clock::{Clock, BACKUP_STAMP_FORMAT};
use crate::error::{Result, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const BACKUP_EXTENSION: &str = "csv";

/// Length of `YYYYMMDD_HHMMSS`.
const STAMP_LEN: usize = 15;

/// A backup file found in the backup directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupInfo {
    /// File name, e.g. `ordens_servico_20240309_140507.csv`.
    pub name: String,
    pub path: PathBuf,
    /// `YYYYMMDD_HHMMSS` embedded in the name.
    pub stamp: String,
    /// Disambiguates snapshots taken within the same second.
    pub seq: u32,
}

impl BackupInfo {
    fn sort_key(&self) -> (&str, u32) {
        (&self.stamp, self.seq)
    }
}

/// Creates, lists, rotates, and restores backups of the primary file.
///
/// Backups live in a flat directory and are never modified once written.
pub struct BackupManager {
    dir: PathBuf,
    primary: PathBuf,
    stem: String,
    clock: Arc<dyn Clock>,
}

impl BackupManager {
    pub fn new(
        dir: impl AsRef<Path>,
        primary: impl AsRef<Path>,
        stem: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            primary: primary.as_ref().to_path_buf(),
            stem: stem.into(),
            clock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the current primary file into the backup directory.
    ///
    /// The name embeds the local time with second resolution. A second
    /// snapshot within the same second gets a numeric suffix instead of
    /// replacing the first. Returns `None` when there is no primary file.
    pub fn snapshot(&self) -> Result<Option<BackupInfo>> {
        if !self.primary.exists() {
            debug!(path = %self.primary.display(), "no primary file to snapshot");
            return Ok(None);
        }
        let bytes = fs::read(&self.primary)?;

        let stamp = self.clock.now().format(BACKUP_STAMP_FORMAT).to_string();
        let mut seq = 0;
        let mut name = self.backup_name(&stamp, seq);
        while self.dir.join(&name).exists() {
            seq += 1;
            name = self.backup_name(&stamp, seq);
        }

        let path = self.dir.join(&name);
        write_atomic(&path, &bytes)?;
        info!(backup = %name, bytes = bytes.len(), "backup created");

        Ok(Some(BackupInfo {
            name,
            path,
            stamp,
            seq,
        }))
    }

    /// Delete all but the `max_backups` most recent backups.
    ///
    /// Returns the number of files removed.
    pub fn rotate(&self, max_backups: usize) -> Result<usize> {
        let backups = self.list()?;
        let mut removed = 0;
        for old in backups.iter().skip(max_backups) {
            fs::remove_file(&old.path)?;
            debug!(backup = %old.name, "backup rotated out");
            removed += 1;
        }
        Ok(removed)
    }

    /// All backups, newest first. Files that do not follow the naming
    /// scheme are ignored.
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        let mut backups = Vec::new();
        if !self.dir.exists() {
            return Ok(backups);
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(info) = self.parse_name(&file_name) {
                backups.push(info);
            }
        }

        backups.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(backups)
    }

    pub fn newest(&self) -> Result<Option<BackupInfo>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Look up a backup by file name.
    pub fn get(&self, name: &str) -> Result<BackupInfo> {
        let info = self
            .parse_name(name)
            .ok_or_else(|| StoreError::BackupNotFound(name.to_string()))?;
        if !info.path.is_file() {
            return Err(StoreError::BackupNotFound(name.to_string()));
        }
        Ok(info)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let info = self.get(name)?;
        Ok(fs::read(&info.path)?)
    }

    /// Overwrite the primary file with a backup's bytes.
    ///
    /// Destructive: the current primary content is lost unless a backup of
    /// it exists. Administrative path only.
    pub fn restore(&self, name: &str) -> Result<()> {
        let bytes = self.read(name)?;
        write_atomic(&self.primary, &bytes)?;
        warn!(backup = %name, path = %self.primary.display(), "primary file restored from backup");
        Ok(())
    }

    /// Delete every backup newer than `name`.
    ///
    /// Used after a restore so that later snapshots of the abandoned history
    /// cannot be picked up by recovery. Returns the number removed.
    pub fn discard_newer_than(&self, name: &str) -> Result<usize> {
        let anchor = self.get(name)?;
        let mut removed = 0;
        for backup in self.list()? {
            if backup.sort_key() > anchor.sort_key() {
                fs::remove_file(&backup.path)?;
                debug!(backup = %backup.name, "discarded backup newer than restore point");
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn backup_name(&self, stamp: &str, seq: u32) -> String {
        if seq == 0 {
            format!("{}_{stamp}.{BACKUP_EXTENSION}", self.stem)
        } else {
            format!("{}_{stamp}_{seq:02}.{BACKUP_EXTENSION}", self.stem)
        }
    }

    /// Inverse of `backup_name`. Rejects anything else, including names
    /// with path separators.
    fn parse_name(&self, name: &str) -> Option<BackupInfo> {
        let rest = name
            .strip_prefix(self.stem.as_str())?
            .strip_prefix('_')?
            .strip_suffix(BACKUP_EXTENSION)?
            .strip_suffix('.')?;

        let stamp = rest.get(..STAMP_LEN)?;
        let valid_stamp = stamp.char_indices().all(|(i, c)| {
            if i == 8 {
                c == '_'
            } else {
                c.is_ascii_digit()
            }
        });
        if !valid_stamp {
            return None;
        }

        let seq = match &rest[STAMP_LEN..] {
            "" => 0,
            suffix => {
                let digits = suffix.strip_prefix('_')?;
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()?
            }
        };

        Some(BackupInfo {
            name: name.to_string(),
            path: self.dir.join(name),
            stamp: stamp.to_string(),
            seq,
        })
    }
}
