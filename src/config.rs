//! Store and remote mirror configuration.
//!
//! Configuration is a plain value built once (usually from a TOML document)
//! and handed to the components that need it.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of backups kept by rotation.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Default local offset (UTC-03:00).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the primary file, backups, and roster.
    pub data_dir: PathBuf,

    /// Primary table file name inside `data_dir`.
    pub primary_file: String,

    /// Backup directory, relative to `data_dir` unless absolute.
    pub backup_dir: PathBuf,

    /// Number of backups kept after each save.
    pub max_backups: usize,

    /// Fixed offset used for all stamps.
    pub utc_offset_hours: i32,

    /// Executor roster file, relative to `data_dir` unless absolute.
    pub roster_file: PathBuf,

    /// Remote mirror settings. Missing fields disable the mirror.
    pub remote: RemoteConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            primary_file: "ordens_servico.csv".to_string(),
            backup_dir: PathBuf::from("backups"),
            max_backups: DEFAULT_MAX_BACKUPS,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            roster_file: PathBuf::from("executantes.txt"),
            remote: RemoteConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `data_dir` with every other field at its default.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Load from a TOML document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(text)?;
        if config.primary_file.trim().is_empty() {
            return Err(StoreError::Config("primary_file must not be empty".into()));
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn primary_path(&self) -> PathBuf {
        self.data_dir.join(&self.primary_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join(&self.backup_dir)
    }

    pub fn roster_path(&self) -> PathBuf {
        self.data_dir.join(&self.roster_file)
    }

    /// Stem used for backup names (`ordens_servico` for `ordens_servico.csv`).
    pub fn backup_stem(&self) -> String {
        Path::new(&self.primary_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "backup".to_string())
    }
}

/// Remote mirror settings. The token is opaque and never logged.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Repository identifier, e.g. `owner/repo`.
    pub repository: Option<String>,

    /// Path of the mirrored file inside the repository.
    pub file_path: Option<String>,

    /// Access credential.
    pub token: Option<String>,

    pub branch: Option<String>,
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("repository", &self.repository)
            .field("file_path", &self.file_path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// The three fields the mirror cannot work without.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTarget<'a> {
    pub repository: &'a str,
    pub file_path: &'a str,
    pub token: &'a str,
}

impl RemoteConfig {
    pub fn new(
        repository: impl Into<String>,
        file_path: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            repository: Some(repository.into()),
            file_path: Some(file_path.into()),
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Load only the remote section from a standalone TOML document holding
    /// `repository`, `file_path`, and `token`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// `Some` only when repository, file path, and token are all present
    /// and non-blank.
    pub fn target(&self) -> Option<RemoteTarget<'_>> {
        Some(RemoteTarget {
            repository: present(&self.repository)?,
            file_path: present(&self.file_path)?,
            token: present(&self.token)?,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.target().is_some()
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::in_dir("/tmp/os");
        assert_eq!(config.primary_path(), PathBuf::from("/tmp/os/ordens_servico.csv"));
        assert_eq!(config.backup_path(), PathBuf::from("/tmp/os/backups"));
        assert_eq!(config.max_backups, 10);
        assert_eq!(config.backup_stem(), "ordens_servico");
        assert!(!config.remote.is_enabled());
    }

    #[test]
    fn test_from_toml_with_remote() {
        let config = StoreConfig::from_toml(
            r#"
            data_dir = "/srv/os"
            max_backups = 3

            [remote]
            repository = "acme/manutencao"
            file_path = "data/ordens_servico.csv"
            token = "ghp_secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_backups, 3);
        assert_eq!(config.utc_offset_hours, -3);
        let target = config.remote.target().unwrap();
        assert_eq!(target.repository, "acme/manutencao");
        assert_eq!(config.remote.api_base(), "https://api.github.com");
    }

    #[test]
    fn test_missing_remote_field_disables() {
        let mut remote = RemoteConfig::new("acme/manutencao", "ordens.csv", "tok");
        assert!(remote.is_enabled());

        remote.token = Some("   ".into());
        assert!(!remote.is_enabled());

        remote.token = None;
        assert!(!remote.is_enabled());
    }

    #[test]
    fn test_debug_redacts_token() {
        let remote = RemoteConfig::new("acme/manutencao", "ordens.csv", "ghp_secret");
        let rendered = format!("{remote:?}");
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = StoreConfig::in_dir("/srv/os");
        let text = config.to_toml().unwrap();
        let parsed = StoreConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.primary_file, config.primary_file);
    }
}
