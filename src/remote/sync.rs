//! Push/pull between the primary file and the remote mirror.

use super::{BlobStore, GitHubBlobStore, RemoteError};
use crate::atomic::write_atomic;
use crate::config::RemoteConfig;
use crate::error::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a sync call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Mirror disabled: no repository, file path, or token configured.
    Unavailable,
    Pulled { revision: String, bytes: usize },
    /// `created` is true when the write went through the unconditional
    /// create path instead of a revision-checked update.
    Pushed { revision: String, created: bool },
}

struct Mirror {
    store: Box<dyn BlobStore>,
    remote_path: String,
    primary: PathBuf,
    last_revision: Mutex<Option<String>>,
}

/// Mirrors the primary file to a remote blob store.
///
/// Calls never retry; a failed push is simply re-attempted by the next save.
pub struct RemoteSync {
    mirror: Option<Mirror>,
}

impl RemoteSync {
    /// A sync that does nothing and reports `Unavailable`.
    pub fn disabled() -> Self {
        Self { mirror: None }
    }

    /// Build from configuration. Missing credentials disable the mirror
    /// without being an error.
    pub fn from_config(config: &RemoteConfig, primary: impl AsRef<Path>) -> Result<Self> {
        let Some(target) = config.target() else {
            debug!("remote mirror not configured");
            return Ok(Self::disabled());
        };
        let remote_path = target.file_path.to_string();
        let store = GitHubBlobStore::from_config(config)?;
        info!(repository = target.repository, path = %remote_path, "remote mirror enabled");
        Ok(Self::with_store(store, remote_path, primary))
    }

    /// Mirror through an arbitrary backend.
    pub fn with_store(
        store: impl BlobStore + 'static,
        remote_path: impl Into<String>,
        primary: impl AsRef<Path>,
    ) -> Self {
        Self {
            mirror: Some(Mirror {
                store: Box::new(store),
                remote_path: remote_path.into(),
                primary: primary.as_ref().to_path_buf(),
                last_revision: Mutex::new(None),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mirror.is_some()
    }

    /// Revision acknowledged by the last successful pull or push.
    pub fn last_revision(&self) -> Option<String> {
        self.mirror
            .as_ref()
            .and_then(|m| m.last_revision.lock().clone())
    }

    /// Fetch the remote content and overwrite the primary file with it.
    pub fn pull(&self) -> Result<SyncOutcome> {
        let Some(mirror) = &self.mirror else {
            return Ok(SyncOutcome::Unavailable);
        };

        let blob = mirror.store.get(&mirror.remote_path)?;
        write_atomic(&mirror.primary, &blob.content)?;
        *mirror.last_revision.lock() = Some(blob.revision.clone());
        info!(revision = %blob.revision, bytes = blob.content.len(), "pulled primary file from remote");

        Ok(SyncOutcome::Pulled {
            revision: blob.revision,
            bytes: blob.content.len(),
        })
    }

    /// Upload the primary file's current bytes.
    ///
    /// Tries a revision-checked update first; when the remote reports the
    /// file missing or at another revision (or no revision is known yet)
    /// it falls back to an unconditional create.
    pub fn push(&self) -> Result<SyncOutcome> {
        let Some(mirror) = &self.mirror else {
            return Ok(SyncOutcome::Unavailable);
        };

        let bytes = fs::read(&mirror.primary)?;
        let known = mirror.last_revision.lock().clone();

        let update = match known {
            Some(revision) => Some(mirror.store.put(&mirror.remote_path, &bytes, &revision)),
            None => None,
        };

        let (revision, created) = match update {
            Some(Ok(revision)) => (revision, false),
            Some(Err(RemoteError::NotFound(_) | RemoteError::Conflict(_))) | None => {
                debug!(path = %mirror.remote_path, "falling back to unconditional create");
                (mirror.store.create(&mirror.remote_path, &bytes)?, true)
            }
            Some(Err(e)) => return Err(e.into()),
        };

        *mirror.last_revision.lock() = Some(revision.clone());
        debug!(%revision, created, "pushed primary file to remote");
        Ok(SyncOutcome::Pushed { revision, created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::remote::MemoryBlobStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    const REMOTE_PATH: &str = "data/ordens_servico.csv";

    fn setup(dir: &TempDir) -> (RemoteSync, Arc<MemoryBlobStore>, PathBuf) {
        let remote = Arc::new(MemoryBlobStore::new());
        let primary = dir.path().join("ordens_servico.csv");
        let sync = RemoteSync::with_store(remote.clone(), REMOTE_PATH, &primary);
        (sync, remote, primary)
    }

    #[test]
    fn test_disabled_is_unavailable() {
        let sync = RemoteSync::from_config(&RemoteConfig::default(), "/nonexistent").unwrap();
        assert!(!sync.is_enabled());
        assert_eq!(sync.push().unwrap(), SyncOutcome::Unavailable);
        assert_eq!(sync.pull().unwrap(), SyncOutcome::Unavailable);
    }

    #[test]
    fn test_standalone_remote_document_gates_sync() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("ordens_servico.csv");
        let doc = dir.path().join("remote.toml");

        let missing = RemoteConfig::load(&doc).unwrap();
        assert!(!RemoteSync::from_config(&missing, &primary).unwrap().is_enabled());

        fs::write(
            &doc,
            "repository = \"acme/manutencao\"\nfile_path = \"data/ordens_servico.csv\"\n",
        )
        .unwrap();
        let partial = RemoteConfig::load(&doc).unwrap();
        assert!(!RemoteSync::from_config(&partial, &primary).unwrap().is_enabled());

        fs::write(
            &doc,
            "repository = \"acme/manutencao\"\nfile_path = \"data/ordens_servico.csv\"\ntoken = \"tok\"\n",
        )
        .unwrap();
        let full = RemoteConfig::load(&doc).unwrap();
        assert_eq!(full.target().unwrap().file_path, "data/ordens_servico.csv");
        assert!(RemoteSync::from_config(&full, &primary).unwrap().is_enabled());
    }

    #[test]
    fn test_first_push_creates_then_updates() {
        let dir = TempDir::new().unwrap();
        let (sync, remote, primary) = setup(&dir);

        fs::write(&primary, b"v1").unwrap();
        let first = sync.push().unwrap();
        assert!(matches!(first, SyncOutcome::Pushed { created: true, .. }));

        fs::write(&primary, b"v2").unwrap();
        let second = sync.push().unwrap();
        assert!(matches!(second, SyncOutcome::Pushed { created: false, .. }));

        assert_eq!(remote.content(REMOTE_PATH).unwrap(), b"v2");
        assert_eq!(sync.last_revision(), remote.revision(REMOTE_PATH));
        assert_eq!(remote.calls(), vec!["create", "put"]);
    }

    #[test]
    fn test_push_conflict_falls_back_to_create() {
        let dir = TempDir::new().unwrap();
        let (sync, remote, primary) = setup(&dir);

        fs::write(&primary, b"v1").unwrap();
        sync.push().unwrap();
        remote.insert(REMOTE_PATH, b"someone else");

        fs::write(&primary, b"v2").unwrap();
        let outcome = sync.push().unwrap();
        assert!(matches!(outcome, SyncOutcome::Pushed { created: true, .. }));
        assert_eq!(remote.content(REMOTE_PATH).unwrap(), b"v2");
    }

    #[test]
    fn test_push_auth_failure_is_typed() {
        let dir = TempDir::new().unwrap();
        let (sync, remote, primary) = setup(&dir);
        fs::write(&primary, b"v1").unwrap();

        remote.set_failure(Some(RemoteError::Auth("bad token".into())));
        assert!(matches!(sync.push(), Err(StoreError::RemoteAuth(_))));
        assert_eq!(sync.last_revision(), None);
    }

    #[test]
    fn test_pull_overwrites_primary() {
        let dir = TempDir::new().unwrap();
        let (sync, remote, primary) = setup(&dir);
        fs::write(&primary, b"local").unwrap();
        let revision = remote.insert(REMOTE_PATH, b"remote");

        let outcome = sync.pull().unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Pulled {
                revision: revision.clone(),
                bytes: 6
            }
        );
        assert_eq!(fs::read(&primary).unwrap(), b"remote");
        assert_eq!(sync.last_revision(), Some(revision));
    }

    #[test]
    fn test_pull_missing_remote_leaves_primary() {
        let dir = TempDir::new().unwrap();
        let (sync, _remote, primary) = setup(&dir);
        fs::write(&primary, b"local").unwrap();

        assert!(matches!(sync.pull(), Err(StoreError::Remote(_))));
        assert_eq!(fs::read(&primary).unwrap(), b"local");
    }
}
