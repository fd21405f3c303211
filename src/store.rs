//! Main RecordStore struct tying all components together.

use crate::atomic::write_atomic;
use crate::backup::{BackupInfo, BackupManager};
use crate::clock::{stamp, Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::recovery::{Recovered, RecoveryCoordinator};
use crate::remote::{RemoteSync, SyncOutcome};
use crate::roster::Roster;
use crate::schema::SchemaManager;
use crate::types::{
    NewOrder, OrderChanges, OrderId, SearchCriterion, ServiceOrder, Status, Table, TableSummary,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened around a successful local save.
///
/// Only the primary file write decides whether `save` succeeds; backup and
/// remote problems end up in `warnings`.
#[derive(Clone, Debug, Default)]
pub struct SaveReport {
    pub backup: Option<BackupInfo>,
    /// Backups deleted by rotation.
    pub rotated: usize,
    /// `None` when the push failed.
    pub remote: Option<SyncOutcome>,
    pub warnings: Vec<String>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// The service order store.
///
/// Provides a unified interface for:
/// - Loading the table through the recovery chain
/// - Saving with backup rotation and the optional remote mirror
/// - Creating and updating service orders
/// - Backup listing and restore for operators
///
/// A single writer is assumed: two processes saving the same primary file
/// race and the last save wins.
pub struct RecordStore {
    config: StoreConfig,
    primary: PathBuf,
    schema: SchemaManager,
    backups: BackupManager,
    remote: RemoteSync,
    roster: Roster,
    clock: Arc<dyn Clock>,
}

impl RecordStore {
    /// Open a store using the system clock at the configured UTC offset.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let clock = SystemClock::with_offset_hours(config.utc_offset_hours)?;
        Self::open_with_clock(config, Arc::new(clock))
    }

    pub fn open_with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let primary = config.primary_path();
        let backups = BackupManager::new(
            config.backup_path(),
            &primary,
            config.backup_stem(),
            Arc::clone(&clock),
        )?;
        let remote = RemoteSync::from_config(&config.remote, &primary)?;
        let roster = Roster::load(config.roster_path())?;

        debug!(path = %primary.display(), remote = remote.is_enabled(), "record store opened");

        Ok(Self {
            config,
            primary,
            schema: SchemaManager::new(),
            backups,
            remote,
            roster,
            clock,
        })
    }

    /// Replace the remote mirror built from configuration.
    pub fn with_remote(mut self, remote: RemoteSync) -> Self {
        self.remote = remote;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn remote(&self) -> &RemoteSync {
        &self.remote
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    // --- Persistence ---

    /// Load the table. Never fails: falls back through backups, the remote
    /// mirror, and finally an empty table.
    pub fn load(&self) -> Table {
        self.recover().table
    }

    /// Like `load`, also reporting which source the table came from.
    pub fn recover(&self) -> Recovered {
        RecoveryCoordinator::new(&self.primary, &self.schema, &self.backups, &self.remote)
            .resolve()
    }

    /// Write the table to the primary file, then snapshot and mirror it.
    ///
    /// The primary file is replaced atomically, so a failed write leaves the
    /// previous file intact. The result reflects only the local write.
    pub fn save(&self, table: &Table) -> Result<SaveReport> {
        let bytes = self.schema.write_bytes(table)?;
        write_atomic(&self.primary, &bytes)?;
        debug!(rows = table.len(), bytes = bytes.len(), "primary file written");

        let mut report = SaveReport::default();

        match self.backups.snapshot() {
            Ok(backup) => report.backup = backup,
            Err(e) => {
                warn!(error = %e, "backup snapshot failed");
                report.warnings.push(format!("backup snapshot failed: {e}"));
            }
        }
        match self.backups.rotate(self.config.max_backups) {
            Ok(removed) => report.rotated = removed,
            Err(e) => {
                warn!(error = %e, "backup rotation failed");
                report.warnings.push(format!("backup rotation failed: {e}"));
            }
        }

        // Runs strictly after the local commit; failure only degrades the mirror.
        match self.remote.push() {
            Ok(outcome) => report.remote = Some(outcome),
            Err(e) => {
                warn!(error = %e, "remote push failed, local save kept");
                report.warnings.push(format!("remote push failed: {e}"));
            }
        }

        Ok(report)
    }

    // --- Service order operations ---

    /// Register a new order: next id, stamped open date/time, `Pending`.
    pub fn create(&self, input: NewOrder) -> Result<ServiceOrder> {
        let description = required(&input.description, "description")?;
        let requester = required(&input.requester, "requester")?;
        let location = required(&input.location, "location")?;

        let mut table = self.load();
        let (open_date, open_time) = stamp(self.clock.now());

        let order = ServiceOrder {
            id: table.next_id()?,
            description,
            requester,
            location,
            open_date,
            open_time,
            maintenance_type: None,
            status: Status::Pending,
            completion_date: String::new(),
            completion_time: String::new(),
            primary_executor: String::new(),
            secondary_executor: String::new(),
            urgent: input.urgent,
            notes: String::new(),
            extra: BTreeMap::new(),
        };

        table.push(order.clone());
        self.save(&table)?;
        info!(id = %order.id, urgent = order.urgent, "service order created");
        Ok(order)
    }

    /// Apply `changes` to an open order.
    ///
    /// Moving to `Done` stamps the completion date/time; any other status
    /// clears them. `InProgress` and `Done` need a primary executor.
    /// Validation failures leave the table untouched.
    pub fn update(&self, id: OrderId, changes: OrderChanges) -> Result<ServiceOrder> {
        let mut table = self.load();
        let current = table.get(id).ok_or(StoreError::RecordNotFound(id))?;
        if current.is_done() {
            return Err(StoreError::OrderClosed(id));
        }

        let mut next = current.clone();
        if let Some(status) = changes.status {
            next.status = status;
        }
        if let Some(kind) = changes.maintenance_type {
            next.maintenance_type = kind;
        }
        // Roster membership is checked only for executors assigned by this call.
        if let Some(name) = changes.primary_executor {
            next.primary_executor = self.rostered(&name)?;
        }
        if let Some(name) = changes.secondary_executor {
            next.secondary_executor = self.rostered(&name)?;
        }
        if let Some(urgent) = changes.urgent {
            next.urgent = urgent;
        }
        if let Some(notes) = changes.notes {
            next.notes = notes;
        }

        self.validate(&next)?;

        if next.status == Status::Done {
            let (date, time) = stamp(self.clock.now());
            next.completion_date = date;
            next.completion_time = time;
        } else {
            next.completion_date.clear();
            next.completion_time.clear();
        }

        if let Some(slot) = table.get_mut(id) {
            *slot = next.clone();
        }
        self.save(&table)?;
        info!(%id, status = %next.status, "service order updated");
        Ok(next)
    }

    fn validate(&self, order: &ServiceOrder) -> Result<()> {
        if order.status.requires_executor() && order.primary_executor.is_empty() {
            return Err(StoreError::Validation(format!(
                "status {} requires a primary executor",
                order.status
            )));
        }
        Ok(())
    }

    fn rostered(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if !self.roster.allows(name) {
            return Err(StoreError::Validation(format!(
                "{name} is not in the executor roster"
            )));
        }
        Ok(name.to_string())
    }

    // --- Read views ---

    /// Open orders offered to editors; `Done` orders are excluded.
    pub fn update_candidates(&self) -> Vec<ServiceOrder> {
        self.load()
            .update_candidates()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn recent(&self, n: usize) -> Vec<ServiceOrder> {
        self.load().recent(n).into_iter().cloned().collect()
    }

    pub fn search(&self, criterion: &SearchCriterion) -> Vec<ServiceOrder> {
        self.load().search(criterion).into_iter().cloned().collect()
    }

    pub fn summary(&self) -> TableSummary {
        self.load().summary()
    }

    // --- Operator paths ---

    /// Backups, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        self.backups.list()
    }

    /// Overwrite the primary file with a backup and return the restored table.
    ///
    /// Ids continue from the restored table's highest id, so ids issued after
    /// the restore point may be reissued. With `discard_newer`, backups taken
    /// after the restore point are deleted so recovery cannot bring that
    /// history back alongside the reissued ids.
    pub fn restore_backup(&self, name: &str, discard_newer: bool) -> Result<Table> {
        let before = self.load().max_id();
        self.backups.restore(name)?;
        if discard_newer {
            let removed = self.backups.discard_newer_than(name)?;
            info!(backup = name, removed, "discarded backups newer than restore point");
        }

        let table = self.load();
        let after = table.max_id();
        if after < before {
            warn!(
                backup = name,
                max_id = ?after,
                previous_max_id = ?before,
                "restore rewinds id sequence; later ids will be reissued"
            );
        }
        Ok(table)
    }

    /// Replace the primary file with the remote mirror's content.
    pub fn pull_remote(&self) -> Result<SyncOutcome> {
        self.remote.pull()
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}
