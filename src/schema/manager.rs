//! Normalization, migration, and typed mapping of the table.

use super::codec::{self, RawTable};
use super::columns::{self, CANONICAL, LEGACY_EXECUTOR, NULL_MARKERS, TEXT_COLUMNS};
use crate::error::Result;
use crate::types::{MaintenanceType, OrderId, ServiceOrder, Status, Table};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// File layouts the store has used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// Single `Executante` column, no time, urgency, or notes columns.
    V1,
    /// Canonical layout.
    V2,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::V2;

    /// Detect the layout from the header set.
    pub fn detect(table: &RawTable) -> Self {
        if table.has_column(LEGACY_EXECUTOR) && !table.has_column(columns::PRIMARY_EXECUTOR) {
            SchemaVersion::V1
        } else {
            SchemaVersion::V2
        }
    }
}

/// Keeps tables in the canonical layout.
///
/// Every operation is total: anything that cannot be interpreted is replaced
/// with a safe default instead of being rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaManager;

impl SchemaManager {
    pub fn new() -> Self {
        Self
    }

    /// Bring a raw table to the canonical column set.
    ///
    /// Idempotent. Rows keep their order and every pre-existing value is kept,
    /// either in its canonical column or as an extra column after it.
    pub fn normalize(&self, mut table: RawTable) -> RawTable {
        let version = SchemaVersion::detect(&table);
        if version < SchemaVersion::CURRENT {
            debug!(?version, "migrating table layout");
        }
        migrate(&mut table, version);

        square_rows(&mut table);
        let mut table = reorder_columns(table);

        if let Some(id) = table.column(columns::ID) {
            for row in &mut table.rows {
                row[id] = coerce_id(&row[id]).to_string();
            }
        }

        for name in TEXT_COLUMNS {
            if let Some(col) = table.column(name) {
                for row in &mut table.rows {
                    if NULL_MARKERS.contains(&row[col].trim()) {
                        row[col].clear();
                    }
                }
            }
        }

        table
    }

    /// Map a raw table to typed rows. The input is normalized first.
    pub fn decode(&self, table: RawTable) -> Table {
        let table = self.normalize(table);
        let extra_columns: Vec<String> = table.headers[CANONICAL.len()..].to_vec();

        let orders = table
            .rows
            .iter()
            .map(|row| {
                // Canonical columns sit at fixed positions after normalize.
                let cell = |i: usize| row[i].clone();
                let id = OrderId(coerce_id(&row[0]));

                let status_label = row[7].trim();
                let status = Status::from_label(status_label).unwrap_or_else(|| {
                    if !status_label.is_empty() {
                        warn!(%id, status = status_label, "unknown status, treating as pending");
                    }
                    Status::Pending
                });

                let type_label = row[6].trim();
                let maintenance_type = MaintenanceType::from_label(type_label);
                if maintenance_type.is_none() && !type_label.is_empty() {
                    warn!(%id, kind = type_label, "unknown maintenance type, clearing");
                }

                let extra: BTreeMap<String, String> = extra_columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row[CANONICAL.len() + i].clone()))
                    .collect();

                ServiceOrder {
                    id,
                    description: cell(1),
                    open_date: cell(2),
                    open_time: cell(3),
                    requester: cell(4),
                    location: cell(5),
                    maintenance_type,
                    status,
                    primary_executor: cell(8),
                    secondary_executor: cell(9),
                    urgent: parse_flag(&row[10]),
                    completion_date: cell(11),
                    completion_time: cell(12),
                    notes: cell(13),
                    extra,
                }
            })
            .collect();

        Table::from_parts(orders, extra_columns)
    }

    /// Map typed rows to the canonical raw layout.
    pub fn encode(&self, table: &Table) -> RawTable {
        let mut headers: Vec<String> = CANONICAL.iter().map(|c| c.to_string()).collect();
        headers.extend(table.extra_columns().iter().cloned());

        let rows = table
            .iter()
            .map(|order| {
                let mut row = vec![
                    order.id.to_string(),
                    order.description.clone(),
                    order.open_date.clone(),
                    order.open_time.clone(),
                    order.requester.clone(),
                    order.location.clone(),
                    order
                        .maintenance_type
                        .map(|t| t.label().to_string())
                        .unwrap_or_default(),
                    order.status.label().to_string(),
                    order.primary_executor.clone(),
                    order.secondary_executor.clone(),
                    render_flag(order.urgent).to_string(),
                    order.completion_date.clone(),
                    order.completion_time.clone(),
                    order.notes.clone(),
                ];
                for name in table.extra_columns() {
                    row.push(order.extra.get(name).cloned().unwrap_or_default());
                }
                row
            })
            .collect();

        RawTable { headers, rows }
    }

    /// Parse file bytes into a normalized typed table.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<Table> {
        Ok(self.decode(codec::parse(bytes)?))
    }

    /// Render a typed table to canonical file bytes.
    pub fn write_bytes(&self, table: &Table) -> Result<Vec<u8>> {
        let raw = self.normalize(self.encode(table));
        codec::render(&raw)
    }

    /// Zero rows, full canonical header.
    pub fn empty_table(&self) -> Table {
        Table::new()
    }
}

/// Run every migration from `version` up to the current layout.
fn migrate(table: &mut RawTable, version: SchemaVersion) {
    if version == SchemaVersion::V1 {
        migrate_v1_to_v2(table);
    }
    // Tables that carry both executor columns (hand edits, partial
    // migrations) fill empty primary slots from the legacy column.
    if let (Some(legacy), Some(primary)) = (
        table.column(LEGACY_EXECUTOR),
        table.column(columns::PRIMARY_EXECUTOR),
    ) {
        for row in &mut table.rows {
            let legacy_value = row.get(legacy).cloned().unwrap_or_default();
            if let Some(slot) = row.get_mut(primary) {
                if slot.trim().is_empty() && !legacy_value.trim().is_empty() {
                    *slot = legacy_value;
                }
            }
        }
    }
}

/// V1 -> V2: the single executor becomes the primary executor and an empty
/// secondary executor column appears. Columns missing from V1 are added by
/// the generic pass in `normalize`.
fn migrate_v1_to_v2(table: &mut RawTable) {
    if let Some(col) = table.column(LEGACY_EXECUTOR) {
        table.headers[col] = columns::PRIMARY_EXECUTOR.to_string();
    }
    if !table.has_column(columns::SECONDARY_EXECUTOR) {
        table.headers.push(columns::SECONDARY_EXECUTOR.to_string());
        for row in &mut table.rows {
            row.push(String::new());
        }
    }
}

/// Pad short rows; name overflow cells of long rows so nothing is lost.
fn square_rows(table: &mut RawTable) {
    let widest = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    while table.headers.len() < widest {
        let name = free_column_name(table.headers.len() + 1, |n| {
            table.headers.iter().any(|h| h == n)
        });
        table.headers.push(name);
    }
    let width = table.headers.len();
    for row in &mut table.rows {
        row.resize(width, String::new());
    }
}

/// Canonical columns first (added empty when missing), then every other
/// column in its original order.
///
/// The first occurrence of a canonical name fills its slot. Repeated names
/// are kept as extras under a generated `Coluna N` name, so headers come out
/// unique.
fn reorder_columns(table: RawTable) -> RawTable {
    let slots: Vec<Option<usize>> = CANONICAL.iter().map(|c| table.column(c)).collect();
    let extras: Vec<usize> = (0..table.headers.len())
        .filter(|i| !slots.contains(&Some(*i)))
        .collect();

    let mut headers: Vec<String> = CANONICAL.iter().map(|c| c.to_string()).collect();
    for &i in &extras {
        let name = &table.headers[i];
        if headers.contains(name) {
            let renamed = free_column_name(i + 1, |n| {
                headers.iter().any(|h| h == n) || table.headers.iter().any(|h| h == n)
            });
            debug!(column = %name, renamed = %renamed, "duplicate column kept under new name");
            headers.push(renamed);
        } else {
            headers.push(name.clone());
        }
    }

    let order: Vec<Option<usize>> = slots
        .into_iter()
        .chain(extras.iter().map(|&i| Some(i)))
        .collect();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            order
                .iter()
                .map(|slot| slot.map(|i| row[i].clone()).unwrap_or_default())
                .collect()
        })
        .collect();

    RawTable { headers, rows }
}

/// `Coluna N` for the first `N >= position` not already taken.
fn free_column_name(position: usize, taken: impl Fn(&str) -> bool) -> String {
    (position..)
        .map(|n| format!("Coluna {n}"))
        .find(|name| !taken(name))
        .unwrap_or_default()
}

/// Integer id; anything non-numeric, negative, or missing becomes `0`.
fn coerce_id(value: &str) -> u64 {
    let value = value.trim();
    if let Ok(id) = value.parse::<u64>() {
        return id;
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => f as u64,
        _ => 0,
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "sim" | "s" | "true" | "1" | "yes" | "y"
    )
}

fn render_flag(flag: bool) -> &'static str {
    if flag {
        "Sim"
    } else {
        "Não"
    }
}
