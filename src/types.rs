//! Core types for the service order store.

use crate::clock::parse_date_input;
use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a service order (assigned by the store).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    /// `None` once the id space is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(OrderId)
    }
}

impl fmt::Debug for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderId({})", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a service order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Paused,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Pending, Status::Paused, Status::InProgress, Status::Done];

    /// Label written to the table file.
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pendente",
            Status::Paused => "Pausado",
            Status::InProgress => "Em execução",
            Status::Done => "Concluído",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Statuses that need a primary executor assigned.
    pub fn requires_executor(self) -> bool {
        matches!(self, Status::InProgress | Status::Done)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Pending
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of maintenance work, set during triage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaintenanceType {
    Electrical,
    Mechanical,
    Refrigeration,
    Hydraulic,
    Civil,
    Installation,
}

impl MaintenanceType {
    pub const ALL: [MaintenanceType; 6] = [
        MaintenanceType::Electrical,
        MaintenanceType::Mechanical,
        MaintenanceType::Refrigeration,
        MaintenanceType::Hydraulic,
        MaintenanceType::Civil,
        MaintenanceType::Installation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MaintenanceType::Electrical => "Elétrica",
            MaintenanceType::Mechanical => "Mecânica",
            MaintenanceType::Refrigeration => "Refrigeração",
            MaintenanceType::Hydraulic => "Hidráulica",
            MaintenanceType::Civil => "Civil",
            MaintenanceType::Installation => "Instalação",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the table: a maintenance request and its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: OrderId,
    pub description: String,
    pub requester: String,
    pub location: String,

    /// `DD/MM/YYYY`, stamped at creation.
    pub open_date: String,

    /// `HH:MM:SS`, stamped at creation.
    pub open_time: String,

    /// Empty until triaged.
    pub maintenance_type: Option<MaintenanceType>,
    pub status: Status,

    /// Non-empty only while `status == Done`.
    pub completion_date: String,
    pub completion_time: String,

    pub primary_executor: String,
    pub secondary_executor: String,
    pub urgent: bool,
    pub notes: String,

    /// Values of non-canonical columns found on disk, keyed by column name.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl ServiceOrder {
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    /// Whether the row satisfies the completion invariant.
    pub fn completion_consistent(&self) -> bool {
        let stamped = !self.completion_date.is_empty() && !self.completion_time.is_empty();
        let cleared = self.completion_date.is_empty() && self.completion_time.is_empty();
        if self.is_done() {
            stamped
        } else {
            cleared
        }
    }
}

/// Input for creating a new service order (before id and stamps are assigned).
#[derive(Clone, Debug, Default)]
pub struct NewOrder {
    pub description: String,
    pub requester: String,
    pub location: String,
    pub urgent: bool,
}

impl NewOrder {
    pub fn new(
        description: impl Into<String>,
        requester: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            requester: requester.into(),
            location: location.into(),
            urgent: false,
        }
    }

    pub fn urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }
}

/// Changes applied by an update. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct OrderChanges {
    pub status: Option<Status>,
    /// `Some(None)` clears the type.
    pub maintenance_type: Option<Option<MaintenanceType>>,
    pub primary_executor: Option<String>,
    pub secondary_executor: Option<String>,
    pub urgent: Option<bool>,
    pub notes: Option<String>,
}

impl OrderChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn maintenance_type(mut self, kind: Option<MaintenanceType>) -> Self {
        self.maintenance_type = Some(kind);
        self
    }

    pub fn primary_executor(mut self, name: impl Into<String>) -> Self {
        self.primary_executor = Some(name.into());
        self
    }

    pub fn secondary_executor(mut self, name: impl Into<String>) -> Self {
        self.secondary_executor = Some(name.into());
        self
    }

    pub fn urgent(mut self, urgent: bool) -> Self {
        self.urgent = Some(urgent);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Full-table scan criteria.
#[derive(Clone, Debug)]
pub enum SearchCriterion {
    Id(OrderId),
    /// Accepts `DD/MM/YYYY` or `DDMMYYYY`.
    OpenDate(String),
    Requester(String),
    Location(String),
    Status(String),
    /// Matches either executor slot.
    Executor(String),
}

/// Counts backing the dashboard views.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub by_status: BTreeMap<Status, usize>,
    pub completed_by_type: BTreeMap<MaintenanceType, usize>,
    pub by_executor: BTreeMap<String, usize>,
}

/// Ordered sequence of service orders. Insertion order is significant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    orders: Vec<ServiceOrder>,
    extra_columns: Vec<String>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(orders: Vec<ServiceOrder>, extra_columns: Vec<String>) -> Self {
        Self {
            orders,
            extra_columns,
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> &[ServiceOrder] {
        &self.orders
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceOrder> {
        self.orders.iter()
    }

    /// Non-canonical columns carried over from disk, in file order.
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn get(&self, id: OrderId) -> Option<&ServiceOrder> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: OrderId) -> Option<&mut ServiceOrder> {
        self.orders.iter_mut().find(|o| o.id == id)
    }

    pub(crate) fn push(&mut self, order: ServiceOrder) {
        self.orders.push(order);
    }

    pub fn max_id(&self) -> Option<OrderId> {
        self.orders.iter().map(|o| o.id).max()
    }

    /// `max(existing ids) + 1`, or `1` for an empty table.
    pub fn next_id(&self) -> Result<OrderId> {
        match self.max_id() {
            None => Ok(OrderId(1)),
            Some(max) => max.next().ok_or_else(|| {
                StoreError::Validation(format!("id sequence exhausted after {max}"))
            }),
        }
    }

    /// Orders still selectable by the update path.
    pub fn update_candidates(&self) -> Vec<&ServiceOrder> {
        self.orders.iter().filter(|o| !o.is_done()).collect()
    }

    /// The `n` most recently inserted orders, newest first.
    pub fn recent(&self, n: usize) -> Vec<&ServiceOrder> {
        self.orders.iter().rev().take(n).collect()
    }

    pub fn search(&self, criterion: &SearchCriterion) -> Vec<&ServiceOrder> {
        match criterion {
            SearchCriterion::Id(id) => self.orders.iter().filter(|o| o.id == *id).collect(),
            SearchCriterion::OpenDate(input) => match parse_date_input(input) {
                Some(date) => self.orders.iter().filter(|o| o.open_date == date).collect(),
                None => Vec::new(),
            },
            SearchCriterion::Requester(needle) => self.filter_text(needle, |o| &o.requester),
            SearchCriterion::Location(needle) => self.filter_text(needle, |o| &o.location),
            SearchCriterion::Status(needle) => {
                let needle = needle.to_lowercase();
                self.orders
                    .iter()
                    .filter(|o| o.status.label().to_lowercase().contains(&needle))
                    .collect()
            }
            SearchCriterion::Executor(needle) => {
                let needle = needle.to_lowercase();
                self.orders
                    .iter()
                    .filter(|o| {
                        o.primary_executor.to_lowercase().contains(&needle)
                            || o.secondary_executor.to_lowercase().contains(&needle)
                    })
                    .collect()
            }
        }
    }

    fn filter_text<F>(&self, needle: &str, field: F) -> Vec<&ServiceOrder>
    where
        F: Fn(&ServiceOrder) -> &String,
    {
        let needle = needle.to_lowercase();
        self.orders
            .iter()
            .filter(|o| field(o).to_lowercase().contains(&needle))
            .collect()
    }

    pub fn summary(&self) -> TableSummary {
        let mut summary = TableSummary::default();
        for order in &self.orders {
            *summary.by_status.entry(order.status).or_default() += 1;
            if order.is_done() {
                if let Some(kind) = order.maintenance_type {
                    *summary.completed_by_type.entry(kind).or_default() += 1;
                }
            }
            if !order.primary_executor.is_empty() {
                *summary
                    .by_executor
                    .entry(order.primary_executor.clone())
                    .or_default() += 1;
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a ServiceOrder;
    type IntoIter = std::slice::Iter<'a, ServiceOrder>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}
