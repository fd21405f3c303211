//! Column names of the on-disk table.

pub const ID: &str = "ID";
pub const DESCRIPTION: &str = "Descrição";
pub const OPEN_DATE: &str = "Data";
pub const OPEN_TIME: &str = "Hora";
pub const REQUESTER: &str = "Solicitante";
pub const LOCATION: &str = "Local";
pub const MAINTENANCE_TYPE: &str = "Tipo";
pub const STATUS: &str = "Status";
pub const PRIMARY_EXECUTOR: &str = "Executante Principal";
pub const SECONDARY_EXECUTOR: &str = "Executante Secundário";
pub const URGENT: &str = "Urgente";
pub const COMPLETION_DATE: &str = "Data Conclusão";
pub const COMPLETION_TIME: &str = "Hora Conclusão";
pub const NOTES: &str = "Observações";

/// Single executor column of the first file layout.
pub const LEGACY_EXECUTOR: &str = "Executante";

/// Canonical header, in file order.
pub const CANONICAL: [&str; 14] = [
    ID,
    DESCRIPTION,
    OPEN_DATE,
    OPEN_TIME,
    REQUESTER,
    LOCATION,
    MAINTENANCE_TYPE,
    STATUS,
    PRIMARY_EXECUTOR,
    SECONDARY_EXECUTOR,
    URGENT,
    COMPLETION_DATE,
    COMPLETION_TIME,
    NOTES,
];

/// Columns whose "no value" must be the empty string, never a null marker.
pub const TEXT_COLUMNS: [&str; 5] = [
    PRIMARY_EXECUTOR,
    SECONDARY_EXECUTOR,
    COMPLETION_DATE,
    COMPLETION_TIME,
    NOTES,
];

/// Null markers left behind by dataframe tooling.
pub const NULL_MARKERS: [&str; 5] = ["nan", "NaN", "<NA>", "None", "null"];

pub fn is_known(name: &str) -> bool {
    name == LEGACY_EXECUTOR || CANONICAL.contains(&name)
}
