//! Delimited text codec for the table file.
//!
//! UTF-8, first row is the header, RFC 4180 quoting, `\n` record terminator.

use super::columns;
use crate::error::{Result, StoreError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Untyped table as it appears in the file: a header plus string rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Cell value, or `""` when the row is short.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parse file bytes into a raw table.
///
/// Rejects bytes that cannot be a table written by this store: invalid
/// UTF-8, an empty file, ragged rows, or a header that does not carry an
/// `ID` column plus at least one other known column.
pub fn parse(bytes: &[u8]) -> Result<RawTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| StoreError::Parse(format!("table is not valid UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(StoreError::Parse("table file is empty".into()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if !headers.iter().any(|h| h == columns::ID) {
        return Err(StoreError::Parse("header has no ID column".into()));
    }
    let known = headers.iter().filter(|h| columns::is_known(h)).count();
    if known < 2 {
        return Err(StoreError::Parse(format!(
            "header does not look like a service order table: {}",
            headers.join(",")
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Render a raw table to file bytes.
pub fn render(table: &RawTable) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(&table.headers)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_fields() {
        let bytes = "ID,Descrição,Status\n1,\"Troca, lâmpada\",Pendente\n2,\"linha 1\nlinha 2\",Pausado\n";
        let table = parse(bytes.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["ID", "Descrição", "Status"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "Troca, lâmpada");
        assert_eq!(table.rows[1][1], "linha 1\nlinha 2");
    }

    #[test]
    fn test_parse_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"ID,Status\n1,Pendente\n");
        let table = parse(&bytes).unwrap();
        assert_eq!(table.headers[0], "ID");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse(b""), Err(StoreError::Parse(_))));
        assert!(matches!(parse(b"\xff\xfe\x00garbage"), Err(StoreError::Parse(_))));
        assert!(matches!(parse(b"hello world\n"), Err(StoreError::Parse(_))));
        assert!(matches!(parse(b"ID\n1\n"), Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let bytes = b"ID,Status\n1,Pendente\n2\n";
        assert!(matches!(parse(bytes), Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_render_quotes_when_needed() {
        let table = RawTable {
            headers: vec!["ID".into(), "Descrição".into()],
            rows: vec![vec!["1".into(), "a, \"b\"".into()]],
        };
        let bytes = render(&table).unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            "ID,Descrição\n1,\"a, \"\"b\"\"\"\n"
        );
        assert_eq!(parse(&bytes).unwrap(), table);
    }
}
