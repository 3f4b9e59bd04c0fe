use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use csv::{ReaderBuilder, Trim};

use crate::error::{AnalysisError, Result};
use crate::fingerprint::fingerprint;
use crate::table::{Table, Value};

pub const YEAR_COLUMN: &str = "year";

/// Survey exports arrive in a Western European single-byte codepage.
/// Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub fn parse_csv(text: &str) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::DataLoad(format!("invalid header row: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(AnalysisError::DataLoad("missing header row".to_string()));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AnalysisError::DataLoad(format!("record {}: {e}", idx + 1)))?;
        if record.len() != headers.len() {
            return Err(AnalysisError::DataLoad(format!(
                "record {} has {} fields, header has {}",
                idx + 1,
                record.len(),
                headers.len()
            )));
        }
        rows.push(record.iter().map(Value::parse_cell).collect());
    }

    Table::new(headers, rows)
}

/// Decodes and parses a panel dataset, which must carry a `year` column.
pub fn load_panel(bytes: &[u8]) -> Result<Table> {
    let table = parse_csv(&decode_latin1(bytes))?;
    table.require_column(YEAR_COLUMN)?;
    Ok(table)
}

/// Decodes and parses a dataset without column requirements (geographic layers).
pub fn load_table(bytes: &[u8]) -> Result<Table> {
    parse_csv(&decode_latin1(bytes))
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| AnalysisError::DataLoad(format!("{}: {e}", path.display())))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Panel,
    Plain,
}

/// Parsed tables memoized by a digest of the raw bytes.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: Mutex<HashMap<String, Arc<Table>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, bytes: &[u8], kind: TableKind) -> Result<Arc<Table>> {
        let tag: &[u8] = match kind {
            TableKind::Panel => b"panel",
            TableKind::Plain => b"plain",
        };
        let key = fingerprint([tag, bytes]);
        if let Some(hit) = self.lock().get(&key) {
            log::debug!("table cache hit {}", &key[..12]);
            return Ok(Arc::clone(hit));
        }

        let table = match kind {
            TableKind::Panel => load_panel(bytes)?,
            TableKind::Plain => load_table(bytes)?,
        };
        log::info!(
            "loaded table: {} rows, {} columns",
            table.len(),
            table.columns().len()
        );
        let table = Arc::new(table);
        self.lock().insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn load_path(&self, path: &Path, kind: TableKind) -> Result<Arc<Table>> {
        let bytes = read_file(path)?;
        self.load(&bytes, kind)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Table>>> {
        // A poisoned map still holds complete entries.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_latin1, load_panel, parse_csv};
    use crate::table::Value;

    #[test]
    fn latin1_bytes_decode_to_accented_text() {
        assert_eq!(decode_latin1(b"Bogot\xe1"), "Bogotá");
        assert_eq!(decode_latin1(b"Nari\xf1o"), "Nariño");
    }

    #[test]
    fn ragged_record_reports_its_position() {
        let err = parse_csv("a,b\n1,2\n3\n").unwrap_err();
        assert!(err.to_string().contains("record 2"), "{err}");
    }

    #[test]
    fn empty_input_is_a_load_error() {
        assert!(parse_csv("").is_err());
    }

    #[test]
    fn cells_are_typed() {
        let t = parse_csv("year,dept,gdp\n2016, Meta ,NA\n").unwrap();
        assert_eq!(t.rows()[0][0], Value::Number(2016.0));
        assert_eq!(t.rows()[0][1], Value::Text("Meta".into()));
        assert_eq!(t.rows()[0][2], Value::Missing);
    }

    #[test]
    fn panel_requires_year() {
        let err = load_panel(b"dept,gdp\nMeta,1\n").unwrap_err();
        assert!(err.is_missing_column());
    }
}
