use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Parses a raw cell. Empty cells and the usual NA spellings are missing.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_na_token(trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Value::Number(v),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Text used for grouping and display. Integral numbers print without a fraction.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str(""),
        }
    }
}

fn is_na_token(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "na" | "n/a" | "nan" | "null" | "none"
    )
}

/// Row-oriented observation table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AnalysisError::DataLoad(format!(
                    "row {} has {} fields, expected {}",
                    idx + 1,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// One entry per row; `None` where the cell is missing or not numeric.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_f64()).collect())
    }

    pub fn is_numeric_column(&self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        let mut seen_number = false;
        for row in &self.rows {
            match &row[idx] {
                Value::Missing => {}
                cell => {
                    if cell.as_f64().is_none() {
                        return false;
                    }
                    seen_number = true;
                }
            }
        }
        seen_number
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.is_numeric_column(c))
            .cloned()
            .collect()
    }

    /// Distinct non-missing keys of a column, in first-seen order.
    pub fn distinct(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.require_column(name)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if let Some(key) = row[idx].key()
                && seen.insert(key.clone())
            {
                out.push(key);
            }
        }
        Ok(out)
    }

    pub fn filter_eq(&self, name: &str, key: &str) -> Result<Table> {
        let idx = self.require_column(name)?;
        let rows = self
            .rows
            .iter()
            .filter(|r| r[idx].key().as_deref() == Some(key))
            .cloned()
            .collect();
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Disjoint partitions keyed by the column's display text, first-seen order.
    /// Rows with a missing key belong to no group.
    pub fn group_by(&self, name: &str) -> Result<Vec<(String, Table)>> {
        let idx = self.require_column(name)?;
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Table)> = Vec::new();
        for row in &self.rows {
            let Some(key) = row[idx].key() else {
                continue;
            };
            let slot = *slots.entry(key.clone()).or_insert_with(|| {
                groups.push((
                    key,
                    Table {
                        columns: self.columns.clone(),
                        rows: Vec::new(),
                    },
                ));
                groups.len() - 1
            });
            groups[slot].1.rows.push(row.clone());
        }
        Ok(groups)
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}
