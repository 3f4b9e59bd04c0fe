use serde::Serialize;

use crate::error::Result;
use crate::stats::{mean, present};
use crate::table::Table;

#[derive(Debug, Clone, Serialize)]
pub struct FieldComparison {
    pub field: String,
    pub mean_a: f64,
    pub mean_b: f64,
    /// Present values in each subset, for histogram rendering.
    pub values_a: Vec<f64>,
    pub values_b: Vec<f64>,
}

impl FieldComparison {
    pub fn mean_difference(&self) -> f64 {
        self.mean_b - self.mean_a
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupComparison {
    pub key_field: String,
    pub key_a: String,
    pub key_b: String,
    pub rows_a: usize,
    pub rows_b: usize,
    pub fields: Vec<FieldComparison>,
}

/// Splits the table on two values of `key_field` and compares field means.
///
/// Returns `Ok(None)` unless exactly two key values and at least one field are
/// selected. A field with nothing numeric in a subset gets a NaN mean.
pub fn compare_groups<S: AsRef<str>>(
    table: &Table,
    fields: &[S],
    key_field: &str,
    key_values: &[S],
) -> Result<Option<GroupComparison>> {
    let [key_a, key_b] = key_values else {
        return Ok(None);
    };
    if fields.is_empty() {
        return Ok(None);
    }
    let (key_a, key_b) = (key_a.as_ref(), key_b.as_ref());

    let subset_a = table.filter_eq(key_field, key_a)?;
    let subset_b = table.filter_eq(key_field, key_b)?;

    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let field = field.as_ref();
        let a = subset_a.numeric(field)?;
        let b = subset_b.numeric(field)?;
        out.push(FieldComparison {
            field: field.to_string(),
            mean_a: mean(&a),
            mean_b: mean(&b),
            values_a: present(&a),
            values_b: present(&b),
        });
    }

    Ok(Some(GroupComparison {
        key_field: key_field.to_string(),
        key_a: key_a.to_string(),
        key_b: key_b.to_string(),
        rows_a: subset_a.len(),
        rows_b: subset_b.len(),
        fields: out,
    }))
}
