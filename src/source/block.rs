//! Virtual blocks and row extraction
//!
//! A block is one page of rows fetched at some offset. Sources that speak
//! JSON rows share [`extract_block`] so value coercion is identical
//! everywhere.

use serde_json::{Map, Value};

use super::errors::{SourceError, SourceResult};

/// One bounded page of rows returned by a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    rows: u64,
    values: Vec<f64>,
}

impl Block {
    /// A block carrying one numeric value per row
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            rows: values.len() as u64,
            values,
        }
    }

    /// A block that only reports how many rows it covered (COUNT without a column)
    pub fn rows_only(rows: u64) -> Self {
        Self {
            rows,
            values: Vec::new(),
        }
    }

    /// An empty block, the exhaustion signal at the end of the data
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows this block covers
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Column values, empty for row-only blocks
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns true when the source handed back fewer rows than asked for
    pub fn is_short(&self, limit: u64) -> bool {
        self.rows < limit
    }
}

/// Build a block from JSON rows.
///
/// With a column, each row must hold a finite number (or a string that
/// parses as one) under that key. Without a column only the row count is
/// kept.
pub fn extract_block(rows: &[Value], column: Option<&str>) -> SourceResult<Block> {
    let Some(column) = column else {
        return Ok(Block::rows_only(rows.len() as u64));
    };

    let mut values = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let object = row.as_object().ok_or_else(|| {
            SourceError::Malformed(format!("row {} is not an object", idx))
        })?;
        values.push(extract_value(object, column, idx)?);
    }

    Ok(Block::from_values(values))
}

fn extract_value(row: &Map<String, Value>, column: &str, idx: usize) -> SourceResult<f64> {
    let raw = row
        .get(column)
        .ok_or_else(|| SourceError::UnknownColumn(column.to_string()))?;

    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(SourceError::Malformed(format!(
            "row {}: value {} for '{}' is not a finite number",
            idx, raw, column
        ))),
    }
}
