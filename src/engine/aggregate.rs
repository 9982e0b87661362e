//! Aggregate kinds and column identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateKind {
    Sum,
    Avg,
    Count,
}

impl AggregateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateKind::Sum => "SUM",
            AggregateKind::Avg => "AVG",
            AggregateKind::Count => "COUNT",
        }
    }

    /// COUNT can run without a column
    pub fn requires_column(&self) -> bool {
        !matches!(self, AggregateKind::Count)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggregateKind::Sum),
            "AVG" => Ok(AggregateKind::Avg),
            "COUNT" => Ok(AggregateKind::Count),
            _ => Err(EngineError::InvalidAggregate(s.to_string())),
        }
    }
}

/// Check a column identifier and decide whether the query carries one.
///
/// Identifiers are interpolated into remote queries, so only
/// `[A-Za-z_][A-Za-z0-9_]*` is accepted. An empty or whitespace column is
/// treated as absent.
pub fn resolve_column(kind: AggregateKind, column: Option<&str>) -> EngineResult<Option<String>> {
    let column = column.map(str::trim).filter(|c| !c.is_empty());

    match column {
        None if kind.requires_column() => Err(EngineError::InvalidColumn(format!(
            "{} requires a column",
            kind
        ))),
        None => Ok(None),
        Some(col) if is_identifier(col) => Ok(Some(col.to_string())),
        Some(col) => Err(EngineError::InvalidColumn(format!(
            "'{}' is not a valid column identifier",
            col
        ))),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
