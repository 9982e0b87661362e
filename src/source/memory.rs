//! In-process block source
//!
//! Holds named numeric columns of equal length. Used by tests and the
//! `query --demo` mode.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::block::Block;
use super::errors::{SourceError, SourceResult};
use super::{check_limit, BlockSource};

/// A fixed table of numeric columns
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    columns: BTreeMap<String, Vec<f64>>,
    rows: u64,
}

impl MemorySource {
    /// Create a source with a single column
    pub fn single(column: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new().with_column(column, values)
    }

    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column.
    ///
    /// The table length is the length of the longest column; shorter
    /// columns read as exhausted early.
    pub fn with_column(mut self, column: impl Into<String>, values: Vec<f64>) -> Self {
        self.rows = self.rows.max(values.len() as u64);
        self.columns.insert(column.into(), values);
        self
    }

    /// Total number of rows
    pub fn len(&self) -> u64 {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

#[async_trait]
impl BlockSource for MemorySource {
    async fn fetch(&self, column: Option<&str>, offset: u64, limit: u64) -> SourceResult<Block> {
        check_limit(limit)?;

        let Some(column) = column else {
            let remaining = self.rows.saturating_sub(offset);
            return Ok(Block::rows_only(remaining.min(limit)));
        };

        let values = self
            .columns
            .get(column)
            .ok_or_else(|| SourceError::UnknownColumn(column.to_string()))?;

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(values.len());
        let end = usize::try_from(offset.saturating_add(limit))
            .unwrap_or(usize::MAX)
            .min(values.len());

        Ok(Block::from_values(values[start..end].to_vec()))
    }

    fn describe(&self) -> String {
        format!("memory({} rows, {} columns)", self.rows, self.columns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_pages_in_order() {
        let source = MemorySource::single("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let first = source.fetch(Some("x"), 0, 2).await.unwrap();
        let second = source.fetch(Some("x"), 2, 2).await.unwrap();
        let third = source.fetch(Some("x"), 4, 2).await.unwrap();

        assert_eq!(first.values(), &[1.0, 2.0]);
        assert_eq!(second.values(), &[3.0, 4.0]);
        assert_eq!(third.values(), &[5.0]);
        assert!(third.is_short(2));
    }

    #[tokio::test]
    async fn test_fetch_past_end_is_empty() {
        let source = MemorySource::single("x", vec![1.0]);
        let block = source.fetch(Some("x"), 10, 5).await.unwrap();
        assert!(block.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_without_column_counts_rows() {
        let source = MemorySource::single("x", vec![1.0, 2.0, 3.0]);
        assert_eq!(source.fetch(None, 0, 2).await.unwrap().rows(), 2);
        assert_eq!(source.fetch(None, 2, 2).await.unwrap().rows(), 1);
        assert_eq!(source.fetch(None, 3, 2).await.unwrap().rows(), 0);
    }

    #[tokio::test]
    async fn test_unknown_column() {
        let source = MemorySource::single("x", vec![1.0]);
        let err = source.fetch(Some("y"), 0, 1).await.unwrap_err();
        assert_eq!(err, SourceError::UnknownColumn("y".into()));
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let source = MemorySource::single("x", vec![1.0]);
        assert!(matches!(
            source.fetch(Some("x"), 0, 0).await,
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn test_describe() {
        let source = MemorySource::new()
            .with_column("a", vec![1.0, 2.0])
            .with_column("b", vec![3.0]);
        assert_eq!(source.len(), 2);
        assert_eq!(source.describe(), "memory(2 rows, 2 columns)");
    }
}
