//! JSON-lines file source
//!
//! Each non-blank line of the file is one row object. Offsets count rows,
//! not lines, so blank lines do not shift block boundaries.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::block::{extract_block, Block};
use super::errors::{SourceError, SourceResult};
use super::{check_limit, BlockSource};

/// Block source over a local `.jsonl` file
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_window(path: &Path, offset: u64, limit: u64) -> SourceResult<Vec<Value>> {
        let reader = BufReader::new(File::open(path)?);
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);

        let mut rows = Vec::new();
        let lines = reader
            .lines()
            .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .skip(skip)
            .take(take);

        for (idx, line) in lines.enumerate() {
            let line = line?;
            let row: Value = serde_json::from_str(&line).map_err(|e| {
                SourceError::Malformed(format!("row {}: {}", offset + idx as u64, e))
            })?;
            rows.push(row);
        }

        Ok(rows)
    }
}

#[async_trait]
impl BlockSource for JsonLinesSource {
    async fn fetch(&self, column: Option<&str>, offset: u64, limit: u64) -> SourceResult<Block> {
        check_limit(limit)?;

        let path = self.path.clone();
        let rows = tokio::task::spawn_blocking(move || Self::read_window(&path, offset, limit))
            .await
            .map_err(|e| SourceError::Unavailable(format!("reader task failed: {}", e)))??;

        extract_block(&rows, column)
    }

    fn describe(&self) -> String {
        format!("jsonl({})", self.path.display())
    }
}
