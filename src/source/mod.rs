//! Block sources
//!
//! A block source turns some ordered row store into a sequence of
//! addressable pages ("virtual blocks"). Given `(column, offset, limit)` it
//! returns at most `limit` rows in a stable order; fewer rows than asked for
//! means the data is exhausted.
//!
//! Sources know nothing about statistics. They are swapped freely behind
//! [`BlockSource`]:
//!
//! - [`SocrataSource`] - remote paginated JSON API
//! - [`JsonLinesSource`] - local file, one JSON object per line
//! - [`MemorySource`] - in-process columns
//!
//! # Ordering
//!
//! Every source must return the same rows for the same `(offset, limit)`
//! window across calls. Retrying a failed fetch relies on it, and the
//! confidence interval assumes blocks are disjoint. The remote source pins
//! this with an explicit `$order`; a live dataset that changes between
//! calls still breaks the assumption.

mod block;
mod errors;
mod jsonl;
mod memory;
mod socrata;

pub use block::{extract_block, Block};
pub use errors::{SourceError, SourceResult};
pub use jsonl::JsonLinesSource;
pub use memory::MemorySource;
pub use socrata::{SocrataConfig, SocrataSource};

use async_trait::async_trait;

/// Ordered, page-addressable row store
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Fetch the block starting at `offset` holding at most `limit` rows.
    ///
    /// `column` is `None` when only row counts are needed.
    async fn fetch(&self, column: Option<&str>, offset: u64, limit: u64) -> SourceResult<Block>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Reject a zero-row request before touching any backend
pub(crate) fn check_limit(limit: u64) -> SourceResult<()> {
    if limit == 0 {
        return Err(SourceError::Malformed("limit must be > 0".to_string()));
    }
    Ok(())
}
