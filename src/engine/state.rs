//! Running query state and block merge
//!
//! `QueryState` holds the sufficient statistics (count, sum, sum of
//! squares) plus the virtual-partition cursor. Merges are all-or-nothing:
//! the next state is computed on a copy, checked, then committed.

use serde::Serialize;

use super::aggregate::AggregateKind;
use super::errors::{EngineError, EngineResult};
use crate::source::Block;

/// Relative slack for the Cauchy-Schwarz check, absorbs float rounding
const CONSISTENCY_TOLERANCE: f64 = 1e-9;

/// State of one progressive query
///
/// Invariants:
/// - `offset == running_count` (each block advances the cursor by the rows it returned)
/// - `running_sum_sq * running_count >= running_sum^2` within tolerance
/// - once `exhausted`, the state never changes again
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryState {
    aggregate: AggregateKind,
    column: Option<String>,
    block_size: u64,
    offset: u64,
    running_count: u64,
    running_sum: f64,
    running_sum_sq: f64,
    exhausted: bool,
}

impl QueryState {
    /// Fresh state for a new query
    pub fn new(aggregate: AggregateKind, column: Option<String>, block_size: u64) -> Self {
        Self {
            aggregate,
            column,
            block_size,
            offset: 0,
            running_count: 0,
            running_sum: 0.0,
            running_sum_sq: 0.0,
            exhausted: false,
        }
    }

    pub fn aggregate(&self) -> AggregateKind {
        self.aggregate
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Start index of the next block
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn running_count(&self) -> u64 {
        self.running_count
    }

    pub fn running_sum(&self) -> f64 {
        self.running_sum
    }

    pub fn running_sum_sq(&self) -> f64 {
        self.running_sum_sq
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fold one block into the statistics.
    ///
    /// On error `self` is untouched.
    pub fn merge(&mut self, block: &Block) -> EngineResult<()> {
        if self.exhausted {
            return Err(EngineError::CorruptMerge(
                "merge into an exhausted query".to_string(),
            ));
        }
        if block.rows() > self.block_size {
            return Err(EngineError::CorruptMerge(format!(
                "block of {} rows exceeds block size {}",
                block.rows(),
                self.block_size
            )));
        }
        if self.column.is_some() && block.values().len() as u64 != block.rows() {
            return Err(EngineError::CorruptMerge(format!(
                "block reports {} rows but carries {} values",
                block.rows(),
                block.values().len()
            )));
        }

        let (sum, sum_sq) = block
            .values()
            .iter()
            .fold((0.0_f64, 0.0_f64), |(s, sq), v| (s + v, sq + v * v));

        let mut next = self.clone();
        next.running_count += block.rows();
        next.running_sum += sum;
        next.running_sum_sq += sum_sq;
        next.offset += block.rows();
        next.exhausted = block.is_short(self.block_size);

        next.check_consistency()?;
        *self = next;
        Ok(())
    }

    /// Verify the sufficient statistics can describe a real sample
    pub fn check_consistency(&self) -> EngineResult<()> {
        if self.offset != self.running_count {
            return Err(EngineError::CorruptMerge(format!(
                "offset {} != row count {}",
                self.offset, self.running_count
            )));
        }
        if !self.running_sum.is_finite() || !self.running_sum_sq.is_finite() {
            return Err(EngineError::CorruptMerge(
                "running sums overflowed".to_string(),
            ));
        }
        if self.column.is_none() || self.running_count == 0 {
            return Ok(());
        }

        let n = self.running_count as f64;
        let lhs = self.running_sum_sq * n;
        let rhs = self.running_sum * self.running_sum;
        if lhs + CONSISTENCY_TOLERANCE * rhs.max(1.0) < rhs {
            return Err(EngineError::CorruptMerge(format!(
                "sum_sq {} < sum^2/n {}",
                self.running_sum_sq,
                rhs / n
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avg_state(block_size: u64) -> QueryState {
        QueryState::new(AggregateKind::Avg, Some("x".into()), block_size)
    }

    #[test]
    fn test_new_state_is_zeroed() {
        let state = avg_state(2);
        assert_eq!(state.offset(), 0);
        assert_eq!(state.running_count(), 0);
        assert_eq!(state.running_sum(), 0.0);
        assert_eq!(state.running_sum_sq(), 0.0);
        assert!(!state.is_exhausted());
    }

    #[test]
    fn test_merge_full_block() {
        let mut state = avg_state(2);
        state.merge(&Block::from_values(vec![10.0, 20.0])).unwrap();
        assert_eq!(state.running_count(), 2);
        assert_eq!(state.offset(), 2);
        assert_eq!(state.running_sum(), 30.0);
        assert_eq!(state.running_sum_sq(), 500.0);
        assert!(!state.is_exhausted());
    }

    #[test]
    fn test_short_block_exhausts() {
        let mut state = avg_state(2);
        state.merge(&Block::from_values(vec![10.0, 20.0])).unwrap();
        state.merge(&Block::from_values(vec![30.0])).unwrap();
        assert_eq!(state.running_count(), 3);
        assert_eq!(state.running_sum(), 60.0);
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_empty_block_exhausts() {
        let mut state = avg_state(2);
        state.merge(&Block::empty()).unwrap();
        assert!(state.is_exhausted());
        assert_eq!(state.offset(), 0);
    }

    #[test]
    fn test_merge_after_exhaustion_rejected() {
        let mut state = avg_state(2);
        state.merge(&Block::empty()).unwrap();
        let before = state.clone();
        assert!(state.merge(&Block::from_values(vec![1.0])).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_oversized_block_rejected_without_change() {
        let mut state = avg_state(2);
        let before = state.clone();
        let err = state
            .merge(&Block::from_values(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, EngineError::CorruptMerge(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_row_only_block_for_count() {
        let mut state = QueryState::new(AggregateKind::Count, None, 5);
        state.merge(&Block::rows_only(5)).unwrap();
        state.merge(&Block::rows_only(2)).unwrap();
        assert_eq!(state.running_count(), 7);
        assert_eq!(state.running_sum(), 0.0);
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_row_only_block_rejected_for_column_query() {
        let mut state = avg_state(5);
        assert!(matches!(
            state.merge(&Block::rows_only(3)),
            Err(EngineError::CorruptMerge(_))
        ));
        assert_eq!(state.running_count(), 0);
    }

    #[test]
    fn test_consistency_holds_for_constant_values() {
        let mut state = avg_state(4);
        state
            .merge(&Block::from_values(vec![0.1, 0.1, 0.1, 0.1]))
            .unwrap();
        assert!(state.check_consistency().is_ok());
    }

    #[test]
    fn test_overflow_rejected() {
        let mut state = avg_state(2);
        let before = state.clone();
        let err = state
            .merge(&Block::from_values(vec![f64::MAX, f64::MAX]))
            .unwrap_err();
        assert!(matches!(err, EngineError::CorruptMerge(_)));
        assert_eq!(state, before);
    }
}
