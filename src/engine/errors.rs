//! Aggregation engine errors
//!
//! Configuration errors (`InvalidAggregate`, `InvalidColumn`) are raised
//! by `start` before any state exists. `SourceUnavailable` leaves the
//! running state exactly as it was. `DivisionUndefined` never reaches
//! callers of `refine`: it is folded into the estimate as "no data yet".

use thiserror::Error;

use crate::source::SourceError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Aggregate name is not SUM, AVG or COUNT
    #[error("Invalid aggregate: '{0}' (expected SUM, AVG or COUNT)")]
    InvalidAggregate(String),

    /// Column missing, malformed, or unknown to the source
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// Block fetch failed; nothing was merged
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Mean requested with zero rows
    #[error("Division undefined: no rows processed yet")]
    DivisionUndefined,

    /// `refine` or `estimate` before any `start`
    #[error("No active query: call start first")]
    NotStarted,

    /// Merged statistics would violate sum_sq >= sum^2 / n
    #[error("Corrupt merge rejected: {0}")]
    CorruptMerge(String),

    /// Session identifier is empty or contains unsupported characters
    #[error("Invalid session id: '{0}'")]
    InvalidSession(String),

    /// Every session slot is busy
    #[error("Session limit reached ({0} active)")]
    TooManySessions(usize),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidAggregate(_) => "AQP_INVALID_AGGREGATE",
            EngineError::InvalidColumn(_) => "AQP_INVALID_COLUMN",
            EngineError::SourceUnavailable(_) => "AQP_SOURCE_UNAVAILABLE",
            EngineError::DivisionUndefined => "AQP_DIVISION_UNDEFINED",
            EngineError::NotStarted => "AQP_NOT_STARTED",
            EngineError::CorruptMerge(_) => "AQP_CORRUPT_MERGE",
            EngineError::InvalidSession(_) => "AQP_INVALID_SESSION",
            EngineError::TooManySessions(_) => "AQP_TOO_MANY_SESSIONS",
        }
    }

    /// Retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::SourceUnavailable(_) | EngineError::TooManySessions(_)
        )
    }
}

impl From<SourceError> for EngineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::UnknownColumn(col) => {
                EngineError::InvalidColumn(format!("'{}' is not known to the source", col))
            }
            SourceError::Unavailable(msg) => EngineError::SourceUnavailable(msg),
            SourceError::Malformed(msg) => {
                EngineError::SourceUnavailable(format!("malformed block: {}", msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_mapping() {
        assert!(matches!(
            EngineError::from(SourceError::UnknownColumn("x".into())),
            EngineError::InvalidColumn(_)
        ));
        assert!(matches!(
            EngineError::from(SourceError::Unavailable("down".into())),
            EngineError::SourceUnavailable(_)
        ));
        assert!(matches!(
            EngineError::from(SourceError::Malformed("bad".into())),
            EngineError::SourceUnavailable(_)
        ));
    }

    #[test]
    fn test_only_source_failures_are_retryable() {
        assert!(EngineError::SourceUnavailable("x".into()).is_retryable());
        assert!(!EngineError::InvalidColumn("x".into()).is_retryable());
        assert!(!EngineError::NotStarted.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = EngineError::InvalidAggregate("MEDIAN".into());
        assert!(err.to_string().contains("MEDIAN"));
        assert_eq!(err.code(), "AQP_INVALID_AGGREGATE");
    }
}
