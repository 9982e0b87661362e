//! Block source errors
//!
//! Error codes:
//! - AQP_SOURCE_UNAVAILABLE (network, HTTP status, body decode)
//! - AQP_SOURCE_UNKNOWN_COLUMN (column not resolvable by the source)
//! - AQP_SOURCE_MALFORMED (row value unusable, bad request shape)

use thiserror::Error;

/// Result type for block source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Failures a block source can report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Remote call failed or returned an unreadable response
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The source does not know the requested column
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A row or request could not be interpreted
    #[error("Malformed block: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            SourceError::Unavailable(_) => "AQP_SOURCE_UNAVAILABLE",
            SourceError::UnknownColumn(_) => "AQP_SOURCE_UNKNOWN_COLUMN",
            SourceError::Malformed(_) => "AQP_SOURCE_MALFORMED",
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Unavailable(format!("undecodable response: {}", err))
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Unavailable(format!("I/O error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SourceError::Unavailable("x".into()).code(),
            "AQP_SOURCE_UNAVAILABLE"
        );
        assert_eq!(
            SourceError::UnknownColumn("x".into()).code(),
            "AQP_SOURCE_UNKNOWN_COLUMN"
        );
        assert_eq!(SourceError::Malformed("x".into()).code(), "AQP_SOURCE_MALFORMED");
    }

    #[test]
    fn test_io_error_is_unavailable() {
        let err: SourceError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, SourceError::Unavailable(_)));
        assert!(err.to_string().contains("missing"));
    }
}
