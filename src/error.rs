//! Error types for gator.

use thiserror::Error;

use crate::rss::FetchError;

/// Common error type for gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant. Inside the poll
    /// scheduler it only aborts the current cycle.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Feed fetch error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Result type alias for gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rss::FetchStage;

    #[test]
    fn test_validation_error_display() {
        let err = GatorError::Validation("usage: login <name>".to_string());
        assert_eq!(err.to_string(), "validation error: usage: login <name>");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = GatorError::NotFound("feed to fetch".to_string());
        assert_eq!(err.to_string(), "feed to fetch not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GatorError = io_err.into();
        assert!(matches!(err, GatorError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_fetch_error_conversion() {
        let fetch = FetchError::new(FetchStage::Parse, "http://example.com/rss", "bad xml");
        let err: GatorError = fetch.into();
        assert!(matches!(err, GatorError::Fetch(_)));
        assert!(err.to_string().starts_with("fetch error: parse"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: GatorError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, GatorError::Database(_)));
    }
}
