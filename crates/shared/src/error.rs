//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// The four domain kinds drive retry policy: `NotFound` is surfaced to the
/// caller and never retried, `Validation` routes entities to review instead
/// of raising, `Collaborator` is retried at the next pipeline pass, and
/// `DataIntegrity` is reported but not auto-corrected.
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced invoice/line/supplier/price record absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Required input missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A mail/AI/storage collaborator call failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Unexpected duplicate or inconsistent stored data.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Collaborator(_) => 502,
            Self::DataIntegrity(_) | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Collaborator(_) => "COLLABORATOR_ERROR",
            Self::DataIntegrity(_) => "DATA_INTEGRITY_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::NotFound(String::new()).status_code(), 404);
        assert_eq!(AppError::Validation(String::new()).status_code(), 400);
        assert_eq!(AppError::Collaborator(String::new()).status_code(), 502);
        assert_eq!(AppError::DataIntegrity(String::new()).status_code(), 500);
        assert_eq!(AppError::Database(String::new()).status_code(), 500);
        assert_eq!(AppError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound(String::new()).error_code(), "NOT_FOUND");
        assert_eq!(
            AppError::Validation(String::new()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::Collaborator(String::new()).error_code(),
            "COLLABORATOR_ERROR"
        );
        assert_eq!(
            AppError::DataIntegrity(String::new()).error_code(),
            "DATA_INTEGRITY_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::NotFound("invoice 42".into()).to_string(),
            "Not found: invoice 42"
        );
        assert_eq!(
            AppError::Collaborator("graph timeout".into()).to_string(),
            "Collaborator error: graph timeout"
        );
    }
}
