//! Storage error types.

/// Errors from PDF storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Storage backend could not be initialized.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Object not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Backend operation failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(e: opendal::Error) -> Self {
        match e.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(e.to_string()),
            _ => Self::Backend(e.to_string()),
        }
    }
}
