//! PDF store implementation using Apache OpenDAL.

use chrono::Utc;
use opendal::{services, Operator};
use tracing::debug;

use factum_shared::config::StorageSettings;

use super::error::StorageError;

/// Result of storing a PDF.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// Key of the object inside the bucket.
    pub key: String,
    /// True when an existing object with the same filename was reused.
    pub reused: bool,
}

/// Object store for invoice PDFs.
///
/// Implemented by [`PdfStore`] in production and by in-memory mocks in
/// service tests.
pub trait DocumentStore: Send + Sync {
    /// Store PDF bytes under a timestamped key derived from `filename`.
    ///
    /// An object already present for the same sanitized filename is reused
    /// instead of written again.
    fn store_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<StoredDocument, StorageError>> + Send;

    /// Fetch the bytes of a stored object.
    fn fetch(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, StorageError>> + Send;
}

/// OpenDAL-backed PDF store.
pub struct PdfStore {
    operator: Operator,
}

impl PdfStore {
    /// Create a store from storage settings.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown backend or an operator that cannot
    /// be built.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let operator = match settings.backend.as_str() {
            "s3" => {
                let builder = services::S3::default()
                    .endpoint(&settings.endpoint)
                    .bucket(&settings.bucket)
                    .access_key_id(&settings.access_key_id)
                    .secret_access_key(&settings.secret_access_key)
                    .region(&settings.region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            "fs" => {
                let builder = services::Fs::default().root(&settings.bucket);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            other => {
                return Err(StorageError::configuration(format!(
                    "unknown storage backend: {other}"
                )));
            }
        };

        Ok(Self { operator })
    }

    /// Build from an already-configured operator. Used by tests.
    #[must_use]
    pub fn from_operator(operator: Operator) -> Self {
        Self { operator }
    }

    /// Find an existing object whose key ends with `_{sanitized}`.
    async fn find_existing(&self, sanitized: &str) -> Result<Option<String>, StorageError> {
        let suffix = format!("_{sanitized}");
        let entries = self.operator.list("/").await?;
        Ok(entries
            .into_iter()
            .map(|e| e.name().to_string())
            .find(|name| name.ends_with(&suffix)))
    }
}

impl DocumentStore for PdfStore {
    async fn store_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredDocument, StorageError> {
        let sanitized = sanitize_filename(filename);

        if let Some(existing) = self.find_existing(&sanitized).await? {
            debug!(key = %existing, "Reusing already stored PDF");
            return Ok(StoredDocument {
                key: existing,
                reused: true,
            });
        }

        let key = format!("{}_{sanitized}", Utc::now().format("%Y%m%d_%H%M%S"));
        self.operator.write(&key, bytes).await?;

        Ok(StoredDocument { key, reused: false })
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let buffer = self.operator.read(key).await?;
        Ok(buffer.to_vec())
    }
}

/// Sanitize a filename for use in a storage key.
///
/// Only ASCII alphanumerics, dots, hyphens, and underscores survive.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("invoice.pdf"), "invoice.pdf");
        assert_eq!(sanitize_filename("faktura 1234 (2).pdf"), "faktura_1234__2_.pdf");
        assert_eq!(sanitize_filename("løn@maj.pdf"), "l_n_maj.pdf");
    }

    #[tokio::test]
    async fn test_store_and_fetch_roundtrip() {
        let dir = std::env::temp_dir().join(format!("factum-store-{}", uuid::Uuid::new_v4()));
        let builder = services::Fs::default().root(dir.to_str().unwrap());
        let store = PdfStore::from_operator(Operator::new(builder).unwrap().finish());

        let stored = store
            .store_pdf("invoice.pdf", b"%PDF-1.4 test".to_vec())
            .await
            .unwrap();
        assert!(!stored.reused);
        assert!(stored.key.ends_with("_invoice.pdf"));

        let bytes = store.fetch(&stored.key).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_store_same_filename_reuses_object() {
        let dir = std::env::temp_dir().join(format!("factum-store-{}", uuid::Uuid::new_v4()));
        let builder = services::Fs::default().root(dir.to_str().unwrap());
        let store = PdfStore::from_operator(Operator::new(builder).unwrap().finish());

        let first = store
            .store_pdf("invoice.pdf", b"one".to_vec())
            .await
            .unwrap();
        let second = store
            .store_pdf("invoice.pdf", b"two".to_vec())
            .await
            .unwrap();

        assert!(second.reused);
        assert_eq!(first.key, second.key);
    }
}
