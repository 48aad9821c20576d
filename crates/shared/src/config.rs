//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// PDF storage configuration.
    pub storage: StorageSettings,
    /// Mail provider (Microsoft Graph) configuration.
    #[serde(default)]
    pub mail: MailConfig,
    /// AI extraction configuration.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Pipeline orchestration configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// PDF storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Storage backend: `fs` or `s3`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Bucket (s3) or root directory (fs) holding invoice PDFs.
    #[serde(default = "default_pdf_bucket")]
    pub bucket: String,
    /// S3 endpoint URL, if `backend = "s3"`.
    #[serde(default)]
    pub endpoint: String,
    /// S3 region.
    #[serde(default)]
    pub region: String,
    /// S3 access key id.
    #[serde(default)]
    pub access_key_id: String,
    /// S3 secret access key.
    #[serde(default)]
    pub secret_access_key: String,
}

fn default_storage_backend() -> String {
    "fs".to_string()
}

fn default_pdf_bucket() -> String {
    "pdfs".to_string()
}

/// Microsoft Graph mail configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailConfig {
    /// Azure AD tenant id.
    #[serde(default)]
    pub tenant_id: String,
    /// Application (client) id.
    #[serde(default)]
    pub client_id: String,
    /// Client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Mailbox address the invoice mail arrives at.
    #[serde(default)]
    pub mailbox: String,
}

/// AI extraction configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// OpenAI API key.
    #[serde(default)]
    pub openai_api_key: String,
    /// Chat-completions model used for extraction.
    #[serde(default = "default_extraction_model")]
    pub model: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            model: default_extraction_model(),
        }
    }
}

fn default_extraction_model() -> String {
    "gpt-4o".to_string()
}

/// Pipeline orchestration configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum invoices fetched per drain batch (and mails per poll).
    #[serde(default = "default_batch_size")]
    pub max_batch_size: u64,
    /// Minutes to sleep between orchestrator cycles.
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: u64,
    /// Run mail polling as an independent background task.
    ///
    /// When enabled the orchestrator skips its own ingestion step so the
    /// mailbox is not polled twice. The two tasks are otherwise
    /// uncoordinated; enabling both polling paths is a misconfiguration.
    #[serde(default)]
    pub enable_background_polling: bool,
    /// Largest accepted PDF attachment, in megabytes.
    #[serde(default = "default_max_pdf_size_mb")]
    pub max_pdf_size_mb: u64,
    /// Configured price tolerance, percent.
    ///
    /// Historically never applied: matching compares with a fixed absolute
    /// epsilon of 0.0001. Kept here so operators can opt in via
    /// `use_percent_tolerance` without changing the default behavior.
    #[serde(default = "default_price_tolerance_percent")]
    pub price_tolerance_percent: Decimal,
    /// Opt in to percentage-based tolerance instead of the absolute epsilon.
    #[serde(default)]
    pub use_percent_tolerance: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_batch_size(),
            poll_interval_minutes: default_poll_interval_minutes(),
            enable_background_polling: false,
            max_pdf_size_mb: default_max_pdf_size_mb(),
            price_tolerance_percent: default_price_tolerance_percent(),
            use_percent_tolerance: false,
        }
    }
}

fn default_batch_size() -> u64 {
    5
}

fn default_poll_interval_minutes() -> u64 {
    90
}

fn default_max_pdf_size_mb() -> u64 {
    10
}

fn default_price_tolerance_percent() -> Decimal {
    Decimal::new(5, 0)
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FACTUM").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Largest accepted PDF size in bytes.
    #[must_use]
    pub const fn max_pdf_size_bytes(&self) -> u64 {
        self.pipeline.max_pdf_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pipeline_defaults() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.max_batch_size, 5);
        assert_eq!(pipeline.poll_interval_minutes, 90);
        assert!(!pipeline.enable_background_polling);
        assert_eq!(pipeline.max_pdf_size_mb, 10);
        assert_eq!(pipeline.price_tolerance_percent, dec!(5));
        assert!(!pipeline.use_percent_tolerance);
    }

    #[test]
    fn test_max_pdf_size_bytes() {
        let config = AppConfig {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/factum".into(),
                max_connections: 10,
            },
            storage: StorageSettings {
                backend: default_storage_backend(),
                bucket: default_pdf_bucket(),
                endpoint: String::new(),
                region: String::new(),
                access_key_id: String::new(),
                secret_access_key: String::new(),
            },
            mail: MailConfig::default(),
            extraction: ExtractionConfig::default(),
            pipeline: PipelineConfig::default(),
        };
        assert_eq!(config.max_pdf_size_bytes(), 10 * 1024 * 1024);
    }
}
