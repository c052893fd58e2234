pub mod record;
pub mod stats;

pub use record::*;
pub use stats::*;

#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Unclassified(String),
}

pub type Result<T> = std::result::Result<T, BackfillError>;
