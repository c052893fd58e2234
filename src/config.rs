use serde::{Deserialize, Serialize};

use crate::models::{BackfillError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Supabase,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Catalog endpoint: http(s) for the REST gateway, mongodb(+srv) for a direct connection
    pub catalog_url: String,
    pub catalog_key: String,
    pub catalog_table: String,
    pub http_user_agent: String,
    pub http_timeout_ms: u64,
    // Image search providers; a provider without credentials is skipped
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub google_search_endpoint: String,
    pub unsplash_access_key: Option<String>,
    pub unsplash_search_endpoint: String,
    // Image processing
    pub image_max_dimension: u32,
    pub image_quality: u8,
    pub image_download_timeout_ms: u64,
    pub image_max_size_mb: u64,
    pub batch_pause_ms: u64,
    // Object storage
    pub storage_backend: StorageBackend,
    pub image_bucket: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    // Optional custom S3 endpoint (e.g., for MinIO: http://localhost:9000)
    pub aws_endpoint: Option<String>,
    pub aws_public_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Support the hosted-gateway variable names as aliases
        let catalog_url = get("CATALOG_URL").or_else(|| get("SUPABASE_URL"));
        let catalog_key = get("CATALOG_SERVICE_KEY")
            .or_else(|| get("SUPABASE_SERVICE_KEY"))
            .or_else(|| get("CATALOG_ANON_KEY"))
            .or_else(|| get("SUPABASE_ANON_KEY"));

        let (catalog_url, catalog_key) = match (catalog_url, catalog_key) {
            (Some(url), Some(key)) => (url.trim_end_matches('/').to_string(), key),
            (None, _) => {
                return Err(BackfillError::Configuration(
                    "set CATALOG_URL (or SUPABASE_URL) in the environment or .env".into(),
                ))
            }
            (_, None) => {
                return Err(BackfillError::Configuration(
                    "set CATALOG_SERVICE_KEY or CATALOG_ANON_KEY (or the SUPABASE_* equivalents)".into(),
                ))
            }
        };

        if let Err(e) = url::Url::parse(&catalog_url) {
            return Err(BackfillError::Configuration(format!("invalid catalog URL '{}': {}", catalog_url, e)));
        }

        let catalog_table = get("CATALOG_TABLE").unwrap_or_else(|| "tobaccos".to_string());
        let http_user_agent = get("HTTP_USER_AGENT").unwrap_or_else(|| "catalog-image-backfill/0.1".to_string());
        let http_timeout_ms: u64 = get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(15000);

        let google_api_key = get("GOOGLE_API_KEY");
        let google_search_engine_id = get("GOOGLE_SEARCH_ENGINE_ID");
        let google_search_endpoint = get("GOOGLE_SEARCH_ENDPOINT")
            .unwrap_or_else(|| "https://www.googleapis.com/customsearch/v1".to_string());
        let unsplash_access_key = get("UNSPLASH_ACCESS_KEY");
        let unsplash_search_endpoint = get("UNSPLASH_SEARCH_ENDPOINT")
            .unwrap_or_else(|| "https://api.unsplash.com/search/photos".to_string());

        let image_max_dimension: u32 = get("IMAGE_MAX_DIMENSION").and_then(|s| s.parse().ok()).unwrap_or(800);
        let image_quality: u8 = get("IMAGE_QUALITY").and_then(|s| s.parse().ok()).unwrap_or(85).min(100);
        let image_download_timeout_ms: u64 = get("IMAGE_DOWNLOAD_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(30000);
        let image_max_size_mb: u64 = get("IMAGE_MAX_SIZE_MB")
            .or_else(|| get("MAX_IMAGE_SIZE_MB"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);
        let batch_pause_ms: u64 = get("BATCH_PAUSE_MS").and_then(|s| s.parse().ok()).unwrap_or(2000);

        let storage_backend = match get("IMAGE_STORAGE_BACKEND").map(|s| s.to_lowercase()).as_deref() {
            None | Some("supabase") => StorageBackend::Supabase,
            Some("s3") => StorageBackend::S3,
            Some(other) => {
                return Err(BackfillError::Configuration(format!(
                    "unknown IMAGE_STORAGE_BACKEND '{}': expected 'supabase' or 's3'",
                    other
                )))
            }
        };
        let image_bucket = get("IMAGE_BUCKET").unwrap_or_else(|| "tobacco-images".to_string());
        let aws_access_key_id = get("AWS_ACCESS_KEY_ID");
        let aws_secret_access_key = get("AWS_SECRET_ACCESS_KEY");
        let aws_region = get("AWS_REGION").unwrap_or_else(|| "eu-central-1".to_string());
        // Support multiple env var names for convenience
        let aws_endpoint = get("AWS_S3_ENDPOINT").or_else(|| get("AWS_ENDPOINT"));
        let aws_public_base_url = get("AWS_S3_PUBLIC_BASE_URL").or_else(|| get("AWS_S3_ACCESS_POINT"));

        Ok(Self {
            catalog_url,
            catalog_key,
            catalog_table,
            http_user_agent,
            http_timeout_ms,
            google_api_key,
            google_search_engine_id,
            google_search_endpoint,
            unsplash_access_key,
            unsplash_search_endpoint,
            image_max_dimension,
            image_quality,
            image_download_timeout_ms,
            image_max_size_mb,
            batch_pause_ms,
            storage_backend,
            image_bucket,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            aws_endpoint,
            aws_public_base_url,
        })
    }

    pub fn catalog_is_mongodb(&self) -> bool {
        self.catalog_url.starts_with("mongodb://") || self.catalog_url.starts_with("mongodb+srv://")
    }
}
