use std::time::Duration;

use reqwest::Client as HttpClient;
use tokio::time::timeout;

use crate::models::{BackfillError, Result};
use crate::processing::{ImageOptimizer, OptimizedImage};

pub const DEFAULT_MAX_IMAGE_SIZE_MB: u64 = 50;

/// Downloads a candidate image and hands it to the optimizer.
#[derive(Clone)]
pub struct ImageFetcher {
    http_client: HttpClient,
    optimizer: ImageOptimizer,
    download_timeout: Duration,
    max_size_bytes: u64,
}

impl ImageFetcher {
    pub fn new(http_client: HttpClient, optimizer: ImageOptimizer, download_timeout_ms: u64) -> Self {
        Self {
            http_client,
            optimizer,
            download_timeout: Duration::from_millis(download_timeout_ms),
            max_size_bytes: DEFAULT_MAX_IMAGE_SIZE_MB * 1024 * 1024,
        }
    }

    /// Rejects downloads larger than `max_size_bytes`.
    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Downloads `url` and re-encodes it. Download problems surface as `Download`, decode/encode
    /// problems as `Codec`.
    pub async fn fetch_and_optimize(&self, url: &str) -> Result<OptimizedImage> {
        let raw = self.download_image(url).await?;
        let original_size = raw.len();

        // Offload CPU-bound decode/resize/encode to a blocking thread
        let optimizer = self.optimizer;
        let optimized = tokio::task::spawn_blocking(move || optimizer.optimize(&raw))
            .await
            .map_err(|e| BackfillError::Codec(format!("Join error in optimize: {}", e)))??;

        tracing::info!(
            original_bytes = original_size,
            optimized_bytes = optimized.data.len(),
            ratio_pct = %format!("{:.1}", optimized.data.len() as f64 / original_size.max(1) as f64 * 100.0),
            "Image optimized"
        );
        Ok(optimized)
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url = %url, "Downloading image");

        let download_future = async {
            let response = self
                .http_client
                .get(url)
                .send()
                .await
                .map_err(|e| BackfillError::Download(format!("request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(BackfillError::Download(format!(
                    "HTTP error downloading image: {} {}",
                    response.status().as_u16(),
                    response.status().canonical_reason().unwrap_or("Unknown")
                )));
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            if !is_image_content_type(&content_type) {
                return Err(BackfillError::Download(format!(
                    "content is not an image: '{}'",
                    content_type
                )));
            }

            if let Some(declared) = response.content_length() {
                self.check_size(declared)?;
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| BackfillError::Download(format!("failed reading body: {}", e)))?;
            // Content-Length may be absent (chunked) or wrong
            self.check_size(bytes.len() as u64)?;
            Ok(bytes.to_vec())
        };

        timeout(self.download_timeout, download_future)
            .await
            .map_err(|_| BackfillError::Download("Image download timeout".to_string()))?
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_size_bytes {
            return Err(BackfillError::Download(format!(
                "Image too large: {} bytes (max: {} bytes)",
                size, self.max_size_bytes
            )));
        }
        Ok(())
    }
}

pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false)
}
