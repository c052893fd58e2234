//! Storage API of a Supabase-style gateway, addressed with the catalog endpoint and key.

use async_trait::async_trait;
use reqwest::Client;

use crate::models::{BackfillError, Result};
use crate::storage::ObjectStore;

#[derive(Clone)]
pub struct SupabaseObjectStore {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseObjectStore {
    pub fn new(client: Client, base_url: impl Into<String>, service_key: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);
        tracing::debug!(url = %url, size = data.len(), content_type = %content_type, "Uploading to storage");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("apikey", &self.service_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true") // overwrite existing files
            .body(data)
            .send()
            .await
            .map_err(|e| BackfillError::Upload(format!("storage request failed: {}", e)))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, bucket = %self.bucket, path = %path, "Storage upload rejected");
        Err(BackfillError::Upload(format!("storage upload failed: {} - {}", status, body)))
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path))
    }
}
