use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::catalog::CatalogStore;
use crate::models::{BackfillError, CatalogRecord, RecordQuery, Result};

/// Catalog table behind a PostgREST gateway (`/rest/v1/{table}`).
#[derive(Clone)]
pub struct PostgrestCatalog {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl PostgrestCatalog {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: table.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Query-string filters for a record query, in PostgREST operator syntax.
    pub fn query_params(query: &RecordQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", "id,name,brand,image_url".to_string())];
        if query.only_missing_image {
            params.push(("or", "(image_url.is.null,image_url.eq.)".to_string()));
        }
        if let Some(brand) = &query.brand {
            params.push(("brand", format!("eq.{}", brand)));
        }
        if let Some(limit) = query.limit.filter(|&n| n > 0) {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

#[async_trait]
impl CatalogStore for PostgrestCatalog {
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<CatalogRecord>> {
        let response = self
            .client
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(&Self::query_params(query))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackfillError::Catalog(format!("record query failed: status={} body={}", status, text)));
        }

        let records: Vec<CatalogRecord> = response.json().await?;
        Ok(records)
    }

    async fn set_image_url(&self, id: &str, image_url: &str) -> Result<()> {
        let response = self
            .client
            .patch(self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .query(&[("id", format!("eq.{}", id))])
            .json(&json!({ "image_url": image_url }))
            .send()
            .await
            .map_err(|e| BackfillError::Catalog(format!("record update request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackfillError::Catalog(format!("record update failed: status={} body={}", status, text)));
        }
        Ok(())
    }
}
