use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::clients::ImageSearchProvider;
use crate::models::{BackfillError, Result};

/// Google Custom Search, restricted to large, safe image results.
#[derive(Clone)]
pub struct GoogleImageSearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    search_engine_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

impl GoogleImageSearch {
    pub fn new(client: Client, endpoint: String, api_key: Option<String>, search_engine_id: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            search_engine_id,
        }
    }

    pub fn query_for(brand: &str, name: &str) -> String {
        format!("{} {} hookah tobacco shisha", brand, name)
    }

    async fn try_search(&self, api_key: &str, cx: &str, brand: &str, name: &str) -> Result<Option<String>> {
        let query = Self::query_for(brand, name);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", api_key),
                ("cx", cx),
                ("q", query.as_str()),
                ("searchType", "image"),
                ("num", "3"),
                ("imgSize", "large"),
                ("safe", "active"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackfillError::Provider(format!(
                "Google search returned status {}",
                response.status().as_u16()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.items.into_iter().next().map(|item| item.link))
    }
}

#[async_trait]
impl ImageSearchProvider for GoogleImageSearch {
    fn name(&self) -> &'static str {
        "google"
    }

    fn is_configured(&self) -> bool {
        let configured = self.api_key.is_some() && self.search_engine_id.is_some();
        if !configured {
            tracing::warn!("Google search not configured; set GOOGLE_API_KEY and GOOGLE_SEARCH_ENGINE_ID");
        }
        configured
    }

    async fn search(&self, brand: &str, name: &str) -> Option<String> {
        let (Some(key), Some(cx)) = (self.api_key.as_deref(), self.search_engine_id.as_deref()) else {
            return None;
        };
        match self.try_search(key, cx, brand, name).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, brand = %brand, name = %name, "Google image search failed");
                None
            }
        }
    }
}
