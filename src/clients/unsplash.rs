use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::clients::ImageSearchProvider;
use crate::models::{BackfillError, Result};

/// Unsplash stock photos; a generic hookah shot is better than no image.
#[derive(Clone)]
pub struct UnsplashSearch {
    client: Client,
    endpoint: String,
    access_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

impl UnsplashSearch {
    pub fn new(client: Client, endpoint: String, access_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            access_key,
        }
    }

    pub fn query_for(brand: &str, name: &str) -> String {
        format!("{} {} hookah", brand, name)
    }

    async fn try_search(&self, access_key: &str, brand: &str, name: &str) -> Result<Option<String>> {
        let query = Self::query_for(brand, name);
        let response = self
            .client
            .get(&self.endpoint)
            .header("Authorization", format!("Client-ID {}", access_key))
            .query(&[("query", query.as_str()), ("per_page", "1"), ("orientation", "squarish")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackfillError::Provider(format!(
                "Unsplash search returned status {}",
                response.status().as_u16()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results.into_iter().next().map(|photo| photo.urls.regular))
    }
}

#[async_trait]
impl ImageSearchProvider for UnsplashSearch {
    fn name(&self) -> &'static str {
        "unsplash"
    }

    fn is_configured(&self) -> bool {
        self.access_key.is_some()
    }

    async fn search(&self, brand: &str, name: &str) -> Option<String> {
        let key = self.access_key.as_deref()?;
        match self.try_search(key, brand, name).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, brand = %brand, name = %name, "Unsplash search failed");
                None
            }
        }
    }
}
