pub mod google;
pub mod unsplash;

pub use google::*;
pub use unsplash::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::models::{BackfillError, Result};

/// An external image search service that maps a (brand, name) pair to at most one image URL.
///
/// Implementations never fail the caller: provider errors are logged and reported as `None`.
#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the credentials this provider needs are present.
    fn is_configured(&self) -> bool;

    async fn search(&self, brand: &str, name: &str) -> Option<String>;
}

/// Providers tried in order, one at a time, until one returns a URL.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ImageSearchProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn ImageSearchProvider>>) -> Self {
        Self { providers }
    }

    pub async fn find_image(&self, brand: &str, name: &str) -> Option<String> {
        for provider in &self.providers {
            if !provider.is_configured() {
                tracing::debug!(provider = provider.name(), "provider not configured; skipping");
                continue;
            }
            if let Some(url) = provider.search(brand, name).await {
                tracing::debug!(provider = provider.name(), brand = %brand, name = %name, "provider returned a candidate");
                return Some(url);
            }
        }
        None
    }
}

pub fn build_http_client(timeout_ms: u64, user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(timeout_ms))
        .connect_timeout(Duration::from_millis(timeout_ms.min(10_000)))
        .build()
        .map_err(|e| BackfillError::Configuration(format!("Failed to create HTTP client: {}", e)))
}
