pub mod mongo;
pub mod postgrest;

pub use mongo::*;
pub use postgrest::*;

use async_trait::async_trait;

use crate::models::{CatalogRecord, RecordQuery, Result};

/// Where catalog records live.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Filtered, limited read of records, projected to id/brand/name/image_url.
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<CatalogRecord>>;

    /// Sets the image reference of a single record.
    async fn set_image_url(&self, id: &str, image_url: &str) -> Result<()>;
}
