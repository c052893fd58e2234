use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::models::Result;
use crate::processing::ImageOptimizer;
use crate::storage::{object_path, ObjectStore};

/// Stores an encoded image under its brand/name path and points the record at it.
#[derive(Clone)]
pub struct ImageUploader {
    objects: Arc<dyn ObjectStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl ImageUploader {
    pub fn new(objects: Arc<dyn ObjectStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { objects, catalog }
    }

    /// Returns the public URL now stored on the record. Nothing is rolled back if a later
    /// step fails after the upload succeeded.
    pub async fn upload(&self, record_id: &str, brand: &str, name: &str, data: Vec<u8>) -> Result<String> {
        let path = object_path(brand, name, ImageOptimizer::EXTENSION);
        tracing::info!(path = %path, record_id = %record_id, "Uploading image");

        self.objects.upload(&path, data, ImageOptimizer::CONTENT_TYPE).await?;
        let public_url = self.objects.public_url(&path)?;
        self.catalog.set_image_url(record_id, &public_url).await?;

        tracing::info!(public_url = %public_url, record_id = %record_id, "Record image updated");
        Ok(public_url)
    }
}
