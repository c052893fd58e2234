use async_trait::async_trait;

use crate::clients::ProviderChain;
use crate::models::{BackfillError, CatalogRecord, RecordOutcome};
use crate::processing::ImageFetcher;
use crate::storage::ImageUploader;

/// Turns one catalog record into a terminal outcome.
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    async fn process(&self, record: &CatalogRecord) -> RecordOutcome;
}

/// search -> fetch -> upload for a single record.
#[derive(Clone)]
pub struct RecordPipeline {
    providers: ProviderChain,
    fetcher: ImageFetcher,
    uploader: ImageUploader,
}

impl RecordPipeline {
    pub fn new(providers: ProviderChain, fetcher: ImageFetcher, uploader: ImageUploader) -> Self {
        Self {
            providers,
            fetcher,
            uploader,
        }
    }
}

#[async_trait]
impl RecordProcessor for RecordPipeline {
    async fn process(&self, record: &CatalogRecord) -> RecordOutcome {
        let label = record.label();
        tracing::info!(record_id = %record.id, brand = %record.brand, name = %record.name, "Processing record");

        let Some(image_url) = self.providers.find_image(&record.brand, &record.name).await else {
            tracing::warn!(record = %label, "No image found");
            return RecordOutcome::NoImage;
        };
        tracing::info!(record = %label, url = %preview(&image_url, 80), "Image candidate found");

        let image = match self.fetcher.fetch_and_optimize(&image_url).await {
            Ok(image) => image,
            Err(e @ (BackfillError::Download(_) | BackfillError::Codec(_) | BackfillError::Http(_))) => {
                tracing::warn!(record = %label, error = %e, "Could not download or optimize image");
                return RecordOutcome::FetchFailed;
            }
            Err(e) => return unclassified(&label, e),
        };

        match self.uploader.upload(&record.id, &record.brand, &record.name, image.data).await {
            Ok(public_url) => {
                tracing::info!(record = %label, "Record completed");
                RecordOutcome::Done { public_url }
            }
            Err(
                e @ (BackfillError::Upload(_)
                | BackfillError::Catalog(_)
                | BackfillError::Database(_)
                | BackfillError::Http(_)
                | BackfillError::Serialization(_)),
            ) => {
                tracing::error!(record = %label, error = %e, "Could not upload image");
                RecordOutcome::UploadFailed
            }
            Err(e) => unclassified(&label, e),
        }
    }
}

fn unclassified(label: &str, err: BackfillError) -> RecordOutcome {
    let message = format!("Error in {}: {}", label, err);
    tracing::error!(error = %message, "Record pipeline failed");
    RecordOutcome::Error(message)
}

fn preview(url: &str, max_chars: usize) -> String {
    if url.chars().count() <= max_chars {
        url.to_string()
    } else {
        format!("{}...", url.chars().take(max_chars).collect::<String>())
    }
}
