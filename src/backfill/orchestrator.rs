use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::backfill::RecordProcessor;
use crate::catalog::CatalogStore;
use crate::models::{CatalogRecord, RecordOutcome, RecordQuery, RunStatistics};

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Waits between batches to stay under provider rate limits.
#[async_trait]
pub trait Pauser: Send + Sync {
    async fn pause(&self, duration: Duration);
}

pub struct TokioPauser;

#[async_trait]
impl Pauser for TokioPauser {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs record pipelines batch by batch. Records within a batch run concurrently; the next
/// batch starts only once every record of the current one has finished.
pub struct BatchOrchestrator {
    catalog: Arc<dyn CatalogStore>,
    processor: Arc<dyn RecordProcessor>,
    batch_size: usize,
    batch_pause: Duration,
    pauser: Arc<dyn Pauser>,
}

impl BatchOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        processor: Arc<dyn RecordProcessor>,
        batch_size: usize,
        batch_pause: Duration,
    ) -> Self {
        Self {
            catalog,
            processor,
            batch_size: batch_size.max(1),
            batch_pause,
            pauser: Arc::new(TokioPauser),
        }
    }

    pub fn with_pauser(mut self, pauser: Arc<dyn Pauser>) -> Self {
        self.pauser = pauser;
        self
    }

    pub async fn run(&self, query: &RecordQuery) -> RunStatistics {
        let records = match self.catalog.fetch_records(query).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch records");
                Vec::new()
            }
        };
        tracing::info!(count = records.len(), brand = ?query.brand, limit = ?query.limit, "Fetched records from catalog");

        // Without an explicit override only image-less records are candidates
        let records: Vec<CatalogRecord> = if query.only_missing_image {
            records.into_iter().filter(CatalogRecord::lacks_image).collect()
        } else {
            records
        };
        self.run_records(records).await
    }

    pub async fn run_records(&self, records: Vec<CatalogRecord>) -> RunStatistics {
        let mut stats = RunStatistics::default();
        if records.is_empty() {
            tracing::info!("No records to process");
            return stats;
        }

        let total = records.len();
        let batches = plan_batches(total, self.batch_size);
        tracing::info!(total, batch_size = self.batch_size, batches = batches.len(), "Starting backfill");

        for (index, range) in batches.iter().enumerate() {
            let batch = &records[range.clone()];
            tracing::info!(batch = index + 1, size = batch.len(), "Processing batch");

            stats.merge(self.run_batch(batch).await);

            tracing::info!(
                processed = stats.processed(),
                total,
                success = stats.success,
                failed = stats.failed,
                no_image = stats.no_image,
                "Progress"
            );

            if index + 1 < batches.len() {
                tracing::info!(pause_ms = self.batch_pause.as_millis() as u64, "Pausing between batches");
                self.pauser.pause(self.batch_pause).await;
            }
        }
        stats
    }

    async fn run_batch(&self, batch: &[CatalogRecord]) -> RunStatistics {
        let handles = batch.iter().cloned().map(|record| {
            let processor = self.processor.clone();
            tokio::spawn(async move { processor.process(&record).await })
        });

        // Every task is awaited; one failure never cancels its siblings
        let results = join_all(handles).await;

        let mut stats = RunStatistics::default();
        for (record, result) in batch.iter().zip(results) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = format!("Error in {}: {}", record.label(), join_error_message(e));
                    tracing::error!(error = %message, "Record task aborted");
                    RecordOutcome::Error(message)
                }
            };
            stats.record(&outcome);
        }
        stats
    }
}

/// Consecutive index ranges of at most `batch_size` records covering `0..total`.
pub fn plan_batches(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
