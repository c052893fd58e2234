use std::path::PathBuf;

use chrono::{DateTime, TimeZone};
use clap::Parser;

use crate::backfill::DEFAULT_BATCH_SIZE;
use crate::models::RecordQuery;

const TEST_MODE_LIMIT: usize = 10;

/// Finds, optimizes and uploads product images for catalog records that have none.
#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-image-backfill", version)]
#[command(after_help = "Examples:\n  catalog-image-backfill --test --limit 10\n  catalog-image-backfill --brand \"Al Fakher\"\n  catalog-image-backfill --full")]
pub struct Args {
    /// Test mode: process only a few records (10 unless --limit is given)
    #[arg(long)]
    pub test: bool,

    /// Maximum number of records to process
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only process records of this brand
    #[arg(long)]
    pub brand: Option<String>,

    /// Process every record that lacks an image
    #[arg(long)]
    pub full: bool,

    /// Records processed concurrently per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Also replace images of records that already have one
    #[arg(long)]
    pub overwrite: bool,

    /// Emit JSON logs on the console
    #[arg(long)]
    pub log_json: bool,

    /// Directory for the per-run log file
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Do not write a log file
    #[arg(long)]
    pub no_log_file: bool,
}

impl Args {
    /// Explicit limit first, then the test-mode default, otherwise unlimited. `--limit 0` counts
    /// as no limit.
    pub fn effective_limit(&self) -> Option<usize> {
        match (self.limit.filter(|&n| n > 0), self.test) {
            (Some(limit), _) => Some(limit),
            (None, true) => Some(TEST_MODE_LIMIT),
            (None, false) => None,
        }
    }

    pub fn record_query(&self) -> RecordQuery {
        RecordQuery {
            brand: self.brand.clone(),
            limit: self.effective_limit(),
            only_missing_image: !self.overwrite,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

pub fn log_file_name<Tz: TimeZone>(started: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("image_backfill_{}.log", started.format("%Y%m%d_%H%M%S"))
}
