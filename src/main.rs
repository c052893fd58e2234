use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalog_image_backfill::cli::{log_file_name, Args};
use catalog_image_backfill::report;
use catalog_image_backfill::{
    build_http_client, BatchOrchestrator, CatalogStore, Config, GoogleImageSearch, ImageFetcher,
    ImageOptimizer, ImageSearchProvider, ImageUploader, MongoCatalog, ObjectStore, PostgrestCatalog,
    ProviderChain, RecordPipeline, S3ObjectStore, StorageBackend, SupabaseObjectStore, UnsplashSearch,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // Credentials usually live in a local .env; real environment variables take precedence
    let _ = dotenvy::dotenv();
    let log_file = init_logging(&args)?;
    if let Some(path) = &log_file {
        tracing::info!(path = %path.display(), "Writing log file");
    }

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Missing configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        catalog_table = %cfg.catalog_table,
        storage_backend = ?cfg.storage_backend,
        bucket = %cfg.image_bucket,
        google_configured = cfg.google_api_key.is_some() && cfg.google_search_engine_id.is_some(),
        unsplash_configured = cfg.unsplash_access_key.is_some(),
        "Loaded configuration"
    );

    let orchestrator = build_orchestrator(&cfg, args.batch_size()).await?;
    let query = args.record_query();
    tracing::info!(
        test_mode = args.test,
        full = args.full,
        overwrite = args.overwrite,
        brand = ?query.brand,
        limit = ?query.limit,
        batch_size = args.batch_size(),
        "Starting image backfill"
    );

    tokio::select! {
        stats = orchestrator.run(&query) => report::log_summary(&stats),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted by user; records already updated stay updated");
        }
    }

    Ok(())
}

fn init_logging(args: &Args) -> anyhow::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = if args.log_json {
        fmt::layer().json().flatten_event(true).with_current_span(true).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    let (file_layer, path) = if args.no_log_file {
        (None, None)
    } else {
        std::fs::create_dir_all(&args.log_dir)?;
        let path = args.log_dir.join(log_file_name(&chrono::Local::now()));
        let file = std::fs::File::create(&path)?;
        let layer = fmt::layer().with_ansi(false).with_target(false).with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(path)
}

async fn build_orchestrator(cfg: &Config, batch_size: usize) -> anyhow::Result<BatchOrchestrator> {
    let api_client = build_http_client(cfg.http_timeout_ms, &cfg.http_user_agent)?;
    let download_client = build_http_client(cfg.image_download_timeout_ms, &cfg.http_user_agent)?;

    let catalog: Arc<dyn CatalogStore> = if cfg.catalog_is_mongodb() {
        Arc::new(MongoCatalog::connect(&cfg.catalog_url, &cfg.catalog_key, &cfg.catalog_table).await?)
    } else {
        Arc::new(PostgrestCatalog::new(
            api_client.clone(),
            &cfg.catalog_url,
            &cfg.catalog_key,
            &cfg.catalog_table,
        ))
    };

    let objects: Arc<dyn ObjectStore> = match cfg.storage_backend {
        StorageBackend::S3 => Arc::new(S3ObjectStore::new(cfg).await?),
        StorageBackend::Supabase => Arc::new(SupabaseObjectStore::new(
            api_client.clone(),
            &cfg.catalog_url,
            &cfg.catalog_key,
            &cfg.image_bucket,
        )),
    };

    let providers: Vec<Arc<dyn ImageSearchProvider>> = vec![
        Arc::new(GoogleImageSearch::new(
            api_client.clone(),
            cfg.google_search_endpoint.clone(),
            cfg.google_api_key.clone(),
            cfg.google_search_engine_id.clone(),
        )),
        Arc::new(UnsplashSearch::new(
            api_client,
            cfg.unsplash_search_endpoint.clone(),
            cfg.unsplash_access_key.clone(),
        )),
    ];

    let fetcher = ImageFetcher::new(
        download_client,
        ImageOptimizer::new(cfg.image_max_dimension, cfg.image_quality),
        cfg.image_download_timeout_ms,
    )
    .with_max_size_bytes(cfg.image_max_size_mb.saturating_mul(1024 * 1024));
    let uploader = ImageUploader::new(objects, catalog.clone());
    let pipeline = RecordPipeline::new(ProviderChain::new(providers), fetcher, uploader);

    Ok(BatchOrchestrator::new(
        catalog,
        Arc::new(pipeline),
        batch_size,
        Duration::from_millis(cfg.batch_pause_ms),
    ))
}
