mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::{routing::get, Json, Router};
use serde_json::json;

use catalog_image_backfill::{
    BatchOrchestrator, CatalogRecord, GoogleImageSearch, ImageFetcher, ImageOptimizer, ImageUploader, Pauser,
    ProviderChain, RecordOutcome, RecordPipeline, RecordProcessor, RecordQuery,
};
use common::{InMemoryCatalog, InMemoryObjectStore};

/// Search endpoint plus image host. Names containing "Missing" resolve to a 404 image,
/// names containing "Unknown" return no results.
async fn provider_server() -> String {
    let (listener, base) = common::bind().await;
    let png = common::png_bytes(1000, 1000);
    let app = Router::new()
        .route(
            "/customsearch/v1",
            get(|State(base): State<String>, Query(q): Query<HashMap<String, String>>| async move {
                let query = q.get("q").cloned().unwrap_or_default();
                if query.contains("Unknown") {
                    return Json(json!({}));
                }
                let file = if query.contains("Missing") { "missing.png" } else { "ok.png" };
                Json(json!({"items": [{"link": format!("{}/images/{}", base, file)}]}))
            }),
        )
        .route(
            "/images/ok.png",
            get(move || {
                let body = png.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], body) }
            }),
        )
        .route("/images/missing.png", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
        .with_state(base.clone());
    common::spawn_on(listener, app);
    base
}

fn pipeline(base: &str, configured: bool, catalog: Arc<InMemoryCatalog>, objects: Arc<InMemoryObjectStore>) -> RecordPipeline {
    let key = configured.then(|| "k".to_string());
    let google = GoogleImageSearch::new(
        reqwest::Client::new(),
        format!("{}/customsearch/v1", base),
        key.clone(),
        key,
    );
    let fetcher = ImageFetcher::new(reqwest::Client::new(), ImageOptimizer::new(800, 85), 30_000);
    let uploader = ImageUploader::new(objects, catalog);
    RecordPipeline::new(ProviderChain::new(vec![Arc::new(google)]), fetcher, uploader)
}

fn orchestrator(catalog: Arc<InMemoryCatalog>, processor: Arc<dyn RecordProcessor>, batch_size: usize) -> BatchOrchestrator {
    BatchOrchestrator::new(catalog, processor, batch_size, Duration::from_millis(1))
}

#[tokio::test]
async fn test_successful_record_lands_under_brand_path() {
    let base = provider_server().await;
    let catalog = Arc::new(InMemoryCatalog::with_records(vec![CatalogRecord::new("abc", "Al Fakher", "Mint")]));
    let objects = Arc::new(InMemoryObjectStore::default());
    let pipe = Arc::new(pipeline(&base, true, catalog.clone(), objects.clone()));

    let stats = orchestrator(catalog.clone(), pipe.clone(), 5).run(&RecordQuery::default()).await;
    assert_eq!((stats.total, stats.success, stats.failed, stats.no_image), (1, 1, 0, 0));

    {
        let stored = objects.objects.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "by-brand/al-fakher/mint.webp");
        assert_eq!(stored[0].2, "image/webp");
        assert_eq!(&stored[0].1[8..12], b"WEBP");
    }
    assert_eq!(
        catalog.image_of("abc").as_deref(),
        Some("https://cdn.test/public/by-brand/al-fakher/mint.webp")
    );

    // Records with an image are no longer candidates
    let again = orchestrator(catalog.clone(), pipe, 5).run(&RecordQuery::default()).await;
    assert_eq!(again.total, 0);
}

#[tokio::test]
async fn test_empty_image_url_is_backfilled() {
    let base = provider_server().await;
    let mut blank = CatalogRecord::new("blank", "Darkside", "Bananapapa");
    blank.image_url = Some(String::new());
    let mut done = CatalogRecord::new("done", "Darkside", "Supernova");
    done.image_url = Some("https://cdn.test/existing.webp".into());
    let catalog = Arc::new(InMemoryCatalog::with_records(vec![blank, done]));
    let objects = Arc::new(InMemoryObjectStore::default());
    let pipe = Arc::new(pipeline(&base, true, catalog.clone(), objects.clone()));

    let stats = orchestrator(catalog.clone(), pipe, 5).run(&RecordQuery::default()).await;
    assert_eq!((stats.total, stats.success), (1, 1));
    assert_eq!(
        catalog.image_of("blank").as_deref(),
        Some("https://cdn.test/public/by-brand/darkside/bananapapa.webp")
    );
    assert_eq!(catalog.image_of("done").as_deref(), Some("https://cdn.test/existing.webp"));
}

#[tokio::test]
async fn test_download_404_counts_as_failed() {
    let base = provider_server().await;
    let catalog = Arc::new(InMemoryCatalog::with_records(vec![CatalogRecord::new("1", "Adalya", "Missing Lemon")]));
    let objects = Arc::new(InMemoryObjectStore::default());
    let pipe = pipeline(&base, true, catalog.clone(), objects.clone());

    assert_eq!(pipe.process(&CatalogRecord::new("1", "Adalya", "Missing Lemon")).await, RecordOutcome::FetchFailed);

    let stats = orchestrator(catalog.clone(), Arc::new(pipe), 5).run(&RecordQuery::default()).await;
    assert_eq!((stats.failed, stats.no_image, stats.success), (1, 0, 0));
    assert!(stats.errors.is_empty());
    assert!(objects.objects.lock().unwrap().is_empty());
    assert_eq!(catalog.image_of("1"), None);
}

#[tokio::test]
async fn test_no_results_or_no_credentials_report_no_image() {
    let base = provider_server().await;
    let catalog = Arc::new(InMemoryCatalog::default());
    let objects = Arc::new(InMemoryObjectStore::default());

    let unconfigured = pipeline(&base, false, catalog.clone(), objects.clone());
    assert_eq!(unconfigured.process(&CatalogRecord::new("1", "Al Fakher", "Mint")).await, RecordOutcome::NoImage);

    let configured = pipeline(&base, true, catalog, objects);
    assert_eq!(configured.process(&CatalogRecord::new("2", "Unknown", "Flavor")).await, RecordOutcome::NoImage);
}

#[tokio::test]
async fn test_upload_and_update_failures_count_as_upload_failed() {
    let base = provider_server().await;
    let record = CatalogRecord::new("9", "Darkside", "Supernova");

    let catalog = Arc::new(InMemoryCatalog::with_records(vec![record.clone()]));
    let objects = Arc::new(InMemoryObjectStore { fail_uploads: true, ..Default::default() });
    let pipe = pipeline(&base, true, catalog.clone(), objects);
    assert_eq!(pipe.process(&record).await, RecordOutcome::UploadFailed);
    assert_eq!(catalog.image_of("9"), None);

    let catalog = Arc::new(InMemoryCatalog { fail_updates: true, ..InMemoryCatalog::with_records(vec![record.clone()]) });
    let objects = Arc::new(InMemoryObjectStore::default());
    let pipe = pipeline(&base, true, catalog.clone(), objects.clone());
    assert_eq!(pipe.process(&record).await, RecordOutcome::UploadFailed);
    // the object stays; nothing is rolled back
    assert_eq!(objects.objects.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_mixed_run_counters_add_up() {
    let base = provider_server().await;
    let catalog = Arc::new(InMemoryCatalog::with_records(vec![
        CatalogRecord::new("1", "Al Fakher", "Mint"),
        CatalogRecord::new("2", "Adalya", "Missing Lemon"),
        CatalogRecord::new("3", "Unknown", "Thing"),
        CatalogRecord::new("4", "Musthave", "Pinkman"),
        CatalogRecord::new("5", "Darkside", "Missing Cola"),
        CatalogRecord::new("6", "Element", "Unknown Water"),
        CatalogRecord::new("7", "Tangiers", "Cane Mint"),
    ]));
    let objects = Arc::new(InMemoryObjectStore::default());
    let pipe = Arc::new(pipeline(&base, true, catalog.clone(), objects));

    let stats = orchestrator(catalog, pipe, 3).run(&RecordQuery::default()).await;
    assert_eq!(stats.total, 7);
    assert_eq!(stats.success, 3);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.no_image, 2);
    assert_eq!(stats.success + stats.failed + stats.no_image, stats.total);
}

#[derive(Default)]
struct CountingPauser {
    pauses: AtomicUsize,
}

#[async_trait]
impl Pauser for CountingPauser {
    async fn pause(&self, _duration: Duration) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records start/end events and in-flight concurrency; panics on the record named "boom".
#[derive(Default)]
struct RecordingProcessor {
    events: Mutex<Vec<(String, bool)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl RecordProcessor for RecordingProcessor {
    async fn process(&self, record: &CatalogRecord) -> RecordOutcome {
        self.events.lock().unwrap().push((record.id.clone(), true));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push((record.id.clone(), false));
        if record.name == "boom" {
            panic!("provider returned garbage");
        }
        RecordOutcome::Done { public_url: format!("https://cdn.test/{}", record.id) }
    }
}

#[tokio::test]
async fn test_twelve_records_run_in_three_sequential_batches() {
    let records: Vec<CatalogRecord> = (0..12).map(|i| CatalogRecord::new(i.to_string(), "Brand", format!("Flavor {}", i))).collect();
    let catalog = Arc::new(InMemoryCatalog::with_records(records));
    let processor = Arc::new(RecordingProcessor::default());
    let pauser = Arc::new(CountingPauser::default());

    let stats = orchestrator(catalog, processor.clone(), 5)
        .with_pauser(pauser.clone())
        .run(&RecordQuery::default())
        .await;

    assert_eq!(stats.total, 12);
    assert_eq!(stats.success, 12);
    assert_eq!(pauser.pauses.load(Ordering::SeqCst), 2);
    assert_eq!(processor.max_in_flight.load(Ordering::SeqCst), 5);

    // every record of a batch ends before any record of the next batch starts
    let events = processor.events.lock().unwrap();
    let position = |id: usize, start: bool| events.iter().position(|(e, s)| *e == id.to_string() && *s == start).unwrap();
    for (prev, next) in [(0..5, 5..10), (5..10, 10..12)] {
        let last_end = prev.map(|i| position(i, false)).max().unwrap();
        let first_start = next.map(|i| position(i, true)).min().unwrap();
        assert!(last_end < first_start);
    }
}

#[tokio::test]
async fn test_panicking_record_is_isolated() {
    let catalog = Arc::new(InMemoryCatalog::with_records(vec![
        CatalogRecord::new("1", "Brand", "ok"),
        CatalogRecord::new("2", "Brand", "boom"),
        CatalogRecord::new("3", "Brand", "fine"),
    ]));
    let processor = Arc::new(RecordingProcessor::default());
    let pauser = Arc::new(CountingPauser::default());

    let stats = orchestrator(catalog, processor, 5).with_pauser(pauser.clone()).run(&RecordQuery::default()).await;

    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.errors, vec!["Error in Brand - boom: provider returned garbage".to_string()]);
    assert_eq!(pauser.pauses.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_query_filters_are_forwarded() {
    let mut with_image = CatalogRecord::new("3", "Al Fakher", "Grape");
    with_image.image_url = Some("https://cdn.test/old.webp".into());
    let catalog = Arc::new(InMemoryCatalog::with_records(vec![
        CatalogRecord::new("1", "Al Fakher", "Mint"),
        CatalogRecord::new("2", "Adalya", "Love 66"),
        with_image,
    ]));
    let processor = Arc::new(RecordingProcessor::default());

    let query = RecordQuery { brand: Some("Al Fakher".into()), limit: None, only_missing_image: true };
    let stats = orchestrator(catalog.clone(), processor.clone(), 5).run(&query).await;
    assert_eq!(stats.total, 1);

    let query = RecordQuery { brand: Some("Al Fakher".into()), limit: None, only_missing_image: false };
    let stats = orchestrator(catalog.clone(), processor.clone(), 5).run(&query).await;
    assert_eq!(stats.total, 2);

    let query = RecordQuery { brand: None, limit: Some(1), only_missing_image: true };
    let stats = orchestrator(catalog, processor, 5).run(&query).await;
    assert_eq!(stats.total, 1);
}
