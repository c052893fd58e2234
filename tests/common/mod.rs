#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

use catalog_image_backfill::{BackfillError, CatalogRecord, CatalogStore, ObjectStore, RecordQuery, Result};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

/// Binds first so handlers can be built knowing their own base URL.
pub async fn bind() -> (tokio::net::TcpListener, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

pub fn spawn_on(listener: tokio::net::TcpListener, app: Router) {
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([30, 120, 60, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png).unwrap();
    buf
}

#[derive(Default)]
pub struct InMemoryCatalog {
    pub records: Mutex<Vec<CatalogRecord>>,
    pub fail_updates: bool,
}

impl InMemoryCatalog {
    pub fn with_records(records: Vec<CatalogRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            fail_updates: false,
        }
    }

    pub fn image_of(&self, id: &str) -> Option<String> {
        self.records.lock().unwrap().iter().find(|r| r.id == id).and_then(|r| r.image_url.clone())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<CatalogRecord>> {
        let records = self.records.lock().unwrap();
        let matching = records
            .iter()
            .filter(|r| !query.only_missing_image || r.lacks_image())
            .filter(|r| query.brand.as_deref().map_or(true, |b| r.brand == b))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn set_image_url(&self, id: &str, image_url: &str) -> Result<()> {
        if self.fail_updates {
            return Err(BackfillError::Catalog("update rejected".into()));
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BackfillError::Catalog(format!("no record {}", id)))?;
        record.image_url = Some(image_url.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    pub objects: Mutex<Vec<(String, Vec<u8>, String)>>,
    pub fail_uploads: bool,
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        if self.fail_uploads {
            return Err(BackfillError::Upload("bucket unavailable".into()));
        }
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|(p, _, _)| p != path);
        objects.push((path.to_string(), data, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Ok(format!("https://cdn.test/public/{}", path))
    }
}
