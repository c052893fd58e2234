pub mod s3;
pub mod supabase;
pub mod uploader;

pub use s3::*;
pub use supabase::*;
pub use uploader::*;

use async_trait::async_trait;

use crate::models::Result;

/// Binary asset hosting with overwrite-on-upload semantics.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `data` at `path`, replacing whatever was there.
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Publicly fetchable URL for an uploaded path.
    fn public_url(&self, path: &str) -> Result<String>;
}

const PATH_ROOT: &str = "by-brand";
const EMPTY_SEGMENT: &str = "untitled";

/// Lowercases, keeps only `[a-z0-9 -]`, collapses whitespace and turns spaces into hyphens.
pub fn sanitize_segment(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == ' ')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Deterministic storage path for a record's image: `by-brand/{brand}/{name}.{ext}`.
pub fn object_path(brand: &str, name: &str, extension: &str) -> String {
    let segment = |s: &str| {
        let clean = sanitize_segment(s);
        if clean.is_empty() { EMPTY_SEGMENT.to_string() } else { clean }
    };
    format!("{}/{}/{}.{}", PATH_ROOT, segment(brand), segment(name), extension)
}
