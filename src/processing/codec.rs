use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::models::{BackfillError, Result};

/// Re-encodes arbitrary downloaded images into bounded, lossy WebP.
#[derive(Debug, Clone, Copy)]
pub struct ImageOptimizer {
    max_dimension: u32,
    quality: u8,
}

#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ImageOptimizer {
    pub const CONTENT_TYPE: &'static str = "image/webp";
    pub const EXTENSION: &'static str = "webp";

    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            quality: quality.min(100),
        }
    }

    pub fn optimize(&self, raw: &[u8]) -> Result<OptimizedImage> {
        let img = image::load_from_memory(raw)
            .map_err(|e| BackfillError::Codec(format!("Failed to load image: {}", e)))?;

        let original = (img.width(), img.height());
        let rgb = flatten_onto_white(&img);
        let (width, height) = target_dimensions(original, self.max_dimension);

        let resized = if (width, height) != original {
            tracing::debug!(
                original_width = original.0,
                original_height = original.1,
                target_width = width,
                target_height = height,
                "Resizing image"
            );
            image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
        } else {
            rgb
        };

        let encoded = webp::Encoder::from_rgb(resized.as_raw(), width, height)
            .encode_simple(false, self.quality as f32)
            .map_err(|e| BackfillError::Codec(format!("WebP encoding failed: {:?}", e)))?;

        Ok(OptimizedImage {
            data: encoded.to_vec(),
            width,
            height,
        })
    }
}

/// Composites any alpha channel over white and drops it; opaque images are just converted.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
    }
    out
}

/// Largest size that fits in a `max_dim` square with the same aspect ratio. Never upscales.
pub fn target_dimensions(original: (u32, u32), max_dim: u32) -> (u32, u32) {
    let (ow, oh) = original;
    if ow <= max_dim && oh <= max_dim {
        return original;
    }
    if ow >= oh {
        let ratio = max_dim as f64 / ow as f64;
        (max_dim, ((oh as f64 * ratio).round() as u32).max(1))
    } else {
        let ratio = max_dim as f64 / oh as f64;
        (((ow as f64 * ratio).round() as u32).max(1), max_dim)
    }
}
