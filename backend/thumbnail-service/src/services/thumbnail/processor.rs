//! Thumbnail processor - generates thumbnails from original images
//!
//! Decodes with the format named by the source extension, shrinks the image
//! to fit the bounding box while keeping its aspect ratio, and encodes it in
//! the target format.
//!
//! Uses `spawn_blocking` for CPU-intensive operations to avoid blocking the async runtime.

use crate::error::{AppError, Result};
use crate::models::{ImageFormat, ThumbnailSpec};
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use tracing::debug;

/// JPEG quality used for `jpg`/`jpeg` thumbnails
const JPEG_QUALITY: u8 = 85;

/// Result of thumbnail generation
#[derive(Debug, Clone)]
pub struct ThumbnailResult {
    /// Encoded thumbnail
    pub data: Bytes,
    /// Width of the thumbnail
    pub width: u32,
    /// Height of the thumbnail
    pub height: u32,
}

/// Stateless decode → resize → encode pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThumbnailProcessor;

impl ThumbnailProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Generate a thumbnail from raw bytes (blocking version)
    ///
    /// **Note:** This method performs CPU-intensive operations and should not be called
    /// directly from async code. Use `generate_async` instead.
    pub fn generate(
        &self,
        original_data: &[u8],
        source_format: ImageFormat,
        spec: &ThumbnailSpec,
    ) -> Result<ThumbnailResult> {
        let img = image::load_from_memory_with_format(original_data, source_format.codec())
            .map_err(|e| AppError::Decode(format!("{}: {e}", spec.identity)))?;

        let (orig_w, orig_h) = img.dimensions();
        debug!(
            original_width = orig_w,
            original_height = orig_h,
            "Processing image for thumbnail"
        );

        let (new_w, new_h) = fit_within(orig_w, orig_h, spec.max_width, spec.max_height);

        // Never upscale
        let thumb = if (new_w, new_h) == (orig_w, orig_h) {
            debug!("Image already within bounding box, encoding as-is");
            img
        } else {
            img.resize_exact(new_w, new_h, FilterType::Triangle)
        };

        let data = encode(&thumb, spec.target_format)
            .map_err(|e| AppError::Encode(format!("{}: {e}", spec.cache_key())))?;

        debug!(
            width = new_w,
            height = new_h,
            size = data.len(),
            "Thumbnail generated"
        );

        Ok(ThumbnailResult {
            data,
            width: new_w,
            height: new_h,
        })
    }

    /// Generate a thumbnail on the blocking thread pool.
    pub async fn generate_async(
        self,
        original_data: Bytes,
        source_format: ImageFormat,
        spec: ThumbnailSpec,
    ) -> Result<ThumbnailResult> {
        tokio::task::spawn_blocking(move || self.generate(&original_data, source_format, &spec))
            .await?
    }
}

/// Largest size with the source's aspect ratio that fits in
/// `max_w` x `max_h`. Images already inside the box keep their size; the
/// constraining side of a larger image lands exactly on the bound. A zero
/// bound is treated as 1.
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let (max_w, max_h) = (max_w.max(1), max_h.max(1));
    if width <= max_w && height <= max_h {
        return (width, height);
    }

    let (w, h, mw, mh) = (width as u64, height as u64, max_w as u64, max_h as u64);

    // Compare w/mw against h/mh without floating point.
    if w * mh >= h * mw {
        let scaled_h = (h * mw + w / 2) / w;
        (max_w, (scaled_h as u32).clamp(1, max_h))
    } else {
        let scaled_w = (w * mh + h / 2) / h;
        ((scaled_w as u32).clamp(1, max_w), max_h)
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> image::ImageResult<Bytes> {
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);

    match format {
        ImageFormat::Png => img.write_to(&mut cursor, ImageOutputFormat::Png)?,
        ImageFormat::Jpg | ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY))?,
        ImageFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut cursor, ImageOutputFormat::Gif)?,
    }

    Ok(Bytes::from(buf))
}
