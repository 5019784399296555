//! Bounded-box thumbnails built with the `image` crate.
//!
//! Decoding, resizing and encoding are CPU bound and run on the blocking pool.

use super::traits::{Thumbnail, ThumbnailGenerator};
use crate::domain::{image::errors::PipelineError, storage::config::ThumbnailFormat};
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, imageops::FilterType};
use std::io::Cursor;
use tracing::{debug, warn};

pub const THUMBNAIL_BOX: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailer {
    max_dimension: u32,
    format: ThumbnailFormat,
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self::new(ThumbnailFormat::default())
    }
}

impl ImageThumbnailer {
    pub fn new(format: ThumbnailFormat) -> Self {
        Self {
            max_dimension: THUMBNAIL_BOX,
            format,
        }
    }

    /// Blocking half of [`ThumbnailGenerator::generate`].
    pub fn render(&self, source: &[u8], file_name: &str) -> Result<Thumbnail, PipelineError> {
        let unsupported = |reason: String| PipelineError::UnsupportedImage {
            file_name: file_name.to_string(),
            reason,
        };

        let source_format = image::guess_format(source).map_err(|e| unsupported(e.to_string()))?;
        let img = image::load_from_memory_with_format(source, source_format)
            .map_err(|e| unsupported(e.to_string()))?;

        let (orig_w, orig_h) = img.dimensions();
        let (width, height) = fit_within(orig_w, orig_h, self.max_dimension);
        let resized = if (width, height) == (orig_w, orig_h) {
            debug!(width, height, "Image already fits the thumbnail box");
            img
        } else {
            img.resize_exact(width, height, FilterType::Triangle)
        };

        let (bytes, format) = match self.format {
            ThumbnailFormat::Png => (encode(&resized, ImageFormat::Png), ImageFormat::Png),
            ThumbnailFormat::Source => match encode_as_source(&resized, source_format) {
                Ok(bytes) => (Ok(bytes), source_format),
                Err(reason) => {
                    warn!(
                        file_name,
                        format = ?source_format,
                        %reason,
                        "Cannot re-encode in source format, using PNG"
                    );
                    (encode(&resized, ImageFormat::Png), ImageFormat::Png)
                }
            },
        };
        let bytes = bytes.map_err(unsupported)?;

        debug!(
            file_name,
            original_width = orig_w,
            original_height = orig_h,
            width,
            height,
            size = bytes.len(),
            "Thumbnail generated"
        );

        Ok(Thumbnail {
            bytes,
            width,
            height,
            content_type: format.to_mime_type(),
        })
    }
}

#[async_trait]
impl ThumbnailGenerator for ImageThumbnailer {
    async fn generate(&self, source: Bytes, file_name: &str) -> Result<Thumbnail, PipelineError> {
        let thumbnailer = *self;
        let file_name_owned = file_name.to_string();
        tokio::task::spawn_blocking(move || thumbnailer.render(&source, &file_name_owned))
            .await
            .map_err(|e| PipelineError::Internal(format!("Thumbnail task panicked: {}", e)))?
    }
}

/// Largest size with the same aspect ratio that fits a `max`×`max` box.
/// Never upscales and never returns a zero side.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width.max(1), height.max(1));
    }

    let scale = |side: u32, longest: u32| -> u32 {
        let scaled = (u64::from(side) * u64::from(max) + u64::from(longest) / 2) / u64::from(longest);
        (scaled as u32).max(1)
    };

    if width >= height {
        (max, scale(height, width))
    } else {
        (scale(width, height), max)
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Bytes, String> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format)
        .map_err(|e| format!("{:?} encoding failed: {}", format, e))?;
    Ok(Bytes::from(buffer.into_inner()))
}

fn encode_as_source(img: &DynamicImage, format: ImageFormat) -> Result<Bytes, String> {
    if !format.writing_enabled() {
        return Err(format!("no {:?} encoder available", format));
    }
    match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => encode(&DynamicImage::ImageRgb8(img.to_rgb8()), format),
        _ => encode(img, format),
    }
}
