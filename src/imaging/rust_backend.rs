//! `image`-crate backend.
//!
//! Dimensions come from the format header via
//! [`ImageReader::into_dimensions`](image::ImageReader::into_dimensions), so a
//! 40-megapixel portrait is measured without allocating its pixel buffer.

use super::backend::{BackendError, Dimensions, ImageBackend};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .into_dimensions()
            .map_err(|e| BackendError::DecodeFailed(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn sniff_media_type(&self, bytes: &[u8]) -> Option<&'static str> {
        let format = image::guess_format(bytes).ok()?;
        Some(match format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Avif => "image/avif",
            _ => return None,
        })
    }
}
