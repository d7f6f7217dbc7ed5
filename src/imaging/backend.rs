//! Image inspection backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines what the intake needs from an image
//! library: pixel dimensions and a content-sniffed media type, both read from
//! in-memory bytes. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image inspection backends.
///
/// `Send + Sync` so one backend can be shared by measurements running on the
/// blocking pool.
pub trait ImageBackend: Send + Sync {
    /// Read pixel dimensions from encoded image bytes.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Media type detected from content, e.g. `image/png`. `None` if unknown.
    fn sniff_media_type(&self, bytes: &[u8]) -> Option<&'static str>;
}
