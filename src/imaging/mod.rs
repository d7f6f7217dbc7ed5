//! Image inspection for uploaded portraits, in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` (header only, no full decode) |
//! | **Sniff type** | `image::guess_format` on the leading bytes |
//!
//! The module is split into:
//! - **Backend**: [`ImageBackend`] trait, [`Dimensions`], [`BackendError`]
//! - **RustBackend**: the `image`-crate implementation used in production

pub mod backend;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use rust_backend::RustBackend;
