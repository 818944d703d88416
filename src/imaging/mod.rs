//! Upload normalizer: any supported photo in, bounded JPEG data URI out.
//!
//! Uploaded photos are embedded straight into share payloads and downloaded
//! cards, so every upload is shrunk and re-encoded before it lands in a slot.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | `image::imageops::resize` with `Lanczos3` |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` at a fixed quality |
//! | **Inline** | `base64` → `data:image/jpeg;base64,...` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::fit_within;
pub use operations::{NormalizeConfig, normalize_bytes, normalize_file, normalize_or_unset};
pub use params::{CompressParams, Quality};
pub use rust_backend::{RustBackend, is_supported_extension, supported_input_extensions};
