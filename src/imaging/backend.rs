//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the normalizer
//! needs: identify and compress. Both take the raw upload bytes, since
//! uploads arrive from a file picker or a directory import rather than
//! a stable path.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::CompressParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared across rayon workers during a
/// batch import.
pub trait ImageBackend: Sync {
    /// Decode just enough of `data` to report its pixel size.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode `data`, resize to the requested size, and re-encode as JPEG.
    fn compress(&self, data: &[u8], params: &CompressParams) -> Result<Vec<u8>, BackendError>;
}
