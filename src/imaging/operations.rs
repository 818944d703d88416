//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::fit_within;
use super::params::{CompressParams, Quality};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;
use tracing::warn;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Prefix of every normalized image.
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Configuration for upload normalization.
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Ceiling for the longer edge, in pixels.
    pub max_dimension: u32,
    pub quality: Quality,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_dimension: 600,
            quality: Quality::default(),
        }
    }
}

/// Plan a compress operation without executing it.
pub fn plan_compress(source: Dimensions, config: &NormalizeConfig) -> CompressParams {
    let (width, height) = fit_within((source.width, source.height), config.max_dimension);
    CompressParams {
        width,
        height,
        quality: config.quality,
    }
}

/// Shrink and re-encode an uploaded image into an inline JPEG data URI.
pub fn normalize_bytes(
    backend: &impl ImageBackend,
    data: &[u8],
    config: &NormalizeConfig,
) -> Result<String> {
    let dims = backend.identify(data)?;
    let params = plan_compress(dims, config);
    let jpeg = backend.compress(data, &params)?;
    Ok(format!("{JPEG_DATA_URI_PREFIX}{}", STANDARD.encode(jpeg)))
}

/// [`normalize_bytes`] for an image on disk.
pub fn normalize_file(
    backend: &impl ImageBackend,
    path: &Path,
    config: &NormalizeConfig,
) -> Result<String> {
    let data = std::fs::read(path)?;
    normalize_bytes(backend, &data, config)
}

/// Normalize, or log why not and leave the slot unset.
pub fn normalize_or_unset(
    backend: &impl ImageBackend,
    data: &[u8],
    config: &NormalizeConfig,
) -> Option<String> {
    normalize_bytes(backend, data, config)
        .inspect_err(|e| warn!(error = %e, "image compression failed, leaving slot empty"))
        .ok()
}
