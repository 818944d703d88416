//! Image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders), format sniffed from bytes |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |
//!
//! Alpha is flattened onto white before encoding, the same result a canvas
//! `toDataURL("image/jpeg")` gives for transparent PNGs.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::CompressParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has an extension from [`supported_input_extensions`].
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
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

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(BackendError::Io)
}

fn load_image(data: &[u8]) -> Result<DynamicImage, BackendError> {
    reader(data)?
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Flatten any alpha channel onto a white background.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(data)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn compress(&self, data: &[u8], params: &CompressParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(data)?;
        let resized = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        let rgb = flatten_to_rgb(resized);

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, params.quality.value())
            .encode_image(&rgb)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use image::{ImageBuffer, Rgba};

    fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, alpha])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn identify_reads_dimensions() {
        let data = png_bytes(120, 80, 255);
        let dims = RustBackend::new().identify(&data).unwrap();
        assert_eq!(dims, Dimensions { width: 120, height: 80 });
    }

    #[test]
    fn identify_rejects_garbage() {
        let result = RustBackend::new().identify(b"definitely not an image");
        assert!(result.is_err());
    }

    #[test]
    fn compress_outputs_jpeg_at_requested_size() {
        let data = png_bytes(200, 100, 255);
        let out = RustBackend::new()
            .compress(
                &data,
                &CompressParams {
                    width: 100,
                    height: 50,
                    quality: Quality::new(50),
                },
            )
            .unwrap();

        assert_eq!(&out[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn compress_flattens_transparency_to_white() {
        let data = png_bytes(16, 16, 0);
        let out = RustBackend::new()
            .compress(
                &data,
                &CompressParams {
                    width: 16,
                    height: 16,
                    quality: Quality::new(100),
                },
            )
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();
        let px = decoded.get_pixel(8, 8);
        assert!(px.0.iter().all(|&c| c > 240), "expected near-white, got {px:?}");
    }

    #[test]
    fn compress_rejects_garbage() {
        let result = RustBackend::new().compress(
            b"nope",
            &CompressParams {
                width: 10,
                height: 10,
                quality: Quality::default(),
            },
        );
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn supported_extensions_include_common_formats() {
        let exts = supported_input_extensions();
        assert!(exts.contains(&"jpg"));
        assert!(exts.contains(&"png"));
        assert!(is_supported_extension(Path::new("a/B.JPG")));
        assert!(!is_supported_extension(Path::new("notes.txt")));
        assert!(!is_supported_extension(Path::new("no_extension")));
    }
}
