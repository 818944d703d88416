//! Batch import: fill a card's photo slots from a directory.
//!
//! Supported images directly inside the directory (no recursion, hidden
//! files skipped) are taken in file-name order, hero first. Only the first
//! seven are used; the rest are reported as ignored. Each file is normalized
//! independently on the rayon pool, and a file that fails to normalize
//! leaves its slot untouched.

use crate::imaging::{BackendError, ImageBackend, NormalizeConfig, is_supported_extension, normalize_file};
use crate::types::{CardState, SLOT_COUNT};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Outcome of one imported file.
#[derive(Debug)]
pub struct ImportEntry {
    /// Slot the file was assigned to (0 = hero).
    pub slot: usize,
    pub path: PathBuf,
    /// Normalized data URI, or why the file could not be used.
    pub result: Result<String, BackendError>,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub entries: Vec<ImportEntry>,
    /// Supported images beyond the seventh.
    pub ignored: Vec<PathBuf>,
}

impl ImportReport {
    pub fn loaded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.loaded()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Supported images directly inside `dir`, sorted by file name.
pub fn collect_photos(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    if !dir.is_dir() {
        return Err(ImportError::NotADirectory(dir.to_path_buf()));
    }
    let mut photos = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && !is_hidden(path) && is_supported_extension(path) {
            photos.push(path.to_path_buf());
        }
    }
    Ok(photos)
}

/// Normalize up to seven photos from `dir` in parallel.
pub fn import_directory(
    backend: &impl ImageBackend,
    dir: &Path,
    config: &NormalizeConfig,
) -> Result<ImportReport, ImportError> {
    let mut photos = collect_photos(dir)?;
    let ignored = photos.split_off(photos.len().min(SLOT_COUNT));

    let entries = photos
        .into_par_iter()
        .enumerate()
        .map(|(slot, path)| {
            let result = normalize_file(backend, &path, config);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "could not import photo");
            }
            ImportEntry { slot, path, result }
        })
        .collect();

    Ok(ImportReport { entries, ignored })
}

/// Write every successful import into its slot. Returns how many slots
/// changed.
pub fn apply_import(state: &mut CardState, report: &ImportReport) -> usize {
    let mut applied = 0;
    for entry in &report.entries {
        if let (Ok(uri), Some(photo)) = (&entry.result, state.photos.get_mut(entry.slot)) {
            photo.set_source(Some(uri.clone()));
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::MockBackend;
    use crate::types::Photo;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"bytes").unwrap();
    }

    #[test]
    fn collects_supported_files_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", ".hidden.jpg", "c.webp"] {
            touch(tmp.path(), name);
        }
        fs::create_dir(tmp.path().join("nested")).unwrap();
        touch(&tmp.path().join("nested"), "0.jpg");

        let names: Vec<_> = collect_photos(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg", "c.webp"]);
    }

    #[test]
    fn missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = collect_photos(&tmp.path().join("nope"));
        assert!(matches!(result, Err(ImportError::NotADirectory(_))));
    }

    #[test]
    fn only_first_seven_are_imported() {
        let tmp = TempDir::new().unwrap();
        for i in 0..9 {
            touch(tmp.path(), &format!("{i:02}.jpg"));
        }
        let backend = MockBackend::with_dimensions(1000, 500);
        let report = import_directory(&backend, tmp.path(), &NormalizeConfig::default()).unwrap();

        assert_eq!(report.entries.len(), SLOT_COUNT);
        assert_eq!(report.ignored.len(), 2);
        assert_eq!(report.loaded(), SLOT_COUNT);
        for (i, entry) in report.entries.iter().enumerate() {
            assert_eq!(entry.slot, i);
            assert!(entry.path.ends_with(format!("{i:02}.jpg")));
        }
        // identify + compress per file
        assert_eq!(backend.get_operations().len(), SLOT_COUNT * 2);
    }

    #[test]
    fn failures_leave_slots_untouched() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("1-good.png"), png_bytes(900, 300)).unwrap();
        fs::write(tmp.path().join("2-bad.jpg"), b"not really a jpeg").unwrap();

        let report =
            import_directory(&RustBackend::new(), tmp.path(), &NormalizeConfig::default()).unwrap();
        assert_eq!(report.loaded(), 1);
        assert_eq!(report.failed(), 1);

        let mut state = CardState::default();
        state.photos.page_two[0] = Photo::with_source("https://example.com/keep.jpg");
        let applied = apply_import(&mut state, &report);

        assert_eq!(applied, 1);
        assert!(state.photos.hero.is_inline());
        assert_eq!(state.photos.page_two[0].src(), Some("https://example.com/keep.jpg"));
    }

    #[test]
    fn applied_photos_start_untransformed() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.jpg");
        let backend = MockBackend::with_dimensions(10, 10);
        let report = import_directory(&backend, tmp.path(), &NormalizeConfig::default()).unwrap();

        let mut state = CardState::default();
        state.photos.hero = Photo::with_source("https://x/y.jpg").with_transform(5.0, 5.0, 3.0);
        apply_import(&mut state, &report);
        assert_eq!(state.photos.hero.src(), Some("data:image/jpeg;base64,anBlZw=="));
        assert_eq!(state.photos.hero.zoom(), 1.0);
        assert_eq!(state.photos.hero.x, 0.0);
    }

    #[test]
    fn empty_directory_imports_nothing() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let report = import_directory(&backend, tmp.path(), &NormalizeConfig::default()).unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(apply_import(&mut CardState::default(), &report), 0);
    }
}
