//! Application configuration.
//!
//! Handles loading, validating, and merging `love-diary.toml`. Stock defaults
//! are overridden by the user file found in the config directory (the current
//! directory unless `--config-dir` says otherwise).
//!
//! ## Configuration Options
//!
//! ```toml
//! # Every key is optional; these are the defaults
//!
//! [share]
//! base_url = "https://love-diary.example.com/"
//! channel = "compressed"        # compressed | legacy | cloud
//! legacy_payload_limit = 8000   # JSON byte budget for legacy links
//!
//! [images]
//! max_dimension = 600           # Longer-edge ceiling for uploads
//! quality = 50                  # JPEG quality (1-100)
//!
//! [store]
//! dir = "cards"                 # Where `share --channel cloud` saves cards
//!
//! [card]
//! lang = "en"
//! filename = "love-diary-card.html"
//! title_suffix = "Our Memories"
//! open_button = "Tap to open our memories ›"
//! salutation = "To:"
//!
//! [theme]
//! primary = "#f43f5e"
//! background = "#fff1f2"
//! accent = "#ffe4e6"
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::codec::LEGACY_PAYLOAD_LIMIT;
use crate::imaging::{NormalizeConfig, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "love-diary.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `love-diary.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Share link settings.
    pub share: ShareConfig,
    /// Upload normalization settings.
    pub images: ImagesConfig,
    /// Card store settings.
    pub store: StoreConfig,
    /// Downloaded card document settings.
    pub card: CardPageConfig,
    /// Colours of the downloaded card.
    pub theme: ThemeConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be non-zero".into(),
            ));
        }
        if self.share.legacy_payload_limit == 0 {
            return Err(ConfigError::Validation(
                "share.legacy_payload_limit must be non-zero".into(),
            ));
        }
        if self.share.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "share.base_url must not be empty".into(),
            ));
        }
        let filename = &self.card.filename;
        if !filename.ends_with(".html") || filename.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "card.filename must be a bare file name ending in .html".into(),
            ));
        }
        Ok(())
    }
}

/// Which link a plain `share` produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareChannel {
    #[default]
    Compressed,
    Legacy,
    Cloud,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShareConfig {
    /// Address the card viewer is served from. Query and fragment are ignored.
    pub base_url: String,
    pub channel: ShareChannel,
    /// JSON byte budget for legacy links.
    pub legacy_payload_limit: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "https://love-diary.example.com/".to_string(),
            channel: ShareChannel::default(),
            legacy_payload_limit: LEGACY_PAYLOAD_LIMIT,
        }
    }
}

/// Upload normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Longer-edge ceiling in pixels.
    pub max_dimension: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_dimension: 600,
            quality: 50,
        }
    }
}

impl ImagesConfig {
    pub fn normalize_config(&self) -> NormalizeConfig {
        NormalizeConfig {
            max_dimension: self.max_dimension,
            quality: Quality::new(self.quality),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Card directory, relative to the config directory unless absolute.
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cards"),
        }
    }
}

impl StoreConfig {
    pub fn resolve(&self, config_dir: &Path) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            config_dir.join(&self.dir)
        }
    }
}

/// Labels and file name of the downloaded card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardPageConfig {
    /// `lang` attribute of the document.
    pub lang: String,
    /// Default download file name.
    pub filename: String,
    /// Appended to the cover title in the document `<title>`.
    pub title_suffix: String,
    /// Button text on the cover page.
    pub open_button: String,
    /// Precedes the recipient name on the letter page.
    pub salutation: String,
}

impl Default for CardPageConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            filename: "love-diary-card.html".to_string(),
            title_suffix: "Our Memories".to_string(),
            open_button: "Tap to open our memories ›".to_string(),
            salutation: "To:".to_string(),
        }
    }
}

/// Card colours, emitted as CSS custom properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Cover background, titles, active dot.
    pub primary: String,
    /// Page background and nav buttons.
    pub background: String,
    /// Photo frame and card border.
    pub accent: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary: "#f43f5e".to_string(),
            background: "#fff1f2".to_string(),
            accent: "#ffe4e6".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `love-diary.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `love-diary.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(load_raw_config(dir)?)
}

/// Returns a fully-commented stock `love-diary.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Love Diary Configuration
#
# Every key is optional; the values below are what you get without this file.
# Misspelled or unknown keys are rejected when the file is loaded.

# ---------------------------------------------------------------------------
# Share links
# ---------------------------------------------------------------------------
[share]
# Address the card viewer is served from.
base_url = "https://love-diary.example.com/"

# Link produced by a plain `share`: "compressed", "legacy", or "cloud".
# Cloud links save the card to the store and carry only its id.
channel = "compressed"

# Legacy links are refused when the card JSON exceeds this many bytes.
legacy_payload_limit = 8000

# ---------------------------------------------------------------------------
# Uploaded photos
# ---------------------------------------------------------------------------
[images]
# Longer-edge ceiling in pixels. Larger photos are scaled down, never up.
max_dimension = 600

# JPEG quality (1 = worst, 100 = best).
quality = 50

# ---------------------------------------------------------------------------
# Card store
# ---------------------------------------------------------------------------
[store]
# Directory holding saved cards, relative to this file.
dir = "cards"

# ---------------------------------------------------------------------------
# Downloaded card
# ---------------------------------------------------------------------------
[card]
lang = "en"
filename = "love-diary-card.html"
title_suffix = "Our Memories"
open_button = "Tap to open our memories ›"
salutation = "To:"

# ---------------------------------------------------------------------------
# Colors
# ---------------------------------------------------------------------------
[theme]
primary = "#f43f5e"
background = "#fff1f2"
accent = "#ffe4e6"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers for `import`.
# Left unset, import uses every available core.
# max_processes = 4
"##
}

/// Generate CSS custom properties from theme config.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
    --primary: {primary};
    --bg: {background};
    --accent: {accent};
}}"#,
        primary = theme.primary,
        background = theme.background,
        accent = theme.accent,
    )
}
