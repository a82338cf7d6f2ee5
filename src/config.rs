//! Build configuration.
//!
//! Handles loading, validating, and merging `pellicule.toml`. Three layers are
//! merged, later ones winning: stock defaults, the user's config file (in the
//! input root, or the one named by `--config`), then command-line flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [thumbnails]
//! width = 250
//! height = 250
//! crop = false      # center-crop to fill the box instead of fitting inside it
//! embed = false     # inline thumbnails as data: URIs
//!
//! [full]
//! # width = 1600    # full-size rendition; set both or neither
//! # height = 1200
//!
//! [gallery]
//! # tags_field = "ImageDescription"
//! per_date = false  # regroup the root's media into one gallery per day
//! # max_depth = 2   # omit for unlimited recursion
//!
//! [output]
//! symlinks = false  # link originals and cache files instead of copying
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::RenditionRequest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the input root.
pub const CONFIG_FILE: &str = "pellicule.toml";

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

/// Build configuration loaded from `pellicule.toml`.
///
/// All fields have defaults; a config file only needs the values it
/// overrides. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Thumbnail box and rendering mode.
    pub thumbnails: ThumbnailsConfig,
    /// Optional full-size rendition linked from each thumbnail.
    pub full: FullConfig,
    /// Tree building options.
    pub gallery: GalleryConfig,
    /// How files reach the output directory.
    pub output: OutputConfig,
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width and thumbnails.height must be non-zero".into(),
            ));
        }
        match (self.full.width, self.full.height) {
            (None, None) => {}
            (Some(w), Some(h)) if w > 0 && h > 0 => {}
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "full.width and full.height must be non-zero".into(),
                ));
            }
            _ => {
                return Err(ConfigError::Validation(
                    "full.width and full.height must be set together".into(),
                ));
            }
        }
        if self.gallery.max_depth == Some(0) {
            return Err(ConfigError::Validation(
                "gallery.max_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The rendition shown in the gallery grid.
    pub fn thumbnail_request(&self) -> RenditionRequest {
        RenditionRequest::new(
            self.thumbnails.width,
            self.thumbnails.height,
            self.thumbnails.crop,
        )
    }

    /// The full-size rendition, when configured.
    pub fn full_request(&self) -> Option<RenditionRequest> {
        match (self.full.width, self.full.height) {
            (Some(w), Some(h)) => Some(RenditionRequest::new(w, h, false)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub width: u32,
    pub height: u32,
    /// Center-crop to fill the box instead of fitting inside it.
    pub crop: bool,
    /// Inline thumbnails into the page as `data:` URIs.
    pub embed: bool,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            width: 250,
            height: 250,
            crop: false,
            embed: false,
        }
    }
}

/// Full-size rendition box. Both sides or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FullConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Metadata text field holding comma or semicolon separated tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_field: Option<String>,
    /// Regroup the root's media into one gallery per capture day.
    pub per_date: bool,
    /// Levels to descend; `None` is unlimited, `Some(1)` stays at the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Symlink originals and cache files into the output instead of copying.
    pub symlinks: bool,
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BuildConfig::default())?)
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

/// Read a config file as a raw TOML value.
pub fn load_raw_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `pellicule.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    load_raw_config_file(&config_path).map(Some)
}

/// Merge optional overlays onto a base value in order, then deserialize and
/// validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = Option<toml::Value>>,
) -> Result<BuildConfig, ConfigError> {
    let merged = overlays
        .into_iter()
        .flatten()
        .fold(base, merge_toml);
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config for a build rooted at `root`.
///
/// `config_file` replaces the lookup of `root/pellicule.toml`; `cli` holds
/// values from command-line flags and wins over both.
pub fn load_config(
    root: &Path,
    config_file: Option<&Path>,
    cli: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let user = match config_file {
        Some(path) => Some(load_raw_config_file(path)?),
        None => load_raw_config(root)?,
    };
    resolve_config(stock_defaults_value()?, [user, cli])
}

/// Returns a fully-commented stock `pellicule.toml` with all keys.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Pellicule Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as pellicule.toml in the input directory, or pass it
# with --config. Command-line flags override it.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Box the thumbnail must fit, in pixels.
width = 250
height = 250

# Center-crop to fill the box exactly instead of fitting inside it.
crop = false

# Inline thumbnails into index.html as data: URIs.
embed = false

# ---------------------------------------------------------------------------
# Full-size rendition
# ---------------------------------------------------------------------------
[full]
# When set, thumbnails link to a downscaled copy instead of the original.
# Set both or neither.
# width = 1600
# height = 1200

# ---------------------------------------------------------------------------
# Gallery tree
# ---------------------------------------------------------------------------
[gallery]
# Metadata text field holding comma or semicolon separated tags,
# e.g. "ImageDescription" or "XPKeywords".
# tags_field = "ImageDescription"

# Regroup all media of the root and its direct subgalleries into one
# gallery per capture day (YYYY-MM-DD).
per_date = false

# Number of directory levels to build. Omit for unlimited; 1 = root only.
# max_depth = 2

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Symlink originals and cached renditions into the output directory
# instead of copying them.
symlinks = false
"##
}
