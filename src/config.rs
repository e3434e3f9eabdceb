//! Dispenser configuration.
//!
//! Handles loading and validating `config.toml`. All options default to
//! sensible values; user config files only specify overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! cache_root = "storage/guided"    # Root of the derivative cache store
//! uploads_root = "storage/uploads" # Root of the source-image store
//!
//! [cache]
//! resized_dir = "resized"   # Subdirectory for resized derivatives
//! thumbs_dir = "thumbs"     # Subdirectory for thumbnails
//! days = 366                # Client cache lifetime (Cache-Control max-age)
//!
//! [encoding]
//! format = "png"            # png | jpeg | gif | webp
//! quality = 90              # JPEG quality (1-100); other formats ignore it
//!
//! [fallback]
//! serve_original_on_failure = false  # Lenient mode: passthrough on failure
//!
//! [headers.additional]
//! # "Access-Control-Allow-Origin" = "*"
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::imaging::{EncodingFormat, Quality};
use crate::response::ResponsePolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Dispenser configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispenserConfig {
    /// Root directory of the derivative cache store.
    #[serde(default = "default_cache_root")]
    pub cache_root: String,
    /// Root directory of the source-image (upload) store.
    #[serde(default = "default_uploads_root")]
    pub uploads_root: String,
    /// Cache layout and client cache lifetime.
    pub cache: CacheConfig,
    /// Derivative encoding settings.
    pub encoding: EncodingConfig,
    /// Behavior when a source image cannot be processed.
    pub fallback: FallbackConfig,
    /// Extra response headers.
    pub headers: HeaderConfig,
}

fn default_cache_root() -> String {
    "storage/guided".to_string()
}

fn default_uploads_root() -> String {
    "storage/uploads".to_string()
}

impl Default for DispenserConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            uploads_root: default_uploads_root(),
            cache: CacheConfig::default(),
            encoding: EncodingConfig::default(),
            fallback: FallbackConfig::default(),
            headers: HeaderConfig::default(),
        }
    }
}

impl DispenserConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.encoding.quality == 0 || self.encoding.quality > 100 {
            return Err(ConfigError::Validation(
                "encoding.quality must be 1-100".into(),
            ));
        }
        if self.cache.days == 0 {
            return Err(ConfigError::Validation(
                "cache.days must be at least 1".into(),
            ));
        }
        if self.cache.resized_dir.is_empty() || self.cache.thumbs_dir.is_empty() {
            return Err(ConfigError::Validation(
                "cache directories must not be empty".into(),
            ));
        }
        if self.cache.resized_dir == self.cache.thumbs_dir {
            return Err(ConfigError::Validation(
                "cache.resized_dir and cache.thumbs_dir must differ".into(),
            ));
        }
        Ok(())
    }

    /// Response shaping derived from this config.
    pub fn response_policy(&self) -> ResponsePolicy {
        ResponsePolicy {
            cache_days: self.cache.days,
            additional_headers: self
                .headers
                .additional
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.encoding.quality)
    }
}

/// Cache layout and client cache lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Subdirectory (under `cache_root`) holding resized derivatives.
    pub resized_dir: String,
    /// Subdirectory (under `cache_root`) holding thumbnails.
    pub thumbs_dir: String,
    /// Client-side cache lifetime in days.
    pub days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            resized_dir: "resized".to_string(),
            thumbs_dir: "thumbs".to_string(),
            days: 366,
        }
    }
}

/// Derivative encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// Output format for generated derivatives.
    pub format: EncodingFormat,
    /// JPEG encoding quality (1 = worst, 100 = best). Other formats ignore it.
    pub quality: u32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            format: EncodingFormat::Png,
            quality: 90,
        }
    }
}

/// Behavior when a source image cannot be read or processed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    /// When true, a processing failure serves the unprocessed original from
    /// the upload store instead of a 404.
    pub serve_original_on_failure: bool,
}

/// Extra response headers merged into every full response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderConfig {
    pub additional: BTreeMap<String, String>,
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Load config from `config.toml` in the given directory.
///
/// Missing file means stock defaults. Unknown keys are rejected and the
/// result is validated.
pub fn load_config(root: &Path) -> Result<DispenserConfig, ConfigError> {
    let config_path = root.join("config.toml");
    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        toml::from_str(&content)?
    } else {
        DispenserConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Guided Image Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Root of the derivative cache store.
cache_root = "storage/guided"

# Root of the source-image (upload) store.
uploads_root = "storage/uploads"

# ---------------------------------------------------------------------------
# Cache layout
# ---------------------------------------------------------------------------
[cache]
# Subdirectories (under cache_root) for the two derivative kinds.
resized_dir = "resized"
thumbs_dir = "thumbs"

# Client-side cache lifetime in days, emitted as Cache-Control max-age.
days = 366

# ---------------------------------------------------------------------------
# Derivative encoding
# ---------------------------------------------------------------------------
[encoding]
# Output format: "png", "jpeg", "gif" or "webp".
format = "png"

# JPEG encoding quality (1 = worst, 100 = best). Other formats ignore it.
quality = 90

# ---------------------------------------------------------------------------
# Failure fallback
# ---------------------------------------------------------------------------
[fallback]
# When a source image cannot be read or processed:
#   false -> respond "not found" (strict)
#   true  -> serve the unprocessed original, marked with an
#            X-Guided-Image-Fallback header (lenient)
serve_original_on_failure = false

# ---------------------------------------------------------------------------
# Extra response headers
# ---------------------------------------------------------------------------
# Merged into every full derivative response.
[headers.additional]
# "Access-Control-Allow-Origin" = "*"
"##
}
