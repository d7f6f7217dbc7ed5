//! Studio configuration module.
//!
//! Handles loading, validating, and merging `studio.toml`. Stock defaults are
//! overridden by whatever keys the user file sets; everything else keeps its
//! default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [intake]
//! max_upload_bytes = 10485760   # Advisory only: larger uploads get a notice
//! accepted_types = ["image/png", "image/jpeg", "image/webp"]
//!
//! [archive]
//! filename = "hairstyle-studio-looks.zip"
//! failure_policy = "all-or-nothing"   # or "skip-failed"
//! compression = "deflated"            # or "stored"
//!
//! [fetch]
//! timeout_secs = 30
//! user_agent = "hairstyle-studio"
//!
//! [generation]
//! endpoint = ""                 # Empty disables the `generate` command
//!
//! [logging]
//! level = "info"                # Overridden by RUST_LOG
//! ```
//!
//! The low-resolution thresholds (800x1000) are fixed and not configurable.
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILENAME: &str = "studio.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Studio configuration loaded from `studio.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    /// Upload advisories.
    pub intake: IntakeConfig,
    /// Download-all archive settings.
    pub archive: ArchiveConfig,
    /// HTTP client settings for fetching look images.
    pub fetch: FetchConfig,
    /// Generation service endpoint.
    pub generation: GenerationConfig,
    /// Log level used when `RUST_LOG` is unset.
    pub logging: LoggingConfig,
}

impl StudioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.archive.filename.trim().is_empty() {
            return Err(ConfigError::Validation(
                "archive.filename must not be empty".into(),
            ));
        }
        if !self.archive.filename.to_ascii_lowercase().ends_with(".zip") {
            return Err(ConfigError::Validation(
                "archive.filename must end in .zip".into(),
            ));
        }
        if let Some(bad) = self
            .intake
            .accepted_types
            .iter()
            .find(|t| !t.to_ascii_lowercase().starts_with("image/"))
        {
            return Err(ConfigError::Validation(format!(
                "intake.accepted_types entry '{bad}' is not an image type"
            )));
        }
        Ok(())
    }
}

/// Upload advisory thresholds. Nothing here blocks an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    /// Uploads larger than this get an advisory.
    pub max_upload_bytes: u64,
    /// Media types the generation service handles best. Empty disables the check.
    pub accepted_types: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            accepted_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/webp".to_string(),
            ],
        }
    }
}

/// What to do when some look images cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Any failed fetch fails the whole archive.
    #[default]
    AllOrNothing,
    /// Archive whatever was fetched and report the failures.
    SkipFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

/// Download-all archive settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Name the archive is saved under.
    pub filename: String,
    pub failure_policy: FailurePolicy,
    pub compression: Compression,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            filename: "hairstyle-studio-looks.zip".to_string(),
            failure_policy: FailurePolicy::default(),
            compression: Compression::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("hairstyle-studio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// URL the portrait is POSTed to. Empty means no generation service.
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(StudioConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
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

/// Load `studio.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `studio.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<StudioConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: StudioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `studio.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Hairstyle Studio Configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Upload intake (advisory only, nothing here blocks an upload)
# ---------------------------------------------------------------------------
[intake]
# Uploads larger than this many bytes get a size notice.
max_upload_bytes = 10485760

# Media types the generation service handles best. Others get a notice.
accepted_types = ["image/png", "image/jpeg", "image/webp"]

# ---------------------------------------------------------------------------
# Download-all archive
# ---------------------------------------------------------------------------
[archive]
filename = "hairstyle-studio-looks.zip"

# "all-or-nothing": one failed image fails the whole archive.
# "skip-failed":    archive what could be fetched, report the rest.
failure_policy = "all-or-nothing"

# "deflated" or "stored".
compression = "deflated"

# ---------------------------------------------------------------------------
# Fetching look images
# ---------------------------------------------------------------------------
[fetch]
timeout_secs = 30
# user_agent = "hairstyle-studio/<version>"

# ---------------------------------------------------------------------------
# Generation service
# ---------------------------------------------------------------------------
[generation]
# URL the portrait is POSTed to (multipart: image, face_shape, hair_length).
endpoint = ""

# ---------------------------------------------------------------------------
# Logging (RUST_LOG takes precedence)
# ---------------------------------------------------------------------------
[logging]
level = "info"
"##
}
