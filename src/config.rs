//! Runtime configuration.
//!
//! Everything has a default, so the tool runs without a config file. Pass
//! `--config <file>` to override any subset of the values; command-line flags
//! override the file in turn.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! host = "127.0.0.1"
//! port = 5000
//!
//! [discovery]
//! check_archives = false      # true = detect archives by content, not extension
//! image_extensions = ["jpg", "jpeg", "png", "gif", "webp"]
//! archive_extensions = ["zip", "cbz"]
//! # max_threads = 4           # parallel root discovery (omit for auto = CPU cores)
//!
//! [browse]
//! page_size = 60              # images per gallery page
//! preview_count = 3           # preview images per group on the index page
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [server]
//! port = 8080
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::classify::{
    ArchiveDetection, Classifier, DEFAULT_ARCHIVE_EXTENSIONS, DEFAULT_IMAGE_EXTENSIONS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

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

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Where the web interface listens.
    pub server: ServerConfig,
    /// How roots are classified and walked.
    pub discovery: DiscoveryConfig,
    /// Presentation settings for the web interface.
    pub browse: BrowseConfig,
}

impl PreviewConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.host must not be empty".into(),
            ));
        }
        if self.discovery.image_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "discovery.image_extensions must not be empty".into(),
            ));
        }
        if let Some(ext) = self.discovery.image_extensions.iter().find(|ext| {
            self.discovery
                .archive_extensions
                .iter()
                .any(|a| a.eq_ignore_ascii_case(ext))
        }) {
            return Err(ConfigError::Validation(format!(
                "extension '{ext}' is listed as both image and archive"
            )));
        }
        if self.discovery.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "discovery.max_threads must be at least 1".into(),
            ));
        }
        if self.browse.page_size == 0 {
            return Err(ConfigError::Validation(
                "browse.page_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Detect archives by opening files instead of trusting extensions.
    pub check_archives: bool,
    pub image_extensions: Vec<String>,
    pub archive_extensions: Vec<String>,
    /// Maximum number of roots discovered in parallel.
    /// When absent, defaults to the number of CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            check_archives: false,
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            archive_extensions: DEFAULT_ARCHIVE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_threads: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn detection(&self) -> ArchiveDetection {
        if self.check_archives {
            ArchiveDetection::Content
        } else {
            ArchiveDetection::Extension
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            &self.image_extensions,
            &self.archive_extensions,
            self.detection(),
        )
    }
}

/// Resolve the effective discovery thread count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &DiscoveryConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowseConfig {
    /// Images per gallery page.
    pub page_size: usize,
    /// Images shown per group on the index page.
    pub preview_count: usize,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: 60,
            preview_count: 3,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PreviewConfig::default())?)
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

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PreviewConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PreviewConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// With no path, returns the validated stock defaults. With a path, the file
/// must exist; its values are merged on top of the defaults.
pub fn load_config(path: Option<&Path>) -> Result<PreviewConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Gallery Preview Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass this file with --config. Command-line flags override it.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Web server
# ---------------------------------------------------------------------------
[server]
# Address to listen on. Use "0.0.0.0" to browse from other machines.
host = "127.0.0.1"
port = 5000

# ---------------------------------------------------------------------------
# Discovery
# ---------------------------------------------------------------------------
[discovery]
# false: a file is an archive when its extension is listed below.
# true:  a file is an archive when it opens as a zip, whatever its name.
#        Slower, since every non-image file gets opened.
check_archives = false

# Extensions (case-insensitive) that mark a file as an image.
image_extensions = ["jpg", "jpeg", "png", "gif", "webp"]

# Extensions that mark a file as a zip archive in extension mode.
archive_extensions = ["zip", "cbz"]

# Maximum roots discovered in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4

# ---------------------------------------------------------------------------
# Browsing
# ---------------------------------------------------------------------------
[browse]
# Images per gallery page.
page_size = 60

# Preview images shown for each group on the index page.
preview_count = 3
"##
}
