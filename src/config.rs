//! Baker configuration.
//!
//! Loaded from `bake.toml`. Stock defaults are the base layer and user
//! values are merged on top, so a config file only needs the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! media_root = "wordpress"          # Directory image URL paths resolve against
//! visualization_route = "/grapher/" # iframe src segment marking a chart embed
//!
//! [exports]
//! dir = "baked/exports"             # Rendered chart exports (the export table)
//! base_url = "/exports"             # Public URL prefix of export files
//! render_timeout_secs = 120         # Cap on waiting for one export
//! # render_command = ["node", "bakeChart.js"]
//!
//! [blog]
//! posts_per_page = 21
//!
//! [catalog]
//! public_tag_parents = [1500, 1501, ..., 1515]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Parent tag ids of the public top-level categories. Chart tags under any
/// other parent are internal and never shown in the catalog.
pub const PUBLIC_TAG_PARENT_IDS: [u64; 16] = [
    1500, 1501, 1502, 1503, 1504, 1505, 1506, 1507, 1508, 1509, 1510, 1511, 1512, 1513, 1514,
    1515,
];

/// Default config file name.
pub const CONFIG_FILENAME: &str = "bake.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Baker configuration loaded from `bake.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BakeConfig {
    /// Directory that image URL paths resolve against when looking for
    /// size variants.
    pub media_root: PathBuf,
    /// iframe `src` segment that marks a visualization embed.
    pub visualization_route: String,
    /// Export table location and rendering.
    pub exports: ExportsConfig,
    /// Blog listing settings.
    pub blog: BlogConfig,
    /// Visualization catalog settings.
    pub catalog: CatalogConfig,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("wordpress"),
            visualization_route: crate::embeds::DEFAULT_ROUTE.to_string(),
            exports: ExportsConfig::default(),
            blog: BlogConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl BakeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blog.posts_per_page == 0 {
            return Err(ConfigError::Validation(
                "blog.posts_per_page must be at least 1".into(),
            ));
        }
        if self.exports.render_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "exports.render_timeout_secs must be at least 1".into(),
            ));
        }
        if self.visualization_route.is_empty() {
            return Err(ConfigError::Validation(
                "visualization_route must not be empty".into(),
            ));
        }
        if self
            .exports
            .render_command
            .as_ref()
            .is_some_and(|c| c.is_empty())
        {
            return Err(ConfigError::Validation(
                "exports.render_command must name a program".into(),
            ));
        }
        Ok(())
    }
}

/// Export rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportsConfig {
    /// Directory holding rendered exports.
    pub dir: PathBuf,
    /// Public URL prefix the export files are served under.
    pub base_url: String,
    /// Seconds to wait for one export before baking without it.
    pub render_timeout_secs: u64,
    /// Program and arguments that render one export. The reference, key,
    /// version and output directory are appended. No command means exports
    /// are never rendered, only looked up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_command: Option<Vec<String>>,
}

impl ExportsConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("baked/exports"),
            base_url: "/exports".to_string(),
            render_timeout_secs: crate::exports::DEFAULT_RENDER_TIMEOUT.as_secs(),
            render_command: None,
        }
    }
}

/// Blog listing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    pub posts_per_page: usize,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            posts_per_page: crate::listing::DEFAULT_POSTS_PER_PAGE,
        }
    }
}

/// Visualization catalog settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Tag parent ids whose tags are shown in the catalog.
    pub public_tag_parents: BTreeSet<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            public_tag_parents: PUBLIC_TAG_PARENT_IDS.into_iter().collect(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BakeConfig::default()).expect("default config must serialize")
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BakeConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BakeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file is
/// absent. Unknown keys and invalid values are errors.
pub fn load_config(path: &Path) -> Result<BakeConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `bake.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Page baker configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Directory that image URL paths resolve against. Listing pages look here for
# smaller size variants of each post's featured image.
media_root = "wordpress"

# An iframe whose src contains this segment is a visualization embed.
visualization_route = "/grapher/"

# ---------------------------------------------------------------------------
# Visualization exports
# ---------------------------------------------------------------------------
[exports]
# Directory of rendered exports, one <key>_v<version>_<w>x<h>.svg per chart.
dir = "baked/exports"

# Public URL prefix the export files are served under.
base_url = "/exports"

# Seconds to wait for one export before baking the page without it.
render_timeout_secs = 120

# Program that renders one export. The embed reference, export key, version
# and output directory are appended as arguments. Without it, exports are
# only looked up, never rendered.
# render_command = ["node", "bakeChart.js"]

# ---------------------------------------------------------------------------
# Blog listing
# ---------------------------------------------------------------------------
[blog]
posts_per_page = 21

# ---------------------------------------------------------------------------
# Visualization catalog
# ---------------------------------------------------------------------------
[catalog]
# Parent ids of the public top-level tag categories. Tags under any other
# parent are left out of the catalog.
public_tag_parents = [
    1500, 1501, 1502, 1503, 1504, 1505, 1506, 1507,
    1508, 1509, 1510, 1511, 1512, 1513, 1514, 1515,
]
"##
}
