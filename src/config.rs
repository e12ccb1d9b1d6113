//! Application configuration.
//!
//! Handles loading, validating, and merging `horoscope.toml`. The file is
//! sparse: stock defaults are the base layer and the user file overrides
//! only the keys it names.
//!
//! ## Config File Location
//!
//! `horoscope.toml` in the working directory, or any path given with
//! `--config`. A missing default file means "all defaults"; a missing
//! explicit file is an error.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! assets_dir = "assets"            # Template backgrounds and fonts
//! cache_dir = ".horoscope-cache"   # On-disk reading cache
//! output_dir = "cards"             # Rendered JPEGs
//! default_template = "1"           # Template id when --template is omitted
//!
//! [fetch]
//! workers = 4                      # Concurrent sign fetches
//! timeout_secs = 10                # Per-sign deadline
//!
//! [cache]
//! retention_days = 1               # Keep today and this many days back
//! timezone = "Asia/Kolkata"        # Where "today" is decided
//!
//! [layout]
//! body_start_size = 24             # First font size tried for readings
//! body_min_size = 16               # Smallest font size tried
//! line_padding = 12                # Added to glyph height per line
//! date_size = 47                   # Date label font size
//!
//! [fonts]
//! date = ["ArchivoBlack-Regular.ttf", "ArchivoBlack.ttf"]
//! body = ["GlacialIndifference-Bold.otf", "GlacialIndifference-Bold.ttf"]
//! fallback = ["arial.ttf", "DejaVuSans.ttf"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::fetch::FetchSettings;
use crate::imaging::CardStyle;
use crate::imaging::template;
use crate::resolve::ResolverSettings;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "horoscope.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config file not found: {0}")]
    Missing(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `horoscope.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Directory holding template folders and fonts.
    pub assets_dir: PathBuf,
    /// Directory for the JSON reading cache.
    pub cache_dir: PathBuf,
    /// Directory rendered cards are written to.
    pub output_dir: PathBuf,
    /// Template id used when none is given on the command line.
    pub default_template: String,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub layout: LayoutConfig,
    pub fonts: FontsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            cache_dir: PathBuf::from(".horoscope-cache"),
            output_dir: PathBuf::from("cards"),
            default_template: template::DEFAULT_TEMPLATE.to_string(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            layout: LayoutConfig::default(),
            fonts: FontsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.workers == 0 {
            return Err(ConfigError::Validation("fetch.workers must be at least 1".into()));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be at least 1".into(),
            ));
        }
        if self.layout.body_min_size == 0 {
            return Err(ConfigError::Validation(
                "layout.body_min_size must be at least 1".into(),
            ));
        }
        if self.layout.body_min_size > self.layout.body_start_size {
            return Err(ConfigError::Validation(
                "layout.body_min_size must not exceed layout.body_start_size".into(),
            ));
        }
        if self.layout.date_size == 0 {
            return Err(ConfigError::Validation("layout.date_size must be at least 1".into()));
        }
        if self.fonts.date.is_empty() && self.fonts.fallback.is_empty() {
            return Err(ConfigError::Validation(
                "fonts.date and fonts.fallback cannot both be empty".into(),
            ));
        }
        if self.fonts.body.is_empty() && self.fonts.fallback.is_empty() {
            return Err(ConfigError::Validation(
                "fonts.body and fonts.fallback cannot both be empty".into(),
            ));
        }
        if template::find(&self.default_template).is_none() {
            let ids: Vec<&str> = template::all().iter().map(|t| t.id).collect();
            return Err(ConfigError::Validation(format!(
                "default_template must be one of {ids:?}"
            )));
        }
        self.cache.tz()?;
        Ok(())
    }

    pub fn resolver_settings(&self) -> Result<ResolverSettings, ConfigError> {
        Ok(ResolverSettings {
            fetch: self.fetch.settings(),
            retention_days: self.cache.retention_days,
            timezone: self.cache.tz()?,
        })
    }
}

/// Source fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Number of signs fetched concurrently.
    pub workers: usize,
    /// Seconds to wait for one sign before using a placeholder.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_secs: 10,
        }
    }
}

impl FetchConfig {
    pub fn settings(&self) -> FetchSettings {
        FetchSettings {
            workers: self.workers,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Cache retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Records dated before `today - retention_days` are purged.
    pub retention_days: u32,
    /// IANA timezone that decides which calendar day "today" is.
    pub timezone: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retention_days: 1,
            timezone: "Asia/Kolkata".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Validation(format!(
                "cache.timezone: unknown timezone '{}'",
                self.timezone
            ))
        })
    }
}

/// Card text sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub body_start_size: u32,
    pub body_min_size: u32,
    pub line_padding: u32,
    pub date_size: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let style = CardStyle::default();
        Self {
            body_start_size: style.body_start_size,
            body_min_size: style.body_min_size,
            line_padding: style.line_padding,
            date_size: style.date_size,
        }
    }
}

impl LayoutConfig {
    pub fn style(&self) -> CardStyle {
        CardStyle {
            body_start_size: self.body_start_size,
            body_min_size: self.body_min_size,
            line_padding: self.line_padding,
            date_size: self.date_size,
        }
    }
}

/// Font file candidates, tried in order under the assets directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    pub date: Vec<String>,
    pub body: Vec<String>,
    /// Tried for either role after its own list.
    pub fallback: Vec<String>,
}

impl Default for FontsConfig {
    fn default() -> Self {
        let names = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
        Self {
            date: names(&["ArchivoBlack-Regular.ttf", "ArchivoBlack.ttf"]),
            body: names(&[
                "GlacialIndifference-Bold.otf",
                "GlacialIndifference-Bold.ttf",
            ]),
            fallback: names(&["arial.ttf", "DejaVuSans.ttf"]),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
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

/// Read a config file as a raw TOML value. `Ok(None)` if it doesn't exist.
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
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// With `explicit` set, that file must exist. Otherwise
/// [`DEFAULT_CONFIG_FILE`] in `cwd` is used when present.
pub fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            Some(load_raw_config(path)?.ok_or_else(|| ConfigError::Missing(path.to_path_buf()))?)
        }
        None => load_raw_config(&cwd.join(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `horoscope.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Horoscope Cards Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding template background folders and font files.
# Fonts are looked up in <assets_dir>/fonts/ first, then <assets_dir>/.
assets_dir = "assets"

# Directory for the on-disk reading cache (one JSON file per language).
cache_dir = ".horoscope-cache"

# Directory rendered cards are written to (horoscope_1.jpg ... horoscope_6.jpg).
output_dir = "cards"

# Template used when `render` is run without --template. Known ids: "1", "2".
default_template = "1"

# ---------------------------------------------------------------------------
# Fetching
# ---------------------------------------------------------------------------
[fetch]
# Number of signs fetched at the same time.
workers = 4

# Seconds to wait for a single sign before substituting a placeholder.
timeout_secs = 10

# ---------------------------------------------------------------------------
# Cache retention
# ---------------------------------------------------------------------------
[cache]
# Records dated before (today - retention_days) are deleted after each fetch.
# 1 keeps today and yesterday.
retention_days = 1

# IANA timezone that decides which calendar day is "today".
timezone = "Asia/Kolkata"

# ---------------------------------------------------------------------------
# Card layout
# ---------------------------------------------------------------------------
[layout]
# Reading text starts at this size and shrinks one pixel at a time
# until it fits its block, stopping at body_min_size.
body_start_size = 24
body_min_size = 16

# Extra pixels between lines, added to the glyph height.
line_padding = 12

# Size of the date label at the top of each card.
date_size = 47

# ---------------------------------------------------------------------------
# Fonts
# ---------------------------------------------------------------------------
[fonts]
# Candidate file names, tried in order. `fallback` is tried for either role
# after its own list is exhausted. If nothing loads, the built-in DejaVu Sans
# face is used.
date = ["ArchivoBlack-Regular.ttf", "ArchivoBlack.ttf"]
body = ["GlacialIndifference-Bold.otf", "GlacialIndifference-Bold.ttf"]
fallback = ["arial.ttf", "DejaVuSans.ttf"]
"##
}
