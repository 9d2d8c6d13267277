//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` only needs the keys it overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [discovery]
//! base = "assets/img/impressions/"        # Banner image directory (site-relative)
//! templates = ["impression-{i}", "{i}"]   # Filename stems; {i} or {i:03}
//! extensions = ["jpg", "jpeg", "png", "webp"]
//! start = 1                 # First index probed
//! max_index = 100           # Last index probed
//! miss_limit = 4            # Consecutive misses (after a hit) that stop the walk
//! target_count = 100        # Stop once this many images were found
//! narrow = true             # Probe only the first hit's template/extension afterwards
//! batch_size = 0            # 0 = one probe at a time, N = N indices in flight
//!
//! [probe]
//! strategy = "auto"         # auto | head | load
//! timeout_ms = 5000
//!
//! [memo]
//! ttl_hours = 168           # Lifetime of a non-empty discovery
//! empty_ttl_minutes = 10    # Lifetime of an empty discovery
//!
//! [banner]
//! speed = 0.5               # Pixels advanced per animation frame
//! drag_threshold = 5.0      # Pointer travel (px) that turns a click into a drag
//! resume_delay_ms = 1500    # Pause after drag/wheel before auto-scroll resumes
//! enlarge = "overlay"       # overlay | new-context
//! height = "220px"
//! gap = "0.75rem"
//!
//! [page]
//! header_scroll_threshold = 10.0
//! reveal_threshold = 0.12
//! lazy_margin = 200.0
//!
//! [galleries]
//! manifest = "assets/img/galleries/manifest.json"
//! base = "assets/img/galleries/"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::pattern::Template;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Banner image discovery.
    pub discovery: DiscoveryConfig,
    /// Existence probing.
    pub probe: ProbeConfig,
    /// Discovery result lifetimes.
    pub memo: MemoConfig,
    /// Banner interaction and layout.
    pub banner: BannerConfig,
    /// Header, reveal and lazy-start thresholds.
    pub page: PageConfig,
    /// Manifest-driven galleries.
    pub galleries: GalleriesConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.discovery;
        if d.templates.is_empty() {
            return Err(ConfigError::Validation(
                "discovery.templates must not be empty".into(),
            ));
        }
        for t in &d.templates {
            Template::parse(t).map_err(|e| {
                ConfigError::Validation(format!("discovery.templates: {e}"))
            })?;
        }
        if d.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "discovery.extensions must not be empty".into(),
            ));
        }
        if d.max_index == 0 {
            return Err(ConfigError::Validation(
                "discovery.max_index must be non-zero".into(),
            ));
        }
        if d.start > d.max_index {
            return Err(ConfigError::Validation(
                "discovery.start must not exceed discovery.max_index".into(),
            ));
        }
        if d.miss_limit == 0 {
            return Err(ConfigError::Validation(
                "discovery.miss_limit must be at least 1".into(),
            ));
        }
        let p = &self.page;
        if !(p.reveal_threshold > 0.0 && p.reveal_threshold <= 1.0) {
            return Err(ConfigError::Validation(
                "page.reveal_threshold must be in (0, 1]".into(),
            ));
        }
        if self.banner.drag_threshold < 0.0 || self.banner.speed < 0.0 {
            return Err(ConfigError::Validation(
                "banner.speed and banner.drag_threshold must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Banner discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Site-relative directory holding the banner images.
    pub base: String,
    /// Filename stems with an `{i}` placeholder, tried in order.
    pub templates: Vec<String>,
    /// Extensions tried for every template, in order.
    pub extensions: Vec<String>,
    pub start: u32,
    pub max_index: u32,
    pub miss_limit: u32,
    pub target_count: usize,
    /// After the first hit, probe only that hit's template/extension.
    pub narrow: bool,
    /// Number of indices probed concurrently; `0` walks one probe at a time.
    pub batch_size: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base: "assets/img/impressions/".to_string(),
            templates: vec!["impression-{i}".to_string(), "{i}".to_string()],
            extensions: ["jpg", "jpeg", "png", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            start: 1,
            max_index: 100,
            miss_limit: 4,
            target_count: 100,
            narrow: true,
            batch_size: 0,
        }
    }
}

/// Which existence check to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStrategy {
    /// Pick once per session from a capability probe.
    #[default]
    Auto,
    /// Metadata-only request.
    Head,
    /// Load the resource and check it decodes as an image.
    Load,
}

/// Existence probing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub strategy: ProbeStrategy,
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            strategy: ProbeStrategy::Auto,
            timeout_ms: 5000,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Discovery result lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoConfig {
    /// Lifetime of a non-empty result, in hours.
    pub ttl_hours: u64,
    /// Lifetime of an empty result, in minutes.
    pub empty_ttl_minutes: u64,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 7 * 24,
            empty_ttl_minutes: 10,
        }
    }
}

/// How a clicked banner image is enlarged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnlargeMode {
    /// In-page lightbox.
    #[default]
    Overlay,
    /// New browsing context (tab/window).
    NewContext,
}

/// Banner interaction and layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BannerConfig {
    pub speed: f64,
    pub drag_threshold: f64,
    pub resume_delay_ms: u64,
    pub enlarge: EnlargeMode,
    /// Track height (CSS value).
    pub height: String,
    /// Gap between banner images (CSS value).
    pub gap: String,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            speed: 0.5,
            drag_threshold: 5.0,
            resume_delay_ms: 1500,
            enlarge: EnlargeMode::Overlay,
            height: "220px".to_string(),
            gap: "0.75rem".to_string(),
        }
    }
}

/// Header, reveal and lazy-start thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    /// Scroll offset (px) past which the header gets the `scrolled` class.
    pub header_scroll_threshold: f64,
    /// Visible fraction of a card that reveals it.
    pub reveal_threshold: f64,
    /// Distance (px) below the viewport at which banner discovery starts.
    pub lazy_margin: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            header_scroll_threshold: 10.0,
            reveal_threshold: 0.12,
            lazy_margin: 200.0,
        }
    }
}

/// Manifest-driven galleries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleriesConfig {
    /// Site-relative path of the optional JSON manifest.
    pub manifest: String,
    /// Site-relative directory containing one sub-directory per gallery id.
    pub base: String,
}

impl Default for GalleriesConfig {
    fn default() -> Self {
        Self {
            manifest: "assets/img/galleries/manifest.json".to_string(),
            base: "assets/img/galleries/".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
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

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory, on top of the
/// stock defaults.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    let overlay = load_raw_config(dir)?;
    if overlay.is_some() {
        log::info!("loaded {}", dir.join("config.toml").display());
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Impressions Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Banner image discovery
# ---------------------------------------------------------------------------
[discovery]
# Site-relative directory holding the banner images.
base = "assets/img/impressions/"

# Filename stems tried for every index. {i} is the index; {i:03} zero-pads it.
templates = ["impression-{i}", "{i}"]

# Extensions tried for every template, in this order.
extensions = ["jpg", "jpeg", "png", "webp"]

# Index range walked upward from `start`.
start = 1
max_index = 100

# Consecutive missing indices that end the walk. Only counts once at least one
# image was found, so a set starting at index 7 is still discovered.
miss_limit = 4

# Stop as soon as this many images were found.
target_count = 100

# After the first hit, only probe that hit's template and extension.
narrow = true

# Indices probed concurrently. 0 probes one candidate at a time.
batch_size = 0

# ---------------------------------------------------------------------------
# Existence probing
# ---------------------------------------------------------------------------
[probe]
# auto: pick once per session (HEAD if the server supports it, else load).
# head: metadata-only requests.  load: fetch and decode the image header.
strategy = "auto"
timeout_ms = 5000

# ---------------------------------------------------------------------------
# Discovery memo
# ---------------------------------------------------------------------------
[memo]
# Lifetime of a non-empty discovery result.
ttl_hours = 168
# Lifetime of an empty result (misconfiguration heals quickly).
empty_ttl_minutes = 10

# ---------------------------------------------------------------------------
# Banner
# ---------------------------------------------------------------------------
[banner]
# Pixels advanced per animation frame.
speed = 0.5
# Pointer travel (px) beyond which a press is a drag, not a click.
drag_threshold = 5.0
# Pause after a drag or wheel before auto-scroll resumes.
resume_delay_ms = 1500
# overlay: in-page lightbox.  new-context: open the image in a new tab.
enlarge = "overlay"
height = "220px"
gap = "0.75rem"

# ---------------------------------------------------------------------------
# Page behaviour
# ---------------------------------------------------------------------------
[page]
header_scroll_threshold = 10.0
reveal_threshold = 0.12
lazy_margin = 200.0

# ---------------------------------------------------------------------------
# Galleries
# ---------------------------------------------------------------------------
[galleries]
# Optional manifest: { "galleries": [ { "id": "...", "title": "...",
#   "count": 12, "pattern": "photo-{i}.jpg", "start": 1 } ] }
manifest = "assets/img/galleries/manifest.json"
# Each gallery lives in <base><id>/
base = "assets/img/galleries/"
"##
}

/// Generate CSS custom properties from banner config.
pub fn generate_banner_css(banner: &BannerConfig) -> String {
    format!(
        r#":root {{
    --banner-height: {height};
    --banner-gap: {gap};
}}"#,
        height = banner.height,
        gap = banner.gap,
    )
}
