//! Run configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Command-line overrides
//! 2. Environment variables (MAPMIRROR_*)
//! 3. TOML config file (explicit path, or MAPMIRROR_CONFIG_FILE)
//! 4. Built-in defaults
//!
//! The loaded [`AppConfig`] is immutable for the duration of a run and is
//! passed explicitly to every component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod site;
mod validation;

pub use site::{SiteLayout, expand};
pub use validation::{ConfigError, MAX_ZOOM};

/// Feature toggles selecting which phases of a mirror run execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Mirror the tiled image pyramids.
    #[serde(default = "default_true")]
    pub tiles: bool,

    /// Mirror the fixed list of top-level asset images.
    #[serde(default = "default_true")]
    pub assets: bool,

    /// Mirror per-zone JSON documents and the marker media they reference.
    #[serde(default = "default_true")]
    pub zones: bool,

    /// Mirror zone icons and island images.
    #[serde(default = "default_true")]
    pub zone_icons: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self { tiles: true, assets: true, zones: true, zone_icons: true }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Command-line overrides
/// 2. Environment variables (MAPMIRROR_*)
/// 3. TOML config file
/// 4. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the mirrored site, e.g. `https://map.example.com`.
    ///
    /// Set via MAPMIRROR_ORIGIN environment variable. Required.
    #[serde(default)]
    pub origin: Option<String>,

    /// Output directory of the mirror.
    ///
    /// Set via MAPMIRROR_OUTDIR environment variable.
    #[serde(default = "default_outdir")]
    pub outdir: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds. Unset uses the transport default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Base delay of the exponential retry backoff.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Upper bound on attempts per request. Unset retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Optional ceiling applied to each backoff delay.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,

    /// Maximum number of in-flight fetches within a phase.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Re-fetch resources even when a cached copy exists.
    #[serde(default)]
    pub refresh: bool,

    /// Allow reusing artifacts already present in the output directory.
    #[serde(default = "default_true")]
    pub reuse_cache: bool,

    #[serde(default)]
    pub features: Features,

    #[serde(default)]
    pub site: SiteLayout,
}

fn default_outdir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_user_agent() -> String {
    concat!("mapmirror/", env!("CARGO_PKG_VERSION")).into()
}

fn default_retry_base_ms() -> u64 {
    250
}

fn default_concurrency() -> usize {
    16
}

pub(crate) fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: None,
            outdir: default_outdir(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            retry_base_ms: default_retry_base_ms(),
            max_attempts: None,
            max_delay_ms: None,
            concurrency: default_concurrency(),
            refresh: false,
            reuse_cache: true,
            features: Features::default(),
            site: SiteLayout::default(),
        }
    }
}

/// Values supplied on the command line.
///
/// Unset fields are skipped during serialization so they never shadow
/// lower-precedence layers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reuse_cache: Option<bool>,
    pub features: FeatureOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiles: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_icons: Option<bool>,
}

impl AppConfig {
    /// Per-request timeout as Duration, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Base delay of the retry backoff.
    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// `config_file` takes priority over `MAPMIRROR_CONFIG_FILE`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(config_file, overrides)
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment(config_file: Option<&Path>, overrides: &Overrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        } else if let Ok(config_path) = std::env::var("MAPMIRROR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment
            .merge(
                Env::prefixed("MAPMIRROR_")
                    .ignore(&["CONFIG_FILE"])
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            )
            .merge(Serialized::defaults(overrides))
    }

    /// The origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no origin was configured.
    pub fn require_origin(&self) -> Result<url::Url, ConfigError> {
        let origin = self.origin.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "origin".into(),
            hint: "Pass --origin or set MAPMIRROR_ORIGIN".into(),
        })?;
        url::Url::parse(origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }
}
