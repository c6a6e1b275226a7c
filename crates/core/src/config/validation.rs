//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Highest zoom level accepted for a tile pyramid.
pub const MAX_ZOOM: u8 = 24;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no origin is set, and
    /// `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL, or carries a path or query
    /// - `concurrency` is 0 or exceeds 256
    /// - `retry_base_ms` is 0, or `max_attempts` is 0
    /// - `user_agent` or `outdir` is empty
    /// - a max zoom exceeds 24
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.require_origin()?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(invalid("origin", "must be an absolute http(s) URL"));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(invalid("origin", "must be a site root without a path or query"));
        }

        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be greater than 0"));
        }
        if self.concurrency > 256 {
            return Err(invalid("concurrency", "must not exceed 256"));
        }

        if self.retry_base_ms == 0 {
            return Err(invalid("retry_base_ms", "must be at least 1ms"));
        }
        if self.max_attempts == Some(0) {
            return Err(invalid("max_attempts", "must be at least 1 when set"));
        }
        if let Some(max_delay) = self.max_delay_ms
            && max_delay < self.retry_base_ms
        {
            return Err(invalid("max_delay_ms", "must not be smaller than retry_base_ms"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.outdir.as_os_str().is_empty() {
            return Err(invalid("outdir", "must not be empty"));
        }

        if self.site.world_max_zoom > MAX_ZOOM {
            return Err(invalid("site.world_max_zoom", "must not exceed 24"));
        }
        if self.site.zone_max_zoom > MAX_ZOOM {
            return Err(invalid("site.zone_max_zoom", "must not exceed 24"));
        }

        if !self.features.zones && self.features.zone_icons {
            tracing::debug!("zone icons enabled without zone data; icons come from the world document only");
        }

        Ok(())
    }
}
