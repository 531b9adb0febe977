//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::manifest::{AssetManifest, resolve_url};
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version_tag` is empty or contains ':' (the generation key separator)
    /// - `scope` is not an absolute http(s) URL
    /// - `manifest` is empty or contains an unresolvable entry
    /// - `offline_document` is not a manifest member
    /// - `max_bytes`, `timeout_ms`, or `prefetch_concurrency` is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version_tag.is_empty() {
            return Err(ConfigError::Invalid { field: "version_tag".into(), reason: "must not be empty".into() });
        }
        if self.version_tag.contains(':') {
            return Err(ConfigError::Invalid { field: "version_tag".into(), reason: "must not contain ':'".into() });
        }

        let scope = Url::parse(&self.scope)
            .map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })?;
        if scope.scheme() != "http" && scope.scheme() != "https" {
            return Err(ConfigError::Invalid { field: "scope".into(), reason: "must be an http(s) URL".into() });
        }

        if self.manifest.is_empty() {
            return Err(ConfigError::Invalid { field: "manifest".into(), reason: "must not be empty".into() });
        }

        let manifest = AssetManifest::resolve(&scope, &self.manifest)
            .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: e.to_string() })?;

        let offline_document = resolve_url(&scope, &self.offline_document)
            .map_err(|e| ConfigError::Invalid { field: "offline_document".into(), reason: e.to_string() })?;
        if !manifest.contains(&offline_document) {
            return Err(ConfigError::Invalid {
                field: "offline_document".into(),
                reason: "must be a manifest member".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.prefetch_concurrency == 0 || self.prefetch_concurrency > 16 {
            return Err(ConfigError::Invalid {
                field: "prefetch_concurrency".into(),
                reason: "must be between 1 and 16".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
