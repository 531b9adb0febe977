//! Deployment configuration with layered loading.
//!
//! The version tag and asset manifest are fixed per deployment; they are
//! inputs chosen at build time, not runtime-negotiated. Loading precedence
//! (highest wins):
//!
//! 1. Environment variables (RMNNT_SW_*)
//! 2. TOML config file (if RMNNT_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Deployment configuration for the offline worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag naming the current cache generation. Bumped on deploy.
    ///
    /// Set via RMNNT_SW_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Origin scope the worker controls; relative manifest entries and
    /// relative request URLs resolve against it.
    ///
    /// Set via RMNNT_SW_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Asset manifest: every URL that must be cached for the application
    /// to function offline, in order.
    ///
    /// Set via the TOML config file (RMNNT_SW_MANIFEST as a list).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Fallback document served for failed navigation requests. Must be a
    /// manifest member.
    ///
    /// Set via RMNNT_SW_OFFLINE_DOCUMENT environment variable.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Path to the SQLite asset store.
    ///
    /// Set via RMNNT_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for prefetch and runtime requests.
    ///
    /// Set via RMNNT_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per response.
    ///
    /// Set via RMNNT_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via RMNNT_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Concurrent requests during install prefetch.
    ///
    /// Set via RMNNT_SW_PREFETCH_CONCURRENCY environment variable.
    #[serde(default = "default_prefetch_concurrency")]
    pub prefetch_concurrency: usize,
}

fn default_version_tag() -> String {
    "0".into()
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/index.html".into()]
}

fn default_offline_document() -> String {
    "/index.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./rmnnt-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "rmnnt-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_prefetch_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version_tag: default_version_tag(),
            scope: default_scope(),
            manifest: default_manifest(),
            offline_document: default_offline_document(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            prefetch_concurrency: default_prefetch_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `RMNNT_SW_`
    /// 2. TOML file from `RMNNT_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RMNNT_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("RMNNT_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version_tag, "0");
        assert_eq!(config.manifest, vec!["/index.html".to_string()]);
        assert_eq!(config.offline_document, "/index.html");
        assert_eq!(config.db_path, PathBuf::from("./rmnnt-sw-cache.sqlite"));
        assert_eq!(config.user_agent, "rmnnt-sw/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.prefetch_concurrency, 4);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }
}
