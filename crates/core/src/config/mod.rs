//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SOJOURN_*)
//! 2. TOML config file (if SOJOURN_CONFIG_FILE set)
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

use crate::store::StoreNames;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SOJOURN_*)
/// 2. TOML config file (if SOJOURN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite store database.
    ///
    /// Set via SOJOURN_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the gateway listens on.
    ///
    /// Set via SOJOURN_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Origin server the gateway fronts. Defines the first-party scope:
    /// requests for any other origin bypass the cache stores entirely.
    ///
    /// Set via SOJOURN_UPSTREAM environment variable.
    #[serde(default = "default_upstream")]
    pub upstream: String,

    /// Prefix for store names.
    ///
    /// Set via SOJOURN_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Build version tag. Stores are named `<prefix>-static-v<version>` and
    /// `<prefix>-dynamic-v<version>`; anything else is purged on activation.
    ///
    /// Set via SOJOURN_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths prefetched into the static store at install. All must succeed
    /// before any are committed.
    ///
    /// Set via SOJOURN_SEED_MANIFEST environment variable.
    #[serde(default = "default_seed_manifest")]
    pub seed_manifest: Vec<String>,

    /// User-Agent string for upstream requests.
    ///
    /// Set via SOJOURN_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via SOJOURN_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes captured per upstream response.
    ///
    /// Set via SOJOURN_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sojourn-stores.sqlite")
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_upstream() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_cache_prefix() -> String {
    "sojourn".into()
}

fn default_cache_version() -> String {
    "1.0.0".into()
}

fn default_seed_manifest() -> Vec<String> {
    ["/", "/index.html", "/assets/index.js", "/assets/index.css", "/manifest.json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_user_agent() -> String {
    "sojourn-gateway/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            upstream: default_upstream(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            seed_manifest: default_seed_manifest(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The two store names this build serves from.
    pub fn store_names(&self) -> StoreNames {
        StoreNames::new(&self.cache_prefix, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SOJOURN_`
    /// 2. TOML file from `SOJOURN_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SOJOURN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SOJOURN_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
