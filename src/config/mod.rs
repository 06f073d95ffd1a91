//! Layered pool configuration resolution (§4.10).
//!
//! Precedence, lowest to highest: built-in defaults, an optional YAML file,
//! process environment variables, then an explicit [`PoolConfig`] passed by
//! the caller to [`crate::manager::DatabaseManager::connect`].

use crate::error::Result;
use crate::pool::config::PoolConfig;
use serde::Deserialize;
use std::env;
use std::path::Path;

/// The subset of [`PoolConfig`] fields a YAML file or environment variable
/// may override; `None` means "not specified at this layer".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfigLayer {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
    pub reap_interval_ms: Option<u64>,
    pub max_connection_age_ms: Option<u64>,
    pub enable_result_cache: Option<bool>,
    pub max_cache_entries: Option<usize>,
    pub enable_statement_cache: Option<bool>,
    pub enable_health_checks: Option<bool>,
    pub enable_logging: Option<bool>,
}

impl PoolConfigLayer {
    /// Apply every field this layer specifies onto `base`, leaving
    /// unspecified fields untouched (higher-precedence layers call this last).
    #[must_use]
    pub fn apply_onto(&self, base: PoolConfig) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections.unwrap_or(base.max_connections),
            min_connections: self.min_connections.unwrap_or(base.min_connections),
            acquire_timeout_ms: self.acquire_timeout_ms.unwrap_or(base.acquire_timeout_ms),
            idle_timeout_ms: self.idle_timeout_ms.unwrap_or(base.idle_timeout_ms),
            reap_interval_ms: self.reap_interval_ms.unwrap_or(base.reap_interval_ms),
            max_connection_age_ms: self.max_connection_age_ms.unwrap_or(base.max_connection_age_ms),
            enable_result_cache: self.enable_result_cache.unwrap_or(base.enable_result_cache),
            max_cache_entries: self.max_cache_entries.unwrap_or(base.max_cache_entries),
            enable_statement_cache: self.enable_statement_cache.unwrap_or(base.enable_statement_cache),
            enable_health_checks: self.enable_health_checks.unwrap_or(base.enable_health_checks),
            enable_logging: self.enable_logging.unwrap_or(base.enable_logging),
        }
    }

    /// Build a layer from a YAML file. A missing file yields an empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Build a layer from `SQLX_POOL_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_connections: parse_env("SQLX_POOL_MAX_CONNECTIONS"),
            min_connections: parse_env("SQLX_POOL_MIN_CONNECTIONS"),
            acquire_timeout_ms: parse_env("SQLX_POOL_ACQUIRE_TIMEOUT_MS"),
            idle_timeout_ms: parse_env("SQLX_POOL_IDLE_TIMEOUT_MS"),
            reap_interval_ms: parse_env("SQLX_POOL_REAP_INTERVAL_MS"),
            max_connection_age_ms: parse_env("SQLX_POOL_MAX_CONNECTION_AGE_MS"),
            enable_result_cache: parse_env_bool("SQLX_POOL_ENABLE_RESULT_CACHE"),
            max_cache_entries: parse_env("SQLX_POOL_MAX_CACHE_ENTRIES"),
            enable_statement_cache: parse_env_bool("SQLX_POOL_ENABLE_STATEMENT_CACHE"),
            enable_health_checks: parse_env_bool("SQLX_POOL_ENABLE_HEALTH_CHECKS"),
            enable_logging: parse_env_bool("SQLX_POOL_ENABLE_LOGGING"),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn parse_env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|value| match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

/// Resolve the effective [`PoolConfig`] for `DatabaseManager::connect`:
/// defaults → `yaml_path` (if given) → environment → `overrides` (if given).
///
/// # Errors
///
/// Returns an error if `yaml_path` is given but cannot be read or parsed.
pub fn resolve_pool_config(yaml_path: Option<&Path>, overrides: Option<&PoolConfigLayer>) -> Result<PoolConfig> {
    let mut config = PoolConfig::default();

    if let Some(path) = yaml_path {
        config = PoolConfigLayer::from_yaml_file(path)?.apply_onto(config);
    }

    config = PoolConfigLayer::from_env().apply_onto(config);

    if let Some(overrides) = overrides {
        config = overrides.apply_onto(config);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Environment-variable tests must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pool.yaml");
        std::fs::write(&path, "maxConnections: 20\nenableResultCache: false\n").unwrap();

        let layer = PoolConfigLayer::from_yaml_file(&path).unwrap();
        let config = layer.apply_onto(PoolConfig::default());
        assert_eq!(config.max_connections, 20);
        assert!(!config.enable_result_cache);
        assert_eq!(config.min_connections, PoolConfig::default().min_connections);
    }

    #[test]
    fn missing_yaml_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yaml");
        let layer = PoolConfigLayer::from_yaml_file(&path).unwrap();
        let config = layer.apply_onto(PoolConfig::default());
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn env_layer_overrides_yaml_layer() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pool.yaml");
        std::fs::write(&path, "maxConnections: 20\n").unwrap();

        unsafe {
            env::set_var("SQLX_POOL_MAX_CONNECTIONS", "42");
        }
        let config = resolve_pool_config(Some(&path), None).unwrap();
        unsafe {
            env::remove_var("SQLX_POOL_MAX_CONNECTIONS");
        }

        assert_eq!(config.max_connections, 42);
    }

    #[test]
    fn explicit_override_wins_over_everything() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::set_var("SQLX_POOL_MAX_CONNECTIONS", "42");
        }
        let overrides = PoolConfigLayer { max_connections: Some(7), ..PoolConfigLayer::default() };
        let config = resolve_pool_config(None, Some(&overrides)).unwrap();
        unsafe {
            env::remove_var("SQLX_POOL_MAX_CONNECTIONS");
        }

        assert_eq!(config.max_connections, 7);
    }
}
