//! Pool configuration and its defaults (§4.6).

/// Tunables for a [`crate::pool::Pool`]. All fields have defaults matching §4.6;
/// callers typically start from [`PoolConfig::default`] and override via
/// [`crate::config::PoolConfigLayer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub reap_interval_ms: u64,
    pub max_connection_age_ms: u64,
    pub enable_result_cache: bool,
    pub max_cache_entries: usize,
    pub enable_statement_cache: bool,
    pub enable_health_checks: bool,
    pub enable_logging: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_ms: 10_000,
            idle_timeout_ms: 30_000,
            reap_interval_ms: 10_000,
            max_connection_age_ms: 3_600_000,
            enable_result_cache: true,
            max_cache_entries: 1000,
            enable_statement_cache: true,
            enable_health_checks: true,
            enable_logging: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_specification() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.min_connections, 2);
        assert_eq!(cfg.acquire_timeout_ms, 10_000);
        assert_eq!(cfg.max_cache_entries, 1000);
        assert!(cfg.enable_result_cache);
        assert!(!cfg.enable_logging);
    }
}
