//! Process-wide registry of open pools, keyed by database path (§5 Ambient
//! process state: "a global registry of pools by database path supports
//! `closeAllPools`").

use crate::error::Result;
use crate::pool::config::PoolConfig;
use crate::pool::Pool;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

static REGISTRY: Lazy<Mutex<HashMap<PathBuf, Arc<Pool>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Return the pool registered for `path`, opening a fresh one with `config`
/// if none exists yet. Subsequent calls for the same path ignore `config`
/// and return the already-open pool, matching a connect-or-reuse registry.
pub fn get_or_open(path: &Path, config: PoolConfig) -> Result<Arc<Pool>> {
    let mut registry = REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(pool) = registry.get(path) {
        return Ok(Arc::clone(pool));
    }
    let pool = Pool::open(path.to_path_buf(), config)?;
    registry.insert(path.to_path_buf(), Arc::clone(&pool));
    Ok(pool)
}

/// Look up a pool already registered for `path` without opening one.
#[must_use]
pub fn lookup(path: &Path) -> Option<Arc<Pool>> {
    let registry = REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    registry.get(path).cloned()
}

/// Remove and shut down the pool registered for `path`, if any.
pub fn close_pool(path: &Path) {
    let pool = {
        let mut registry = REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry.remove(path)
    };
    if let Some(pool) = pool {
        pool.shutdown();
    }
}

/// Shut down and remove every registered pool (`closeAllPools`, §5).
pub fn close_all_pools() {
    let pools: Vec<Arc<Pool>> = {
        let mut registry = REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry.drain().map(|(_, pool)| pool).collect()
    };
    for pool in pools {
        pool.shutdown();
    }
}

/// How many pools are currently registered.
#[must_use]
pub fn open_pool_count() -> usize {
    REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
}
