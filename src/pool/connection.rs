//! A single pooled connection and its bookkeeping metadata (§4.6 `PooledConnection`).

use rusqlite::Connection;
use std::time::Instant;

/// Apply the pool-variant pragmas from §4.7 to a freshly opened connection.
pub fn apply_pool_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", -64_000)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "mmap_size", 268_435_456_i64)?;
    Ok(())
}

/// One connection owned by the pool, plus the metadata the reaper, health
/// checker, and statistics surface need.
pub struct PooledConnection {
    pub id: u64,
    pub handle: Connection,
    pub created_at: Instant,
    pub last_used: Instant,
    pub in_use: bool,
    pub query_count: u64,
    pub error_count: u64,
}

impl PooledConnection {
    /// Open a connection for pool id `id` against `path`. `enable_statement_cache`
    /// mirrors [`crate::pool::config::PoolConfig::enable_statement_cache`]: when
    /// `false`, the connection's prepared-statement cache is disabled outright
    /// (capacity 0), so `prepare_cached` behaves like a plain `prepare`.
    pub fn open(id: u64, path: &std::path::Path, enable_statement_cache: bool) -> rusqlite::Result<Self> {
        let handle = Connection::open(path)?;
        apply_pool_pragmas(&handle)?;
        if !enable_statement_cache {
            handle.set_prepared_statement_cache_capacity(0);
        }
        let now = Instant::now();
        Ok(Self {
            id,
            handle,
            created_at: now,
            last_used: now,
            in_use: false,
            query_count: 0,
            error_count: 0,
        })
    }

    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    #[must_use]
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_used.elapsed()
    }

    /// Probe the connection with `SELECT 1`, as used by the pool health
    /// check (§4.6).
    pub fn is_healthy(&self) -> bool {
        self.handle.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabling_the_statement_cache_still_yields_a_working_connection() {
        let conn = PooledConnection::open(0, std::path::Path::new(":memory:"), false).unwrap();
        assert!(conn.is_healthy());
    }

    #[test]
    fn enabling_the_statement_cache_is_the_default_behavior() {
        let conn = PooledConnection::open(0, std::path::Path::new(":memory:"), true).unwrap();
        assert!(conn.is_healthy());
    }
}
