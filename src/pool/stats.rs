//! Pool statistics surface (§4.6) and the rolling acquire-time window.

use std::collections::VecDeque;
use std::time::Duration;

const ACQUIRE_WINDOW_SIZE: usize = 100;

/// A rolling window of the last [`ACQUIRE_WINDOW_SIZE`] acquire latencies,
/// backing `averageAcquireTime` (§4.6).
#[derive(Default)]
pub struct AcquireTimeWindow {
    samples: VecDeque<u64>,
}

impl AcquireTimeWindow {
    pub fn record(&mut self, elapsed: Duration) {
        if self.samples.len() >= ACQUIRE_WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }

    #[must_use]
    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.samples.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let average = sum as f64 / self.samples.len() as f64;
        average
    }
}

/// Mutable counters maintained inside the pool's lock; snapshotted into
/// [`PoolStats`] on request.
#[derive(Default)]
pub struct PoolCounters {
    pub total_created: u64,
    pub total_destroyed: u64,
    pub total_acquired: u64,
    pub total_released: u64,
    pub total_errors: u64,
    pub acquire_times: AcquireTimeWindow,
}

/// A point-in-time snapshot of pool health (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub total_connections: usize,
    pub active_connections: usize,
    pub idle_connections: usize,
    pub waiting_clients: usize,
    pub total_created: u64,
    pub total_destroyed: u64,
    pub total_acquired: u64,
    pub total_released: u64,
    pub total_errors: u64,
    pub average_acquire_time_ms: f64,
    pub cache_hit_rate: f64,
}
