//! The locked-database retry policy shared by the table façade and the
//! database lifecycle manager (§4.4 "Retry", §5 Cancellation/timeouts).

use crate::error::{Result, StoreError};
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 1000;

/// Run `op`, retrying up to [`MAX_RETRIES`] times with exponential backoff
/// (`100ms · 2ⁿ`, capped at `1000ms`) whenever it fails with
/// [`StoreError::EngineLocked`]. Any other failure propagates immediately.
pub fn with_retry<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(StoreError::EngineLocked) if attempt < MAX_RETRIES => {
                let backoff = BASE_BACKOFF_MS.saturating_mul(1 << attempt).min(MAX_BACKOFF_MS);
                std::thread::sleep(Duration::from_millis(backoff));
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn succeeds_immediately_without_retry() {
        let calls = Cell::new(0);
        let result = with_retry(|| {
            calls.set(calls.get() + 1);
            Ok::<_, StoreError>(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_locked_errors_then_gives_up() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(StoreError::EngineLocked)
        });
        assert!(matches!(result, Err(StoreError::EngineLocked)));
        assert_eq!(calls.get(), MAX_RETRIES + 1);
    }

    #[test]
    fn non_locked_errors_propagate_without_retry() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(StoreError::NotConnected)
        });
        assert!(matches!(result, Err(StoreError::NotConnected)));
        assert_eq!(calls.get(), 1);
    }
}
