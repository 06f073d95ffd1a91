//! Logging configuration and initialization (§4.9).
//!
//! Uses tracing with environment-based filtering. Honors `RUST_LOG` if set;
//! otherwise a default filter is derived from `verbosity`/`quiet`.

use std::io::IsTerminal;
use std::sync::Once;

use crate::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global `tracing` subscriber for this process.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init(verbosity: u8, quiet: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbosity, quiet)))
        .map_err(|err| crate::error::StoreError::Unexpected(err.to_string()))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions))
        .with_ansi(std::io::stderr().is_terminal());

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(env_filter).with(fmt_layer))
        .map_err(|err| crate::error::StoreError::Unexpected(err.to_string()))?;

    Ok(())
}

fn default_filter(verbosity: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }

    match verbosity {
        0 => {
            if cfg!(debug_assertions) {
                "sqlit=debug,rusqlite=warn".to_string()
            } else {
                "sqlit=info,rusqlite=warn".to_string()
            }
        }
        1 => "sqlit=debug,rusqlite=warn".to_string(),
        2 => "sqlit=debug,rusqlite=debug".to_string(),
        _ => "sqlit=trace,rusqlite=debug".to_string(),
    }
}

/// Install a test-writer subscriber once per process, for use from tests
/// that want pool/table lifecycle events printed alongside test output.
pub fn init_test() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("sqlit=debug,test=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_filter_is_error_only() {
        assert_eq!(default_filter(0, true), "error");
    }

    #[test]
    fn verbosity_two_enables_rusqlite_debug() {
        assert_eq!(default_filter(2, false), "sqlit=debug,rusqlite=debug");
    }

    #[test]
    fn init_test_is_idempotent() {
        init_test();
        init_test();
    }
}
