//! Logger setup
//!
//! Thin wrapper over `tracing-subscriber`: `[LEVEL] message` lines on
//! stderr, filtered by `ALPHA_LOG` (falls back to `info`).
//!
//! # Usage
//!
//! ```rust
//! use alpha::util::logger;
//!
//! logger::init();
//! tracing::info!("hello");
//! ```

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable consulted for the log filter
pub const LOG_ENV: &str = "ALPHA_LOG";

/// Initialize the global subscriber. Safe to call more than once;
/// only the first call installs anything.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}

/// Initialize with an explicit filter string, ignoring the environment.
/// Used by the CLI `--verbose` flag.
pub fn init_with_filter(filter: &str) {
    INIT.call_once(|| {
        fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}
