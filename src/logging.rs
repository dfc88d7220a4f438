//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events. Applications (and demos)
//! that want them printed call [`init_tracing`] once at startup. The filter is
//! read from `SPARK_UI_LOG`, then `RUST_LOG`, and defaults to `warn`.

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "SPARK_UI_LOG";

static TRACING_INSTALLED: Once = Once::new();

/// Install a global fmt subscriber. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let installed = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .try_init();

        if installed.is_err() {
            tracing::debug!("a global tracing subscriber was already installed");
        }
    });
}

