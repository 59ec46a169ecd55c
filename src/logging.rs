//! Tracing subscriber setup for binaries and services embedding the crate.
//!
//! `RUST_LOG` overrides the default filter.

use crate::error::{ChequeError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Compact human-readable output.
pub fn init_logger(verbose: bool) -> Result<()> {
    let filter = if verbose {
        filter("chequeflow=debug,info")
    } else {
        filter("chequeflow=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| ChequeError::Config {
            message: format!("logger already initialised: {e}"),
        })
}

/// One JSON object per event, for log shippers.
pub fn init_json_logger() -> Result<()> {
    tracing_subscriber::registry()
        .with(filter("chequeflow=info"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .json()
                .with_current_span(false),
        )
        .try_init()
        .map_err(|e| ChequeError::Config {
            message: format!("logger already initialised: {e}"),
        })
}
