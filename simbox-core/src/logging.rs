//! Structured logging setup for simulations.
//!
//! The engine logs through `tracing`: per-event `trace!` records, `debug!`
//! composition and scheduler-state updates, and `info!` run milestones. These
//! helpers install a `tracing-subscriber` with an `EnvFilter`, so `RUST_LOG`
//! always wins over the programmatic default:
//!
//! ```bash
//! RUST_LOG=simbox_core=debug cargo run
//! RUST_LOG=simbox_core::sandbox=trace cargo run
//! ```

use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with sensible defaults (`info` level).
///
/// # Panics
///
/// Panics if a global subscriber is already installed; use
/// [`try_init_logging_with_level`] when that may be the case.
pub fn init_logging() {
    init_logging_with_level("info")
}

/// Initialize logging at a specific level: "trace", "debug", "info", "warn",
/// or "error".
pub fn init_logging_with_level(level: &str) {
    try_init_logging_with_level(level).expect("failed to install logging subscriber");
}

/// Fallible variant of [`init_logging_with_level`], for embedders (and the
/// simulation builder) that may race with an already-installed subscriber.
pub fn try_init_logging_with_level(level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("simbox_core={level},simbox_components={level}").into());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .map_err(|error| error.to_string())?;

    info!("simulation logging initialized at level: {}", level);
    Ok(())
}
