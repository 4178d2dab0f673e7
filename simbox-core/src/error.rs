//! Error types for simulation assembly.
//!
//! Construction and configuration problems surface as errors; runtime logic
//! violations (observing behind the clock, running into the past, reentrant
//! run calls) are programming errors and panic instead.

use thiserror::Error;

/// Errors raised while assembling a simulation.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("simulation label cannot be empty")]
    EmptyLabel,

    #[error("failed to install logging subscriber: {0}")]
    Logging(String),
}
