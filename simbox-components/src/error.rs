//! Error types for component construction.

use thiserror::Error;

/// Validation errors raised when assembling a component.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    #[error("rate must be positive and finite, got {0}")]
    InvalidRate(f64),

    #[error("cycle interval must be non-zero")]
    ZeroInterval,

    #[error("a tandem line requires at least one station")]
    NoStations,
}
