//! Fluent assembly of a simulation root.

use tracing::debug;

use crate::error::BuildError;
use crate::logging;
use crate::Sandbox;

/// Builder for a ready-to-run simulation root.
///
/// ```rust
/// use simbox_core::SimulationBuilder;
///
/// let root = SimulationBuilder::new("mm1")
///     .seed(42)
///     .build()
///     .unwrap();
/// assert_eq!(root.label(), "mm1");
/// ```
pub struct SimulationBuilder {
    label: String,
    seed: u64,
    log_level: Option<String>,
}

impl SimulationBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            seed: 0,
            log_level: None,
        }
    }

    /// Seed for the root sandbox's RNG and for deterministic identities.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Install a logging subscriber at this level during `build`.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Validate the configuration and construct the root sandbox.
    pub fn build(self) -> Result<Sandbox, BuildError> {
        if self.label.is_empty() {
            return Err(BuildError::EmptyLabel);
        }
        if let Some(level) = &self.log_level {
            logging::try_init_logging_with_level(level).map_err(BuildError::Logging)?;
        }
        debug!(label = %self.label, seed = self.seed, "building simulation root");
        Ok(Sandbox::new(self.label, self.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_root() {
        let root = SimulationBuilder::new("system").seed(7).build().unwrap();
        assert_eq!(root.label(), "system");
        assert_eq!(root.seed(), 7);
        assert!(root.is_root());
    }

    #[test]
    fn test_empty_label_is_rejected() {
        let result = SimulationBuilder::new("").build();
        assert!(matches!(result, Err(BuildError::EmptyLabel)));
    }
}
