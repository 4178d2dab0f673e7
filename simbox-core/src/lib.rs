//! Hierarchical discrete-event simulation engine.
//!
//! This crate provides the building blocks for discrete-event models that
//! evolve over logical time: a tree of [`Sandbox`] scheduler nodes draining
//! per-node future-event lists against a single root clock, and the
//! [`HourCounter`] time-weighted statistic accumulator.
//!
//! # Architecture overview
//!
//! - [`Sandbox`]: a scheduler node. Every sandbox owns its own future-event
//!   list; the root owns the authoritative clock and the event index counter.
//!   Run control (step, run for a duration, run N events, wall-clock paced
//!   runs, warm-up) drives the whole tree regardless of which handle it is
//!   invoked on, executing events in strict `(time, index)` order tree-wide.
//!
//! - [`HourCounter`]: a piecewise-constant integrator bound to the tree's
//!   clock, recording count-hours, rates, utilization, percentiles and
//!   histograms, with pause/resume and warm-up semantics.
//!
//! # Basic usage
//!
//! ```rust
//! use simbox_core::{Sandbox, SimTime};
//! use std::time::Duration;
//!
//! let root = Sandbox::new("system", 42);
//! let worker = root.add_child("worker", 7);
//! let occupancy = worker.add_hour_counter(false);
//!
//! let busy = occupancy.clone();
//! worker.schedule(Duration::from_secs(3600), move || busy.observe_change(1.0));
//!
//! root.run_for(Duration::from_secs(7200));
//! assert_eq!(root.clock_time(), SimTime::from_hours(2));
//! assert_eq!(occupancy.average_count(), 0.5);
//! ```
//!
//! # Time model
//!
//! All timing uses [`SimTime`], logical time since the simulation epoch; wall
//! clock is consulted only by [`Sandbox::run_at_speed`]. Runs are
//! deterministic: replaying with the same seeds yields the same event trace.

pub mod builder;
pub mod error;
pub mod event;
pub mod hour_counter;
pub mod logging;
pub mod sandbox;
pub mod stats;
pub mod time;

pub use builder::SimulationBuilder;
pub use error::BuildError;
pub use event::{EventId, ScheduledEvent};
pub use hour_counter::{HistogramBin, HourCounter, HourCounterView};
pub use logging::{init_logging, init_logging_with_level, try_init_logging_with_level};
pub use sandbox::{ClockRef, Sandbox};
pub use stats::{Statics, StaticsSummary};
pub use time::SimTime;

/// The deterministic RNG owned by every sandbox.
pub type DefaultRng = rand_chacha::ChaCha8Rng;
