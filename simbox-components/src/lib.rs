//! Reference domain components for the simbox simulation engine.
//!
//! Each component owns a child sandbox under the caller's tree and exposes
//! hooks (`on_arrive`, `on_enqueued`, `on_started`, `on_ready_to_depart`)
//! that user models wire together. Hooks always fire with component state
//! unlocked, and capacity-gated admissions run as zero-delay events, so hook
//! chains may freely call back into any component.
//!
//! - [`Generator`]: on/off arrival source driven by an inter-arrival sampler.
//! - [`PatternGenerator`]: seasonal (non-homogeneous Poisson) arrivals via
//!   thinning.
//! - [`Queue`]: capacity-bound FIFO buffering with occupancy statistics.
//! - [`Server`]: multi-slot service stage with sampled service times.
//! - [`Mm1System`] / [`TandemSystem`]: end-to-end reference wirings.

pub mod error;
pub mod generator;
pub mod pattern;
pub mod queue;
pub mod server;
pub mod tandem;

pub use error::ComponentError;
pub use generator::{Generator, InterArrival};
pub use pattern::{PatternConfig, PatternGenerator};
pub use queue::Queue;
pub use server::{Server, ServiceTime};
pub use tandem::{Job, Mm1System, TandemSystem};
