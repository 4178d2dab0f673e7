//! Arrival generation driven by an inter-arrival-time sampler.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, trace};

use simbox_core::{DefaultRng, Sandbox, SimTime};

use crate::error::ComponentError;

/// Sampler producing the delay until the next arrival from the owning
/// sandbox's deterministic RNG.
pub type InterArrival = Box<dyn FnMut(&mut DefaultRng) -> Duration + Send>;

type ArriveHooks = Arc<Mutex<Vec<Box<dyn FnMut() + Send>>>>;

struct GeneratorState {
    on: bool,
    count: u64,
    // Bumped on `end`; arrivals scheduled under an older phase are stale
    // even if the generator has been restarted since.
    phase: u64,
    start_time: Option<SimTime>,
    inter_arrival: InterArrival,
}

/// An on/off arrival source.
///
/// While on, the generator perpetually schedules its next arrival using the
/// sampler and emits an `on_arrive` notification per arrival. Turning it off
/// leaves the already-scheduled arrival in the event list; when that event
/// fires it is recognised as stale and ignored. The arrival count accumulates
/// across off/on cycles and is reset by warm-up.
#[derive(Clone)]
pub struct Generator {
    sandbox: Sandbox,
    state: Arc<Mutex<GeneratorState>>,
    hooks: ArriveHooks,
}

impl Generator {
    /// Create a generator as a child sandbox of `parent`.
    pub fn new(
        parent: &Sandbox,
        label: &str,
        seed: u64,
        inter_arrival: impl FnMut(&mut DefaultRng) -> Duration + Send + 'static,
    ) -> Self {
        Self::from_sandbox(parent.add_child(label, seed), Box::new(inter_arrival))
    }

    /// Create a generator with exponentially distributed inter-arrival times
    /// at `hourly_rate` arrivals per hour (a Poisson arrival process).
    pub fn exponential(
        parent: &Sandbox,
        label: &str,
        seed: u64,
        hourly_rate: f64,
    ) -> Result<Self, ComponentError> {
        if !hourly_rate.is_finite() || hourly_rate <= 0.0 {
            return Err(ComponentError::InvalidRate(hourly_rate));
        }
        let exp = rand_distr::Exp::new(hourly_rate).expect("validated rate");
        Ok(Self::new(parent, label, seed, move |rng| {
            let hours: f64 = rng.sample(exp);
            Duration::from_secs_f64(hours * 3600.0)
        }))
    }

    /// Wrap an existing sandbox. Used by sources that build their sampler
    /// against the sandbox's clock before construction.
    pub(crate) fn from_sandbox(sandbox: Sandbox, inter_arrival: InterArrival) -> Self {
        let generator = Self {
            sandbox,
            state: Arc::new(Mutex::new(GeneratorState {
                on: false,
                count: 0,
                phase: 0,
                start_time: None,
                inter_arrival,
            })),
            hooks: Arc::new(Mutex::new(Vec::new())),
        };
        let state = Arc::clone(&generator.state);
        generator.sandbox.on_warmed_up(move || {
            state.lock().unwrap().count = 0;
        });
        generator
    }

    /// Register a hook fired on every (non-stale) arrival.
    pub fn on_arrive(&self, hook: impl FnMut() + Send + 'static) {
        self.hooks.lock().unwrap().push(Box::new(hook));
    }

    /// Turn the generator on and schedule its first arrival. No-op while on.
    pub fn start(&self) {
        let mut state = self.state.lock().unwrap();
        if state.on {
            return;
        }
        state.on = true;
        state.start_time = Some(self.sandbox.clock_time());
        debug!(label = %self.sandbox.label(), at = %self.sandbox.clock_time(), "generator started");
        schedule_next(&self.sandbox, &self.state, &self.hooks, &mut state);
    }

    /// Turn the generator off. The outstanding arrival event still fires but
    /// is ignored. No-op while off.
    pub fn end(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.on {
            return;
        }
        state.on = false;
        state.phase += 1;
        debug!(label = %self.sandbox.label(), at = %self.sandbox.clock_time(), "generator stopped");
    }

    pub fn is_on(&self) -> bool {
        self.state.lock().unwrap().on
    }

    /// Arrivals emitted since construction or the last warm-up.
    pub fn count(&self) -> u64 {
        self.state.lock().unwrap().count
    }

    /// Clock time of the most recent `start`.
    pub fn start_time(&self) -> Option<SimTime> {
        self.state.lock().unwrap().start_time
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }
}

fn schedule_next(
    sandbox: &Sandbox,
    state: &Arc<Mutex<GeneratorState>>,
    hooks: &ArriveHooks,
    locked: &mut GeneratorState,
) {
    let phase = locked.phase;
    let sampler = &mut locked.inter_arrival;
    let delay = sandbox.with_rng(|rng| sampler(rng));
    let next_sandbox = sandbox.clone();
    let next_state = Arc::clone(state);
    let next_hooks = Arc::clone(hooks);
    sandbox.schedule_tagged(delay, "arrive", move || {
        arrive(&next_sandbox, &next_state, &next_hooks, phase)
    });
}

fn arrive(sandbox: &Sandbox, state: &Arc<Mutex<GeneratorState>>, hooks: &ArriveHooks, phase: u64) {
    {
        let mut locked = state.lock().unwrap();
        if !locked.on || locked.phase != phase {
            trace!(label = %sandbox.label(), "stale arrival ignored");
            return;
        }
        locked.count += 1;
        trace!(label = %sandbox.label(), count = locked.count, "arrival");
        schedule_next(sandbox, state, hooks, &mut locked);
    }
    // State lock released before notifying, so hooks may call back into the
    // generator or schedule freely.
    let mut hooks = hooks.lock().unwrap();
    for hook in hooks.iter_mut() {
        hook();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(period: Duration) -> impl FnMut(&mut DefaultRng) -> Duration + Send {
        move |_rng| period
    }

    #[test]
    fn test_start_schedules_arrivals() {
        let root = Sandbox::new("root", 0);
        let generator = Generator::new(&root, "arrivals", 1, constant(Duration::from_secs(60)));
        assert!(!generator.is_on());

        generator.start();
        assert!(generator.is_on());
        assert_eq!(generator.start_time(), Some(SimTime::zero()));

        root.run_for(Duration::from_secs(600));
        assert_eq!(generator.count(), 10);
    }

    #[test]
    fn test_start_is_idempotent() {
        let root = Sandbox::new("root", 0);
        let generator = Generator::new(&root, "arrivals", 1, constant(Duration::from_secs(60)));
        generator.start();
        generator.start();
        root.run_for(Duration::from_secs(120));
        // A second start must not schedule a second arrival stream.
        assert_eq!(generator.count(), 2);
    }

    #[test]
    fn test_end_leaves_stale_arrival_ignored() {
        let root = Sandbox::new("root", 0);
        let generator = Generator::new(&root, "arrivals", 1, constant(Duration::from_secs(60)));
        generator.start();
        root.run_for(Duration::from_secs(90));
        assert_eq!(generator.count(), 1);

        generator.end();
        assert!(!generator.is_on());
        // The outstanding arrival at t=120s fires but changes nothing.
        root.run_for(Duration::from_secs(600));
        assert_eq!(generator.count(), 1);
        assert!(!root.has_pending_events());
    }

    #[test]
    fn test_on_arrive_hooks_fire_per_arrival() {
        let root = Sandbox::new("root", 0);
        let generator = Generator::new(&root, "arrivals", 1, constant(Duration::from_secs(10)));
        let seen = Arc::new(Mutex::new(0u32));
        let tally = seen.clone();
        generator.on_arrive(move || *tally.lock().unwrap() += 1);

        generator.start();
        root.run_for(Duration::from_secs(35));
        assert_eq!(*seen.lock().unwrap(), 3);
    }

    #[test]
    fn test_warm_up_resets_count_only() {
        let root = Sandbox::new("root", 0);
        let generator = Generator::new(&root, "arrivals", 1, constant(Duration::from_secs(60)));
        generator.start();
        root.warm_up(Duration::from_secs(300));

        assert_eq!(generator.count(), 0);
        assert!(generator.is_on());
        root.run_for(Duration::from_secs(120));
        assert_eq!(generator.count(), 2);
    }

    #[test]
    fn test_exponential_rejects_bad_rate() {
        let root = Sandbox::new("root", 0);
        assert!(Generator::exponential(&root, "bad", 1, 0.0).is_err());
        assert!(Generator::exponential(&root, "bad", 1, -1.0).is_err());
        assert!(Generator::exponential(&root, "bad", 1, f64::NAN).is_err());
        assert!(Generator::exponential(&root, "ok", 1, 4.0).is_ok());
    }
}
