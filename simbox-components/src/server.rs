//! Capacity-bound serving stage with sampled service times.
//!
//! Loads asked to start wait in a pending list; capacity counts both loads in
//! service and loads that finished but have not yet departed. Start attempts
//! run as zero-delay events, and all hooks fire with the server's state lock
//! released, mirroring the queue's re-entrancy discipline.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tracing::trace;

use simbox_core::{DefaultRng, HourCounter, HourCounterView, Sandbox};

use crate::error::ComponentError;

/// Sampler producing a service time for a load from the server sandbox's RNG.
pub type ServiceTime<L> = Box<dyn FnMut(&mut DefaultRng, &L) -> Duration + Send>;

type LoadHooks<L> = Arc<Mutex<Vec<Box<dyn FnMut(&L) + Send>>>>;

struct ServerState<L> {
    capacity: Option<usize>,
    pending: VecDeque<L>,
    serving: Vec<L>,
    pending_to_depart: Vec<L>,
    service_time: ServiceTime<L>,
}

impl<L: PartialEq> ServerState<L> {
    fn occupied(&self) -> usize {
        self.serving.len() + self.pending_to_depart.len()
    }
}

/// A multi-slot server.
///
/// Lifecycle of a load: `rqst_start` (pending) → start (serving, service time
/// sampled, `on_started`) → completion (pending-to-depart,
/// `on_ready_to_depart`) → external [`Server::depart`] frees the slot.
#[derive(Clone)]
pub struct Server<L> {
    sandbox: Sandbox,
    state: Arc<Mutex<ServerState<L>>>,
    on_started: LoadHooks<L>,
    on_ready_to_depart: LoadHooks<L>,
    serving: HourCounter,
    departing: HourCounter,
}

impl<L> Server<L>
where
    L: Clone + PartialEq + Send + 'static,
{
    /// Create a server as a child sandbox of `parent`. `None` capacity means
    /// unbounded; zero capacity is rejected.
    pub fn new(
        parent: &Sandbox,
        label: &str,
        seed: u64,
        capacity: Option<usize>,
        service_time: impl FnMut(&mut DefaultRng, &L) -> Duration + Send + 'static,
    ) -> Result<Self, ComponentError> {
        if capacity == Some(0) {
            return Err(ComponentError::ZeroCapacity);
        }
        let sandbox = parent.add_child(label, seed);
        let serving = sandbox.add_hour_counter(false);
        let departing = sandbox.add_hour_counter(false);
        Ok(Self {
            sandbox,
            state: Arc::new(Mutex::new(ServerState {
                capacity,
                pending: VecDeque::new(),
                serving: Vec::new(),
                pending_to_depart: Vec::new(),
                service_time: Box::new(service_time),
            })),
            on_started: Arc::new(Mutex::new(Vec::new())),
            on_ready_to_depart: Arc::new(Mutex::new(Vec::new())),
            serving,
            departing,
        })
    }

    /// Create a server with exponentially distributed service times at
    /// `hourly_rate` completions per hour per slot.
    pub fn exponential(
        parent: &Sandbox,
        label: &str,
        seed: u64,
        capacity: Option<usize>,
        hourly_rate: f64,
    ) -> Result<Self, ComponentError> {
        if !hourly_rate.is_finite() || hourly_rate <= 0.0 {
            return Err(ComponentError::InvalidRate(hourly_rate));
        }
        let exp = rand_distr::Exp::new(hourly_rate).expect("validated rate");
        Self::new(parent, label, seed, capacity, move |rng, _load| {
            let hours: f64 = rng.sample(exp);
            Duration::from_secs_f64(hours * 3600.0)
        })
    }

    /// Register a hook fired when a load enters service.
    pub fn on_started(&self, hook: impl FnMut(&L) + Send + 'static) {
        self.on_started.lock().unwrap().push(Box::new(hook));
    }

    /// Register a hook fired when a load finishes service.
    pub fn on_ready_to_depart(&self, hook: impl FnMut(&L) + Send + 'static) {
        self.on_ready_to_depart.lock().unwrap().push(Box::new(hook));
    }

    /// Ask to serve `load`: it joins the pending list and a start attempt is
    /// scheduled at the current timestamp.
    pub fn rqst_start(&self, load: L) {
        self.state.lock().unwrap().pending.push_back(load);
        self.schedule_attempt();
    }

    /// Remove a finished load, freeing a slot and retriggering a start
    /// attempt. Returns `false` if the load was not ready to depart.
    pub fn depart(&self, load: &L) -> bool {
        let removed = {
            let mut state = self.state.lock().unwrap();
            match state
                .pending_to_depart
                .iter()
                .position(|ready| ready == load)
            {
                Some(position) => {
                    state.pending_to_depart.remove(position);
                    true
                }
                None => false,
            }
        };
        if removed {
            trace!(label = %self.sandbox.label(), "load departed");
            self.departing.observe_change(-1.0);
            self.schedule_attempt();
        }
        removed
    }

    fn schedule_attempt(&self) {
        let server = self.clone();
        self.sandbox
            .schedule_tagged(Duration::ZERO, "atmpt_start", move || server.attempt());
    }

    /// Move the head pending load into service if a slot is free.
    fn attempt(&self) {
        let started = {
            let mut state = self.state.lock().unwrap();
            let has_room = state
                .capacity
                .map_or(true, |capacity| state.occupied() < capacity);
            if has_room {
                if let Some(load) = state.pending.pop_front() {
                    state.serving.push(load.clone());
                    let sampler = &mut state.service_time;
                    let service = self.sandbox.with_rng(|rng| sampler(rng, &load));
                    Some((load, service))
                } else {
                    None
                }
            } else {
                None
            }
        };

        if let Some((load, service)) = started {
            trace!(label = %self.sandbox.label(), service = ?service, "service started");
            self.serving.observe_change(1.0);

            let server = self.clone();
            let served = load.clone();
            self.sandbox
                .schedule_tagged(service, "ready_to_depart", move || {
                    server.ready_to_depart(served)
                });

            let mut hooks = self.on_started.lock().unwrap();
            for hook in hooks.iter_mut() {
                hook(&load);
            }
        }
    }

    fn ready_to_depart(&self, load: L) {
        {
            let mut state = self.state.lock().unwrap();
            let position = state
                .serving
                .iter()
                .position(|serving| *serving == load)
                .expect("completed load is in service");
            state.serving.remove(position);
            state.pending_to_depart.push(load.clone());
        }
        self.serving.observe_change(-1.0);
        self.departing.observe_change(1.0);

        let mut hooks = self.on_ready_to_depart.lock().unwrap();
        for hook in hooks.iter_mut() {
            hook(&load);
        }
    }

    pub fn n_serving(&self) -> usize {
        self.state.lock().unwrap().serving.len()
    }

    pub fn n_pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn n_pending_to_depart(&self) -> usize {
        self.state.lock().unwrap().pending_to_depart.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.state.lock().unwrap().capacity
    }

    /// Time-weighted in-service statistics.
    pub fn serving_counter(&self) -> HourCounterView {
        self.serving.as_read_only()
    }

    /// Time-weighted finished-but-not-departed statistics.
    pub fn departing_counter(&self) -> HourCounterView {
        self.departing.as_read_only()
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(service: Duration) -> impl FnMut(&mut DefaultRng, &u32) -> Duration + Send {
        move |_rng, _load| service
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_load_flows_through_the_stages() {
        let root = Sandbox::new("root", 0);
        let server = Server::new(&root, "server", 1, Some(1), fixed(10 * MINUTE)).unwrap();

        server.rqst_start(1u32);
        root.run_for(Duration::ZERO);
        assert_eq!(server.n_serving(), 1);
        assert_eq!(server.n_pending_to_depart(), 0);

        root.run_for(10 * MINUTE);
        assert_eq!(server.n_serving(), 0);
        assert_eq!(server.n_pending_to_depart(), 1);

        assert!(server.depart(&1));
        assert!(!server.depart(&1));
        assert_eq!(server.n_pending_to_depart(), 0);
    }

    #[test]
    fn test_capacity_counts_undeparted_loads() {
        let root = Sandbox::new("root", 0);
        let server = Server::new(&root, "server", 1, Some(1), fixed(MINUTE)).unwrap();

        server.rqst_start(1u32);
        server.rqst_start(2u32);
        root.run_for(5 * MINUTE);

        // First load finished but never departed: the slot stays occupied.
        assert_eq!(server.n_pending_to_depart(), 1);
        assert_eq!(server.n_serving(), 0);
        assert_eq!(server.n_pending(), 1);

        // Departing frees the slot and the second load starts.
        assert!(server.depart(&1));
        root.run_for(5 * MINUTE);
        assert_eq!(server.n_pending(), 0);
        assert_eq!(server.n_pending_to_depart(), 1);
    }

    #[test]
    fn test_hooks_fire_in_lifecycle_order() {
        let root = Sandbox::new("root", 0);
        let server = Server::new(&root, "server", 1, None, fixed(MINUTE)).unwrap();
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let started = log.clone();
        server.on_started(move |load| started.lock().unwrap().push(format!("start {load}")));
        let ready = log.clone();
        server.on_ready_to_depart(move |load| ready.lock().unwrap().push(format!("ready {load}")));

        server.rqst_start(1u32);
        server.rqst_start(2u32);
        root.run_for(2 * MINUTE);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start 1", "start 2", "ready 1", "ready 2"]
        );
    }

    #[test]
    fn test_serving_counter_tracks_busy_time() {
        let root = Sandbox::new("root", 0);
        let server = Server::new(&root, "server", 1, Some(1), fixed(30 * MINUTE)).unwrap();

        server.rqst_start(1u32);
        root.run_for(Duration::from_secs(3600));

        // Busy the first half hour of one hour.
        assert_eq!(server.serving_counter().average_count(), 0.5);
        assert_eq!(server.departing_counter().last_count(), 1.0);
    }

    #[test]
    fn test_auto_depart_wiring() {
        let root = Sandbox::new("root", 0);
        let server = Server::new(&root, "server", 1, Some(1), fixed(MINUTE)).unwrap();

        let sink = server.clone();
        server.on_ready_to_depart(move |load| {
            sink.depart(load);
        });

        for load in 0..5u32 {
            server.rqst_start(load);
        }
        root.run_for(10 * MINUTE);
        assert_eq!(server.n_pending(), 0);
        assert_eq!(server.n_serving(), 0);
        assert_eq!(server.n_pending_to_depart(), 0);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let root = Sandbox::new("root", 0);
        assert!(Server::<u32>::new(&root, "server", 1, Some(0), fixed(MINUTE)).is_err());
    }
}
