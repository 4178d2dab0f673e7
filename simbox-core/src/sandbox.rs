//! The sandbox tree: scheduler nodes, the shared clock, and run control.
//!
//! A [`Sandbox`] is a node in a tree of schedulers. Every node owns its own
//! future-event list; the root owns the authoritative clock and the event
//! index counter. Run control always operates on the whole tree: the head
//! event is the earliest event (by `(time, index)`) across every node's FEL,
//! so events interleave in strict FIFO order tree-wide.
//!
//! `Sandbox` is a cloneable handle onto shared tree state. Event actions are
//! invoked with the tree lock released, so an action may freely call
//! [`Sandbox::schedule`] (or any other mutation except `run*`, which is a
//! reentrancy violation and panics).
//!
//! # Reading time
//!
//! For lock-free time reading, use [`ClockRef`]:
//!
//! ```rust
//! use simbox_core::Sandbox;
//! let root = Sandbox::new("system", 42);
//! let clock = root.clock();
//! assert_eq!(clock.time(), root.clock_time());
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::event::{Event, EventId, EventKey, Fel, ScheduledEvent};
use crate::hour_counter::HourCounter;
use crate::SimTime;

type Clock = Arc<AtomicU64>;

/// 64-bit avalanche finalizer (murmur-style).
fn avalanche(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 33;
    x = x.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    x ^ (x >> 33)
}

/// Derive a node's identity from the root seed, its creation rank, and its
/// label, so identities are reproducible across runs and stable in traces.
fn node_uuid(seed: u64, rank: u64, label: &str) -> Uuid {
    let mut hash = seed ^ rank.rotate_left(32);
    for byte in label.bytes() {
        hash = (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01B3);
    }
    let lo = avalanche(hash);
    let hi = avalanche(hash.rotate_left(31) ^ !rank);
    Uuid::from_u128((u128::from(hi) << 64) | u128::from(lo))
}

fn simtime_to_nanos(time: SimTime) -> u64 {
    time.as_nanos()
}

fn nanos_to_simtime(nanos: u64) -> SimTime {
    SimTime::from_nanos(nanos)
}

/// A lightweight, lock-free reference for reading simulation time.
///
/// Every sandbox in a tree reads the same root clock through its `ClockRef`,
/// which is what makes the clock appear to "read through" to the root on any
/// descendant.
#[derive(Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        nanos_to_simtime(self.clock.load(AtomicOrdering::Relaxed))
    }
}

/// Warm-up multicast entry. Appended by `add_child`, `add_hour_counter`, and
/// `on_warmed_up`; invoked in insertion order.
#[derive(Clone)]
enum WarmUpHandler {
    Child(usize),
    Counter(HourCounter),
    Hook(Arc<Mutex<Box<dyn FnMut() + Send>>>),
}

struct Node {
    id: Uuid,
    label: String,
    seed: u64,
    rng: ChaCha8Rng,
    fel: Fel,
    parent: Option<usize>,
    children: Vec<usize>,
    warm_up: Vec<WarmUpHandler>,
}

impl Node {
    fn new(id: Uuid, label: String, seed: u64, parent: Option<usize>) -> Self {
        Self {
            id,
            label,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            fel: Fel::default(),
            parent,
            children: Vec::new(),
            warm_up: Vec::new(),
        }
    }
}

struct Tree {
    clock: Clock,
    next_event_id: u64,
    nodes: Vec<Node>,
    running: bool,
    pace_mark: Option<Instant>,
    id_seed: u64,
}

impl Tree {
    fn time(&self) -> SimTime {
        nanos_to_simtime(self.clock.load(AtomicOrdering::Relaxed))
    }

    /// Advance the clock. The clock never retreats.
    fn advance_to(&self, time: SimTime) {
        if time > self.time() {
            self.clock
                .store(simtime_to_nanos(time), AtomicOrdering::Relaxed);
        }
    }

    /// Allocate the next event index: the counter starts at 0 and each
    /// allocation returns the pre-assigned value before incrementing.
    fn allocate_event_id(&mut self) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        id
    }

    /// The `(node, key)` of the earliest event across every FEL in the tree.
    fn head(&self) -> Option<(usize, EventKey)> {
        let mut best: Option<(usize, EventKey)> = None;
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(key) = node.fel.min().map(Event::key) {
                if best.map_or(true, |(_, best_key)| key < best_key) {
                    best = Some((index, key));
                }
            }
        }
        best
    }

    /// Remove the head event and advance the clock to its timestamp.
    fn pop_head(&mut self) -> Option<Event> {
        let (index, key) = self.head()?;
        let event = self.nodes[index]
            .fel
            .remove(key)
            .expect("head event present in its owner's FEL");
        debug_assert!(event.time >= self.time(), "head event is in the past");
        self.advance_to(event.time);
        Some(event)
    }

    fn events_pending(&self) -> bool {
        self.nodes.iter().any(|node| !node.fel.is_empty())
    }
}

/// A scheduler node in a hierarchical simulation.
///
/// Create the root with [`Sandbox::new`]; build the hierarchy with
/// [`Sandbox::add_child`]. Handles are cheap to clone and all refer to the
/// same shared tree, so run control may be invoked through any of them and
/// always drives the whole tree against the root clock.
#[derive(Clone)]
pub struct Sandbox {
    tree: Arc<Mutex<Tree>>,
    node: usize,
    id: Uuid,
    clock: ClockRef,
}

impl PartialEq for Sandbox {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Sandbox {}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", &self.id)
            .field("label", &self.label())
            .finish()
    }
}

impl Sandbox {
    /// Create the root of a new simulation tree.
    pub fn new(label: impl Into<String>, seed: u64) -> Self {
        let label = label.into();
        let clock: Clock = Arc::new(AtomicU64::new(0));
        let id = node_uuid(seed, 0, &label);
        let tree = Tree {
            clock: Arc::clone(&clock),
            next_event_id: 0,
            nodes: vec![Node::new(id, label.clone(), seed, None)],
            running: false,
            pace_mark: None,
            id_seed: seed,
        };
        info!(label = %label, seed, "simulation root created");
        Self {
            tree: Arc::new(Mutex::new(tree)),
            node: 0,
            id,
            clock: ClockRef { clock },
        }
    }

    /// Add a child sandbox under this node and register its warm-up
    /// propagation with this node's multicast list.
    pub fn add_child(&self, label: impl Into<String>, seed: u64) -> Sandbox {
        let label = label.into();
        let mut tree = self.tree.lock().unwrap();
        let index = tree.nodes.len();
        let id = node_uuid(tree.id_seed, index as u64, &label);
        tree.nodes.push(Node::new(id, label.clone(), seed, Some(self.node)));
        tree.nodes[self.node].children.push(index);
        tree.nodes[self.node].warm_up.push(WarmUpHandler::Child(index));
        debug!(
            parent = %tree.nodes[self.node].label,
            child = %label,
            seed,
            "sandbox attached"
        );
        Sandbox {
            tree: Arc::clone(&self.tree),
            node: index,
            id,
            clock: self.clock.clone(),
        }
    }

    /// Create an hour counter bound to this tree's clock and register its
    /// warm-up reset with this node's multicast list.
    pub fn add_hour_counter(&self, keep_history: bool) -> HourCounter {
        let counter = HourCounter::new(self.clock.clone(), keep_history);
        let mut tree = self.tree.lock().unwrap();
        tree.nodes[self.node]
            .warm_up
            .push(WarmUpHandler::Counter(counter.clone()));
        counter
    }

    /// Register a hook invoked when warm-up reaches this node.
    ///
    /// Domain modules use this to reset their transient statistics at the
    /// warm-up horizon.
    pub fn on_warmed_up(&self, hook: impl FnMut() + Send + 'static) {
        let mut tree = self.tree.lock().unwrap();
        tree.nodes[self.node]
            .warm_up
            .push(WarmUpHandler::Hook(Arc::new(Mutex::new(Box::new(hook)))));
    }

    // ------------------------------------------------------------------
    // Identity and introspection
    // ------------------------------------------------------------------

    /// Stable identity of this node, derived deterministically from the root
    /// seed and the node's creation rank.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The node's label.
    pub fn label(&self) -> String {
        self.tree.lock().unwrap().nodes[self.node].label.clone()
    }

    /// The seed this node's RNG was last seeded with.
    pub fn seed(&self) -> u64 {
        self.tree.lock().unwrap().nodes[self.node].seed
    }

    /// Current simulation time (lock-free; reads through to the root clock).
    pub fn clock_time(&self) -> SimTime {
        self.clock.time()
    }

    /// A lock-free reference onto the root clock.
    pub fn clock(&self) -> ClockRef {
        self.clock.clone()
    }

    /// Whether this node is the tree root.
    pub fn is_root(&self) -> bool {
        self.tree.lock().unwrap().nodes[self.node].parent.is_none()
    }

    /// The parent sandbox, if any.
    pub fn parent(&self) -> Option<Sandbox> {
        let tree = self.tree.lock().unwrap();
        tree.nodes[self.node].parent.map(|index| Sandbox {
            tree: Arc::clone(&self.tree),
            node: index,
            id: tree.nodes[index].id,
            clock: self.clock.clone(),
        })
    }

    /// An immutable snapshot of this node's children.
    pub fn children(&self) -> Vec<Sandbox> {
        let tree = self.tree.lock().unwrap();
        tree.nodes[self.node]
            .children
            .iter()
            .map(|&index| Sandbox {
                tree: Arc::clone(&self.tree),
                node: index,
                id: tree.nodes[index].id,
                clock: self.clock.clone(),
            })
            .collect()
    }

    /// Number of events pending in this node's own FEL.
    pub fn pending_events(&self) -> usize {
        self.tree.lock().unwrap().nodes[self.node].fel.len()
    }

    /// Whether any event is pending anywhere in the tree.
    pub fn has_pending_events(&self) -> bool {
        self.tree.lock().unwrap().events_pending()
    }

    /// Timestamp of the earliest event anywhere in the tree.
    pub fn next_event_time(&self) -> Option<SimTime> {
        let tree = self.tree.lock().unwrap();
        tree.head().map(|(_, (time, _))| time)
    }

    // ------------------------------------------------------------------
    // Randomness
    // ------------------------------------------------------------------

    /// Run a sampler against this node's deterministic RNG.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut tree = self.tree.lock().unwrap();
        f(&mut tree.nodes[self.node].rng)
    }

    /// Replace this node's RNG with a fresh one seeded by `seed`.
    pub fn update_random_seed(&self, seed: u64) {
        let mut tree = self.tree.lock().unwrap();
        let node = &mut tree.nodes[self.node];
        node.seed = seed;
        node.rng = ChaCha8Rng::seed_from_u64(seed);
        debug!(label = %node.label, seed, "sandbox reseeded");
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Schedule `action` into this node's own FEL at `clock + delay`.
    ///
    /// Delays are `Duration`s and therefore non-negative by construction.
    /// Returns a token that can be passed to [`Sandbox::cancel`].
    pub fn schedule(
        &self,
        delay: Duration,
        action: impl FnOnce() + Send + 'static,
    ) -> ScheduledEvent {
        self.schedule_inner(delay, None, Box::new(action))
    }

    /// Schedule `action` at `clock + delay`, carrying a label for tracing.
    pub fn schedule_tagged(
        &self,
        delay: Duration,
        tag: &str,
        action: impl FnOnce() + Send + 'static,
    ) -> ScheduledEvent {
        self.schedule_inner(delay, Some(tag.to_string()), Box::new(action))
    }

    /// Schedule `action` at the current timestamp (zero delay).
    pub fn schedule_now(&self, action: impl FnOnce() + Send + 'static) -> ScheduledEvent {
        self.schedule_inner(Duration::ZERO, None, Box::new(action))
    }

    fn schedule_inner(
        &self,
        delay: Duration,
        tag: Option<String>,
        action: Box<dyn FnOnce() + Send>,
    ) -> ScheduledEvent {
        let mut tree = self.tree.lock().unwrap();
        let id = tree.allocate_event_id();
        let time = tree.time() + delay;
        trace!(
            event_id = %id,
            scheduled_time = %time,
            current_time = %tree.time(),
            owner = %tree.nodes[self.node].label,
            tag = tag.as_deref().unwrap_or(""),
            "event scheduled"
        );
        let key = tree.nodes[self.node].fel.insert(Event {
            id,
            time,
            owner: self.id,
            action: Some(action),
            tag,
        });

        if tree.next_event_id % 1000 == 0 {
            debug!(
                current_time = %tree.time(),
                total_events_scheduled = tree.next_event_id,
                "scheduler state update"
            );
        }

        ScheduledEvent {
            owner: self.node,
            key,
        }
    }

    /// Remove a pending event from its owner's FEL.
    ///
    /// Returns `false` if the event already fired or was cancelled.
    pub fn cancel(&self, event: ScheduledEvent) -> bool {
        let mut tree = self.tree.lock().unwrap();
        tree.nodes[event.owner].fel.remove(event.key).is_some()
    }

    // ------------------------------------------------------------------
    // Run control
    // ------------------------------------------------------------------

    /// Execute the single earliest event in the tree.
    ///
    /// Removes the head event from its owner's FEL, advances the clock to its
    /// timestamp, and invokes its action. Returns `false` if no event exists
    /// anywhere in the tree (not an error).
    pub fn run_once(&self) -> bool {
        self.step()
    }

    /// Execute up to `count` events; `false` as soon as the tree runs dry.
    pub fn run_events(&self, count: usize) -> bool {
        for _ in 0..count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Run for a logical duration: `run_until(clock + duration)`.
    pub fn run_for(&self, duration: Duration) -> bool {
        self.run_until(self.clock_time() + duration)
    }

    /// Execute every event with timestamp `<= terminate`, then advance the
    /// clock to `terminate` even if no further events fired.
    ///
    /// Returns `true` iff an event remains anywhere in the tree, i.e. whether
    /// the simulation can continue.
    ///
    /// # Panics
    ///
    /// Panics if `terminate` is in the past or when called from inside an
    /// event action.
    pub fn run_until(&self, terminate: SimTime) -> bool {
        self.assert_not_running();
        let now = self.clock_time();
        assert!(
            terminate >= now,
            "cannot run until {terminate}: clock is already at {now}"
        );

        loop {
            let head_due = {
                let tree = self.tree.lock().unwrap();
                matches!(tree.head(), Some((_, (time, _))) if time <= terminate)
            };
            if !head_due {
                break;
            }
            self.step();
        }

        let tree = self.tree.lock().unwrap();
        tree.advance_to(terminate);
        let remaining = tree.events_pending();
        debug!(final_time = %tree.time(), remaining, "run horizon reached");
        remaining
    }

    /// Run paced against wall-clock time, scaled by `speed`.
    ///
    /// Each call observes the wall-clock time elapsed since the previous call
    /// and executes `run_until(clock + elapsed * speed)`. The first call only
    /// seeds the wall-clock reference and returns `true` without executing
    /// events.
    pub fn run_at_speed(&self, speed: f64) -> bool {
        assert!(
            speed.is_finite() && speed > 0.0,
            "speed must be positive and finite, got {speed}"
        );
        let elapsed = {
            let mut tree = self.tree.lock().unwrap();
            let now = Instant::now();
            match tree.pace_mark.replace(now) {
                None => return true,
                Some(previous) => now - previous,
            }
        };
        let scaled = Duration::from_secs_f64(elapsed.as_secs_f64() * speed);
        self.run_until(self.clock_time() + scaled)
    }

    /// Run to `clock + duration`, then fan the warm-up notification out over
    /// the entire subtree: every registered hour counter resets its
    /// accumulators and every warm-up hook fires, in registration order.
    ///
    /// Returns `true` iff an event remains in the tree afterwards.
    pub fn warm_up(&self, duration: Duration) -> bool {
        let remaining = self.run_until(self.clock_time() + duration);
        info!(horizon = %self.clock_time(), "warm-up horizon reached, resetting statistics");
        fan_out_warm_up(&self.tree, 0);
        remaining
    }

    fn assert_not_running(&self) {
        let tree = self.tree.lock().unwrap();
        assert!(
            !tree.running,
            "run* called re-entrantly from within an event action"
        );
    }

    /// Pop and execute the head event. The action runs with the tree lock
    /// released so it can schedule follow-up events.
    fn step(&self) -> bool {
        let action = {
            let mut tree = self.tree.lock().unwrap();
            assert!(
                !tree.running,
                "run* called re-entrantly from within an event action"
            );
            let Some(event) = tree.pop_head() else {
                return false;
            };
            trace!(
                event_id = %event.id,
                time = %event.time,
                tag = event.tag.as_deref().unwrap_or(""),
                "processing event"
            );
            tree.running = true;
            event.action
        };

        if let Some(action) = action {
            action();
        }

        self.tree.lock().unwrap().running = false;
        true
    }
}

/// Walk a node's warm-up multicast list in insertion order, recursing into
/// children. Invoked with the tree lock released so hooks and counter resets
/// may touch the engine.
fn fan_out_warm_up(tree: &Arc<Mutex<Tree>>, node: usize) {
    let handlers = tree.lock().unwrap().nodes[node].warm_up.clone();
    for handler in handlers {
        match handler {
            WarmUpHandler::Child(child) => fan_out_warm_up(tree, child),
            WarmUpHandler::Counter(counter) => counter.warmed_up(),
            WarmUpHandler::Hook(hook) => {
                let mut hook = hook.lock().unwrap();
                (*hook)();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_clock_starts_at_zero() {
        let root = Sandbox::new("root", 0);
        assert_eq!(root.clock_time(), SimTime::zero());
        assert_eq!(root.clock().time(), SimTime::zero());
        assert!(root.is_root());
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_run_once_advances_clock_and_fires_action() {
        let root = Sandbox::new("root", 0);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        root.schedule(Duration::from_secs(3), move || {
            fired2.fetch_add(1, AtomicOrdering::SeqCst);
        });

        assert!(root.run_once());
        assert_eq!(root.clock_time(), SimTime::from_secs(3));
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);

        // Empty tree: false, clock untouched.
        assert!(!root.run_once());
        assert_eq!(root.clock_time(), SimTime::from_secs(3));
    }

    #[test]
    fn test_children_merge_into_global_order() {
        let root = Sandbox::new("root", 0);
        let child = root.add_child("child", 1);
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let log = order.clone();
        child.schedule(Duration::from_secs(2), move || log.lock().unwrap().push("child"));
        let log = order.clone();
        root.schedule(Duration::from_secs(1), move || log.lock().unwrap().push("root"));

        assert!(!root.run_until(SimTime::from_secs(5)));
        assert_eq!(*order.lock().unwrap(), vec!["root", "child"]);
        assert_eq!(root.clock_time(), SimTime::from_secs(5));
    }

    #[test]
    fn test_same_timestamp_fifo_across_nodes() {
        let root = Sandbox::new("root", 0);
        let child = root.add_child("child", 1);
        let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        // Scheduling order decides: child first, then root, then child again.
        for (sandbox, mark) in [(&child, 0u32), (&root, 1), (&child, 2)] {
            let log = order.clone();
            sandbox.schedule(Duration::from_secs(1), move || log.lock().unwrap().push(mark));
        }

        root.run_for(Duration::from_secs(1));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_delay_runs_at_current_clock() {
        let root = Sandbox::new("root", 0);
        root.run_for(Duration::from_secs(10));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let clock = root.clock();
        root.schedule_now(move || log.lock().unwrap().push(clock.time()));
        assert!(!root.run_for(Duration::ZERO));

        assert_eq!(*seen.lock().unwrap(), vec![SimTime::from_secs(10)]);
        assert_eq!(root.clock_time(), SimTime::from_secs(10));
    }

    #[test]
    fn test_actions_can_schedule_follow_ups() {
        let root = Sandbox::new("root", 0);
        let count = Arc::new(AtomicUsize::new(0));

        fn tick(sandbox: Sandbox, count: Arc<AtomicUsize>) {
            if count.fetch_add(1, AtomicOrdering::SeqCst) < 9 {
                let next = sandbox.clone();
                sandbox.schedule(Duration::from_secs(2), move || tick(next, count));
            }
        }

        let handle = root.clone();
        let count2 = count.clone();
        root.schedule_now(move || tick(handle, count2));

        assert!(!root.run_events(100));
        assert_eq!(count.load(AtomicOrdering::SeqCst), 10);
        assert_eq!(root.clock_time(), SimTime::from_secs(18));
    }

    #[test]
    fn test_run_events_counts_steps() {
        let root = Sandbox::new("root", 0);
        for i in 0..5u64 {
            root.schedule(Duration::from_secs(i), || {});
        }
        assert!(root.run_events(3));
        assert_eq!(root.clock_time(), SimTime::from_secs(2));
        assert!(!root.run_events(3));
        assert_eq!(root.clock_time(), SimTime::from_secs(4));
    }

    #[test]
    fn test_cancel_leaves_twin_event() {
        let root = Sandbox::new("root", 0);
        let fired = Arc::new(Mutex::new(Vec::new()));

        let log = fired.clone();
        let first = root.schedule(Duration::from_secs(1), move || log.lock().unwrap().push("first"));
        let log = fired.clone();
        root.schedule(Duration::from_secs(1), move || log.lock().unwrap().push("second"));

        assert!(root.cancel(first));
        assert!(!root.cancel(first));

        root.run_for(Duration::from_secs(1));
        assert_eq!(*fired.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_run_at_speed_first_call_seeds_reference() {
        let root = Sandbox::new("root", 0);
        root.schedule(Duration::from_secs(1_000_000), || {});
        assert!(root.run_at_speed(1000.0));
        assert_eq!(root.clock_time(), SimTime::zero());
        // Subsequent calls advance by scaled wall time; the far-future event
        // stays pending for any realistic test duration.
        assert!(root.run_at_speed(1000.0));
        assert!(root.has_pending_events());
    }

    #[test]
    #[should_panic(expected = "re-entrantly")]
    fn test_reentrant_run_panics() {
        let root = Sandbox::new("root", 0);
        let inner = root.clone();
        root.schedule_now(move || {
            inner.run_once();
        });
        root.run_once();
    }

    #[test]
    #[should_panic(expected = "cannot run until")]
    fn test_run_until_into_the_past_panics() {
        let root = Sandbox::new("root", 0);
        root.run_for(Duration::from_secs(5));
        root.run_until(SimTime::from_secs(1));
    }

    #[test]
    fn test_event_index_is_monotonic() {
        let root = Sandbox::new("root", 0);
        let child = root.add_child("child", 7);
        let a = root.schedule(Duration::from_secs(1), || {});
        let b = child.schedule(Duration::from_secs(1), || {});
        let c = root.schedule_now(|| {});
        assert!(a.id() < b.id());
        assert!(b.id() < c.id());
    }

    #[test]
    fn test_with_rng_is_deterministic() {
        use rand::Rng;

        let draw = |seed: u64| {
            let root = Sandbox::new("root", seed);
            root.with_rng(|rng| rng.gen::<u64>())
        };
        assert_eq!(draw(11), draw(11));
        assert_ne!(draw(11), draw(12));

        let root = Sandbox::new("root", 11);
        let first = root.with_rng(|rng| rng.gen::<u64>());
        root.update_random_seed(11);
        let replayed = root.with_rng(|rng| rng.gen::<u64>());
        assert_eq!(first, replayed);
    }

    #[test]
    fn test_node_identities_are_reproducible() {
        let build = |seed: u64| {
            let root = Sandbox::new("root", seed);
            let child = root.add_child("child", 1);
            (root.id(), child.id())
        };
        assert_eq!(build(42), build(42));
        assert_ne!(build(42), build(43));

        // Same rank, different label still separates identities.
        assert_ne!(node_uuid(42, 1, "queue"), node_uuid(42, 1, "server"));
        assert_ne!(node_uuid(42, 1, "queue"), node_uuid(42, 2, "queue"));
    }

    #[test]
    fn test_children_snapshot() {
        let root = Sandbox::new("root", 0);
        let a = root.add_child("a", 1);
        let b = root.add_child("b", 2);
        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], a);
        assert_eq!(children[1], b);
        assert_eq!(a.parent().unwrap(), root);
        assert!(!a.is_root());
    }
}
