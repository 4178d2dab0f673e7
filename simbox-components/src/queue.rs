//! Capacity-bound FIFO queueing stage.
//!
//! Loads asked to enqueue wait in a pending list until the queue has room.
//! Enqueue attempts run as zero-delay events on the queue's own sandbox, so
//! notification chains between components never re-enter each other's state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;

use simbox_core::{HourCounter, HourCounterView, Sandbox};

use crate::error::ComponentError;

type LoadHooks<L> = Arc<Mutex<Vec<Box<dyn FnMut(&L) + Send>>>>;

struct QueueState<L> {
    capacity: Option<usize>,
    pending: VecDeque<L>,
    queueing: Vec<L>,
}

/// A FIFO queue with optional capacity, instrumented with an hour counter on
/// its occupancy.
#[derive(Clone)]
pub struct Queue<L> {
    sandbox: Sandbox,
    state: Arc<Mutex<QueueState<L>>>,
    on_enqueued: LoadHooks<L>,
    occupancy: HourCounter,
}

impl<L> Queue<L>
where
    L: Clone + PartialEq + Send + 'static,
{
    /// Create a queue as a child sandbox of `parent`. `None` capacity means
    /// unbounded; zero capacity is rejected.
    pub fn new(
        parent: &Sandbox,
        label: &str,
        seed: u64,
        capacity: Option<usize>,
    ) -> Result<Self, ComponentError> {
        if capacity == Some(0) {
            return Err(ComponentError::ZeroCapacity);
        }
        let sandbox = parent.add_child(label, seed);
        let occupancy = sandbox.add_hour_counter(false);
        Ok(Self {
            sandbox,
            state: Arc::new(Mutex::new(QueueState {
                capacity,
                pending: VecDeque::new(),
                queueing: Vec::new(),
            })),
            on_enqueued: Arc::new(Mutex::new(Vec::new())),
            occupancy,
        })
    }

    /// Register a hook fired when a load actually enters the queue.
    pub fn on_enqueued(&self, hook: impl FnMut(&L) + Send + 'static) {
        self.on_enqueued.lock().unwrap().push(Box::new(hook));
    }

    /// Ask to enqueue `load`: it joins the pending list and an enqueue
    /// attempt is scheduled at the current timestamp.
    pub fn rqst_enqueue(&self, load: L) {
        self.state.lock().unwrap().pending.push_back(load);
        self.schedule_attempt();
    }

    /// Remove a queueing load, freeing a slot and retriggering an attempt.
    /// Returns `false` if the load was not queueing.
    pub fn dequeue(&self, load: &L) -> bool {
        let removed = {
            let mut state = self.state.lock().unwrap();
            match state.queueing.iter().position(|queued| queued == load) {
                Some(position) => {
                    state.queueing.remove(position);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.occupancy.observe_change(-1.0);
            self.schedule_attempt();
        }
        removed
    }

    fn schedule_attempt(&self) {
        let queue = self.clone();
        self.sandbox
            .schedule_tagged(Duration::ZERO, "atmpt_enqueue", move || queue.attempt());
    }

    /// Move the head pending load into the queue if a slot is free.
    fn attempt(&self) {
        let admitted = {
            let mut state = self.state.lock().unwrap();
            let has_room = state
                .capacity
                .map_or(true, |capacity| state.queueing.len() < capacity);
            if has_room {
                state.pending.pop_front().map(|load| {
                    state.queueing.push(load.clone());
                    load
                })
            } else {
                None
            }
        };
        // Hooks fire with the state lock released.
        if let Some(load) = admitted {
            trace!(label = %self.sandbox.label(), "load enqueued");
            self.occupancy.observe_change(1.0);
            let mut hooks = self.on_enqueued.lock().unwrap();
            for hook in hooks.iter_mut() {
                hook(&load);
            }
        }
    }

    /// Number of loads currently queueing.
    pub fn length(&self) -> usize {
        self.state.lock().unwrap().queueing.len()
    }

    /// Number of loads waiting to enter the queue.
    pub fn pending_length(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.state.lock().unwrap().capacity
    }

    /// Time-weighted occupancy statistics.
    pub fn occupancy_counter(&self) -> HourCounterView {
        self.occupancy.as_read_only()
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }
}
