//! Reference systems: an M/M/1 station and a tandem line of stations.
//!
//! These wire the generator, queue and server components together the way a
//! user model would: arrival hooks feed the first queue, enqueue hooks
//! request service, start hooks dequeue, and completion hooks depart and pass
//! the load downstream. A root-level hour counter on the number of loads in
//! the system yields sojourn times through Little's law.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use simbox_core::{HourCounter, HourCounterView, Sandbox, Statics};

use crate::error::ComponentError;
use crate::generator::Generator;
use crate::queue::Queue;
use crate::server::Server;

/// Opaque load flowing through the reference systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Job(pub u64);

/// Where a station's completed loads go.
enum StationExit {
    Downstream(Queue<Job>),
    LeaveSystem(HourCounter),
}

/// Feed generator arrivals into `queue`, tagging each with a fresh job id and
/// registering it on the in-system counter.
fn feed_from_generator(generator: &Generator, queue: &Queue<Job>, in_system: &HourCounter) {
    let next_job = Arc::new(AtomicU64::new(0));
    let queue = queue.clone();
    let in_system = in_system.clone();
    generator.on_arrive(move || {
        let job = Job(next_job.fetch_add(1, Ordering::SeqCst));
        in_system.observe_change(1.0);
        queue.rqst_enqueue(job);
    });
}

/// Connect one queue+server station: enqueued loads request service, started
/// loads leave the queue, completed loads depart and follow `exit`.
fn wire_station(queue: &Queue<Job>, server: &Server<Job>, exit: StationExit) {
    {
        let server = server.clone();
        queue.on_enqueued(move |job: &Job| server.rqst_start(*job));
    }
    {
        let queue = queue.clone();
        server.on_started(move |job: &Job| {
            queue.dequeue(job);
        });
    }
    {
        let server_handle = server.clone();
        server.on_ready_to_depart(move |job: &Job| {
            server_handle.depart(job);
            match &exit {
                StationExit::Downstream(next) => next.rqst_enqueue(*job),
                StationExit::LeaveSystem(in_system) => in_system.observe_change(-1.0),
            }
        });
    }
}

/// A single M/M/1 station: Poisson arrivals, one exponential server, an
/// unbounded queue.
pub struct Mm1System {
    root: Sandbox,
    generator: Generator,
    queue: Queue<Job>,
    server: Server<Job>,
    in_system: HourCounter,
}

impl Mm1System {
    pub fn new(
        label: &str,
        seed: u64,
        arrival_rate: f64,
        service_rate: f64,
    ) -> Result<Self, ComponentError> {
        let root = Sandbox::new(label, seed);
        let generator =
            Generator::exponential(&root, "arrivals", seed.wrapping_add(1), arrival_rate)?;
        let queue = Queue::new(&root, "queue", seed.wrapping_add(2), None)?;
        let server = Server::exponential(
            &root,
            "server",
            seed.wrapping_add(3),
            Some(1),
            service_rate,
        )?;
        let in_system = root.add_hour_counter(false);

        feed_from_generator(&generator, &queue, &in_system);
        wire_station(&queue, &server, StationExit::LeaveSystem(in_system.clone()));

        Ok(Self {
            root,
            generator,
            queue,
            server,
            in_system,
        })
    }

    /// Turn on the arrival stream.
    pub fn start(&self) {
        self.generator.start();
    }

    pub fn warm_up(&self, duration: Duration) -> bool {
        self.root.warm_up(duration)
    }

    pub fn run_for(&self, duration: Duration) -> bool {
        self.root.run_for(duration)
    }

    pub fn root(&self) -> &Sandbox {
        &self.root
    }

    pub fn arrival_count(&self) -> u64 {
        self.generator.count()
    }

    /// Time-weighted average queue length.
    pub fn avg_n_queueing(&self) -> f64 {
        self.queue.occupancy_counter().average_count()
    }

    /// Time-weighted average number in service (server utilization for a
    /// single slot).
    pub fn avg_n_serving(&self) -> f64 {
        self.server.serving_counter().average_count()
    }

    /// Average sojourn time per load, in hours (Little's law on the
    /// in-system counter).
    pub fn avg_hours_in_system(&self) -> f64 {
        self.in_system.average_duration()
    }

    pub fn in_system_counter(&self) -> HourCounterView {
        self.in_system.as_read_only()
    }

    /// All headline counters under stable names.
    pub fn statics(&self) -> Statics {
        let mut statics = Statics::new();
        statics.register("n_queueing", self.queue.occupancy_counter());
        statics.register("n_serving", self.server.serving_counter());
        statics.register("n_in_system", self.in_system.as_read_only());
        statics
    }
}

/// A tandem line: one arrival stream through several queue+server stations in
/// series.
pub struct TandemSystem {
    root: Sandbox,
    generator: Generator,
    stations: Vec<(Queue<Job>, Server<Job>)>,
    in_system: HourCounter,
}

impl TandemSystem {
    pub fn new(
        label: &str,
        seed: u64,
        arrival_rate: f64,
        service_rates: &[f64],
    ) -> Result<Self, ComponentError> {
        if service_rates.is_empty() {
            return Err(ComponentError::NoStations);
        }

        let root = Sandbox::new(label, seed);
        let generator =
            Generator::exponential(&root, "arrivals", seed.wrapping_add(1), arrival_rate)?;
        let in_system = root.add_hour_counter(false);

        let mut stations = Vec::with_capacity(service_rates.len());
        for (index, &rate) in service_rates.iter().enumerate() {
            let queue = Queue::new(
                &root,
                &format!("queue-{index}"),
                seed.wrapping_add(10 + 2 * index as u64),
                None,
            )?;
            let server = Server::exponential(
                &root,
                &format!("server-{index}"),
                seed.wrapping_add(11 + 2 * index as u64),
                Some(1),
                rate,
            )?;
            stations.push((queue, server));
        }

        feed_from_generator(&generator, &stations[0].0, &in_system);
        for index in 0..stations.len() {
            let exit = match stations.get(index + 1) {
                Some((next_queue, _)) => StationExit::Downstream(next_queue.clone()),
                None => StationExit::LeaveSystem(in_system.clone()),
            };
            let (queue, server) = &stations[index];
            wire_station(queue, server, exit);
        }

        Ok(Self {
            root,
            generator,
            stations,
            in_system,
        })
    }

    pub fn start(&self) {
        self.generator.start();
    }

    pub fn warm_up(&self, duration: Duration) -> bool {
        self.root.warm_up(duration)
    }

    pub fn run_for(&self, duration: Duration) -> bool {
        self.root.run_for(duration)
    }

    pub fn root(&self) -> &Sandbox {
        &self.root
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn avg_n_queueing(&self, station: usize) -> f64 {
        self.stations[station].0.occupancy_counter().average_count()
    }

    pub fn avg_n_serving(&self, station: usize) -> f64 {
        self.stations[station].1.serving_counter().average_count()
    }

    pub fn avg_hours_in_system(&self) -> f64 {
        self.in_system.average_duration()
    }
}
