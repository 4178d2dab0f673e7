//! Time-weighted statistic accumulation.
//!
//! An [`HourCounter`] integrates a piecewise-constant count over simulation
//! time, read from the owning tree's clock. It accumulates total count-hours,
//! increment/decrement totals, active duration, and a per-count-value time
//! distribution, from which averages, rates, utilization, percentiles and
//! histograms are derived. Counters can be paused (intervals are then ignored
//! entirely) and are reset by warm-up while preserving the current level.
//!
//! Counter handles are cheap clones of shared state, like sandbox handles;
//! [`HourCounter::as_read_only`] narrows one to its query surface.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::sandbox::ClockRef;
use crate::SimTime;

fn hours(duration: Duration) -> f64 {
    duration.as_secs_f64() / 3600.0
}

/// Map key ordering observed counts by `f64::total_cmp`.
#[derive(Debug, Clone, Copy)]
struct CountKey(f64);

impl PartialEq for CountKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for CountKey {}

impl PartialOrd for CountKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CountKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One bin of [`HourCounter::histogram`]: counts in `[lower, lower + width)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower bound of the bin.
    pub lower: f64,
    /// Active hours spent at count values inside the bin.
    pub hours: f64,
    /// Share of total active hours.
    pub probability: f64,
    /// Running share up to and including this bin.
    pub cum_probability: f64,
}

#[derive(Debug)]
struct CounterState {
    initial_time: SimTime,
    last_time: SimTime,
    last_count: f64,
    total_increment: f64,
    total_decrement: f64,
    total_hours: f64,
    cum_value: f64,
    paused: bool,
    keep_history: bool,
    history: Option<BTreeMap<SimTime, f64>>,
    hours_for_count: BTreeMap<CountKey, f64>,
}

impl CounterState {
    fn new(now: SimTime, keep_history: bool) -> Self {
        Self {
            initial_time: now,
            last_time: now,
            last_count: 0.0,
            total_increment: 0.0,
            total_decrement: 0.0,
            total_hours: 0.0,
            cum_value: 0.0,
            paused: false,
            keep_history,
            history: keep_history.then(BTreeMap::new),
            hours_for_count: BTreeMap::new(),
        }
    }

    /// Close the interval since `last_time` and take a new level.
    ///
    /// While paused, only the level and timestamp are updated; no interval
    /// is accumulated and no increment/decrement is registered.
    fn observe(&mut self, count: f64, at: SimTime, record: bool) {
        if at < self.last_time {
            panic!(
                "hour counter observed at {at}, behind its last observation at {}",
                self.last_time
            );
        }
        if !self.paused {
            let delta_hours = hours(at - self.last_time);
            self.total_hours += delta_hours;
            self.cum_value += delta_hours * self.last_count;
            if count > self.last_count {
                self.total_increment += count - self.last_count;
            } else {
                self.total_decrement += self.last_count - count;
            }
            *self
                .hours_for_count
                .entry(CountKey(self.last_count))
                .or_insert(0.0) += delta_hours;
        }
        self.last_time = at;
        self.last_count = count;
        if record {
            if let Some(history) = &mut self.history {
                history.insert(at, count);
            }
        }
    }

    /// Virtual observation at the current level, used to bring the
    /// accumulators up to `at` before a query. Does not touch history.
    fn sync(&mut self, at: SimTime) {
        self.observe(self.last_count, at, false);
    }

    fn reset(&mut self, now: SimTime) {
        self.initial_time = now;
        self.last_time = now;
        self.total_increment = 0.0;
        self.total_decrement = 0.0;
        self.total_hours = 0.0;
        self.cum_value = 0.0;
        self.hours_for_count.clear();
        if self.keep_history {
            self.history = Some(BTreeMap::new());
        }
    }
}

/// A time-weighted statistic accumulator bound to a simulation clock.
///
/// Obtained from [`Sandbox::add_hour_counter`](crate::Sandbox::add_hour_counter),
/// which also registers the counter for warm-up resets.
#[derive(Clone)]
pub struct HourCounter {
    state: Arc<Mutex<CounterState>>,
    clock: ClockRef,
}

impl HourCounter {
    pub(crate) fn new(clock: ClockRef, keep_history: bool) -> Self {
        let now = clock.time();
        Self {
            state: Arc::new(Mutex::new(CounterState::new(now, keep_history))),
            clock,
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Observe a new count level at the current clock time.
    ///
    /// # Panics
    ///
    /// Panics if the clock is behind the counter's last observation, which
    /// indicates a logic error in clock handling.
    pub fn observe_count(&self, count: f64) {
        let at = self.clock.time();
        self.state.lock().unwrap().observe(count, at, true);
    }

    /// Observe a change relative to the current level.
    pub fn observe_change(&self, delta: f64) {
        let at = self.clock.time();
        let mut state = self.state.lock().unwrap();
        let count = state.last_count + delta;
        state.observe(count, at, true);
    }

    /// Stop accumulating. The interval up to now is closed first; further
    /// intervals are ignored entirely until [`HourCounter::resume`].
    /// Idempotent.
    pub fn pause(&self) {
        let at = self.clock.time();
        let mut state = self.state.lock().unwrap();
        if !state.paused {
            state.sync(at);
            state.paused = true;
        }
    }

    /// Resume accumulating from the current clock time. Idempotent.
    pub fn resume(&self) {
        let at = self.clock.time();
        let mut state = self.state.lock().unwrap();
        if state.paused {
            state.last_time = at;
            state.paused = false;
        }
    }

    /// Reset all accumulators at the current clock time, keeping the current
    /// level. Invoked by the warm-up fan-out; may also be called directly.
    pub fn warmed_up(&self) {
        let now = self.clock.time();
        let mut state = self.state.lock().unwrap();
        state.reset(now);
        debug!(at = %now, last_count = state.last_count, "hour counter reset");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Timestamp the counter started (or was last reset) at.
    pub fn initial_time(&self) -> SimTime {
        self.state.lock().unwrap().initial_time
    }

    /// Timestamp of the last observation.
    pub fn last_time(&self) -> SimTime {
        self.state.lock().unwrap().last_time
    }

    /// The current count level.
    pub fn last_count(&self) -> f64 {
        self.state.lock().unwrap().last_count
    }

    pub fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn keeps_history(&self) -> bool {
        self.state.lock().unwrap().keep_history
    }

    /// Total active (non-paused) duration, in hours.
    pub fn total_hours(&self) -> f64 {
        self.synced(|state| state.total_hours)
    }

    /// `∫ count · dt` over active time, in count-hours.
    pub fn cum_value(&self) -> f64 {
        self.synced(|state| state.cum_value)
    }

    /// Sum of all upward level changes while active.
    pub fn total_increment(&self) -> f64 {
        self.synced(|state| state.total_increment)
    }

    /// Sum of all downward level changes while active.
    pub fn total_decrement(&self) -> f64 {
        self.synced(|state| state.total_decrement)
    }

    /// Time-weighted average count; the current level if no time has been
    /// accumulated yet.
    pub fn average_count(&self) -> f64 {
        self.synced(|state| {
            if state.total_hours == 0.0 {
                state.last_count
            } else {
                state.cum_value / state.total_hours
            }
        })
    }

    /// Upward changes per active hour. NaN on a counter with no active time.
    pub fn increment_rate(&self) -> f64 {
        self.synced(|state| state.total_increment / state.total_hours)
    }

    /// Downward changes per active hour. NaN on a counter with no active time.
    pub fn decrement_rate(&self) -> f64 {
        self.synced(|state| state.total_decrement / state.total_hours)
    }

    /// Ratio of active time to elapsed time since `initial_time`, in `[0, 1]`.
    pub fn working_time_ratio(&self) -> f64 {
        self.synced(|state| {
            let elapsed = hours(state.last_time - state.initial_time);
            if elapsed == 0.0 {
                0.0
            } else {
                (state.total_hours / elapsed).clamp(0.0, 1.0)
            }
        })
    }

    /// Average time a unit of count persists, in hours (Little's law:
    /// `average_count / decrement_rate`). 0 when the rate is NaN or infinite.
    pub fn average_duration(&self) -> f64 {
        self.synced(|state| {
            let average = if state.total_hours == 0.0 {
                state.last_count
            } else {
                state.cum_value / state.total_hours
            };
            let rate = state.total_decrement / state.total_hours;
            let duration = average / rate;
            if duration.is_finite() {
                duration
            } else {
                0.0
            }
        })
    }

    /// The smallest observed count value whose cumulative active hours reach
    /// `p` percent of the total. `p` must lie in `[0, 100]`.
    pub fn percentile(&self, p: f64) -> f64 {
        assert!(
            (0.0..=100.0).contains(&p),
            "percentile must be in [0, 100], got {p}"
        );
        self.synced(|state| {
            if state.hours_for_count.is_empty() {
                return state.last_count;
            }
            let total: f64 = state.hours_for_count.values().sum();
            let threshold = p / 100.0 * total;
            let mut cum = 0.0;
            let mut result = state.last_count;
            for (key, value) in &state.hours_for_count {
                result = key.0;
                cum += value;
                if cum >= threshold {
                    break;
                }
            }
            result
        })
    }

    /// Distribution of active hours over count values, partitioned into bins
    /// of `bin_width` anchored at 0: bin `k` covers `[k·w, (k+1)·w)`.
    ///
    /// Bins run contiguously from the lowest to the highest occupied bin,
    /// interior empty bins included, the final bin included even if only
    /// partially filled. Empty counter: empty vec.
    ///
    /// # Panics
    ///
    /// Panics unless `bin_width` is positive and finite.
    pub fn histogram(&self, bin_width: f64) -> Vec<HistogramBin> {
        assert!(
            bin_width.is_finite() && bin_width > 0.0,
            "bin width must be positive and finite, got {bin_width}"
        );
        self.synced(|state| {
            if state.hours_for_count.is_empty() {
                return Vec::new();
            }
            let bin_of = |count: f64| (count / bin_width).floor() as i64;
            let lowest = bin_of(state.hours_for_count.keys().next().unwrap().0);
            let highest = bin_of(state.hours_for_count.keys().next_back().unwrap().0);

            let mut bins =
                vec![0.0f64; usize::try_from(highest - lowest + 1).expect("bin range fits")];
            for (key, value) in &state.hours_for_count {
                bins[(bin_of(key.0) - lowest) as usize] += value;
            }

            let total: f64 = bins.iter().sum();
            let mut cum = 0.0;
            bins.into_iter()
                .enumerate()
                .map(|(offset, bin_hours)| {
                    let probability = if total == 0.0 { 0.0 } else { bin_hours / total };
                    cum += probability;
                    HistogramBin {
                        lower: (lowest + offset as i64) as f64 * bin_width,
                        hours: bin_hours,
                        probability,
                        cum_probability: cum,
                    }
                })
                .collect()
        })
    }

    /// Explicitly observed `(time, count)` pairs, if history is enabled.
    /// A later observation at the same timestamp overwrites the earlier one.
    pub fn history(&self) -> Option<Vec<(SimTime, f64)>> {
        let state = self.state.lock().unwrap();
        state
            .history
            .as_ref()
            .map(|history| history.iter().map(|(&at, &count)| (at, count)).collect())
    }

    /// Active hours held at each distinct count value, ascending by count.
    pub fn hours_for_count(&self) -> Vec<(f64, f64)> {
        self.synced(|state| {
            state
                .hours_for_count
                .iter()
                .map(|(key, &value)| (key.0, value))
                .collect()
        })
    }

    /// A non-mutating façade over this counter's derived metrics.
    pub fn as_read_only(&self) -> HourCounterView {
        HourCounterView {
            inner: self.clone(),
        }
    }

    /// Sync the accumulators to the current clock, then run the query.
    fn synced<T>(&self, query: impl FnOnce(&CounterState) -> T) -> T {
        let at = self.clock.time();
        let mut state = self.state.lock().unwrap();
        state.sync(at);
        query(&state)
    }
}

impl std::fmt::Debug for HourCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("HourCounter")
            .field("last_time", &state.last_time)
            .field("last_count", &state.last_count)
            .field("total_hours", &state.total_hours)
            .field("paused", &state.paused)
            .finish()
    }
}

/// Read-only view of an [`HourCounter`], exposing only its derived metrics.
#[derive(Clone, Debug)]
pub struct HourCounterView {
    inner: HourCounter,
}

impl HourCounterView {
    pub fn initial_time(&self) -> SimTime {
        self.inner.initial_time()
    }

    pub fn last_time(&self) -> SimTime {
        self.inner.last_time()
    }

    pub fn last_count(&self) -> f64 {
        self.inner.last_count()
    }

    pub fn paused(&self) -> bool {
        self.inner.paused()
    }

    pub fn total_hours(&self) -> f64 {
        self.inner.total_hours()
    }

    pub fn cum_value(&self) -> f64 {
        self.inner.cum_value()
    }

    pub fn total_increment(&self) -> f64 {
        self.inner.total_increment()
    }

    pub fn total_decrement(&self) -> f64 {
        self.inner.total_decrement()
    }

    pub fn average_count(&self) -> f64 {
        self.inner.average_count()
    }

    pub fn increment_rate(&self) -> f64 {
        self.inner.increment_rate()
    }

    pub fn decrement_rate(&self) -> f64 {
        self.inner.decrement_rate()
    }

    pub fn working_time_ratio(&self) -> f64 {
        self.inner.working_time_ratio()
    }

    pub fn average_duration(&self) -> f64 {
        self.inner.average_duration()
    }

    pub fn percentile(&self, p: f64) -> f64 {
        self.inner.percentile(p)
    }

    pub fn histogram(&self, bin_width: f64) -> Vec<HistogramBin> {
        self.inner.histogram(bin_width)
    }

    pub fn history(&self) -> Option<Vec<(SimTime, f64)>> {
        self.inner.history()
    }

    pub fn hours_for_count(&self) -> Vec<(f64, f64)> {
        self.inner.hours_for_count()
    }
}
