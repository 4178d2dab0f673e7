//! Simulation time management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::time::Duration;

const NANOS_PER_HOUR: u64 = 3_600_000_000_000;

/// Simulation time with nanosecond precision
///
/// SimTime represents a point in simulation time, stored as nanoseconds since
/// the simulation epoch. It supports arithmetic operations and conversions
/// to/from standard Duration types. Because time-weighted statistics are
/// expressed in count-hours, hour conversions are provided alongside the
/// usual second-based ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// Create a new SimTime at the simulation epoch (time zero)
    pub const fn zero() -> Self {
        SimTime(0)
    }

    /// Create a SimTime from nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    /// Create a SimTime from microseconds
    pub const fn from_micros(micros: u64) -> Self {
        SimTime(micros * 1_000)
    }

    /// Create a SimTime from milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000_000)
    }

    /// Create a SimTime from seconds
    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1_000_000_000)
    }

    /// Create a SimTime from whole hours
    pub const fn from_hours(hours: u64) -> Self {
        SimTime(hours * NANOS_PER_HOUR)
    }

    /// Create a SimTime from whole days
    pub const fn from_days(days: u64) -> Self {
        SimTime(days * 24 * NANOS_PER_HOUR)
    }

    /// Create a SimTime from a Duration
    pub fn from_duration(duration: Duration) -> Self {
        SimTime(duration.as_nanos() as u64)
    }

    /// Create a SimTime from fractional hours
    ///
    /// # Panics
    ///
    /// Panics if the input is negative, infinite, NaN, or too large to
    /// represent.
    pub fn from_hours_f64(hours: f64) -> Self {
        if !hours.is_finite() {
            panic!("SimTime cannot be created from non-finite value: {hours}");
        }
        if hours < 0.0 {
            panic!("SimTime cannot be negative: {hours}");
        }

        const MAX_HOURS: f64 = (u64::MAX as f64) / (NANOS_PER_HOUR as f64);
        if hours > MAX_HOURS {
            panic!("SimTime value too large: {hours} hours (max: {MAX_HOURS} hours)");
        }

        SimTime((hours * NANOS_PER_HOUR as f64) as u64)
    }

    /// Create a SimTime from fractional seconds
    ///
    /// # Panics
    ///
    /// Panics if the input is negative, infinite, NaN, or too large to
    /// represent.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() {
            panic!("SimTime cannot be created from non-finite value: {secs}");
        }
        if secs < 0.0 {
            panic!("SimTime cannot be negative: {secs}");
        }

        const MAX_SECS: f64 = (u64::MAX as f64) / 1_000_000_000.0;
        if secs > MAX_SECS {
            panic!("SimTime value too large: {secs} seconds (max: {MAX_SECS} seconds)");
        }

        SimTime((secs * 1_000_000_000.0) as u64)
    }

    /// Convert SimTime to a Duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.0)
    }

    /// Get the raw nanosecond value
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Time since the epoch, in fractional hours
    pub fn as_hours_f64(&self) -> f64 {
        self.0 as f64 / NANOS_PER_HOUR as f64
    }

    /// Time since the epoch, in fractional seconds
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Calculate the duration since another SimTime
    pub fn duration_since(&self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Add a duration to this SimTime
    pub fn add_duration(&self, duration: Duration) -> Self {
        SimTime(self.0.saturating_add(duration.as_nanos() as u64))
    }

    /// Subtract a duration from this SimTime
    pub fn sub_duration(&self, duration: Duration) -> Self {
        SimTime(self.0.saturating_sub(duration.as_nanos() as u64))
    }
}

impl Add<SimTime> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> Self::Output {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        self.add_duration(rhs)
    }
}

impl Sub<Duration> for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: Duration) -> Self::Output {
        self.sub_duration(rhs)
    }
}

impl Sub<SimTime> for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl Mul<u64> for SimTime {
    type Output = SimTime;

    fn mul(self, rhs: u64) -> Self::Output {
        SimTime(self.0.saturating_mul(rhs))
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::zero()
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self.as_duration();
        let secs = duration.as_secs();
        let millis = duration.subsec_millis();
        let micros = duration.subsec_micros() % 1000;
        let nanos = duration.subsec_nanos() % 1000;

        if secs >= 3600 {
            write!(f, "{:.3}h", self.as_hours_f64())
        } else if secs > 0 {
            write!(f, "{secs}.{millis:03}s")
        } else if millis > 0 {
            write!(f, "{millis}.{micros:03}ms")
        } else if micros > 0 {
            write!(f, "{micros}.{nanos:03}µs")
        } else {
            write!(f, "{nanos}ns")
        }
    }
}
