//! Non-homogeneous Poisson arrivals via thinning.
//!
//! A [`PatternGenerator`] emits arrivals whose instantaneous hourly rate is a
//! baseline scaled by seasonal factor lists: hour-of-day, day-of-week,
//! day-of-month, month-of-year, year, and any number of custom
//! `(interval, factors)` cycles. Candidates are drawn from a dominating
//! homogeneous process at the peak rate and accepted dimension by dimension
//! with probability `factor / max_factor`, which thins the stream down to the
//! seasonal rate.
//!
//! Calendar components are extracted from a synthetic wall-clock anchored at
//! 2024-01-01T00:00:00 UTC (a Monday), used solely for indexing the factor
//! lists.

use std::time::Duration;

use hifitime::{Epoch, Weekday};
use rand::Rng;
use rand_distr::Exp;
use tracing::debug;

use simbox_core::{DefaultRng, Sandbox, SimTime};

use crate::error::ComponentError;
use crate::generator::Generator;

const HOUR_OF_DAY_LEN: usize = 24;
const DAY_OF_WEEK_LEN: usize = 7;
const DAY_OF_MONTH_LEN: usize = 31;
const MONTH_OF_YEAR_LEN: usize = 12;

/// Seasonal configuration for a [`PatternGenerator`].
///
/// Factor lists may be supplied at any length; on construction each is
/// clamped non-negative, padded with 1.0 or truncated to its fixed length,
/// and rescaled so its arithmetic mean equals 1 (an all-zero or empty list
/// becomes a list of 1s). The `year` list keeps its supplied length and
/// cycles from the epoch year.
#[derive(Debug, Clone)]
pub struct PatternConfig {
    mean_hourly_rate: f64,
    hour_of_day: Vec<f64>,
    day_of_week: Vec<f64>,
    day_of_month: Vec<f64>,
    month_of_year: Vec<f64>,
    year: Vec<f64>,
    custom: Vec<(Duration, Vec<f64>)>,
}

impl PatternConfig {
    pub fn new(mean_hourly_rate: f64) -> Self {
        Self {
            mean_hourly_rate,
            hour_of_day: Vec::new(),
            day_of_week: Vec::new(),
            day_of_month: Vec::new(),
            month_of_year: Vec::new(),
            year: Vec::new(),
            custom: Vec::new(),
        }
    }

    #[must_use]
    pub fn hour_of_day(mut self, factors: Vec<f64>) -> Self {
        self.hour_of_day = factors;
        self
    }

    #[must_use]
    pub fn day_of_week(mut self, factors: Vec<f64>) -> Self {
        self.day_of_week = factors;
        self
    }

    #[must_use]
    pub fn day_of_month(mut self, factors: Vec<f64>) -> Self {
        self.day_of_month = factors;
        self
    }

    #[must_use]
    pub fn month_of_year(mut self, factors: Vec<f64>) -> Self {
        self.month_of_year = factors;
        self
    }

    #[must_use]
    pub fn year(mut self, factors: Vec<f64>) -> Self {
        self.year = factors;
        self
    }

    /// Add a custom seasonal cycle: `factors[i]` applies during the `i`-th
    /// `interval` slice of the repeating cycle.
    #[must_use]
    pub fn custom_cycle(mut self, interval: Duration, factors: Vec<f64>) -> Self {
        self.custom.push((interval, factors));
        self
    }
}

/// Clamp, pad/truncate, and rescale a factor list to mean 1.
fn normalize(factors: &[f64], target_len: Option<usize>) -> Vec<f64> {
    let mut list: Vec<f64> = factors
        .iter()
        .map(|&f| if f.is_finite() && f > 0.0 { f } else { 0.0 })
        .collect();
    if let Some(len) = target_len {
        list.truncate(len);
        list.resize(len, 1.0);
    }
    if list.is_empty() {
        list.push(1.0);
    }
    let sum: f64 = list.iter().sum();
    if sum == 0.0 {
        return vec![1.0; list.len()];
    }
    let mean = sum / list.len() as f64;
    list.iter().map(|f| f / mean).collect()
}

#[derive(Debug, Clone)]
struct Dimension {
    factors: Vec<f64>,
    max: f64,
}

impl Dimension {
    fn new(raw: &[f64], target_len: Option<usize>) -> Self {
        let factors = normalize(raw, target_len);
        let max = factors.iter().cloned().fold(f64::MIN, f64::max);
        Self { factors, max }
    }
}

#[derive(Debug, Clone)]
struct CustomCycle {
    interval_secs: f64,
    dimension: Dimension,
}

impl CustomCycle {
    fn index_at(&self, t: SimTime) -> usize {
        let span = self.interval_secs * self.dimension.factors.len() as f64;
        let into_cycle = t.as_secs_f64().rem_euclid(span);
        let index = (into_cycle / self.interval_secs) as usize;
        index.min(self.dimension.factors.len() - 1)
    }
}

fn weekday_index(weekday: Weekday) -> usize {
    match weekday {
        Weekday::Monday => 0,
        Weekday::Tuesday => 1,
        Weekday::Wednesday => 2,
        Weekday::Thursday => 3,
        Weekday::Friday => 4,
        Weekday::Saturday => 5,
        Weekday::Sunday => 6,
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        other => unreachable!("invalid month {other}"),
    }
}

/// Normalized seasonal profile plus the dominating-process parameters.
struct Profile {
    hour_of_day: Dimension,
    day_of_week: Dimension,
    day_of_month: Dimension,
    month_of_year: Dimension,
    year: Dimension,
    custom: Vec<CustomCycle>,
    epoch: Epoch,
    epoch_year: i32,
    exp_peak: Exp<f64>,
}

impl Profile {
    fn build(config: &PatternConfig) -> Result<(Self, f64), ComponentError> {
        if !config.mean_hourly_rate.is_finite() || config.mean_hourly_rate <= 0.0 {
            return Err(ComponentError::InvalidRate(config.mean_hourly_rate));
        }
        for (interval, _) in &config.custom {
            if interval.is_zero() {
                return Err(ComponentError::ZeroInterval);
            }
        }

        let hour_of_day = Dimension::new(&config.hour_of_day, Some(HOUR_OF_DAY_LEN));
        let day_of_week = Dimension::new(&config.day_of_week, Some(DAY_OF_WEEK_LEN));
        let day_of_month = Dimension::new(&config.day_of_month, Some(DAY_OF_MONTH_LEN));
        let month_of_year = Dimension::new(&config.month_of_year, Some(MONTH_OF_YEAR_LEN));
        let year = Dimension::new(&config.year, None);
        let custom: Vec<CustomCycle> = config
            .custom
            .iter()
            .map(|(interval, factors)| CustomCycle {
                interval_secs: interval.as_secs_f64(),
                dimension: Dimension::new(factors, None),
            })
            .collect();

        let mut peak = config.mean_hourly_rate
            * hour_of_day.max
            * day_of_week.max
            * day_of_month.max
            * month_of_year.max
            * year.max;
        for cycle in &custom {
            peak *= cycle.dimension.max;
        }

        let exp_peak = Exp::new(peak).map_err(|_| ComponentError::InvalidRate(peak))?;
        let profile = Self {
            hour_of_day,
            day_of_week,
            day_of_month,
            month_of_year,
            year,
            custom,
            epoch: Epoch::from_gregorian_utc(2024, 1, 1, 0, 0, 0, 0),
            epoch_year: 2024,
            exp_peak,
        };
        Ok((profile, peak))
    }

    /// One round of acceptance tests for a candidate at `t`; a candidate is
    /// kept only if every dimension accepts.
    fn accept(&self, rng: &mut DefaultRng, t: SimTime) -> bool {
        let when = self.epoch + hifitime::Duration::from_seconds(t.as_secs_f64());
        let (year, month, day, hour, _, _, _) = when.to_gregorian_utc();

        let mut keep = |factor: f64, max: f64| rng.gen::<f64>() <= factor / max;

        if !keep(self.hour_of_day.factors[hour as usize], self.hour_of_day.max) {
            return false;
        }
        let weekday = weekday_index(when.weekday_utc());
        if !keep(self.day_of_week.factors[weekday], self.day_of_week.max) {
            return false;
        }
        // Rescale so short months keep the configured monthly mean.
        let dom_factor = self.day_of_month.factors[(day - 1) as usize] * 31.0
            / f64::from(days_in_month(year, month));
        if !keep(dom_factor, self.day_of_month.max) {
            return false;
        }
        if !keep(
            self.month_of_year.factors[(month - 1) as usize],
            self.month_of_year.max,
        ) {
            return false;
        }
        let year_index = (year - self.epoch_year).rem_euclid(self.year.factors.len() as i32);
        if !keep(self.year.factors[year_index as usize], self.year.max) {
            return false;
        }
        for cycle in &self.custom {
            let index = cycle.index_at(t);
            if !keep(cycle.dimension.factors[index], cycle.dimension.max) {
                return false;
            }
        }
        true
    }

    /// Delay until the next accepted arrival, thinning candidates drawn from
    /// the dominating process at the peak rate.
    fn next_arrival(&self, rng: &mut DefaultRng, from: SimTime) -> Duration {
        let mut t = from;
        loop {
            let step_hours: f64 = rng.sample(self.exp_peak);
            t = t + Duration::from_secs_f64(step_hours * 3600.0);
            if self.accept(rng, t) {
                return t - from;
            }
        }
    }
}

/// Arrival source following a seasonal (non-homogeneous Poisson) pattern.
///
/// Shares the on/off, count, hook, and warm-up surface of [`Generator`].
#[derive(Clone)]
pub struct PatternGenerator {
    generator: Generator,
    peak_hourly_rate: f64,
}

impl PatternGenerator {
    pub fn new(
        parent: &Sandbox,
        label: &str,
        seed: u64,
        config: PatternConfig,
    ) -> Result<Self, ComponentError> {
        let (profile, peak) = Profile::build(&config)?;
        debug!(
            label,
            mean_hourly_rate = config.mean_hourly_rate,
            peak_hourly_rate = peak,
            "pattern generator configured"
        );

        let sandbox = parent.add_child(label, seed);
        let clock = sandbox.clock();
        let generator = Generator::from_sandbox(
            sandbox,
            Box::new(move |rng| profile.next_arrival(rng, clock.time())),
        );
        Ok(Self {
            generator,
            peak_hourly_rate: peak,
        })
    }

    /// Rate of the dominating homogeneous process, in arrivals per hour.
    pub fn peak_hourly_rate(&self) -> f64 {
        self.peak_hourly_rate
    }

    pub fn on_arrive(&self, hook: impl FnMut() + Send + 'static) {
        self.generator.on_arrive(hook);
    }

    pub fn start(&self) {
        self.generator.start();
    }

    pub fn end(&self) {
        self.generator.end();
    }

    pub fn is_on(&self) -> bool {
        self.generator.is_on()
    }

    pub fn count(&self) -> u64 {
        self.generator.count()
    }

    pub fn start_time(&self) -> Option<SimTime> {
        self.generator.start_time()
    }

    pub fn sandbox(&self) -> &Sandbox {
        self.generator.sandbox()
    }
}
