//! Rate recovery and seasonality enforcement for the pattern generator.

use simbox_components::{PatternConfig, PatternGenerator};
use simbox_core::Sandbox;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Baseline 1/h with no seasonality degenerates to a homogeneous Poisson
/// process: generating many arrivals takes close to one hour each.
#[test]
fn flat_pattern_recovers_the_baseline_rate() {
    const ARRIVALS: usize = 10_000;

    let root = Sandbox::new("pattern", 9);
    let pattern = PatternGenerator::new(&root, "arrivals", 9, PatternConfig::new(1.0)).unwrap();
    assert_eq!(pattern.peak_hourly_rate(), 1.0);

    pattern.start();
    assert!(root.run_events(ARRIVALS));
    assert_eq!(pattern.count(), ARRIVALS as u64);

    let observed_hours = root.clock_time().as_hours_f64();
    let expected = ARRIVALS as f64;
    assert!(
        (observed_hours - expected).abs() / expected <= 0.05,
        "observed {observed_hours:.1}h for {ARRIVALS} arrivals"
    );
}

/// Hour-of-day factors that zero out the afternoon: every arrival must land
/// in the morning half of the synthetic day.
#[test]
fn zeroed_hours_receive_no_arrivals() {
    const ARRIVALS: usize = 2_000;

    let mut factors = vec![1.0; 12];
    factors.extend(vec![0.0; 12]);
    let config = PatternConfig::new(2.0).hour_of_day(factors);

    let root = Sandbox::new("pattern", 17);
    let pattern = PatternGenerator::new(&root, "arrivals", 17, config).unwrap();
    // Morning factors rescale to 2, so the dominating rate doubles twice.
    assert_eq!(pattern.peak_hourly_rate(), 4.0);

    let hours_of_day: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let log = hours_of_day.clone();
    let clock = root.clock();
    pattern.on_arrive(move || {
        log.lock()
            .unwrap()
            .push(clock.time().as_hours_f64().rem_euclid(24.0));
    });

    pattern.start();
    assert!(root.run_events(ARRIVALS));

    let seen = hours_of_day.lock().unwrap();
    assert_eq!(seen.len(), ARRIVALS);
    assert!(seen.iter().all(|&hour| hour < 12.0), "afternoon arrival");
}

/// A custom on/off cycle confines arrivals to the first half of each period.
#[test]
fn custom_cycle_gates_arrivals() {
    const ARRIVALS: usize = 1_000;
    const INTERVAL: Duration = Duration::from_secs(1800);

    let config = PatternConfig::new(1.0).custom_cycle(INTERVAL, vec![1.0, 0.0]);
    let root = Sandbox::new("pattern", 29);
    let pattern = PatternGenerator::new(&root, "arrivals", 29, config).unwrap();

    let offsets: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let log = offsets.clone();
    let clock = root.clock();
    pattern.on_arrive(move || {
        log.lock()
            .unwrap()
            .push(clock.time().as_secs_f64().rem_euclid(3600.0));
    });

    pattern.start();
    assert!(root.run_events(ARRIVALS));

    let seen = offsets.lock().unwrap();
    assert_eq!(seen.len(), ARRIVALS);
    assert!(
        seen.iter().all(|&offset| offset < 1800.0),
        "arrival in the off half of the cycle"
    );
}
