//! Long-run M/M/1 behaviour across seeds.

use simbox_components::Mm1System;
use simbox_core::SimTime;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

/// Arrival rate 4/h against service rate 5/h: after a 1000h warm-up and a
/// 20000h measurement window, the headline statistics must be sane for every
/// seed.
#[test]
fn mm1_long_run_statistics_are_sane() {
    for seed in [11u64, 23, 47] {
        let system = Mm1System::new("mm1", seed, 4.0, 5.0).unwrap();
        system.start();
        system.warm_up(1000 * HOUR);
        assert_eq!(system.root().clock_time(), SimTime::from_hours(1000));

        system.run_for(20_000 * HOUR);
        assert_eq!(system.root().clock_time(), SimTime::from_hours(21_000));

        let n_queueing = system.avg_n_queueing();
        assert!(
            n_queueing.is_finite() && n_queueing >= 0.0,
            "seed {seed}: avg queue length {n_queueing}"
        );

        let n_serving = system.avg_n_serving();
        assert!(
            (0.0..=1.0).contains(&n_serving),
            "seed {seed}: utilization {n_serving}"
        );
        // Utilization should hover near rho = 0.8 over 20000 hours.
        assert!(
            (0.6..=0.95).contains(&n_serving),
            "seed {seed}: utilization {n_serving} far from rho"
        );

        let sojourn = system.avg_hours_in_system();
        assert!(
            sojourn.is_finite() && sojourn > 0.0,
            "seed {seed}: sojourn {sojourn}"
        );

        let ratio = system.in_system_counter().working_time_ratio();
        assert!((0.0..=1.0).contains(&ratio), "seed {seed}: ratio {ratio}");
    }
}

/// The warm-up must drop the transient: statistics restart at the horizon
/// with the in-flight population preserved.
#[test]
fn mm1_warm_up_restarts_statistics() {
    let system = Mm1System::new("mm1", 3, 4.0, 5.0).unwrap();
    system.start();
    system.run_for(100 * HOUR);
    let arrivals_before = system.arrival_count();
    assert!(arrivals_before > 0);

    system.warm_up(Duration::ZERO);
    assert_eq!(system.arrival_count(), 0);
    assert_eq!(system.in_system_counter().total_hours(), 0.0);

    system.run_for(100 * HOUR);
    assert!(system.arrival_count() > 0);
    assert!(system.avg_hours_in_system() > 0.0);
}

/// Replaying the same seed reproduces the statistics bit for bit.
#[test]
fn mm1_is_deterministic_per_seed() {
    let run = |seed: u64| {
        let system = Mm1System::new("mm1", seed, 4.0, 5.0).unwrap();
        system.start();
        system.run_for(500 * HOUR);
        (
            system.arrival_count(),
            system.avg_n_queueing(),
            system.avg_n_serving(),
            system.avg_hours_in_system(),
        )
    };

    assert_eq!(run(99), run(99));
    assert_ne!(run(99), run(100));
}
