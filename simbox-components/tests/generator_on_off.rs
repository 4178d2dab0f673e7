//! Generator on/off cycling across run segments.

use simbox_components::Generator;
use simbox_core::{DefaultRng, Sandbox};
use std::time::Duration;

fn every(period: Duration) -> impl FnMut(&mut DefaultRng) -> Duration + Send {
    move |_rng| period
}

/// Start, emit N/2 arrivals, stop across a long idle stretch, then start
/// again: the count accumulates to N and the on-flag tracks the transitions.
#[test]
fn generator_count_accumulates_across_off_period() {
    const N: u64 = 40;

    let root = Sandbox::new("root", 0);
    let generator = Generator::new(&root, "arrivals", 1, every(Duration::from_secs(900)));

    generator.start();
    assert!(generator.is_on());
    assert!(root.run_events(N as usize / 2));
    assert_eq!(generator.count(), N / 2);

    generator.end();
    assert!(!generator.is_on());

    // Three idle days: the one outstanding arrival fires and is ignored.
    let before = generator.count();
    root.run_for(Duration::from_secs(3 * 24 * 3600));
    assert_eq!(generator.count(), before);
    assert!(!root.has_pending_events());

    generator.start();
    assert!(generator.is_on());
    assert!(root.run_events(N as usize / 2));
    assert_eq!(generator.count(), N);
}

/// Stopping and restarting within the same timestamp still guards the stale
/// arrival.
#[test]
fn generator_restart_does_not_double_schedule() {
    let root = Sandbox::new("root", 0);
    let generator = Generator::new(&root, "arrivals", 1, every(Duration::from_secs(60)));

    generator.start();
    generator.end();
    generator.start();

    // Two outstanding arrivals exist (one stale, one live): only the live
    // chain emits.
    root.run_for(Duration::from_secs(300));
    assert_eq!(generator.count(), 5);
}
