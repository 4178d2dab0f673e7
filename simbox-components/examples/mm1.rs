//! Minimal end-to-end run: an M/M/1 station with warm-up and statistics.
//!
//! ```bash
//! cargo run --example mm1
//! RUST_LOG=simbox_core=debug cargo run --example mm1
//! ```

use simbox_components::Mm1System;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

fn main() {
    simbox_core::init_logging();

    let system = Mm1System::new("mm1-demo", 42, 4.0, 5.0).expect("valid rates");
    system.start();

    system.warm_up(1000 * HOUR);
    system.run_for(20_000 * HOUR);

    let statics = system.statics();
    statics.emit();
    print!("{}", statics.summary());
    println!(
        "avg hours in system: {:.4} (theory for M/M/1 at rho=0.8: 1.0)",
        system.avg_hours_in_system()
    );
}
