//! Drive the controller against the simulated device
//!
//! A helper thread stands in for the platform interrupt callback.
//!
//! ```bash
//! RUST_LOG=edu_driver=debug EDU_DEBUG=3 cargo run -p edu-driver --example simulated_factorial
//! ```

use edu_driver::{Controller, ControllerConfig, Result, SimulatedDevice};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let dev = Arc::new(SimulatedDevice::new());
    let ctrl = Arc::new(Controller::new(Arc::clone(&dev), ControllerConfig::from_env()));

    println!("edu version : {}", ctrl.read_version());
    println!("liveness    : {:#010x}", ctrl.probe_liveness(0x1234_5678));

    for n in 0..=12 {
        let irq_dev = Arc::clone(&dev);
        let irq_ctrl = Arc::clone(&ctrl);
        let line = thread::spawn(move || {
            if irq_dev.wait_until_armed(Duration::from_secs(1)) && irq_dev.complete_factorial() {
                irq_ctrl.handle_interrupt();
            }
        });

        println!("{n:>2}!         : {}", ctrl.compute_factorial(n)?);
        let _ = line.join();
    }

    Ok(())
}
