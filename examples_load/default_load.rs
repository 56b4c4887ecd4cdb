use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use tracing_cloud_logging::init::{init_tracing_with_config, LayerConfig};
use tracing_cloud_logging::sink::Discard;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LayerConfig {
        detect_resource: false,
        ..LayerConfig::default()
    };
    init_tracing_with_config(Arc::new(Discard), config)?;

    let n: u64 = 100_000;

    let start = Instant::now();
    for i in 0..n {
        debug!(iteration = i, "disabled load test event");
    }
    let disabled = start.elapsed();

    let start = Instant::now();
    for i in 0..n {
        error!(iteration = i, "default load test error");
    }
    let enabled = start.elapsed();

    println!(
        "disabled: {} events in {:?} (~{:.0} ev/s)",
        n,
        disabled,
        n as f64 / disabled.as_secs_f64()
    );
    println!(
        "enabled: {} events in {:?} (~{:.0} ev/s)",
        n,
        enabled,
        n as f64 / enabled.as_secs_f64()
    );
    Ok(())
}
