use std::sync::Arc;
use tracing::{error, info, info_span, warn};

use tracing_cloud_logging::init::{init_tracing_with_config, LayerConfig};
use tracing_cloud_logging::severity::Level;
use tracing_cloud_logging::sink::{LockedWriter, WriteSyncer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout has nothing meaningful to flush; a locked writer maps sync to
    // a plain flush of the buffered handle.
    let sink: Arc<dyn WriteSyncer> = Arc::new(LockedWriter::new(std::io::stdout()));

    let mut config = LayerConfig {
        level: Level::Debug,
        source_location: true,
        stacktrace_level: Some(Level::Error),
        ..LayerConfig::default()
    };
    config.initial_fields.insert("service".to_string(), "checkout".into());
    init_tracing_with_config(sink, config)?;

    info!("starting service");

    let span = info_span!("request", request_id = "9f2c", path = "/cart");
    let _guard = span.enter();
    warn!(items = 0, "empty cart");
    error!(user_id = 42, reason = "card declined", "payment failed");
    Ok(())
}
