use crate::core::{Core, CoreConfig};
use crate::encoder::EncoderConfig;
use crate::layer::CloudLoggingLayer;
use crate::resource::{EnvResourceDetector, ResourceDetector};
use crate::severity::Level;
use crate::sink::WriteSyncer;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// **Fields**
/// - `level`: minimum level written to the sink.
/// - `initial_fields`: fields emitted on every line, ordered by key.
/// - `detect_resource`: when `true`, the deployment resource is read from
///   the environment through [`EnvResourceDetector`].
/// - `source_location`: attach `logging.googleapis.com/sourceLocation` to
///   every line.
/// - `stacktrace_level`: capture a backtrace for events at or above this
///   level.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top and events are also printed in human-readable form.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub level: Level,
    pub initial_fields: BTreeMap<String, Value>,
    pub detect_resource: bool,
    pub source_location: bool,
    pub stacktrace_level: Option<Level>,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            initial_fields: BTreeMap::new(),
            detect_resource: true,
            source_location: false,
            stacktrace_level: None,
            enable_stdout: false,
        }
    }
}

/// Error returned when the global subscriber cannot be installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Build a [`CloudLoggingLayer`] without installing it, for callers that
/// compose their own subscriber.
pub fn build_layer(sink: Arc<dyn WriteSyncer>, config: &LayerConfig) -> CloudLoggingLayer {
    build_layer_with_detector(sink, config, &EnvResourceDetector)
}

pub fn build_layer_with_detector(
    sink: Arc<dyn WriteSyncer>,
    config: &LayerConfig,
    detector: &dyn ResourceDetector,
) -> CloudLoggingLayer {
    let mut core_config = CoreConfig {
        initial_fields: config.initial_fields.clone(),
        resource: None,
        encoder: EncoderConfig::default(),
    };
    if config.detect_resource {
        core_config = core_config.detect_resource(detector);
    }

    CloudLoggingLayer::new(Core::new(sink, config.level, core_config))
        .with_source_location(config.source_location)
        .with_stacktrace_level(config.stacktrace_level)
}

/// Initialize the global `tracing` subscriber with a layer writing to
/// `sink` according to [`LayerConfig`].
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`CloudLoggingLayer`] as the
/// global default subscriber, so all `tracing` events in the process are
/// observed by the layer.
pub fn init_tracing_with_config(sink: Arc<dyn WriteSyncer>, config: LayerConfig) -> Result<(), InitError> {
    let layer = build_layer(sink, &config);

    // Both subscriber shapes are spelled out so each has a concrete type.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(sink: Arc<dyn WriteSyncer>) -> Result<(), InitError> {
    init_tracing_with_config(sink, LayerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use crate::sink::Discard;

    #[test]
    fn build_layer_uses_detector_only_when_asked() {
        let detector = || Some(Resource::new("global", "projects/p/logs/app"));

        let config = LayerConfig::default();
        let layer = build_layer_with_detector(Arc::new(Discard), &config, &detector);
        assert_eq!(layer.core().fields().len(), 2);

        let config = LayerConfig {
            detect_resource: false,
            ..LayerConfig::default()
        };
        let layer = build_layer_with_detector(Arc::new(Discard), &config, &detector);
        assert!(layer.core().fields().is_empty());
    }

    #[test]
    fn level_from_config() {
        let config = LayerConfig {
            level: Level::Warn,
            ..LayerConfig::default()
        };
        let layer = build_layer_with_detector(Arc::new(Discard), &config, &|| -> Option<Resource> { None });
        assert!(!layer.core().enabled(Level::Info));
        assert!(layer.core().enabled(Level::Error));
    }
}
