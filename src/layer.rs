use crate::core::Core;
use crate::field::Field;
use crate::record::{Caller, Entry};
use crate::severity::Level;
use crate::source_location::{source_location_field, SourceLocation};
use chrono::Utc;
use std::backtrace::Backtrace;
use tracing::field::{Field as TracingField, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that writes every enabled event as one
/// Cloud Logging JSON line through a [`Core`].
///
/// Span fields become context: each span stores a core derived from its
/// parent's with [`Core::with`], and events are written through the core
/// of the innermost span. Writing happens on the caller's thread.
pub struct CloudLoggingLayer {
    core: Core,
    source_location: bool,
    stacktrace_level: Option<Level>,
}

/// Derived core stored in a span's extensions, together with what it was
/// derived from so recorded values can replace earlier ones.
struct SpanCore {
    parent: Core,
    own: Vec<Field>,
    core: Core,
}

impl SpanCore {
    fn new(parent: Core, own: Vec<Field>) -> Self {
        let core = parent.with(own.iter().cloned());
        SpanCore { parent, own, core }
    }

    /// Overwrite same-key fields in place, append the rest, re-derive.
    fn record(&mut self, fields: Vec<Field>) {
        for field in fields {
            match self.own.iter_mut().find(|f| f.key() == field.key()) {
                Some(slot) => *slot = field,
                None => self.own.push(field),
            }
        }
        self.core = self.parent.with(self.own.iter().cloned());
    }
}

impl CloudLoggingLayer {
    pub fn new(core: Core) -> Self {
        CloudLoggingLayer {
            core,
            source_location: false,
            stacktrace_level: None,
        }
    }

    /// Attach `logging.googleapis.com/sourceLocation` built from the event's
    /// call site.
    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    /// Capture a backtrace into `stacktrace` for events at or above `level`.
    pub fn with_stacktrace_level(mut self, level: Option<Level>) -> Self {
        self.stacktrace_level = level;
        self
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    fn entry(&self, level: Level, meta: &tracing::Metadata<'_>, message: String) -> Entry {
        let caller = meta.file().map(|file| Caller::new(file, meta.line().unwrap_or_default()));
        let stack = match self.stacktrace_level {
            Some(min) if level >= min => Some(Backtrace::force_capture().to_string()),
            _ => None,
        };
        Entry {
            level,
            time: Utc::now(),
            logger_name: Some(meta.target().to_string()),
            message,
            caller,
            stack,
        }
    }
}

impl<S> Layer<S> for CloudLoggingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut fields = Vec::new();
        attrs.record(&mut FieldVisitor::new(&mut fields, None));

        let base = {
            let parent = span.parent();
            let parent_ext = parent.as_ref().map(|p| p.extensions());
            parent_ext
                .as_ref()
                .and_then(|ext| ext.get::<SpanCore>())
                .map_or(&self.core, |c| &c.core)
                .clone()
        };
        span.extensions_mut().insert(SpanCore::new(base, fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut fields = Vec::new();
        values.record(&mut FieldVisitor::new(&mut fields, None));
        if fields.is_empty() {
            return;
        }

        let mut ext = span.extensions_mut();
        match ext.get_mut::<SpanCore>() {
            Some(current) => current.record(fields),
            None => ext.insert(SpanCore::new(self.core.clone(), fields)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        if !self.core.enabled(level) {
            return;
        }

        let mut fields = Vec::new();
        let mut message = None;
        event.record(&mut FieldVisitor::new(&mut fields, Some(&mut message)));
        if self.source_location {
            fields.push(source_location_field(SourceLocation::from_metadata(meta)));
        }

        let entry = self.entry(level, meta, message.unwrap_or_default());

        let span = ctx.event_span(event);
        let ext = span.as_ref().map(|s| s.extensions());
        let core = ext
            .as_ref()
            .and_then(|ext| ext.get::<SpanCore>())
            .map_or(&self.core, |c| &c.core);

        if let Some(checked) = core.check(&entry) {
            if let Err(e) = checked.write(&fields) {
                eprintln!("cloud logging layer: {}", e);
            }
        }
    }
}

/// Collects `tracing` field values as [`Field`]s. The `message` field is
/// routed to the entry message when a slot for it is provided.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Vec<Field>,
    pub message: Option<&'a mut Option<String>>,
}

impl<'a> FieldVisitor<'a> {
    pub fn new(fields: &'a mut Vec<Field>, message: Option<&'a mut Option<String>>) -> Self {
        FieldVisitor { fields, message }
    }

    fn take_message(&mut self, field: &TracingField, value: impl FnOnce() -> String) -> bool {
        match &mut self.message {
            Some(slot) if field.name() == "message" => {
                **slot = Some(value());
                true
            }
            _ => false,
        }
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &TracingField, value: &str) {
        if !self.take_message(field, || value.to_string()) {
            self.fields.push(Field::string(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.fields.push(Field::i64(field.name(), value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.fields.push(Field::u64(field.name(), value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        // Non-finite floats would fail the whole line; keep them readable.
        if value.is_finite() {
            self.fields.push(Field::f64(field.name(), value));
        } else {
            self.fields.push(Field::string(field.name(), value.to_string()));
        }
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.fields.push(Field::bool(field.name(), value));
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn std::error::Error + 'static)) {
        self.fields.push(Field::string(field.name(), value.to_string()));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn std::fmt::Debug) {
        if !self.take_message(field, || format!("{:?}", value)) {
            self.fields.push(Field::string(field.name(), format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::Capture;
    use crate::core::CoreConfig;
    use crate::operation::OPERATION_KEY;
    use crate::source_location::SOURCE_LOCATION_KEY;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    fn layer(sink: Arc<Capture>, level: Level) -> CloudLoggingLayer {
        CloudLoggingLayer::new(Core::new(sink, level, CoreConfig::default().with_initial_field("app", "demo")))
    }

    #[test]
    fn writes_event_fields_and_message() {
        let sink = Arc::new(Capture::default());
        let subscriber = tracing_subscriber::registry().with(layer(sink.clone(), Level::Info));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("filtered");
            tracing::warn!(user_id = 42, ok = false, ratio = 0.5, "disk {} full", "/var");
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["severity"], "WARNING");
        assert_eq!(line["message"], "disk /var full");
        assert_eq!(line["user_id"], 42);
        assert_eq!(line["ok"], false);
        assert_eq!(line["ratio"], 0.5);
        assert_eq!(line["app"], "demo");
        assert_eq!(line["logger"], module_path!());
        assert!(line["caller"].as_str().unwrap().contains("layer.rs:"));
        assert!(line.get(SOURCE_LOCATION_KEY).is_none());
        assert!(line.get(OPERATION_KEY).is_none());
    }

    #[test]
    fn span_fields_are_context() {
        let sink = Arc::new(Capture::default());
        let subscriber = tracing_subscriber::registry().with(layer(sink.clone(), Level::Debug));

        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("request", request_id = "r-1", attempt = tracing::field::Empty);
            let _outer = outer.enter();
            {
                let inner = tracing::info_span!("db", table = "users");
                let _inner = inner.enter();
                tracing::info!("query");
            }
            outer.record("attempt", 2);
            tracing::info!("done");
        });
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer(sink.clone(), Level::Debug)), || {
            tracing::info!("outside");
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["request_id"], "r-1");
        assert_eq!(lines[0]["table"], "users");
        assert!(lines[0].get("attempt").is_none());

        assert_eq!(lines[1]["request_id"], "r-1");
        assert_eq!(lines[1]["attempt"], 2);
        assert!(lines[1].get("table").is_none());

        assert!(lines[2].get("request_id").is_none());
    }

    #[test]
    fn recorded_span_fields_replace_earlier_values() {
        let sink = Arc::new(Capture::default());
        let subscriber = tracing_subscriber::registry().with(layer(sink.clone(), Level::Info));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("req", attempt = 1, stage = tracing::field::Empty);
            let _guard = span.enter();
            span.record("attempt", 2);
            span.record("stage", "fetch");
            span.record("attempt", 3);
            tracing::info!("x");
        });

        let raw = sink.raw();
        assert_eq!(raw.matches("\"attempt\"").count(), 1, "{raw}");
        assert_eq!(raw.matches("\"stage\"").count(), 1, "{raw}");
        assert!(raw.trim_end().ends_with(r#""message":"x","app":"demo","attempt":3,"stage":"fetch"}"#), "{raw}");
    }

    #[test]
    fn source_location_and_stacktrace() {
        let sink = Arc::new(Capture::default());
        let layer = layer(sink.clone(), Level::Info)
            .with_source_location(true)
            .with_stacktrace_level(Some(Level::Error));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("plain");
            tracing::error!(error = %std::io::Error::other("boom"), "failed");
        });

        let lines = sink.lines();
        let loc = &lines[0][SOURCE_LOCATION_KEY];
        assert!(loc["file"].as_str().unwrap().ends_with("layer.rs"));
        assert!(loc["line"].as_i64().unwrap() > 0);
        assert_eq!(loc["function"], module_path!());
        assert!(lines[0].get("stacktrace").is_none());

        assert!(lines[1]["stacktrace"].is_string());
        assert_eq!(lines[1]["error"], "boom");
    }
}
