use crate::encoder::{EncoderConfig, JsonEncoder};
use crate::error::CoreError;
use crate::field::Field;
use crate::record::Entry;
use crate::resource::{Resource, ResourceDetector};
use crate::severity::{severity_of, Level, Severity};
use crate::sink::WriteSyncer;
use crate::sync_error::is_known_sync_error;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Decides which levels a core accepts.
pub trait LevelEnabler: Send + Sync {
    fn enabled(&self, level: Level) -> bool;
}

/// A level enables itself and everything above it.
impl LevelEnabler for Level {
    fn enabled(&self, level: Level) -> bool {
        level >= *self
    }
}

impl<F> LevelEnabler for F
where
    F: Fn(Level) -> bool + Send + Sync,
{
    fn enabled(&self, level: Level) -> bool {
        self(level)
    }
}

/// Construction-time options of a [`Core`].
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    /// Emitted on every line, ordered by key.
    pub initial_fields: BTreeMap<String, Value>,
    /// Deployment resource; `None` emits no resource fields.
    pub resource: Option<Resource>,
    pub encoder: EncoderConfig,
}

impl CoreConfig {
    pub fn with_initial_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial_fields.insert(key.into(), value.into());
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Fill in the resource from `detector`; leaves it unset when nothing
    /// is detected.
    pub fn detect_resource(mut self, detector: &dyn ResourceDetector) -> Self {
        self.resource = detector.detect();
        self
    }
}

/// Record pipeline behind every log line: level check, context merge,
/// encode, write and best-effort flush.
///
/// `Clone` is the derivation primitive: the encoder and field list are
/// copied, the sink is shared. All operations take `&self` and may run
/// concurrently; each write merges context into its own encoder clone, so
/// field merge and encode of two writes never interleave on shared state.
#[derive(Clone)]
pub struct Core {
    enabler: Arc<dyn LevelEnabler>,
    encoder: JsonEncoder,
    sink: Arc<dyn WriteSyncer>,
    fields: Vec<Field>,
    initial_fields: Arc<BTreeMap<String, Value>>,
}

impl Core {
    /// Create a core writing to `sink`.
    ///
    /// **Parameters**
    /// - `sink`: shared destination; must serialize concurrent writes.
    /// - `enabler`: level filter, e.g. a minimum [`Level`].
    /// - `config`: initial fields, resource and encoder keys.
    pub fn new(sink: Arc<dyn WriteSyncer>, enabler: impl LevelEnabler + 'static, config: CoreConfig) -> Self {
        let CoreConfig {
            initial_fields,
            resource,
            encoder,
        } = config;

        let mut fields = resource.map(|r| r.fields()).unwrap_or_default();
        fields.extend(initial_fields.iter().map(|(k, v)| Field::json(k.clone(), v.clone())));

        Core {
            enabler: Arc::new(enabler),
            encoder: JsonEncoder::new(encoder),
            sink,
            fields,
            initial_fields: Arc::new(initial_fields),
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.enabler.enabled(level)
    }

    /// `Some` when `entry` should be written by this core.
    pub fn check<'a>(&'a self, entry: &'a Entry) -> Option<CheckedEntry<'a>> {
        if self.enabled(entry.level) {
            Some(CheckedEntry { core: self, entry })
        } else {
            None
        }
    }

    /// Encode and write one entry.
    ///
    /// Entries above `ERROR` are followed by a [`Core::sync`] whose result
    /// is dropped: the process may be about to abort, and a flush failure
    /// must not replace the outcome of the write.
    pub fn write(&self, entry: &Entry, fields: &[Field]) -> Result<(), CoreError> {
        let mut enc = self.encoder.clone();
        enc.add_fields(&self.fields).map_err(CoreError::Encode)?;
        let buf = enc.encode_entry(entry, fields).map_err(CoreError::Encode)?;

        let written = self.sink.write(&buf);
        drop(buf);
        written.map_err(CoreError::Write)?;

        if severity_of(entry.level) > Severity::Error {
            let _ = self.sync();
        }
        Ok(())
    }

    /// Flush the sink. Known non-actionable flush errors count as success.
    pub fn sync(&self) -> Result<(), CoreError> {
        match self.sink.sync() {
            Ok(()) => Ok(()),
            Err(err) if is_known_sync_error(&err) => Ok(()),
            Err(err) => Err(CoreError::Sync(err)),
        }
    }

    /// Derived core whose lines also carry `fields`.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Core {
        let mut child = self.clone();
        child.fields.extend(fields);
        child
    }

    pub fn initial_fields(&self) -> &BTreeMap<String, Value> {
        &self.initial_fields
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn encoder(&self) -> &JsonEncoder {
        &self.encoder
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("encoder", &self.encoder)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// An entry accepted by [`Core::check`], ready to be written.
#[derive(Debug)]
pub struct CheckedEntry<'a> {
    core: &'a Core,
    entry: &'a Entry,
}

impl<'a> CheckedEntry<'a> {
    pub fn entry(&self) -> &Entry {
        self.entry
    }

    pub fn write(self, fields: &[Field]) -> Result<(), CoreError> {
        self.core.write(self.entry, fields)
    }
}
