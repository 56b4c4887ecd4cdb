use crate::error::EncodeError;
use crate::field::{Field, MarshalObject, ObjectEncoder};
use crate::record::Entry;
use crate::severity::severity_of;
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Top-level keys of an encoded entry. An empty key leaves that element
/// out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub time_key: &'static str,
    pub level_key: &'static str,
    pub name_key: &'static str,
    pub caller_key: &'static str,
    pub message_key: &'static str,
    pub stacktrace_key: &'static str,
    pub line_ending: &'static str,
}

impl Default for EncoderConfig {
    /// Keys recognised by the Cloud Logging agent for structured payloads.
    fn default() -> Self {
        EncoderConfig {
            time_key: "time",
            level_key: "severity",
            name_key: "logger",
            caller_key: "caller",
            message_key: "message",
            stacktrace_key: "stacktrace",
            line_ending: "\n",
        }
    }
}

/// Newline-delimited JSON encoder.
///
/// Fields added through [`ObjectEncoder`] accumulate in a context buffer
/// owned by this value. `Clone` copies that buffer, so a clone and its
/// origin never observe each other's additions.
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    config: Arc<EncoderConfig>,
    context: Vec<u8>,
}

impl JsonEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        JsonEncoder {
            config: Arc::new(config),
            context: Vec::new(),
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Number of context bytes accumulated so far.
    pub fn context_len(&self) -> usize {
        self.context.len()
    }

    pub fn add_fields(&mut self, fields: &[Field]) -> Result<(), EncodeError> {
        for field in fields {
            field.add_to(self)?;
        }
        Ok(())
    }

    /// Encode `entry` followed by the accumulated context and `fields`.
    ///
    /// Consumes the encoder: callers clone first when the context must
    /// survive the call.
    pub fn encode_entry(mut self, entry: &Entry, fields: &[Field]) -> Result<Vec<u8>, EncodeError> {
        self.add_fields(fields)?;

        let cfg = Arc::clone(&self.config);
        let mut out = Vec::with_capacity(self.context.len() + entry.message.len() + 128);
        out.push(b'{');

        if !cfg.time_key.is_empty() {
            let time = entry.time.to_rfc3339_opts(SecondsFormat::Nanos, true);
            push_key(&mut out, cfg.time_key);
            push_str(&mut out, &time);
        }
        if !cfg.level_key.is_empty() {
            push_key(&mut out, cfg.level_key);
            push_str(&mut out, severity_of(entry.level).as_str());
        }
        if let (false, Some(name)) = (cfg.name_key.is_empty(), &entry.logger_name) {
            push_key(&mut out, cfg.name_key);
            push_str(&mut out, name);
        }
        if let (false, Some(caller)) = (cfg.caller_key.is_empty(), &entry.caller) {
            push_key(&mut out, cfg.caller_key);
            push_str(&mut out, &caller.short());
        }
        if !cfg.message_key.is_empty() {
            push_key(&mut out, cfg.message_key);
            push_str(&mut out, &entry.message);
        }
        if let (false, Some(stack)) = (cfg.stacktrace_key.is_empty(), &entry.stack) {
            push_key(&mut out, cfg.stacktrace_key);
            push_str(&mut out, stack);
        }

        if !self.context.is_empty() {
            separate(&mut out);
            out.extend_from_slice(&self.context);
        }

        out.push(b'}');
        out.extend_from_slice(cfg.line_ending.as_bytes());
        Ok(out)
    }

    fn key(&mut self, key: &str) {
        push_key(&mut self.context, key);
    }
}

fn separate(buf: &mut Vec<u8>) {
    match buf.last() {
        None | Some(b'{') | Some(b'[') | Some(b':') => {}
        Some(_) => buf.push(b','),
    }
}

fn push_key(buf: &mut Vec<u8>, key: &str) {
    separate(buf);
    push_str(buf, key);
    buf.push(b':');
}

fn push_str(buf: &mut Vec<u8>, value: &str) {
    // Writing a str into a Vec<u8> cannot fail.
    let _ = serde_json::to_writer(&mut *buf, value);
}

fn push_serialize<T: Serialize + ?Sized>(buf: &mut Vec<u8>, key: &str, value: &T) -> Result<(), EncodeError> {
    serde_json::to_writer(&mut *buf, value).map_err(|source| EncodeError::Json {
        key: key.to_string(),
        source,
    })
}

impl ObjectEncoder for JsonEncoder {
    fn add_str(&mut self, key: &str, value: &str) {
        self.key(key);
        push_str(&mut self.context, value);
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.key(key);
        self.context.extend_from_slice(value.to_string().as_bytes());
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.key(key);
        self.context.extend_from_slice(value.to_string().as_bytes());
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.key(key);
        self.context
            .extend_from_slice(if value { b"true".as_slice() } else { b"false".as_slice() });
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.key(key);
        // Finite by construction.
        let _ = serde_json::to_writer(&mut self.context, &value.as_secs_f64());
    }

    fn add_f64(&mut self, key: &str, value: f64) -> Result<(), EncodeError> {
        if !value.is_finite() {
            return Err(EncodeError::NonFiniteFloat {
                key: key.to_string(),
                value,
            });
        }
        self.key(key);
        push_serialize(&mut self.context, key, &value)
    }

    fn add_json(&mut self, key: &str, value: &Value) -> Result<(), EncodeError> {
        self.key(key);
        push_serialize(&mut self.context, key, value)
    }

    fn add_object(&mut self, key: &str, value: &dyn MarshalObject) -> Result<(), EncodeError> {
        self.key(key);
        self.context.push(b'{');
        value.marshal(self)?;
        self.context.push(b'}');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Caller;
    use crate::severity::Level;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(level: Level) -> Entry {
        let mut entry = Entry::new(level, "hello")
            .with_logger_name("svc")
            .with_caller(Caller::new("/src/app/main.rs", 7));
        entry.time = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        entry
    }

    #[test]
    fn encodes_reserved_keys_in_order() {
        let enc = JsonEncoder::new(EncoderConfig::default());
        let out = enc.encode_entry(&entry(Level::Warn), &[]).unwrap();
        let line = String::from_utf8(out).unwrap();

        assert_eq!(
            line,
            "{\"time\":\"2023-11-14T22:13:20.123456789Z\",\"severity\":\"WARNING\",\"logger\":\"svc\",\
             \"caller\":\"app/main.rs:7\",\"message\":\"hello\"}\n"
        );
    }

    #[test]
    fn context_then_call_site_fields() {
        let mut enc = JsonEncoder::new(EncoderConfig::default());
        enc.add_fields(&[Field::string("ctx", "a")]).unwrap();
        let out = enc
            .encode_entry(
                &entry(Level::Info),
                &[
                    Field::i64("n", -3),
                    Field::bool("ok", true),
                    Field::json("tags", json!(["x", {"y": 1}])),
                    Field::duration("took", Duration::from_millis(1500)),
                ],
            )
            .unwrap();

        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with(
            "\"message\":\"hello\",\"ctx\":\"a\",\"n\":-3,\"ok\":true,\"tags\":[\"x\",{\"y\":1}],\"took\":1.5}\n"
        ));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["severity"], "INFO");
    }

    #[test]
    fn clone_does_not_share_context() {
        let mut parent = JsonEncoder::new(EncoderConfig::default());
        parent.add_str("a", "1");
        let mut child = parent.clone();
        child.add_str("b", "2");

        assert!(parent.context_len() < child.context_len());
        let out = parent.encode_entry(&entry(Level::Info), &[]).unwrap();
        let parsed: Value = serde_json::from_str(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(parsed["a"], "1");
        assert!(parsed.get("b").is_none());
    }

    #[test]
    fn empty_key_omits_element() {
        let config = EncoderConfig {
            caller_key: "",
            name_key: "",
            ..EncoderConfig::default()
        };
        let out = JsonEncoder::new(config).encode_entry(&entry(Level::Error), &[]).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert!(parsed.get("caller").is_none());
        assert!(parsed.get("logger").is_none());
        assert_eq!(parsed["message"], "hello");
    }

    #[test]
    fn escapes_strings() {
        let out = JsonEncoder::new(EncoderConfig::default())
            .encode_entry(&Entry::new(Level::Info, "line\n\"quoted\""), &[Field::string("k\"", "v")])
            .unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["message"], "line\n\"quoted\"");
        assert_eq!(parsed["k\""], "v");
    }

    #[test]
    fn encode_failure_returns_error() {
        let err = JsonEncoder::new(EncoderConfig::default())
            .encode_entry(&entry(Level::Info), &[Field::f64("bad", f64::INFINITY)])
            .unwrap_err();
        assert!(matches!(err, EncodeError::NonFiniteFloat { .. }));
    }
}
