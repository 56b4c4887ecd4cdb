use crate::error::EncodeError;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Receiver for the flattened sub-fields of a structured value.
///
/// Implemented by the JSON entry encoder and by [`MapObjectEncoder`].
pub trait ObjectEncoder {
    fn add_str(&mut self, key: &str, value: &str);
    fn add_i64(&mut self, key: &str, value: i64);
    fn add_u64(&mut self, key: &str, value: u64);
    fn add_bool(&mut self, key: &str, value: bool);
    fn add_duration(&mut self, key: &str, value: Duration);
    fn add_f64(&mut self, key: &str, value: f64) -> Result<(), EncodeError>;
    fn add_json(&mut self, key: &str, value: &Value) -> Result<(), EncodeError>;
    fn add_object(&mut self, key: &str, value: &dyn MarshalObject) -> Result<(), EncodeError>;
}

/// A value that knows how to write itself as a set of named sub-fields.
pub trait MarshalObject: Send + Sync {
    fn marshal(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError>;
}

/// Supported field value shapes.
#[derive(Clone)]
pub enum FieldValue {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Duration(Duration),
    /// Strings, numbers, bools, mappings and sequences.
    Json(Value),
    Object(Arc<dyn MarshalObject>),
    /// Sub-fields written directly into the enclosing object.
    Inline(Arc<dyn MarshalObject>),
    /// Contributes nothing to the output.
    Skip,
}

/// A named value attached to a log entry or to a core's context.
#[derive(Clone)]
pub struct Field {
    key: Cow<'static, str>,
    value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: FieldValue) -> Self {
        Field { key: key.into(), value }
    }

    pub fn string(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Field::new(key, FieldValue::Str(value.into()))
    }

    pub fn i64(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Field::new(key, FieldValue::I64(value))
    }

    pub fn u64(key: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Field::new(key, FieldValue::U64(value))
    }

    pub fn f64(key: impl Into<Cow<'static, str>>, value: f64) -> Self {
        Field::new(key, FieldValue::F64(value))
    }

    pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Field::new(key, FieldValue::Bool(value))
    }

    pub fn duration(key: impl Into<Cow<'static, str>>, value: Duration) -> Self {
        Field::new(key, FieldValue::Duration(value))
    }

    pub fn json(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Field::new(key, FieldValue::Json(value.into()))
    }

    pub fn object(key: impl Into<Cow<'static, str>>, value: impl MarshalObject + 'static) -> Self {
        Field::new(key, FieldValue::Object(Arc::new(value)))
    }

    pub fn inline(value: impl MarshalObject + 'static) -> Self {
        Field::new("", FieldValue::Inline(Arc::new(value)))
    }

    pub fn skip() -> Self {
        Field::new("", FieldValue::Skip)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn add_to(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError> {
        let key = self.key.as_ref();
        match &self.value {
            FieldValue::Str(v) => enc.add_str(key, v),
            FieldValue::I64(v) => enc.add_i64(key, *v),
            FieldValue::U64(v) => enc.add_u64(key, *v),
            FieldValue::F64(v) => enc.add_f64(key, *v)?,
            FieldValue::Bool(v) => enc.add_bool(key, *v),
            FieldValue::Duration(v) => enc.add_duration(key, *v),
            FieldValue::Json(v) => enc.add_json(key, v)?,
            FieldValue::Object(v) => enc.add_object(key, v.as_ref())?,
            FieldValue::Inline(v) => v.marshal(enc)?,
            FieldValue::Skip => {}
        }
        Ok(())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Field");
        s.field("key", &self.key);
        match &self.value {
            FieldValue::Str(v) => s.field("value", v),
            FieldValue::I64(v) => s.field("value", v),
            FieldValue::U64(v) => s.field("value", v),
            FieldValue::F64(v) => s.field("value", v),
            FieldValue::Bool(v) => s.field("value", v),
            FieldValue::Duration(v) => s.field("value", v),
            FieldValue::Json(v) => s.field("value", v),
            FieldValue::Object(_) => s.field("value", &"<object>"),
            FieldValue::Inline(_) => s.field("value", &"<inline>"),
            FieldValue::Skip => s.field("value", &"<skip>"),
        };
        s.finish()
    }
}

/// [`ObjectEncoder`] that collects sub-fields into a `serde_json` map.
///
/// Handy for inspecting what a [`MarshalObject`] produces without going
/// through a full entry encode.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapObjectEncoder {
    pub fields: Map<String, Value>,
}

impl MapObjectEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl ObjectEncoder for MapObjectEncoder {
    fn add_str(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.fields.insert(key.to_string(), Value::from(value));
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.fields.insert(key.to_string(), Value::from(value));
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.fields.insert(key.to_string(), Value::from(value));
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.fields.insert(key.to_string(), Value::from(value.as_secs_f64()));
    }

    fn add_f64(&mut self, key: &str, value: f64) -> Result<(), EncodeError> {
        let number = serde_json::Number::from_f64(value).ok_or_else(|| EncodeError::NonFiniteFloat {
            key: key.to_string(),
            value,
        })?;
        self.fields.insert(key.to_string(), Value::Number(number));
        Ok(())
    }

    fn add_json(&mut self, key: &str, value: &Value) -> Result<(), EncodeError> {
        self.fields.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn add_object(&mut self, key: &str, value: &dyn MarshalObject) -> Result<(), EncodeError> {
        let mut nested = MapObjectEncoder::new();
        value.marshal(&mut nested)?;
        self.fields.insert(key.to_string(), nested.into_value());
        Ok(())
    }
}
