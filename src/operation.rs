use crate::error::EncodeError;
use crate::field::{Field, MarshalObject, ObjectEncoder};

/// Key under which Cloud Logging groups related entries into one operation.
pub const OPERATION_KEY: &str = "logging.googleapis.com/operation";

/// Payload of the `operation` special field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    pub id: String,
    pub producer: String,
    pub first: bool,
    pub last: bool,
}

impl MarshalObject for Operation {
    fn marshal(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError> {
        enc.add_str("id", &self.id);
        enc.add_str("producer", &self.producer);
        enc.add_bool("first", self.first);
        enc.add_bool("last", self.last);
        Ok(())
    }
}

/// Operation field from its four parts. `id` and `producer` are written
/// as given.
pub fn operation(id: impl Into<String>, producer: impl Into<String>, first: bool, last: bool) -> Field {
    Field::object(
        OPERATION_KEY,
        Operation {
            id: id.into(),
            producer: producer.into(),
            first,
            last,
        },
    )
}

/// First entry of an operation.
pub fn operation_start(id: impl Into<String>, producer: impl Into<String>) -> Field {
    operation(id, producer, true, false)
}

/// Any entry between the first and the last.
pub fn operation_cont(id: impl Into<String>, producer: impl Into<String>) -> Field {
    operation(id, producer, false, false)
}

/// Last entry of an operation.
pub fn operation_end(id: impl Into<String>, producer: impl Into<String>) -> Field {
    operation(id, producer, false, true)
}
