use std::io;

/// Failure while turning an entry or a field into JSON.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("field {key:?}: non-finite float {value}")]
    NonFiniteFloat { key: String, value: f64 },

    #[error("field {key:?}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("field {key:?}: {message}")]
    Marshal { key: String, message: String },
}

/// Error returned by [`crate::core::Core`] operations.
///
/// None of these are fatal to the core itself: a failed write leaves the
/// core usable for the next entry.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("could not encode entry: {0}")]
    Encode(#[source] EncodeError),

    #[error("could not write buf: {0}")]
    Write(#[source] io::Error),

    #[error("failed to sync logger: {0}")]
    Sync(#[source] io::Error),
}
