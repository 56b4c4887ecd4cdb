pub mod core;
pub mod encoder;
pub mod error;
pub mod field;
pub mod record;
pub mod severity;
pub mod sink;
pub mod sync_error;

pub mod http_request;
pub mod operation;
pub mod resource;
pub mod source_location;

pub mod env;
pub mod init;
pub mod layer;
