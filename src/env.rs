//! Environment variable names consulted by
//! [`crate::resource::EnvResourceDetector`].
//!
//! These are purely helpers; the core never reads the environment itself.

/// Project id, set by most Google Cloud runtimes and by users locally.
pub const GOOGLE_CLOUD_PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

/// Cloud Run / Knative service name.
pub const K_SERVICE_ENV: &str = "K_SERVICE";

/// Cloud Run revision name.
pub const K_REVISION_ENV: &str = "K_REVISION";

/// Cloud Run configuration name.
pub const K_CONFIGURATION_ENV: &str = "K_CONFIGURATION";

/// Cloud Functions entrypoint; distinguishes functions from plain Cloud Run.
pub const FUNCTION_TARGET_ENV: &str = "FUNCTION_TARGET";

/// Cloud Functions region (first generation runtimes).
pub const FUNCTION_REGION_ENV: &str = "FUNCTION_REGION";

/// App Engine service name.
pub const GAE_SERVICE_ENV: &str = "GAE_SERVICE";

/// App Engine version id.
pub const GAE_VERSION_ENV: &str = "GAE_VERSION";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating empty values as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
