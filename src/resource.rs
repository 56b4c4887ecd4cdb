use crate::env::{
    env_opt, env_or, FUNCTION_REGION_ENV, FUNCTION_TARGET_ENV, GAE_SERVICE_ENV, GAE_VERSION_ENV,
    GOOGLE_CLOUD_PROJECT_ENV, K_CONFIGURATION_ENV, K_REVISION_ENV, K_SERVICE_ENV,
};
use crate::error::EncodeError;
use crate::field::{Field, MarshalObject, ObjectEncoder};
use std::collections::BTreeMap;

/// Deployment resource the process runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    /// Monitored resource type, e.g. `cloud_run_revision`.
    pub kind: String,
    /// Log stream the resource writes to.
    pub log_id: String,
    pub labels: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(kind: impl Into<String>, log_id: impl Into<String>) -> Self {
        Resource {
            kind: kind.into(),
            log_id: log_id.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// `<kind>: <log id>` followed by the labels inlined at the top level.
    /// An unknown resource contributes nothing.
    pub fn fields(&self) -> Vec<Field> {
        if self.kind.is_empty() {
            return Vec::new();
        }
        vec![
            Field::string(self.kind.clone(), self.log_id.clone()),
            Field::inline(self.clone()),
        ]
    }
}

impl MarshalObject for Resource {
    fn marshal(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError> {
        for (k, v) in &self.labels {
            enc.add_str(k, v);
        }
        Ok(())
    }
}

/// Source of the [`Resource`] attached to every line.
pub trait ResourceDetector {
    /// `None` when the platform could not be identified.
    fn detect(&self) -> Option<Resource>;
}

impl<F> ResourceDetector for F
where
    F: Fn() -> Option<Resource>,
{
    fn detect(&self) -> Option<Resource> {
        self()
    }
}

/// Detects Cloud Functions, Cloud Run and App Engine from the variables
/// their runtimes export.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvResourceDetector;

impl ResourceDetector for EnvResourceDetector {
    fn detect(&self) -> Option<Resource> {
        let project = env_opt(GOOGLE_CLOUD_PROJECT_ENV);
        let with_project = |res: Resource| match &project {
            Some(p) => res.with_label("project_id", p.clone()),
            None => res,
        };

        if let Some(service) = env_opt(K_SERVICE_ENV) {
            if env_opt(FUNCTION_TARGET_ENV).is_some() {
                let mut res = Resource::new("cloud_function", "cloudfunctions.googleapis.com/cloud-functions")
                    .with_label("function_name", service);
                if let Some(region) = env_opt(FUNCTION_REGION_ENV) {
                    res = res.with_label("region", region);
                }
                return Some(with_project(res));
            }

            let res = Resource::new("cloud_run_revision", "run.googleapis.com/stdout")
                .with_label("service_name", service)
                .with_label("revision_name", env_or(K_REVISION_ENV, ""))
                .with_label("configuration_name", env_or(K_CONFIGURATION_ENV, ""));
            return Some(with_project(res));
        }

        if let Some(service) = env_opt(GAE_SERVICE_ENV) {
            let res = Resource::new("gae_app", "appengine.googleapis.com/stdout")
                .with_label("module_id", service)
                .with_label("version_id", env_or(GAE_VERSION_ENV, ""));
            return Some(with_project(res));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::MapObjectEncoder;
    use serde_json::json;

    #[test]
    fn fields_for_known_resource() {
        let res = Resource::new("cloud_run_revision", "run.googleapis.com/stdout")
            .with_label("service_name", "api")
            .with_label("revision_name", "api-00001");

        let mut enc = MapObjectEncoder::new();
        for f in res.fields() {
            f.add_to(&mut enc).unwrap();
        }
        assert_eq!(
            enc.into_value(),
            json!({
                "cloud_run_revision": "run.googleapis.com/stdout",
                "service_name": "api",
                "revision_name": "api-00001",
            })
        );
    }

    #[test]
    fn unknown_resource_has_no_fields() {
        assert!(Resource::default().fields().is_empty());
    }

    #[test]
    fn closure_detector() {
        let detector = || Some(Resource::new("global", "log"));
        assert_eq!(detector.detect().unwrap().kind, "global");
    }
}
