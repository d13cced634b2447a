pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::classification::IncidentClassifier;
use crate::config::{Config, UnconfiguredPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<IncidentClassifier>,
    pub unconfigured_policy: UnconfiguredPolicy,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(classifier: Arc<IncidentClassifier>) -> Self {
        let defaults = Config::default();
        Self {
            classifier,
            unconfigured_policy: defaults.classification.unconfigured_policy,
            max_body_bytes: defaults.server.max_body_bytes,
            request_timeout: Duration::from_secs(defaults.server.request_timeout_secs),
        }
    }

    /// Build state from application config
    pub fn from_config(classifier: Arc<IncidentClassifier>, config: &Config) -> Self {
        Self {
            classifier,
            unconfigured_policy: config.classification.unconfigured_policy,
            max_body_bytes: config.server.max_body_bytes,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        }
    }

    /// Set the policy for requests arriving without a provider credential
    pub fn with_unconfigured_policy(mut self, policy: UnconfiguredPolicy) -> Self {
        self.unconfigured_policy = policy;
        self
    }
}
