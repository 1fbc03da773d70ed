//! Error types for pagetrail-core

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Main error type for the pagetrail-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Bad shape passed to the entry point
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Required analytics client operations are absent
    #[error("analytics client is missing required operations: {}", .members.join(", "))]
    MissingDependency { members: Vec<&'static str> },

    /// Failure while computing or emitting a virtual navigation page view
    #[error("navigation emission failed: {0}")]
    NavigationEmission(String),

    /// Capture could not be scheduled on the event loop
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a single missing collaborator operation
    pub fn missing(member: &'static str) -> Self {
        Error::MissingDependency {
            members: vec![member],
        }
    }
}

/// Result type alias for pagetrail-core
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal configuration problems found during init or startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationWarning {
    /// No integrations configured; analytics will not be set up
    #[error("no integrations configured, analytics is disabled")]
    NoIntegrations,

    /// Configured integrations the analytics client does not implement
    #[error("integrations configured but not implemented by the client: {}", .0.join(", "))]
    UnsupportedIntegrations(Vec<String>),
}

/// Shared record of configuration warnings
///
/// Every warning is logged when reported and kept for later inspection.
#[derive(Debug, Clone, Default)]
pub struct WarningLog {
    entries: Arc<Mutex<Vec<ConfigurationWarning>>>,
}

impl WarningLog {
    pub fn report(&self, warning: ConfigurationWarning) {
        tracing::warn!(warning = %warning, "Analytics configuration warning");
        self.entries.lock().push(warning);
    }

    pub fn entries(&self) -> Vec<ConfigurationWarning> {
        self.entries.lock().clone()
    }
}
