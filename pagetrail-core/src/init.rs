//! Entry point
//!
//! `init` checks that a usable analytics client and an integration mapping
//! were supplied, publishes the client into the window's global slot and
//! hooks the bootstrap onto the startup signal. Nothing is tracked until the
//! window reports that it has loaded.

use std::sync::Arc;

use serde_json::Value;

use crate::bootstrap::Bootstrap;
use crate::browser::BrowserWindow;
use crate::collaborator::Collaborator;
use crate::descriptor::DescriptorBuilder;
use crate::dispatch::Dispatcher;
use crate::error::{ConfigurationWarning, Error, Result, WarningLog};
use crate::navigation::{InterceptorState, NavigationTracker};
use crate::types::{CaptureTiming, Properties, Settings};

/// Arguments to `init`
///
/// Mirrors the loosely typed shape a host page passes in: any member may be
/// missing and the mappings are raw JSON until validated.
#[derive(Debug, Default)]
pub struct InitOptions {
    pub analytics: Option<Collaborator>,
    pub integrations: Option<Value>,
    pub options: Option<Value>,
    /// Defaults to true; only an explicit `false` turns tracking off
    pub autorun: Option<bool>,
    pub timing: Option<CaptureTiming>,
}

/// Handle to a wired-up tracker
pub struct Tracker {
    collaborator: Arc<Collaborator>,
    dispatcher: Dispatcher,
    navigation: Arc<NavigationTracker>,
    bootstrap: Arc<Bootstrap>,
    warnings: WarningLog,
}

/// Validate inputs and wire the tracker into `window`
pub fn init(window: Arc<dyn BrowserWindow>, opts: InitOptions) -> Result<Tracker> {
    let analytics = opts
        .analytics
        .ok_or_else(|| Error::InvalidArgument("analytics must be provided".to_string()))?;
    let integrations = object_argument("integrations", opts.integrations)?;
    let options = match opts.options {
        None | Some(Value::Null) => Properties::new(),
        other => object_argument("options", other)?,
    };

    let missing = analytics.missing_required();
    if !missing.is_empty() {
        return Err(Error::MissingDependency { members: missing });
    }

    let warnings = WarningLog::default();
    if let Some(registry) = analytics.integrations() {
        let unsupported: Vec<String> = integrations
            .keys()
            .filter(|name| !registry.contains(name.as_str()))
            .cloned()
            .collect();
        if !unsupported.is_empty() {
            warnings.report(ConfigurationWarning::UnsupportedIntegrations(unsupported));
        }
    }

    let settings = Settings {
        integrations,
        options,
        autorun: opts.autorun != Some(false),
        timing: opts.timing.unwrap_or_default(),
    };

    let collaborator = Arc::new(analytics);
    window.publish_analytics(Arc::clone(&collaborator));

    let dispatcher = Dispatcher::new(Arc::clone(&collaborator));
    let builder = DescriptorBuilder::new(Arc::clone(&window), dispatcher.clone());
    let navigation = Arc::new(NavigationTracker::new(
        Arc::clone(&window),
        builder,
        settings.timing,
    ));
    let bootstrap = Arc::new(Bootstrap::new(
        settings,
        Arc::clone(&collaborator),
        Arc::clone(&navigation),
        warnings.clone(),
    ));
    Bootstrap::hook(&bootstrap, window.as_ref());

    tracing::info!(?collaborator, "Analytics tracker wired");

    Ok(Tracker {
        collaborator,
        dispatcher,
        navigation,
        bootstrap,
        warnings,
    })
}

fn object_argument(name: &str, value: Option<Value>) -> Result<Properties> {
    match value {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(Error::InvalidArgument(format!(
            "{name} must be an object, got {}",
            value_kind(&other)
        ))),
        None => Err(Error::InvalidArgument(format!("{name} must be provided"))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Tracker {
    /// Track an event once the client is ready
    pub fn track(&self, event: impl Into<String>, properties: Properties) -> Result<()> {
        self.dispatcher.track_when_ready(event, properties)
    }

    /// Record a page view once the client is ready
    pub fn page(&self, name: impl Into<String>, properties: Properties) -> Result<()> {
        self.dispatcher.page_when_ready(name, properties)
    }

    /// Identify the user once the client is ready
    pub fn identify(&self, id: impl Into<String>, traits: Properties) -> Result<()> {
        self.dispatcher.identify_when_ready(id, traits)
    }

    /// Configuration warnings reported so far
    pub fn warnings(&self) -> Vec<ConfigurationWarning> {
        self.warnings.entries()
    }

    pub fn is_installed(&self) -> bool {
        self.navigation.state() == InterceptorState::Installed
    }

    pub fn settings(&self) -> &Settings {
        self.bootstrap.settings()
    }

    pub fn collaborator(&self) -> Arc<Collaborator> {
        Arc::clone(&self.collaborator)
    }

    /// Calls still waiting for the client to become ready
    pub fn pending_calls(&self) -> usize {
        self.dispatcher.pending()
    }
}
