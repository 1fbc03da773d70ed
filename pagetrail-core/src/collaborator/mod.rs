//! Analytics client binding
//!
//! The tracker never talks to an analytics client directly. It goes through a
//! `Collaborator`, a table of the client's operations. A table can be built
//! from any `AnalyticsClient` implementation, or assembled operation by
//! operation when a host binds a foreign client whose shape is only known at
//! runtime. Absent operations surface as `Error::MissingDependency`.

mod recording;

pub use recording::{RecordedCall, RecordedEntry, RecordingClient};

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::Properties;

/// Callback invoked once the client's integrations have loaded
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

type ReadyFn = Arc<dyn Fn(ReadyCallback) + Send + Sync>;
type CallFn = Arc<dyn Fn(&str, &Properties) + Send + Sync>;
type InitializeFn = Arc<dyn Fn(&Properties, &Properties) + Send + Sync>;

/// Operations a collaborator may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ready,
    Track,
    Page,
    Identify,
    Initialize,
}

impl Operation {
    /// Operations the entry point insists on, in reporting order
    pub const REQUIRED: [Operation; 4] = [
        Operation::Ready,
        Operation::Track,
        Operation::Page,
        Operation::Identify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Ready => "ready",
            Operation::Track => "track",
            Operation::Page => "page",
            Operation::Identify => "identify",
            Operation::Initialize => "initialize",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete analytics client
pub trait AnalyticsClient: Send + Sync {
    /// Run `callback` once integrations are loaded (immediately if they already are)
    fn ready(&self, callback: ReadyCallback);

    fn track(&self, event: &str, properties: &Properties);

    fn page(&self, name: &str, properties: &Properties);

    fn identify(&self, id: &str, traits: &Properties);

    /// Configure downstream delivery
    fn initialize(&self, integrations: &Properties, options: &Properties);

    /// Names of integrations the client can actually run, if it publishes a registry
    fn integrations(&self) -> Option<Vec<String>> {
        None
    }
}

/// Operation table for an analytics client
#[derive(Clone, Default)]
pub struct Collaborator {
    ready: Option<ReadyFn>,
    track: Option<CallFn>,
    page: Option<CallFn>,
    identify: Option<CallFn>,
    initialize: Option<InitializeFn>,
    integrations: Option<BTreeSet<String>>,
}

impl Collaborator {
    /// An empty table; every operation is missing
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every operation of a complete client
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: AnalyticsClient + 'static,
    {
        let registry = client.integrations();

        let ready_client = Arc::clone(&client);
        let track_client = Arc::clone(&client);
        let page_client = Arc::clone(&client);
        let identify_client = Arc::clone(&client);
        let init_client = client;

        let mut collaborator = Self::new()
            .with_ready(move |cb| ready_client.ready(cb))
            .with_track(move |event, props| track_client.track(event, props))
            .with_page(move |name, props| page_client.page(name, props))
            .with_identify(move |id, traits| identify_client.identify(id, traits))
            .with_initialize(move |integrations, options| {
                init_client.initialize(integrations, options)
            });

        if let Some(names) = registry {
            collaborator = collaborator.with_integrations(names);
        }
        collaborator
    }

    pub fn with_ready(mut self, f: impl Fn(ReadyCallback) + Send + Sync + 'static) -> Self {
        self.ready = Some(Arc::new(f));
        self
    }

    pub fn with_track(mut self, f: impl Fn(&str, &Properties) + Send + Sync + 'static) -> Self {
        self.track = Some(Arc::new(f));
        self
    }

    pub fn with_page(mut self, f: impl Fn(&str, &Properties) + Send + Sync + 'static) -> Self {
        self.page = Some(Arc::new(f));
        self
    }

    pub fn with_identify(mut self, f: impl Fn(&str, &Properties) + Send + Sync + 'static) -> Self {
        self.identify = Some(Arc::new(f));
        self
    }

    pub fn with_initialize(
        mut self,
        f: impl Fn(&Properties, &Properties) + Send + Sync + 'static,
    ) -> Self {
        self.initialize = Some(Arc::new(f));
        self
    }

    /// Publish the client's integration registry
    pub fn with_integrations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.integrations = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the table has a binding for `op`
    pub fn implements(&self, op: Operation) -> bool {
        match op {
            Operation::Ready => self.ready.is_some(),
            Operation::Track => self.track.is_some(),
            Operation::Page => self.page.is_some(),
            Operation::Identify => self.identify.is_some(),
            Operation::Initialize => self.initialize.is_some(),
        }
    }

    /// Required operations that are not bound, in reporting order
    pub fn missing_required(&self) -> Vec<&'static str> {
        Operation::REQUIRED
            .iter()
            .filter(|op| !self.implements(**op))
            .map(Operation::as_str)
            .collect()
    }

    /// The integration registry, if the client publishes one
    pub fn integrations(&self) -> Option<&BTreeSet<String>> {
        self.integrations.as_ref()
    }

    pub fn ready(&self, callback: ReadyCallback) -> Result<()> {
        let f = self.ready.as_ref().ok_or_else(|| Error::missing("ready"))?;
        f(callback);
        Ok(())
    }

    pub fn track(&self, event: &str, properties: &Properties) -> Result<()> {
        let f = self.track.as_ref().ok_or_else(|| Error::missing("track"))?;
        f(event, properties);
        Ok(())
    }

    pub fn page(&self, name: &str, properties: &Properties) -> Result<()> {
        let f = self.page.as_ref().ok_or_else(|| Error::missing("page"))?;
        f(name, properties);
        Ok(())
    }

    pub fn identify(&self, id: &str, traits: &Properties) -> Result<()> {
        let f = self
            .identify
            .as_ref()
            .ok_or_else(|| Error::missing("identify"))?;
        f(id, traits);
        Ok(())
    }

    pub fn initialize(&self, integrations: &Properties, options: &Properties) -> Result<()> {
        let f = self
            .initialize
            .as_ref()
            .ok_or_else(|| Error::missing("initialize"))?;
        f(integrations, options);
        Ok(())
    }
}

impl fmt::Debug for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: Vec<&str> = [
            Operation::Ready,
            Operation::Track,
            Operation::Page,
            Operation::Identify,
            Operation::Initialize,
        ]
        .iter()
        .filter(|op| self.implements(**op))
        .map(Operation::as_str)
        .collect();

        f.debug_struct("Collaborator")
            .field("operations", &bound)
            .field("integrations", &self.integrations)
            .finish()
    }
}
