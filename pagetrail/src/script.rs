//! Navigation scripts
//!
//! A script describes the page a session lands on and the steps a user (or
//! the application) takes afterwards. Scripts are JSON documents:
//!
//! ```json
//! {
//!   "url": "https://ex.com/a?x=1",
//!   "title": "Page A",
//!   "referrer": "https://ref.com/",
//!   "integrations": { "Google Analytics": { "trackingId": "UA-1" } },
//!   "steps": [
//!     { "action": "push", "url": "/b", "title": "Page B" },
//!     { "action": "back", "title": "Page A" },
//!     { "action": "wait", "ms": 100 }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use pagetrail_core::Properties;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Landing URL
    pub url: String,

    #[serde(default)]
    pub title: String,

    /// Value of `document.referrer` on the landing page
    #[serde(default)]
    pub referrer: String,

    /// State already attached to the landing history entry
    #[serde(default)]
    pub state: Option<Value>,

    /// Overrides the integrations from the config file
    #[serde(default)]
    pub integrations: Option<Properties>,

    /// Overrides the options from the config file
    #[serde(default)]
    pub options: Option<Properties>,

    /// Report the client ready right after the page loads. When false the
    /// script needs a `ready` step.
    #[serde(default = "default_ready_on_load")]
    pub ready_on_load: bool,

    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_ready_on_load() -> bool {
    true
}

/// One thing that happens during a session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Application routes to `url` through pushState
    Push {
        url: String,
        #[serde(default)]
        state: Option<Value>,
        /// Document title the application sets after routing
        #[serde(default)]
        title: Option<String>,
    },
    /// Application replaces the current entry's state
    Replace { state: Value },
    Back {
        #[serde(default)]
        title: Option<String>,
    },
    Forward {
        #[serde(default)]
        title: Option<String>,
    },
    Go {
        delta: isize,
        #[serde(default)]
        title: Option<String>,
    },
    /// User follows an in-page anchor
    Hash { fragment: String },
    Title { title: String },
    Wait { ms: u64 },
    Track {
        event: String,
        #[serde(default)]
        properties: Properties,
    },
    Identify {
        id: String,
        #[serde(default)]
        traits: Properties,
    },
    /// Analytics client finishes loading
    Ready,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Push { .. } => "push",
            Step::Replace { .. } => "replace",
            Step::Back { .. } => "back",
            Step::Forward { .. } => "forward",
            Step::Go { .. } => "go",
            Step::Hash { .. } => "hash",
            Step::Title { .. } => "title",
            Step::Wait { .. } => "wait",
            Step::Track { .. } => "track",
            Step::Identify { .. } => "identify",
            Step::Ready => "ready",
        }
    }
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
