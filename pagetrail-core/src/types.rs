//! Core domain types for pagetrail
//!
//! These types describe what flows between the window, the tracker and the
//! analytics client:
//! - `Location` - the parts of the current URL the tracker reads
//! - `PageDescriptor` - the normalized page-view record
//! - `NavigationState` - the history entry state carrying the stored referrer
//! - `Settings` - validated init settings consumed by the bootstrap

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Key/value properties forwarded to the analytics client
pub type Properties = serde_json::Map<String, Value>;

// ============================================
// Location
// ============================================

/// Snapshot of the window location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Full URL including fragment
    pub href: String,
    /// Scheme, host and port (`https://ex.com`)
    pub origin: String,
    /// Path component, always starting with `/` for hierarchical URLs
    pub pathname: String,
    /// Query string including the leading `?`, or empty
    pub search: String,
    /// Fragment including the leading `#`, or empty
    pub hash: String,
}

impl Location {
    /// Parse an absolute URL into its location components
    pub fn parse(href: &str) -> Result<Self> {
        let url = url::Url::parse(href)
            .map_err(|e| Error::InvalidArgument(format!("invalid URL {href:?}: {e}")))?;
        Ok(Self::from_url(&url))
    }

    pub(crate) fn from_url(url: &url::Url) -> Self {
        Self {
            href: url.as_str().to_string(),
            origin: url.origin().ascii_serialization(),
            pathname: url.path().to_string(),
            search: prefixed('?', url.query()),
            hash: prefixed('#', url.fragment()),
        }
    }

    /// The referrer form of this location: origin, path and query, no fragment
    pub fn referrer(&self) -> String {
        format!("{}{}{}", self.origin, self.pathname, self.search)
    }
}

/// Browsers report an empty query or fragment as the empty string
fn prefixed(prefix: char, part: Option<&str>) -> String {
    match part {
        Some(p) if !p.is_empty() => format!("{prefix}{p}"),
        _ => String::new(),
    }
}

// ============================================
// Page descriptor
// ============================================

/// Normalized page-view record handed to the analytics client
///
/// Built fresh for each navigation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub title: String,
    pub referrer: String,
    pub path: String,
    pub search: String,
    pub url: String,
}

impl PageDescriptor {
    /// Build a descriptor from the current document title and location
    pub fn new(title: impl Into<String>, referrer: impl Into<String>, location: &Location) -> Self {
        Self {
            title: title.into(),
            referrer: referrer.into(),
            path: location.pathname.clone(),
            search: location.search.clone(),
            url: location.href.clone(),
        }
    }

    /// Properties form used as the `page` call payload
    pub fn to_properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("title".into(), Value::String(self.title.clone()));
        props.insert("referrer".into(), Value::String(self.referrer.clone()));
        props.insert("path".into(), Value::String(self.path.clone()));
        props.insert("search".into(), Value::String(self.search.clone()));
        props.insert("url".into(), Value::String(self.url.clone()));
        props
    }
}

// ============================================
// Navigation state
// ============================================

/// History entry state with the reserved `referrer` field
///
/// The application may already keep its own fields in the state object.
/// Writes always merge into what is there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    fields: Properties,
}

impl NavigationState {
    /// Reserved key holding the stored referrer
    pub const REFERRER_KEY: &'static str = "referrer";

    /// Wrap an existing state blob; absent and null states start empty
    ///
    /// Non-object states cannot be merged without losing data and are rejected.
    pub fn from_existing(state: Option<&Value>) -> Result<Self> {
        match state {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self { fields: map.clone() }),
            Some(other) => Err(Error::InvalidArgument(format!(
                "history state is not an object: {other}"
            ))),
        }
    }

    /// Set the reserved field, keeping every other field
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.fields
            .insert(Self::REFERRER_KEY.to_string(), Value::String(referrer.into()));
        self
    }

    /// Stored referrer, if present and a string
    pub fn referrer(&self) -> Option<&str> {
        self.fields.get(Self::REFERRER_KEY).and_then(Value::as_str)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Referrer stored in a raw state blob, defaulting to the empty string
    ///
    /// Hash-only changes leave no state behind, so absence is normal.
    pub fn stored_referrer(state: Option<&Value>) -> String {
        state
            .and_then(|s| s.get(Self::REFERRER_KEY))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

// ============================================
// Settings
// ============================================

/// Capture delays applied by the navigation tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTiming {
    /// Delay for pushState navigations
    pub virtual_delay: Duration,
    /// Delay for back/forward navigations, gives the renderer time to retitle
    pub popstate_delay: Duration,
    /// Delay for the initial page view
    pub first_load_delay: Duration,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            virtual_delay: Duration::ZERO,
            popstate_delay: Duration::from_millis(50),
            first_load_delay: Duration::ZERO,
        }
    }
}

/// Validated init settings, consumed once by the bootstrap
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Integration name to integration settings
    pub integrations: Properties,
    /// Options passed through to `initialize`
    pub options: Properties,
    /// When false, the bootstrap initializes the client but tracks nothing
    pub autorun: bool,
    pub timing: CaptureTiming,
}
