//! Browser surface consumed by the tracker
//!
//! `BrowserWindow` is everything the tracker reads from or hooks into on the
//! host page: document title and referrer, the location, the history entry
//! state, the history mutation primitive, the startup signal, back/forward
//! notifications, and the global analytics slot.
//!
//! The history primitive lives in a slot. Wrapping it is explicit: an
//! interceptor holds the primitive it replaced as its `next` and is put back
//! in the slot, so any code that pushes through the window still gets
//! standard behaviour plus whatever wrappers were installed.

mod simulated;

pub use simulated::SimulatedWindow;

use std::sync::Arc;

use serde_json::Value;

use crate::collaborator::Collaborator;
use crate::error::Result;
use crate::types::Location;

/// The history mutation primitive (`history.pushState`)
pub trait HistoryMutator: Send + Sync {
    /// Push a new entry with `state`; `url` may be relative to the current location
    fn push_state(&self, state: Option<Value>, title: &str, url: Option<&str>) -> Result<()>;
}

/// Payload of the startup signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    /// Location at the time the page finished loading
    pub url: String,
}

/// Payload of a back/forward notification
#[derive(Debug, Clone, PartialEq)]
pub struct PopStateEvent {
    /// State of the entry navigated to
    pub state: Option<Value>,
}

/// Handler run once the page has finished loading
pub type StartupHandler = Arc<dyn Fn(&LoadEvent) + Send + Sync>;

/// Listener run on back/forward navigation
pub type PopStateListener = Arc<dyn Fn(&PopStateEvent) + Send + Sync>;

/// Host page as seen by the tracker
pub trait BrowserWindow: Send + Sync {
    /// `document.title`
    fn title(&self) -> String;

    /// `document.referrer`
    fn document_referrer(&self) -> String;

    /// `window.location`
    fn location(&self) -> Location;

    /// `history.state` of the current entry
    fn history_state(&self) -> Option<Value>;

    /// Replace the current entry's state without changing its URL
    fn replace_state(&self, state: Value) -> Result<()>;

    /// The history primitive currently installed
    fn history(&self) -> Arc<dyn HistoryMutator>;

    fn set_history(&self, history: Arc<dyn HistoryMutator>);

    /// The startup handler currently installed, if any
    fn startup_handler(&self) -> Option<StartupHandler>;

    fn set_startup_handler(&self, handler: StartupHandler);

    fn add_popstate_listener(&self, listener: PopStateListener);

    /// Publish the analytics client into the page's global slot
    fn publish_analytics(&self, analytics: Arc<Collaborator>);

    /// The analytics client in the page's global slot
    fn analytics(&self) -> Option<Arc<Collaborator>>;

    /// Push through whatever primitive is installed, as page code would
    fn push_state(&self, state: Option<Value>, title: &str, url: Option<&str>) -> Result<()> {
        self.history().push_state(state, title, url)
    }
}
