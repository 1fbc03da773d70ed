//! In-memory browser window
//!
//! Models a single tab: a document with a title and an incoming referrer,
//! and a session history of `{url, state}` entries with a cursor. Pushing
//! drops forward entries; back/forward move the cursor and notify popstate
//! listeners. Used by the replay CLI and by tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use url::Url;

use super::{
    BrowserWindow, HistoryMutator, LoadEvent, PopStateEvent, PopStateListener, StartupHandler,
};
use crate::collaborator::Collaborator;
use crate::error::{Error, Result};
use crate::types::Location;

struct HistoryEntry {
    url: Url,
    state: Option<Value>,
}

/// Session history; `entries` is never empty
struct SessionHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl SessionHistory {
    fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    fn current_mut(&mut self) -> &mut HistoryEntry {
        &mut self.entries[self.index]
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }

    /// Move the cursor by `delta`, returning the new entry's state
    fn traverse(&mut self, delta: isize) -> Option<Option<Value>> {
        if delta == 0 {
            return None;
        }
        let target = (self.index as isize).checked_add(delta)?;
        let target = usize::try_from(target)
            .ok()
            .filter(|&t| t < self.entries.len())?;
        self.index = target;
        Some(self.current().state.clone())
    }
}

/// The window's own `pushState`
struct NativeHistory {
    session: Arc<Mutex<SessionHistory>>,
}

impl HistoryMutator for NativeHistory {
    fn push_state(&self, state: Option<Value>, _title: &str, url: Option<&str>) -> Result<()> {
        let mut session = self.session.lock();
        let current = &session.current().url;

        let target = match url {
            Some(u) => current
                .join(u)
                .map_err(|e| Error::InvalidArgument(format!("invalid URL {u:?}: {e}")))?,
            None => current.clone(),
        };

        if target.origin() != current.origin() {
            return Err(Error::InvalidArgument(format!(
                "cannot push {target} from origin {}",
                current.origin().ascii_serialization()
            )));
        }

        session.push(HistoryEntry { url: target, state });
        Ok(())
    }
}

struct Document {
    title: String,
    referrer: String,
}

/// A browser window held entirely in memory
pub struct SimulatedWindow {
    document: Mutex<Document>,
    session: Arc<Mutex<SessionHistory>>,
    history: Mutex<Arc<dyn HistoryMutator>>,
    startup: Mutex<Option<StartupHandler>>,
    popstate: Mutex<Vec<PopStateListener>>,
    analytics: Mutex<Option<Arc<Collaborator>>>,
    loaded: AtomicBool,
}

impl SimulatedWindow {
    /// Open a window at an absolute URL with an empty title and no referrer
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::InvalidArgument(format!("invalid URL {url:?}: {e}")))?;

        let session = Arc::new(Mutex::new(SessionHistory {
            entries: vec![HistoryEntry { url, state: None }],
            index: 0,
        }));
        let native: Arc<dyn HistoryMutator> = Arc::new(NativeHistory {
            session: Arc::clone(&session),
        });

        Ok(Self {
            document: Mutex::new(Document {
                title: String::new(),
                referrer: String::new(),
            }),
            session,
            history: Mutex::new(native),
            startup: Mutex::new(None),
            popstate: Mutex::new(Vec::new()),
            analytics: Mutex::new(None),
            loaded: AtomicBool::new(false),
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.document.get_mut().title = title.into();
        self
    }

    /// Set the referrer the page was opened with
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.document.get_mut().referrer = referrer.into();
        self
    }

    /// Seed the initial entry's state, as if the app had already written one
    pub fn with_state(self, state: Value) -> Self {
        self.session.lock().current_mut().state = Some(state);
        self
    }

    /// Change `document.title`, as a renderer would after a route change
    pub fn set_title(&self, title: impl Into<String>) {
        self.document.lock().title = title.into();
    }

    /// Fire the startup signal; only the first call has any effect
    pub fn load(&self) -> bool {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return false;
        }

        let handler = self.startup.lock().clone();
        if let Some(handler) = handler {
            handler(&LoadEvent {
                url: self.current_url(),
            });
        }
        true
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Traverse the session history; out-of-range moves do nothing
    pub fn go(&self, delta: isize) -> bool {
        let state = match self.session.lock().traverse(delta) {
            Some(state) => state,
            None => return false,
        };

        tracing::trace!(delta, url = %self.current_url(), "History traversal");
        self.dispatch_popstate(PopStateEvent { state });
        true
    }

    /// Fragment navigation: a new entry with no state, then popstate
    pub fn navigate_hash(&self, fragment: &str) {
        {
            let mut session = self.session.lock();
            let mut url = session.current().url.clone();
            url.set_fragment(Some(fragment.trim_start_matches('#')));
            session.push(HistoryEntry { url, state: None });
        }
        self.dispatch_popstate(PopStateEvent { state: None });
    }

    pub fn history_len(&self) -> usize {
        self.session.lock().entries.len()
    }

    pub fn current_url(&self) -> String {
        self.session.lock().current().url.to_string()
    }

    fn dispatch_popstate(&self, event: PopStateEvent) {
        let listeners = self.popstate.lock().clone();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl BrowserWindow for SimulatedWindow {
    fn title(&self) -> String {
        self.document.lock().title.clone()
    }

    fn document_referrer(&self) -> String {
        self.document.lock().referrer.clone()
    }

    fn location(&self) -> Location {
        Location::from_url(&self.session.lock().current().url)
    }

    fn history_state(&self) -> Option<Value> {
        self.session.lock().current().state.clone()
    }

    fn replace_state(&self, state: Value) -> Result<()> {
        self.session.lock().current_mut().state = Some(state);
        Ok(())
    }

    fn history(&self) -> Arc<dyn HistoryMutator> {
        self.history.lock().clone()
    }

    fn set_history(&self, history: Arc<dyn HistoryMutator>) {
        *self.history.lock() = history;
    }

    fn startup_handler(&self) -> Option<StartupHandler> {
        self.startup.lock().clone()
    }

    fn set_startup_handler(&self, handler: StartupHandler) {
        *self.startup.lock() = Some(handler);
    }

    fn add_popstate_listener(&self, listener: PopStateListener) {
        self.popstate.lock().push(listener);
    }

    fn publish_analytics(&self, analytics: Arc<Collaborator>) {
        *self.analytics.lock() = Some(analytics);
    }

    fn analytics(&self) -> Option<Arc<Collaborator>> {
        self.analytics.lock().clone()
    }
}
