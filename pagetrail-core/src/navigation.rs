//! Navigation interceptor
//!
//! Produces one page view per navigation with the referrer set to the URL
//! the user was on just before it.
//!
//! - **pushState**: the referrer is the pre-navigation location. It is
//!   merged into the pushed state so a later back/forward to this entry can
//!   recover it.
//! - **back/forward**: the referrer is read back from the entry's state.
//! - **first load**: the referrer is `document.referrer`, written into the
//!   current entry with a same-URL replace.
//!
//! Telemetry never blocks navigation: failures while recording a push are
//! logged and the wrapped primitive runs regardless.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::browser::{BrowserWindow, HistoryMutator, PopStateEvent};
use crate::descriptor::{CaptureHandle, DescriptorBuilder};
use crate::error::{Error, Result};
use crate::types::{CaptureTiming, NavigationState};

/// Whether interception is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorState {
    Idle,
    Installed,
}

/// `pushState` wrapper that records the navigation before delegating
pub struct PushInterceptor {
    next: Arc<dyn HistoryMutator>,
    window: Arc<dyn BrowserWindow>,
    builder: DescriptorBuilder,
    delay: Duration,
}

impl HistoryMutator for PushInterceptor {
    fn push_state(&self, state: Option<Value>, title: &str, url: Option<&str>) -> Result<()> {
        let referrer = self.window.location().referrer();

        if let Err(e) = self.builder.schedule(referrer.clone(), self.delay) {
            let e = Error::NavigationEmission(e.to_string());
            tracing::warn!(error = %e, url = ?url, "Failed to record virtual navigation");
        }

        let state = match NavigationState::from_existing(state.as_ref()) {
            Ok(merged) => Some(merged.with_referrer(referrer).into_value()),
            Err(e) => {
                tracing::warn!(error = %e, url = ?url, "History state left without referrer");
                state
            }
        };

        self.next.push_state(state, title, url)
    }
}

/// Owns the interceptor lifecycle for one window
pub struct NavigationTracker {
    window: Arc<dyn BrowserWindow>,
    builder: DescriptorBuilder,
    timing: CaptureTiming,
    state: Mutex<InterceptorState>,
}

impl NavigationTracker {
    pub fn new(
        window: Arc<dyn BrowserWindow>,
        builder: DescriptorBuilder,
        timing: CaptureTiming,
    ) -> Self {
        Self {
            window,
            builder,
            timing,
            state: Mutex::new(InterceptorState::Idle),
        }
    }

    pub fn state(&self) -> InterceptorState {
        *self.state.lock()
    }

    /// Emit the initial page view with `document.referrer`
    ///
    /// The referrer is stored in the current entry so that navigating back
    /// to the landing page later reports the same referrer.
    pub fn record_first_load(&self) -> Result<CaptureHandle> {
        let referrer = self.window.document_referrer();

        let stored = NavigationState::from_existing(self.window.history_state().as_ref())
            .and_then(|state| {
                self.window
                    .replace_state(state.with_referrer(referrer.clone()).into_value())
            });
        if let Err(e) = stored {
            tracing::warn!(error = %e, "Could not store landing referrer in history state");
        }

        self.builder.schedule(referrer, self.timing.first_load_delay)
    }

    /// Wrap the history primitive and listen for back/forward
    ///
    /// Returns false if already installed; installation happens once.
    pub fn install(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state == InterceptorState::Installed {
                return false;
            }
            *state = InterceptorState::Installed;
        }

        let interceptor = PushInterceptor {
            next: self.window.history(),
            window: Arc::clone(&self.window),
            builder: self.builder.clone(),
            delay: self.timing.virtual_delay,
        };
        self.window.set_history(Arc::new(interceptor));

        let window = Arc::clone(&self.window);
        let builder = self.builder.clone();
        let delay = self.timing.popstate_delay;
        self.window
            .add_popstate_listener(Arc::new(move |_event: &PopStateEvent| {
                let referrer = NavigationState::stored_referrer(window.history_state().as_ref());
                if let Err(e) = builder.schedule(referrer, delay) {
                    tracing::warn!(error = %e, "Failed to schedule back/forward page view");
                }
            }));

        tracing::info!(
            popstate_delay_ms = delay.as_millis() as u64,
            "Navigation interceptor installed"
        );
        true
    }
}
