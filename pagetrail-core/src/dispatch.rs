//! Readiness-deferred dispatch
//!
//! Calls made before the analytics client reports readiness are queued and
//! replayed in submission order once it does. The first queued call registers
//! a single readiness callback; every later call either joins the queue or,
//! once the queue has drained, goes straight through.
//!
//! The readiness callback is a `FnOnce`, so a client that signals readiness
//! more than once cannot make the queue replay twice.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collaborator::{Collaborator, Operation};
use crate::error::{Error, Result};
use crate::types::Properties;

/// A call held until the client is ready
#[derive(Debug, Clone, PartialEq)]
pub enum PendingCall {
    Track { event: String, properties: Properties },
    Page { name: String, properties: Properties },
    Identify { id: String, traits: Properties },
}

impl PendingCall {
    pub fn operation(&self) -> Operation {
        match self {
            PendingCall::Track { .. } => Operation::Track,
            PendingCall::Page { .. } => Operation::Page,
            PendingCall::Identify { .. } => Operation::Identify,
        }
    }

    fn forward(&self, collaborator: &Collaborator) -> Result<()> {
        match self {
            PendingCall::Track { event, properties } => collaborator.track(event, properties),
            PendingCall::Page { name, properties } => collaborator.page(name, properties),
            PendingCall::Identify { id, traits } => collaborator.identify(id, traits),
        }
    }
}

#[derive(Default)]
struct DispatchState {
    ready: bool,
    listening: bool,
    queue: VecDeque<PendingCall>,
}

struct DispatchInner {
    collaborator: Arc<Collaborator>,
    state: Mutex<DispatchState>,
}

/// Queues calls until the analytics client is ready
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatchInner>,
}

impl Dispatcher {
    pub fn new(collaborator: Arc<Collaborator>) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                collaborator,
                state: Mutex::new(DispatchState::default()),
            }),
        }
    }

    pub fn track_when_ready(&self, event: impl Into<String>, properties: Properties) -> Result<()> {
        self.submit(PendingCall::Track {
            event: event.into(),
            properties,
        })
    }

    pub fn page_when_ready(&self, name: impl Into<String>, properties: Properties) -> Result<()> {
        self.submit(PendingCall::Page {
            name: name.into(),
            properties,
        })
    }

    pub fn identify_when_ready(&self, id: impl Into<String>, traits: Properties) -> Result<()> {
        self.submit(PendingCall::Identify {
            id: id.into(),
            traits,
        })
    }

    /// Whether readiness has fired and the queue has drained
    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().ready
    }

    /// Number of calls waiting for readiness
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Forward now if ready, otherwise queue and make sure a flush is registered
    pub fn submit(&self, call: PendingCall) -> Result<()> {
        let collaborator = &self.inner.collaborator;
        if !collaborator.implements(call.operation()) {
            return Err(Error::missing(call.operation().as_str()));
        }

        let register = {
            let mut state = self.inner.state.lock();
            if state.ready {
                drop(state);
                return call.forward(collaborator);
            }

            tracing::debug!(
                operation = %call.operation(),
                queued = state.queue.len() + 1,
                "Deferring call until analytics is ready"
            );
            state.queue.push_back(call);
            !std::mem::replace(&mut state.listening, true)
        };

        if register {
            let inner = Arc::clone(&self.inner);
            let registered = collaborator.ready(Box::new(move || inner.flush()));
            if registered.is_err() {
                // Leave the queue intact so a later call can retry registration.
                self.inner.state.lock().listening = false;
            }
            registered?;
        }
        Ok(())
    }
}

impl DispatchInner {
    /// Replay the queue in order, then switch to direct forwarding
    ///
    /// Calls submitted while the flush runs land at the back of the queue and
    /// are replayed by this same loop.
    fn flush(&self) {
        let mut replayed = 0usize;
        loop {
            let next = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(call) => call,
                    None => {
                        state.ready = true;
                        break;
                    }
                }
            };

            if let Err(e) = next.forward(&self.collaborator) {
                tracing::warn!(
                    operation = %next.operation(),
                    error = %e,
                    "Failed to replay deferred call"
                );
            }
            replayed += 1;
        }

        tracing::debug!(replayed, "Analytics ready, deferred calls flushed");
    }
}
