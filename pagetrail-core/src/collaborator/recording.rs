//! In-memory analytics client that records every call
//!
//! Readiness is triggered by hand with `mark_ready`, which makes it possible
//! to observe what the tracker does before and after the client is ready.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use super::{AnalyticsClient, ReadyCallback};
use crate::types::Properties;

/// A call received by the recording client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RecordedCall {
    Initialize {
        integrations: Properties,
        options: Properties,
    },
    Track {
        event: String,
        properties: Properties,
    },
    Page {
        name: String,
        properties: Properties,
    },
    Identify {
        id: String,
        traits: Properties,
    },
}

/// A recorded call with its offset from client creation
#[derive(Debug, Clone, Serialize)]
pub struct RecordedEntry {
    pub at_ms: u64,
    #[serde(flatten)]
    pub call: RecordedCall,
}

#[derive(Default)]
struct RecordingState {
    ready: bool,
    waiting: Vec<ReadyCallback>,
    ready_registrations: usize,
    entries: Vec<RecordedEntry>,
}

/// Analytics client that keeps every call in memory
pub struct RecordingClient {
    started: Instant,
    integrations: Option<Vec<String>>,
    state: Mutex<RecordingState>,
}

impl Default for RecordingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            integrations: None,
            state: Mutex::new(RecordingState::default()),
        }
    }

    /// Publish an integration registry with the given names
    pub fn with_integrations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.integrations = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Signal readiness and run every waiting callback, in registration order
    ///
    /// Later calls are no-ops.
    pub fn mark_ready(&self) {
        let waiting = {
            let mut state = self.state.lock();
            if state.ready {
                return;
            }
            state.ready = true;
            std::mem::take(&mut state.waiting)
        };

        tracing::debug!(callbacks = waiting.len(), "Recording client ready");
        for callback in waiting {
            callback();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    /// Number of times `ready` was called
    pub fn ready_registrations(&self) -> usize {
        self.state.lock().ready_registrations
    }

    /// Recorded calls with timing offsets
    pub fn entries(&self) -> Vec<RecordedEntry> {
        self.state.lock().entries.clone()
    }

    /// Recorded calls without timing
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|e| e.call.clone())
            .collect()
    }

    /// Properties of each recorded `page` call, in order
    pub fn pages(&self) -> Vec<Properties> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Page { properties, .. } => Some(properties),
                _ => None,
            })
            .collect()
    }

    /// Event names of each recorded `track` call, in order
    pub fn tracked_events(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Track { event, .. } => Some(event),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        let elapsed: Duration = self.started.elapsed();
        self.state.lock().entries.push(RecordedEntry {
            at_ms: elapsed.as_millis() as u64,
            call,
        });
    }
}

impl AnalyticsClient for RecordingClient {
    fn ready(&self, callback: ReadyCallback) {
        let run_now = {
            let mut state = self.state.lock();
            state.ready_registrations += 1;
            if state.ready {
                Some(callback)
            } else {
                state.waiting.push(callback);
                None
            }
        };

        if let Some(callback) = run_now {
            callback();
        }
    }

    fn track(&self, event: &str, properties: &Properties) {
        self.record(RecordedCall::Track {
            event: event.to_string(),
            properties: properties.clone(),
        });
    }

    fn page(&self, name: &str, properties: &Properties) {
        self.record(RecordedCall::Page {
            name: name.to_string(),
            properties: properties.clone(),
        });
    }

    fn identify(&self, id: &str, traits: &Properties) {
        self.record(RecordedCall::Identify {
            id: id.to_string(),
            traits: traits.clone(),
        });
    }

    fn initialize(&self, integrations: &Properties, options: &Properties) {
        self.record(RecordedCall::Initialize {
            integrations: integrations.clone(),
            options: options.clone(),
        });
    }

    fn integrations(&self) -> Option<Vec<String>> {
        self.integrations.clone()
    }
}
