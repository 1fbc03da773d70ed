//! # pagetrail-core
//!
//! Navigation tracking for single-page applications.
//!
//! This library provides:
//! - Page-view emission with a correct referrer for every navigation,
//!   including pushState routing and back/forward
//! - Readiness-deferred dispatch to an external analytics client
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Navigation flows through four stages:
//! - **Entry point:** `init` validates the client and integrations, then
//!   publishes the client on the window
//! - **Bootstrap:** on the window's startup signal, initializes the client,
//!   emits the landing page view and installs the interceptor
//! - **Interceptor:** wraps pushState and listens for back/forward, threading
//!   the referrer through history entry state
//! - **Dispatch:** page views and calls wait for the client's readiness and
//!   replay in order
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pagetrail_core::{init, Collaborator, InitOptions, RecordingClient, SimulatedWindow};
//!
//! # async fn run() -> pagetrail_core::Result<()> {
//! let window = Arc::new(SimulatedWindow::new("https://ex.com/a")?.with_title("Home"));
//! let client = Arc::new(RecordingClient::new());
//!
//! let _tracker = init(
//!     window.clone(),
//!     InitOptions {
//!         analytics: Some(Collaborator::from_client(client.clone())),
//!         integrations: Some(serde_json::json!({ "Google Analytics": {} })),
//!         ..Default::default()
//!     },
//! )?;
//!
//! window.load();
//! client.mark_ready();
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use browser::{BrowserWindow, HistoryMutator, SimulatedWindow};
pub use collaborator::{AnalyticsClient, Collaborator, RecordingClient};
pub use config::Config;
pub use error::{ConfigurationWarning, Error, Result};
pub use init::{init, InitOptions, Tracker};
pub use types::*;

// Public modules
pub mod bootstrap;
pub mod browser;
pub mod collaborator;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod init;
pub mod logging;
pub mod navigation;
pub mod types;
