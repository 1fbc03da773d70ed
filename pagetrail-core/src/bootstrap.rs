//! Bootstrap sequencer
//!
//! Hooks the window's startup signal. When the page finishes loading the
//! analytics client is initialized with the configured integrations, the
//! landing page view is emitted and the navigation interceptor is installed.
//! A startup handler that was already present keeps running, after ours.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::browser::{BrowserWindow, LoadEvent};
use crate::collaborator::Collaborator;
use crate::error::{ConfigurationWarning, Result, WarningLog};
use crate::navigation::NavigationTracker;
use crate::types::Settings;

/// What a bootstrap run ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Startup already handled for this page
    AlreadyRan,
    /// No integrations configured; nothing was set up
    NotConfigured,
    /// Client initialized, tracking left off (`autorun = false`)
    Initialized,
    /// Client initialized, landing page emitted, interceptor installed
    Tracking,
}

pub struct Bootstrap {
    settings: Settings,
    collaborator: Arc<Collaborator>,
    navigation: Arc<NavigationTracker>,
    warnings: WarningLog,
    started: AtomicBool,
}

impl Bootstrap {
    pub fn new(
        settings: Settings,
        collaborator: Arc<Collaborator>,
        navigation: Arc<NavigationTracker>,
        warnings: WarningLog,
    ) -> Self {
        Self {
            settings,
            collaborator,
            navigation,
            warnings,
            started: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Install on the window's startup signal, composing with any prior handler
    pub fn hook(this: &Arc<Self>, window: &dyn BrowserWindow) {
        let prior = window.startup_handler();
        let chained = prior.is_some();
        let bootstrap = Arc::clone(this);

        window.set_startup_handler(Arc::new(move |event: &LoadEvent| {
            match bootstrap.run() {
                Ok(outcome) => tracing::debug!(?outcome, url = %event.url, "Bootstrap finished"),
                Err(e) => tracing::error!(error = %e, "Analytics bootstrap failed"),
            }
            if let Some(prior) = &prior {
                prior(event);
            }
        }));

        tracing::debug!(chained, "Startup handler installed");
    }

    /// Run the startup sequence; only the first call does anything
    pub fn run(&self) -> Result<BootstrapOutcome> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(BootstrapOutcome::AlreadyRan);
        }

        if self.settings.integrations.is_empty() {
            self.warnings.report(ConfigurationWarning::NoIntegrations);
            return Ok(BootstrapOutcome::NotConfigured);
        }

        self.collaborator
            .initialize(&self.settings.integrations, &self.settings.options)?;
        tracing::info!(
            integrations = self.settings.integrations.len(),
            autorun = self.settings.autorun,
            "Analytics initialized"
        );

        if !self.settings.autorun {
            return Ok(BootstrapOutcome::Initialized);
        }

        if let Err(e) = self.navigation.record_first_load() {
            tracing::warn!(error = %e, "Failed to record landing page view");
        }
        self.navigation.install();

        Ok(BootstrapOutcome::Tracking)
    }
}
