//! Page descriptor builder
//!
//! Page views are captured after a delay rather than at call time. Right
//! after a route change the title, and for pushState the location itself,
//! may not reflect the new page yet. Each capture is a task on the event
//! loop; overlapping captures are independent and none is cancelled by the
//! tracker.
//!
//! Captures run on the tokio runtime the caller is inside, which must be a
//! current-thread one. A capture must not run before the navigation that
//! scheduled it finishes, and a multi-thread worker could pick it up early.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::RuntimeFlavor;
use tokio::task::JoinHandle;

use crate::browser::BrowserWindow;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::types::PageDescriptor;

/// Handle to a scheduled capture
#[derive(Debug)]
pub struct CaptureHandle {
    task: JoinHandle<()>,
}

impl CaptureHandle {
    /// Abort the capture if it has not run yet
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Builds page descriptors from the window and hands them to dispatch
#[derive(Clone)]
pub struct DescriptorBuilder {
    window: Arc<dyn BrowserWindow>,
    dispatcher: Dispatcher,
}

impl DescriptorBuilder {
    pub fn new(window: Arc<dyn BrowserWindow>, dispatcher: Dispatcher) -> Self {
        Self { window, dispatcher }
    }

    /// Snapshot the current title and location
    pub fn capture(&self, referrer: &str) -> PageDescriptor {
        PageDescriptor::new(self.window.title(), referrer, &self.window.location())
    }

    /// Snapshot now and send it as a page view named after the title
    pub fn emit(&self, referrer: &str) -> Result<PageDescriptor> {
        let descriptor = self.capture(referrer);
        self.dispatcher
            .page_when_ready(descriptor.title.clone(), descriptor.to_properties())?;
        Ok(descriptor)
    }

    /// Emit after `delay` on the event loop
    pub fn schedule(&self, referrer: impl Into<String>, delay: Duration) -> Result<CaptureHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Scheduler(format!("no event loop to schedule capture: {e}")))?;
        if runtime.runtime_flavor() != RuntimeFlavor::CurrentThread {
            return Err(Error::Scheduler(format!(
                "captures need a current-thread runtime, got {:?}",
                runtime.runtime_flavor()
            )));
        }

        let builder = self.clone();
        let referrer = referrer.into();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            match builder.emit(&referrer) {
                Ok(descriptor) => tracing::debug!(
                    path = %descriptor.path,
                    referrer = %descriptor.referrer,
                    "Page view captured"
                ),
                Err(e) => tracing::warn!(error = %e, "Failed to emit page view"),
            }
        });

        Ok(CaptureHandle { task })
    }
}
