//! Run a navigation script against a simulated window
//!
//! The script's steps drive a `SimulatedWindow`; every call the tracker makes
//! lands in a `RecordingClient` and ends up in the report.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pagetrail_core::collaborator::{RecordedCall, RecordedEntry};
use pagetrail_core::{
    init, BrowserWindow, CaptureTiming, Collaborator, Config, InitOptions, RecordingClient,
    SimulatedWindow, Tracker,
};
use serde::Serialize;
use serde_json::Value;

use crate::script::{Script, Step};

/// Extra time allowed for the last scheduled capture to land
const SETTLE_MARGIN: Duration = Duration::from_millis(20);

/// Outcome of a replay
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub final_url: String,
    pub history_len: usize,
    pub installed: bool,
    pub pending_calls: usize,
    pub warnings: Vec<String>,
    pub calls: Vec<RecordedEntry>,
}

struct Session {
    window: Arc<SimulatedWindow>,
    client: Arc<RecordingClient>,
    tracker: Tracker,
}

/// Replay `script` with integrations, options and timing from `config`
pub async fn run(script: &Script, config: &Config) -> Result<ReplayReport> {
    let integrations = match &script.integrations {
        Some(integrations) => integrations.clone(),
        None => config.integrations_json()?,
    };
    let options = match &script.options {
        Some(options) => options.clone(),
        None => config.options_json()?,
    };
    let timing = config.tracking.timing();

    let mut window = SimulatedWindow::new(&script.url)
        .with_context(|| format!("invalid landing url {}", script.url))?
        .with_title(script.title.as_str())
        .with_referrer(script.referrer.as_str());
    if let Some(state) = &script.state {
        window = window.with_state(state.clone());
    }
    let window = Arc::new(window);
    let client = Arc::new(RecordingClient::new());

    let tracker = init(
        window.clone(),
        InitOptions {
            analytics: Some(Collaborator::from_client(client.clone())),
            integrations: Some(Value::Object(integrations)),
            options: Some(Value::Object(options)),
            autorun: Some(config.tracking.autorun),
            timing: Some(timing),
        },
    )
    .context("failed to wire tracker")?;

    let session = Session {
        window,
        client,
        tracker,
    };

    tracing::info!(url = %script.url, steps = script.steps.len(), "Replaying script");

    session.window.load();
    if script.ready_on_load {
        session.client.mark_ready();
    }

    for (index, step) in script.steps.iter().enumerate() {
        tracing::debug!(index, step = step.name(), "Applying step");
        apply(&session, step)
            .await
            .with_context(|| format!("step {} ({}) failed", index + 1, step.name()))?;
    }

    tokio::time::sleep(settle_time(&timing)).await;

    Ok(ReplayReport {
        final_url: session.window.current_url(),
        history_len: session.window.history_len(),
        installed: session.tracker.is_installed(),
        pending_calls: session.tracker.pending_calls(),
        warnings: session
            .tracker
            .warnings()
            .iter()
            .map(ToString::to_string)
            .collect(),
        calls: session.client.entries(),
    })
}

async fn apply(session: &Session, step: &Step) -> Result<()> {
    let window = &session.window;
    match step {
        Step::Push { url, state, title } => {
            window.push_state(state.clone(), "", Some(url.as_str()))?;
            if let Some(title) = title {
                window.set_title(title.as_str());
            }
        }
        Step::Replace { state } => window.replace_state(state.clone())?,
        Step::Back { title } => traverse(window, -1, title.as_deref()),
        Step::Forward { title } => traverse(window, 1, title.as_deref()),
        Step::Go { delta, title } => traverse(window, *delta, title.as_deref()),
        Step::Hash { fragment } => window.navigate_hash(fragment),
        Step::Title { title } => window.set_title(title.as_str()),
        Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
        Step::Track { event, properties } => {
            session.tracker.track(event.as_str(), properties.clone())?
        }
        Step::Identify { id, traits } => session.tracker.identify(id.as_str(), traits.clone())?,
        Step::Ready => session.client.mark_ready(),
    }
    Ok(())
}

fn traverse(window: &SimulatedWindow, delta: isize, title: Option<&str>) {
    if !window.go(delta) {
        tracing::warn!(delta, "History traversal out of range, ignored");
        return;
    }
    if let Some(title) = title {
        window.set_title(title);
    }
}

fn settle_time(timing: &CaptureTiming) -> Duration {
    timing
        .virtual_delay
        .max(timing.popstate_delay)
        .max(timing.first_load_delay)
        + SETTLE_MARGIN
}

/// Render a report as one line per recorded call
pub fn render_text(report: &ReplayReport) -> String {
    let mut out = String::new();
    for entry in &report.calls {
        out.push_str(&format!("{:>6}ms  {}\n", entry.at_ms, describe(&entry.call)));
    }
    for warning in &report.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out.push_str(&format!(
        "{} call(s), {} pending, final url {} ({} history entries)\n",
        report.calls.len(),
        report.pending_calls,
        report.final_url,
        report.history_len
    ));
    out
}

fn describe(call: &RecordedCall) -> String {
    match call {
        RecordedCall::Initialize { integrations, .. } => {
            let names: Vec<&str> = integrations.keys().map(String::as_str).collect();
            format!("initialize  {}", names.join(", "))
        }
        RecordedCall::Track { event, .. } => format!("track       {event}"),
        RecordedCall::Identify { id, .. } => format!("identify    {id}"),
        RecordedCall::Page { name, properties } => format!(
            "page        {name:?} url={} referrer={}",
            text_field(properties.get("url")),
            text_field(properties.get("referrer"))
        ),
    }
}

fn text_field(value: Option<&Value>) -> &str {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.as_str(),
        _ => "-",
    }
}
