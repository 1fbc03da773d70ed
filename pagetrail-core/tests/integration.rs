//! Integration tests for the navigation tracker
//!
//! These tests drive a `SimulatedWindow` through `init`, the startup signal
//! and a series of navigations, and check what reaches a `RecordingClient`.

use std::sync::Arc;
use std::time::Duration;

use pagetrail_core::collaborator::RecordedCall;
use pagetrail_core::{
    init, BrowserWindow, Collaborator, ConfigurationWarning, Error, InitOptions, NavigationState,
    Properties, RecordingClient, SimulatedWindow, Tracker,
};
use serde_json::{json, Value};

struct Session {
    window: Arc<SimulatedWindow>,
    client: Arc<RecordingClient>,
    tracker: Tracker,
}

fn start(url: &str, title: &str, referrer: &str) -> Session {
    pagetrail_core::logging::init_test();

    let window = Arc::new(
        SimulatedWindow::new(url)
            .expect("valid url")
            .with_title(title)
            .with_referrer(referrer),
    );
    let client = Arc::new(RecordingClient::new());
    let tracker = init(
        window.clone(),
        InitOptions {
            analytics: Some(Collaborator::from_client(client.clone())),
            integrations: Some(json!({ "Google Analytics": { "trackingId": "UA-1" } })),
            ..Default::default()
        },
    )
    .expect("init should succeed");

    Session {
        window,
        client,
        tracker,
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn page(props: &Properties) -> Value {
    Value::Object(props.clone())
}

// ============================================
// End-to-end navigation
// ============================================

#[tokio::test(start_paused = true)]
async fn test_first_load_push_and_back() {
    let s = start("https://ex.com/a?x=1", "Page A", "https://ref.com/");
    s.client.mark_ready();

    assert!(s.window.load());
    advance(5).await;

    s.window.push_state(None, "", Some("/b")).unwrap();
    s.window.set_title("Page B");
    advance(5).await;

    assert!(s.window.back());
    s.window.set_title("Page A");
    advance(20).await;
    assert_eq!(s.client.pages().len(), 2, "back/forward capture waits 50ms");
    advance(40).await;

    let pages = s.client.pages();
    assert_eq!(pages.len(), 3);
    assert_eq!(
        page(&pages[0]),
        json!({
            "title": "Page A",
            "referrer": "https://ref.com/",
            "path": "/a",
            "search": "?x=1",
            "url": "https://ex.com/a?x=1",
        })
    );
    assert_eq!(
        page(&pages[1]),
        json!({
            "title": "Page B",
            "referrer": "https://ex.com/a?x=1",
            "path": "/b",
            "search": "",
            "url": "https://ex.com/b",
        })
    );
    // Back/forward reports the referrer stored in the entry navigated to, not
    // the URL just left. First load stored document.referrer in the landing
    // entry, so going back to /a reports https://ref.com/.
    assert_eq!(
        page(&pages[2]),
        json!({
            "title": "Page A",
            "referrer": "https://ref.com/",
            "path": "/a",
            "search": "?x=1",
            "url": "https://ex.com/a?x=1",
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_page_name_is_title() {
    let s = start("https://ex.com/", "Landing", "");
    s.client.mark_ready();
    s.window.load();
    advance(5).await;

    let calls = s.client.calls();
    assert!(matches!(calls.last(), Some(RecordedCall::Page { name, .. }) if name == "Landing"));
}

#[tokio::test(start_paused = true)]
async fn test_forward_replays_stored_referrer() {
    let s = start("https://ex.com/a", "A", "");
    s.client.mark_ready();
    s.window.load();
    advance(5).await;

    s.window.push_state(None, "", Some("/b")).unwrap();
    s.window.push_state(None, "", Some("/c")).unwrap();
    advance(5).await;

    assert!(s.window.back());
    advance(60).await;
    assert!(s.window.forward());
    advance(60).await;

    let referrers: Vec<Value> = s
        .client
        .pages()
        .iter()
        .map(|p| p["referrer"].clone())
        .collect();
    assert_eq!(
        referrers,
        vec![
            json!(""),
            json!("https://ex.com/a"),
            json!("https://ex.com/b"),
            // back to /b: the entry stored /a as its referrer
            json!("https://ex.com/a"),
            // forward to /c: the entry stored /b
            json!("https://ex.com/b"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_app_state_survives_tracking() {
    let s = start("https://ex.com/a", "A", "https://ref.com/");
    s.client.mark_ready();
    s.window.load();

    s.window
        .push_state(Some(json!({ "modal": "open", "scroll": 300 })), "", Some("/b"))
        .unwrap();
    let stored = s.window.history_state();
    assert_eq!(
        stored,
        Some(json!({ "modal": "open", "scroll": 300, "referrer": "https://ex.com/a" }))
    );
    assert_eq!(
        NavigationState::stored_referrer(stored.as_ref()),
        "https://ex.com/a"
    );
}

#[tokio::test(start_paused = true)]
async fn test_hash_change_reports_empty_referrer() {
    let s = start("https://ex.com/a", "A", "");
    s.client.mark_ready();
    s.window.load();
    advance(5).await;

    s.window.navigate_hash("details");
    advance(60).await;

    let pages = s.client.pages();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1]["referrer"], json!(""));
    assert_eq!(pages[1]["url"], json!("https://ex.com/a#details"));
}

// ============================================
// Readiness
// ============================================

#[tokio::test(start_paused = true)]
async fn test_calls_before_ready_replay_in_order() {
    let s = start("https://ex.com/a", "A", "");
    s.window.load();
    s.tracker.track("Signed Up", Properties::new()).unwrap();
    s.tracker.identify("user-42", Properties::new()).unwrap();
    advance(5).await;

    s.window.push_state(None, "", Some("/b")).unwrap();
    advance(5).await;
    s.tracker.track("Viewed Pricing", Properties::new()).unwrap();

    // Only initialize went straight through.
    assert_eq!(s.client.calls().len(), 1);
    assert_eq!(s.tracker.pending_calls(), 5);
    assert_eq!(s.client.ready_registrations(), 1);

    s.client.mark_ready();

    let calls = s.client.calls();
    assert_eq!(calls.len(), 6);
    assert!(matches!(calls[0], RecordedCall::Initialize { .. }));
    assert!(matches!(calls[1], RecordedCall::Track { ref event, .. } if event == "Signed Up"));
    assert!(matches!(calls[2], RecordedCall::Identify { ref id, .. } if id == "user-42"));
    assert!(matches!(calls[3], RecordedCall::Page { ref name, .. } if name == "A"));
    assert!(matches!(calls[4], RecordedCall::Page { ref properties, .. } if properties["path"] == json!("/b")));
    assert!(matches!(calls[5], RecordedCall::Track { ref event, .. } if event == "Viewed Pricing"));
    assert_eq!(s.tracker.pending_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_calls_after_ready_are_immediate() {
    let s = start("https://ex.com/a", "A", "");
    s.client.mark_ready();

    for i in 0..3 {
        s.tracker.track(format!("event-{i}"), Properties::new()).unwrap();
    }
    assert_eq!(
        s.client.tracked_events(),
        vec!["event-0", "event-1", "event-2"]
    );
}

// ============================================
// Entry point and bootstrap
// ============================================

#[test]
fn test_guard_rejects_missing_analytics() {
    let window = Arc::new(SimulatedWindow::new("https://ex.com/").unwrap());
    let err = init(window, InitOptions::default()).err().unwrap();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_guard_names_missing_operations() {
    let window = Arc::new(SimulatedWindow::new("https://ex.com/").unwrap());
    let err = init(
        window.clone(),
        InitOptions {
            analytics: Some(Collaborator::new().with_track(|_, _| {})),
            integrations: Some(json!({ "a": 1 })),
            ..Default::default()
        },
    )
    .err()
    .unwrap();

    assert_eq!(
        err.to_string(),
        "analytics client is missing required operations: ready, page, identify"
    );
    assert!(window.analytics().is_none());
    assert!(window.startup_handler().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_empty_integrations_do_nothing_on_load() {
    let window = Arc::new(SimulatedWindow::new("https://ex.com/a").unwrap());
    let client = Arc::new(RecordingClient::new());
    client.mark_ready();
    let tracker = init(
        window.clone(),
        InitOptions {
            analytics: Some(Collaborator::from_client(client.clone())),
            integrations: Some(json!({})),
            ..Default::default()
        },
    )
    .unwrap();

    window.load();
    window.push_state(None, "", Some("/b")).unwrap();
    advance(60).await;

    assert_eq!(tracker.warnings(), vec![ConfigurationWarning::NoIntegrations]);
    assert!(client.calls().is_empty());
    assert!(!tracker.is_installed());
    assert_eq!(window.history_state(), None);
}

#[tokio::test(start_paused = true)]
async fn test_autorun_false_skips_tracking() {
    let window = Arc::new(SimulatedWindow::new("https://ex.com/a").unwrap());
    let client = Arc::new(RecordingClient::new());
    client.mark_ready();
    let tracker = init(
        window.clone(),
        InitOptions {
            analytics: Some(Collaborator::from_client(client.clone())),
            integrations: Some(json!({ "Segment.io": {} })),
            autorun: Some(false),
            ..Default::default()
        },
    )
    .unwrap();

    window.load();
    advance(60).await;

    assert_eq!(client.calls().len(), 1);
    assert!(!tracker.is_installed());
}

#[tokio::test(start_paused = true)]
async fn test_prior_startup_handler_still_runs() {
    let window = Arc::new(SimulatedWindow::new("https://ex.com/a").unwrap());
    let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    window.set_startup_handler(Arc::new(move |_event: &pagetrail_core::browser::LoadEvent| {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }));

    let client = Arc::new(RecordingClient::new());
    let tracker = init(
        window.clone(),
        InitOptions {
            analytics: Some(Collaborator::from_client(client.clone())),
            integrations: Some(json!({ "a": {} })),
            ..Default::default()
        },
    )
    .unwrap();

    window.load();
    assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    assert!(tracker.is_installed());
}
