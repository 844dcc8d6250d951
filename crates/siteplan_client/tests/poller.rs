use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use siteplan_client::{
    start_poll, ChannelUpdateSink, ClientSettings, ErrorKind, IdentityContext, PollEvent,
    PollOptions, RemoteClient, RequestError, StatusSource,
};
use siteplan_core::{ImportResult, ImportState, ImportStatus};

fn running() -> ImportStatus {
    ImportStatus {
        import_id: "imp-1".to_string(),
        state: ImportState::Running,
        requested_at: "2026-08-01T09:00:00Z".to_string(),
        completed_at: None,
        result: None,
        error: None,
    }
}

fn completed(units: &[&str]) -> ImportStatus {
    ImportStatus {
        import_id: "imp-1".to_string(),
        state: ImportState::Completed,
        requested_at: "2026-08-01T09:00:00Z".to_string(),
        completed_at: Some("2026-08-01T09:00:02Z".to_string()),
        result: Some(ImportResult {
            detected_units: units.iter().map(|u| u.to_string()).collect(),
        }),
        error: None,
    }
}

/// Serves a scripted list of responses, then keeps reporting `running`.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<ImportStatus, RequestError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Vec<Result<ImportStatus, RequestError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self, _import_id: &str) -> Result<ImportStatus, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(running()))
    }
}

/// Collects every event until the session ends and the sink is dropped.
async fn drain(rx: mpsc::Receiver<PollEvent>) -> Vec<PollEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(mpsc::TryRecvError::Empty) => tokio::time::sleep(Duration::from_millis(5)).await,
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
    }
    events
}

#[tokio::test]
async fn delivers_running_then_completed_with_detected_units() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(running()),
        Ok(completed(&["01-01"])),
    ]));
    let (tx, rx) = mpsc::channel();

    start_poll(
        source.clone(),
        "imp-1",
        PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(100),
        },
        Arc::new(ChannelUpdateSink::new(tx)),
    );

    let events = drain(rx).await;
    assert!(events.len() >= 2, "expected at least two updates, got {events:?}");
    assert_eq!(events[0], PollEvent::Status(running()));
    assert_eq!(
        events.last(),
        Some(&PollEvent::Status(completed(&["01-01"])))
    );
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn transient_failures_do_not_end_the_session() {
    let source = Arc::new(ScriptedSource::new(vec![
        Err(RequestError {
            kind: ErrorKind::Unreachable,
            message: "connection refused".to_string(),
        }),
        Ok(running()),
        Ok(completed(&["01-01", "01-02"])),
    ]));
    let (tx, rx) = mpsc::channel();

    start_poll(
        source.clone(),
        "imp-1",
        PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(200),
        },
        Arc::new(ChannelUpdateSink::new(tx)),
    );

    let events = drain(rx).await;
    assert_eq!(
        events,
        vec![
            PollEvent::Status(running()),
            PollEvent::Status(completed(&["01-01", "01-02"])),
        ]
    );
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn times_out_while_the_job_is_still_running() {
    let source = Arc::new(ScriptedSource::new(Vec::new()));
    let (tx, rx) = mpsc::channel();

    start_poll(
        source.clone(),
        "imp-1",
        PollOptions {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(60),
        },
        Arc::new(ChannelUpdateSink::new(tx)),
    );

    let events = drain(rx).await;
    assert!(events.len() >= 2, "expected updates before the timeout, got {events:?}");
    assert_eq!(events.last(), Some(&PollEvent::TimedOut));
    assert!(events[..events.len() - 1]
        .iter()
        .all(|event| *event == PollEvent::Status(running())));
}

#[tokio::test]
async fn the_deadline_cuts_off_a_poll_still_in_flight() {
    // First call answers immediately; every later call takes longer than
    // the remaining session time, so a completion exists but arrives late.
    struct SlowSecondCall {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatusSource for SlowSecondCall {
        async fn fetch_status(&self, _import_id: &str) -> Result<ImportStatus, RequestError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(running())
            } else {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(completed(&["01-01"]))
            }
        }
    }

    let (tx, rx) = mpsc::channel();
    start_poll(
        Arc::new(SlowSecondCall {
            calls: AtomicUsize::new(0),
        }),
        "imp-1",
        PollOptions {
            interval: Duration::from_millis(20),
            timeout: Duration::from_millis(50),
        },
        Arc::new(ChannelUpdateSink::new(tx)),
    );

    let events = drain(rx).await;
    assert_eq!(
        events,
        vec![PollEvent::Status(running()), PollEvent::TimedOut]
    );
}

#[tokio::test]
async fn cancel_stops_updates_and_is_idempotent() {
    let source = Arc::new(ScriptedSource::new(Vec::new()));
    let (tx, rx) = mpsc::channel();

    let handle = start_poll(
        source.clone(),
        "imp-1",
        PollOptions {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(10),
        },
        Arc::new(ChannelUpdateSink::new(tx)),
    );

    tokio::time::sleep(Duration::from_millis(25)).await;
    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());

    // Give the session time to wind down, then flush what was delivered
    // before the cancellation took effect.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let delivered = drain(rx).await;
    assert!(delivered
        .iter()
        .all(|event| *event == PollEvent::Status(running())));

    // Nothing else ever arrives.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(source.calls() <= 4);
}

#[tokio::test]
async fn remote_client_maps_the_wire_status_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/imports/imp-9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "requested_at": "2026-08-01T09:00:00Z",
            "completed_at": "2026-08-01T09:00:02Z",
            "result": { "detected_units": ["01-01", "01-02"] },
            "job_id": "imp-9",
        })))
        .mount(&server)
        .await;

    let settings = ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    };
    let client = RemoteClient::new(settings, IdentityContext::default()).expect("client builds");

    let (tx, rx) = mpsc::channel();
    start_poll(
        Arc::new(client),
        "imp-9",
        PollOptions::default(),
        Arc::new(ChannelUpdateSink::new(tx)),
    );

    let events = drain(rx).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        PollEvent::Status(status) => {
            assert_eq!(status.import_id, "imp-9");
            assert_eq!(status.state, ImportState::Completed);
            assert_eq!(
                status.result.as_ref().map(|r| r.detected_units.clone()),
                Some(vec!["01-01".to_string(), "01-02".to_string()])
            );
        }
        other => panic!("expected a status update, got {other:?}"),
    }
}
