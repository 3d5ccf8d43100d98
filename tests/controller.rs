use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use goalscan::{
    AnalysisResult, AnalysisState, AnalysisStatus, Analyzer, Breakdown, ClientBuilder, Completion,
    Controller, EncodedPayload, FailureKind, ScoutError, VideoFile,
};
use serde_json::json;
use tokio::sync::Notify;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn screamer() -> AnalysisResult {
    AnalysisResult {
        score: 88.0,
        breakdown: Breakdown {
            skill: 90.0,
            accuracy: 85.0,
            difficulty: 92.0,
            aesthetics: 80.0,
        },
        title: "Top Corner Screamer".into(),
        verdict: "...".into(),
        evidence: vec!["30-yard strike".into(), "top-left corner".into()],
        tips: vec!["Try first-time shots more often".into()],
    }
}

fn mp4(len: usize) -> VideoFile {
    VideoFile::from_bytes("goal.mp4", "video/mp4", vec![0x42; len])
}

/// Answers every request with the same canned outcome.
struct StubAnalyzer<F> {
    calls: AtomicUsize,
    reply: F,
}

impl<F> StubAnalyzer<F>
where
    F: Fn() -> goalscan::Result<AnalysisResult> + Send + Sync,
{
    fn new(reply: F) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> Analyzer for StubAnalyzer<F>
where
    F: Fn() -> goalscan::Result<AnalysisResult> + Send + Sync,
{
    async fn analyze(&self, payload: EncodedPayload) -> goalscan::Result<AnalysisResult> {
        assert!(payload.mime_type.starts_with("video/"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)()
    }
}

/// Signals `entered` on each call, then blocks until `gate` is released.
struct GatedAnalyzer {
    entered: Notify,
    gate: Notify,
}

impl GatedAnalyzer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            gate: Notify::new(),
        })
    }
}

#[async_trait]
impl Analyzer for GatedAnalyzer {
    async fn analyze(&self, _payload: EncodedPayload) -> goalscan::Result<AnalysisResult> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(screamer())
    }
}

#[tokio::test]
async fn video_selection_goes_loading_then_success() {
    let analyzer = StubAnalyzer::new(|| Ok(screamer()));
    let mut controller = Controller::new(analyzer.clone());
    assert_eq!(controller.status(), AnalysisStatus::Idle);

    let task = controller.select_file(mp4(5 * 1024 * 1024)).unwrap();
    assert_eq!(controller.status(), AnalysisStatus::Loading);
    assert!(controller.result().is_none());
    assert!(controller.preview().is_some());

    assert!(controller.complete(task.run().await));

    assert_eq!(controller.status(), AnalysisStatus::Success);
    assert_eq!(controller.result(), Some(&screamer()));
    assert!(controller.error_message().is_none());
    let preview = controller.preview().unwrap();
    assert!(controller.previews().is_live(preview.id()));
    assert_eq!(preview.file().name, "goal.mp4");
    assert_eq!(analyzer.calls(), 1);
}

#[tokio::test]
async fn non_video_is_rejected_without_calling_the_model() {
    let analyzer = StubAnalyzer::new(|| Ok(screamer()));
    let mut controller = Controller::new(analyzer.clone());

    let err = controller
        .select_file(VideoFile::from_bytes("shot.png", "image/png", vec![0x89, b'P', b'N', b'G']))
        .err()
        .unwrap();

    assert!(matches!(err, ScoutError::Validation(_)));
    assert_eq!(controller.status(), AnalysisStatus::Idle);
    assert_eq!(controller.validation_message(), Some("Please upload a valid video file."));
    assert!(controller.preview().is_none());
    assert_eq!(controller.previews().live_count(), 0);
    assert_eq!(analyzer.calls(), 0);

    // The next good selection clears the inline message.
    let _task = controller.select_file(mp4(16)).unwrap();
    assert!(controller.validation_message().is_none());
}

#[tokio::test]
async fn transport_failure_ends_in_error_without_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let client = ClientBuilder::new()
        .api_key("test-key")
        .base_url(server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let mut controller = Controller::new(Arc::new(client));

    let status = controller.process(mp4(1024)).await.unwrap();

    assert_eq!(status, AnalysisStatus::Error);
    assert_eq!(controller.failure_kind(), Some(FailureKind::Transport));
    assert!(controller.error_message().unwrap().contains("try again"));
    assert!(controller.result().is_none());
}

#[tokio::test]
async fn unparseable_reply_ends_in_error_without_leaking_text() {
    let raw = "<<sorry, cannot comply: internal-token-123>>";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": raw }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = ClientBuilder::new()
        .api_key("test-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    let mut controller = Controller::new(Arc::new(client));

    controller.process(mp4(1024)).await.unwrap();

    assert_eq!(controller.status(), AnalysisStatus::Error);
    assert_eq!(controller.failure_kind(), Some(FailureKind::SchemaValidation));
    let message = controller.error_message().unwrap();
    assert!(!message.contains("internal-token-123"));
    assert!(!message.contains("sorry"));
    assert!(controller.result().is_none());
}

#[tokio::test]
async fn unreadable_file_ends_in_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = StubAnalyzer::new(|| Ok(screamer()));
    let mut controller = Controller::new(analyzer.clone());

    controller
        .process(VideoFile::open(dir.path().join("deleted.mp4")))
        .await
        .unwrap();

    assert_eq!(controller.status(), AnalysisStatus::Error);
    assert_eq!(controller.failure_kind(), Some(FailureKind::Io));
    assert!(controller.error_message().unwrap().contains("Could not read"));
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn configuration_failure_is_reported() {
    let analyzer = StubAnalyzer::new(|| Err(ScoutError::Configuration("no key".into())));
    let mut controller = Controller::new(analyzer);

    controller.process(mp4(8)).await.unwrap();

    assert_eq!(controller.failure_kind(), Some(FailureKind::Configuration));
    assert!(controller.error_message().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn reset_returns_to_idle_and_releases_preview() {
    let mut controller = Controller::new(StubAnalyzer::new(|| Ok(screamer())));
    controller.process(mp4(32)).await.unwrap();
    let id = controller.preview().unwrap().id();

    controller.reset();

    assert_eq!(controller.status(), AnalysisStatus::Idle);
    assert!(controller.result().is_none());
    assert!(controller.error_message().is_none());
    assert!(controller.preview().is_none());
    assert!(!controller.previews().is_live(id));
    assert_eq!(controller.previews().live_count(), 0);

    let mut controller = Controller::new(StubAnalyzer::new(|| {
        Err(ScoutError::ModelRefusal("nope".into()))
    }));
    controller.process(mp4(32)).await.unwrap();
    assert_eq!(controller.status(), AnalysisStatus::Error);
    controller.reset();
    assert_eq!(controller.status(), AnalysisStatus::Idle);
    assert!(controller.error_message().is_none());
    assert_eq!(controller.previews().live_count(), 0);
}

#[tokio::test]
async fn new_selection_replaces_previous_preview() {
    let mut controller = Controller::new(StubAnalyzer::new(|| Ok(screamer())));
    controller.process(mp4(32)).await.unwrap();
    let first = controller.preview().unwrap().id();

    let task = controller.select_file(mp4(64)).unwrap();
    let second = controller.preview().unwrap().id();

    assert_ne!(first, second);
    assert!(!controller.previews().is_live(first));
    assert!(controller.previews().is_live(second));
    assert_eq!(controller.previews().live_count(), 1);
    assert!(controller.result().is_none());

    controller.complete(task.run().await);
    assert_eq!(controller.status(), AnalysisStatus::Success);
}

#[tokio::test]
async fn selection_while_loading_is_rejected() {
    let analyzer = GatedAnalyzer::new();
    let mut controller = Controller::new(analyzer.clone());

    let task = controller.select_file(mp4(16)).unwrap();
    let request_id = task.request_id();
    let preview = controller.preview().unwrap().id();

    let err = controller.select_file(mp4(32)).err().unwrap();
    assert!(matches!(err, ScoutError::Busy));
    assert!(controller.validation_message().is_some());
    match controller.state() {
        AnalysisState::Loading { request_id: current, .. } => assert_eq!(*current, request_id),
        other => panic!("expected loading, got {other:?}"),
    }
    assert_eq!(controller.preview().unwrap().id(), preview);

    let running = tokio::spawn(task.run());
    analyzer.gate.notify_one();
    assert!(controller.complete(running.await.unwrap()));
    assert_eq!(controller.status(), AnalysisStatus::Success);
}

#[tokio::test]
async fn reset_cancels_in_flight_request_and_drops_late_result() {
    let analyzer = GatedAnalyzer::new();
    let mut controller = Controller::new(analyzer.clone());

    let task = controller.select_file(mp4(16)).unwrap();
    let running = tokio::spawn(task.run());

    controller.reset();
    assert_eq!(controller.status(), AnalysisStatus::Idle);
    assert_eq!(controller.previews().live_count(), 0);

    let completion = running.await.unwrap();
    assert!(matches!(completion.outcome, Err(ScoutError::Cancelled)));
    assert!(!controller.complete(completion));
    assert_eq!(controller.status(), AnalysisStatus::Idle);
}

#[tokio::test]
async fn reset_during_model_call_cancels_it() {
    let analyzer = GatedAnalyzer::new();
    let mut controller = Controller::new(analyzer.clone());

    let task = controller.select_file(mp4(16)).unwrap();
    let running = tokio::spawn(task.run());

    // Wait until the task is parked inside the model call.
    analyzer.entered.notified().await;
    controller.reset();

    let completion = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cancelled task should finish without the gate opening")
        .unwrap();
    assert!(matches!(completion.outcome, Err(ScoutError::Cancelled)));
    assert!(!controller.complete(completion));
    assert_eq!(controller.status(), AnalysisStatus::Idle);
    assert!(controller.result().is_none());
    assert_eq!(controller.previews().live_count(), 0);
}

#[tokio::test]
async fn stale_success_is_ignored() {
    let mut controller = Controller::new(StubAnalyzer::new(|| Ok(screamer())));
    let stale = controller.select_file(mp4(16)).unwrap().request_id();
    controller.reset();

    let applied = controller.complete(Completion {
        request_id: stale,
        outcome: Ok(screamer()),
    });

    assert!(!applied);
    assert_eq!(controller.status(), AnalysisStatus::Idle);
    assert!(controller.result().is_none());

    // A completion for the old request must not land on a newer one either.
    let _current = controller.select_file(mp4(16)).unwrap();
    assert!(!controller.complete(Completion {
        request_id: stale,
        outcome: Ok(screamer()),
    }));
    assert_eq!(controller.status(), AnalysisStatus::Loading);
}
