//! The state machine a UI drives to get a scouting report.
//!
//! ```text
//! Idle --select_file--> Loading --complete--> Success | Error --reset--> Idle
//! ```
//!
//! [`Controller::select_file`] moves to `Loading` and hands back an
//! [`AnalysisTask`]. The caller runs the task wherever it likes (inline or on
//! a spawned task) and feeds the [`Completion`] back through
//! [`Controller::complete`]. Only one request may be in flight; completions
//! for a request that is no longer current are dropped.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use uuid::Uuid;

use crate::client::Analyzer;
use crate::encoder::{encode, VideoFile};
use crate::errors::{FailureKind, Result, ScoutError, INVALID_VIDEO_MESSAGE};
use crate::models::AnalysisResult;

/// Which state the controller is in, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Current state. Each variant carries only what is valid in it.
#[derive(Debug)]
pub enum AnalysisState {
    Idle,
    Loading {
        request_id: u64,
        preview: PreviewHandle,
    },
    Success {
        result: AnalysisResult,
        preview: PreviewHandle,
    },
    Error {
        /// Safe to display; never contains model output.
        message: String,
        kind: FailureKind,
        preview: PreviewHandle,
    },
}

impl AnalysisState {
    pub fn status(&self) -> AnalysisStatus {
        match self {
            AnalysisState::Idle => AnalysisStatus::Idle,
            AnalysisState::Loading { .. } => AnalysisStatus::Loading,
            AnalysisState::Success { .. } => AnalysisStatus::Success,
            AnalysisState::Error { .. } => AnalysisStatus::Error,
        }
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        match self {
            AnalysisState::Idle => None,
            AnalysisState::Loading { preview, .. }
            | AnalysisState::Success { preview, .. }
            | AnalysisState::Error { preview, .. } => Some(preview),
        }
    }
}

// ---------------------------------------------------------------------------
// Preview handles
// ---------------------------------------------------------------------------

/// Issues preview handles for selected clips and tracks which are live.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: Mutex<HashSet<Uuid>>,
}

impl PreviewRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn acquire(self: &Arc<Self>, file: Arc<VideoFile>) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.lock().insert(id);
        tracing::debug!(%id, file = %file.name, "preview acquired");
        PreviewHandle {
            id,
            file,
            registry: Arc::clone(self),
        }
    }

    pub fn is_live(&self, id: Uuid) -> bool {
        self.lock().contains(&id)
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, id: Uuid) {
        if self.lock().remove(&id) {
            tracing::debug!(%id, "preview released");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A renderable reference to the clip being shown.
///
/// Released when dropped, so it is released exactly once and cannot be used
/// afterwards.
pub struct PreviewHandle {
    id: Uuid,
    file: Arc<VideoFile>,
    registry: Arc<PreviewRegistry>,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> String {
        format!("blob:goalscan/{}", self.id)
    }

    pub fn file(&self) -> &VideoFile {
        &self.file
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("file", &self.file.name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    /// Resolves once cancellation is signalled or the controller is gone.
    async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

/// One in-flight analysis: read, encode, analyze.
pub struct AnalysisTask {
    request_id: u64,
    file: Arc<VideoFile>,
    analyzer: Arc<dyn Analyzer>,
    cancel: CancelToken,
}

impl AnalysisTask {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Run the pipeline. Cancellation is checked at the file read and at the
    /// model call; a cancelled task yields [`ScoutError::Cancelled`].
    pub async fn run(self) -> Completion {
        let AnalysisTask {
            request_id,
            file,
            analyzer,
            mut cancel,
        } = self;

        let outcome = execute(&file, analyzer.as_ref(), &mut cancel).await;
        Completion {
            request_id,
            outcome,
        }
    }
}

async fn execute(
    file: &VideoFile,
    analyzer: &dyn Analyzer,
    cancel: &mut CancelToken,
) -> Result<AnalysisResult> {
    let payload = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ScoutError::Cancelled),
        payload = encode(file) => payload?,
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScoutError::Cancelled),
        report = analyzer.analyze(payload) => report,
    }
}

/// The outcome of an [`AnalysisTask`], tagged with the request it belongs to.
#[derive(Debug)]
pub struct Completion {
    pub request_id: u64,
    pub outcome: Result<AnalysisResult>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Sequences file selection, analysis, and reset for a single user.
pub struct Controller {
    analyzer: Arc<dyn Analyzer>,
    previews: Arc<PreviewRegistry>,
    state: AnalysisState,
    validation_message: Option<String>,
    last_request_id: u64,
    cancel: Option<watch::Sender<bool>>,
}

impl Controller {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            previews: PreviewRegistry::new(),
            state: AnalysisState::Idle,
            validation_message: None,
            last_request_id: 0,
            cancel: None,
        }
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn status(&self) -> AnalysisStatus {
        self.state.status()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            AnalysisState::Success { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.state.preview()
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            AnalysisState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.state {
            AnalysisState::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Inline message for the upload surface after a rejected selection.
    pub fn validation_message(&self) -> Option<&str> {
        self.validation_message.as_deref()
    }

    pub fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.previews
    }

    /// Accept a clip and move to `Loading`.
    ///
    /// Rejected without any state change if the file is not declared as
    /// `video/*` ([`ScoutError::Validation`]) or another analysis is still
    /// running ([`ScoutError::Busy`]). Selecting from `Success` or `Error`
    /// replaces the previous report.
    pub fn select_file(&mut self, file: VideoFile) -> Result<AnalysisTask> {
        if let AnalysisState::Loading { request_id, .. } = &self.state {
            tracing::warn!(request_id, file = %file.name, "selection rejected: analysis in flight");
            self.validation_message = Some(ScoutError::Busy.user_message().to_string());
            return Err(ScoutError::Busy);
        }

        if !file.is_video() {
            tracing::warn!(file = %file.name, media_type = %file.media_type, "selection rejected: not a video");
            self.validation_message = Some(INVALID_VIDEO_MESSAGE.to_string());
            return Err(ScoutError::Validation(format!(
                "`{}` has media type `{}`",
                file.name, file.media_type
            )));
        }

        self.validation_message = None;
        // Drop the old preview before taking a new one.
        self.state = AnalysisState::Idle;

        let file = Arc::new(file);
        let preview = self.previews.acquire(Arc::clone(&file));

        self.last_request_id += 1;
        let request_id = self.last_request_id;
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(tx);
        self.state = AnalysisState::Loading {
            request_id,
            preview,
        };

        tracing::info!(request_id, file = %file.name, media_type = %file.media_type, "analysis started");

        Ok(AnalysisTask {
            request_id,
            file,
            analyzer: Arc::clone(&self.analyzer),
            cancel: CancelToken(rx),
        })
    }

    /// Apply a finished task. Returns `false` if it belonged to a request
    /// that is no longer current, in which case nothing changes.
    pub fn complete(&mut self, completion: Completion) -> bool {
        let preview = match std::mem::replace(&mut self.state, AnalysisState::Idle) {
            AnalysisState::Loading {
                request_id,
                preview,
            } if request_id == completion.request_id => preview,
            other => {
                self.state = other;
                tracing::warn!(
                    request_id = completion.request_id,
                    "discarding completion for a request that is no longer current"
                );
                return false;
            }
        };

        self.cancel = None;
        self.state = match completion.outcome {
            Ok(result) => {
                tracing::info!(
                    request_id = completion.request_id,
                    score = result.score,
                    "analysis succeeded"
                );
                AnalysisState::Success { result, preview }
            }
            Err(err) => {
                tracing::error!(request_id = completion.request_id, error = %err, "analysis failed");
                AnalysisState::Error {
                    message: err.user_message().to_string(),
                    kind: err.kind(),
                    preview,
                }
            }
        };
        true
    }

    /// Return to `Idle`, releasing the preview and clearing any report or
    /// error. An in-flight request is cancelled and its completion ignored.
    pub fn reset(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.send_replace(true);
            tracing::info!(request_id = self.last_request_id, "in-flight analysis cancelled");
        }
        self.validation_message = None;
        self.state = AnalysisState::Idle;
    }

    /// Select, run, and complete in one go.
    ///
    /// Returns the resulting status; only selection failures are errors.
    pub async fn process(&mut self, file: VideoFile) -> Result<AnalysisStatus> {
        let task = self.select_file(file)?;
        let completion = task.run().await;
        self.complete(completion);
        Ok(self.status())
    }
}
