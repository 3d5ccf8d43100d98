use thiserror::Error;

/// All errors that can occur while producing a scouting report.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// The selected file is not something we can analyze (e.g. not a video).
    #[error("invalid selection: {0}")]
    Validation(String),

    /// A file was selected while another analysis is still in flight.
    #[error("an analysis is already in progress")]
    Busy,

    /// The video could not be read into memory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A transport-level HTTP error from reqwest (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API key was rejected (HTTP 401/403).
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The model service is throttling us (HTTP 429).
    #[error("rate limited: {message}")]
    RateLimit { message: String },

    /// Any other non-success HTTP status.
    #[error("API error {status_code}: {message}")]
    Api { status_code: u16, message: String },

    /// The model declined the request or produced no content.
    #[error("model returned no report: {0}")]
    ModelRefusal(String),

    /// The model's reply is not a valid scouting report.
    #[error("invalid report: {0}")]
    SchemaValidation(String),

    /// The client is missing required configuration (e.g. the API key).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request was cancelled before it completed.
    #[error("analysis cancelled")]
    Cancelled,
}

/// A convenience alias for `Result<T, ScoutError>`.
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Coarse failure categories used to pick what the user is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    Io,
    Transport,
    /// The service refused this particular request (4xx); retrying won't help.
    Rejected,
    ModelRefusal,
    SchemaValidation,
    Configuration,
    Cancelled,
}

pub(crate) const INVALID_VIDEO_MESSAGE: &str = "Please upload a valid video file.";

impl ScoutError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScoutError::Validation(_) | ScoutError::Busy => FailureKind::Validation,
            ScoutError::Io(_) => FailureKind::Io,
            ScoutError::Transport(_) | ScoutError::RateLimit { .. } => FailureKind::Transport,
            ScoutError::Api { status_code, .. } if *status_code >= 500 => FailureKind::Transport,
            ScoutError::Api { .. } => FailureKind::Rejected,
            ScoutError::ModelRefusal(_) => FailureKind::ModelRefusal,
            ScoutError::SchemaValidation(_) => FailureKind::SchemaValidation,
            ScoutError::Authentication { .. } | ScoutError::Configuration(_) => {
                FailureKind::Configuration
            }
            ScoutError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Text safe to show the end user.
    ///
    /// Never includes response bodies or model output; those stay in the
    /// `Display` impl and in logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            ScoutError::Busy => "Your previous clip is still being analyzed. Please wait.",
            _ => match self.kind() {
                FailureKind::Validation => INVALID_VIDEO_MESSAGE,
                FailureKind::Io => "Could not read the video file. Please try another clip.",
                FailureKind::Transport => {
                    "Could not reach the analysis service. Check your connection and try again."
                }
                FailureKind::Rejected
                | FailureKind::ModelRefusal
                | FailureKind::SchemaValidation => {
                    "The AI scout could not analyze this clip. Please try again or upload a different video."
                }
                FailureKind::Configuration => {
                    "The analysis service is not configured. Set the GEMINI_API_KEY environment variable."
                }
                FailureKind::Cancelled => "The analysis was cancelled.",
            },
        }
    }
}
