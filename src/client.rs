use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};

use crate::encoder::EncodedPayload;
use crate::errors::{Result, ScoutError};
use crate::models::{
    parse_report, report_text_from_response, AnalysisResult, ApiError, Content,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::schema::{build_prompt, response_schema, DEFAULT_NARRATIVE_LANGUAGE};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
// Inline video bodies are large; uploads and inference both take a while.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Environment variable checked first for the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Checked when [`API_KEY_ENV`] is unset.
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Anything that can turn an encoded clip into a scouting report.
///
/// [`Client`] is the real implementation; the controller only depends on
/// this trait so it can be driven by stubs.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, payload: EncodedPayload) -> Result<AnalysisResult>;
}

/// Builder for constructing a [`Client`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use goalscan::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> goalscan::Result<()> {
/// let client = ClientBuilder::new()
///     .api_key("AIza...")
///     .model("gemini-2.5-flash")
///     .narrative_language("English")
///     .timeout(Duration::from_secs(300))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Duration,
    narrative_language: String,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            narrative_language: DEFAULT_NARRATIVE_LANGUAGE.to_string(),
        }
    }

    /// Set the API key for the model service.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the base URL (defaults to `https://generativelanguage.googleapis.com/v1beta`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model name (defaults to `gemini-3-flash-preview`).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the HTTP request timeout (defaults to 120 seconds).
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Language for the title, verdict, evidence and tips (defaults to Arabic).
    pub fn narrative_language(mut self, language: impl Into<String>) -> Self {
        self.narrative_language = language.into();
        self
    }

    /// Build the [`Client`].
    ///
    /// If no API key was set via [`api_key`](Self::api_key), the builder reads
    /// `GEMINI_API_KEY`, then `API_KEY`, from the environment.
    ///
    /// Returns [`ScoutError::Configuration`] if no non-blank key is available.
    pub fn build(self) -> Result<Client> {
        let api_key = resolve_api_key(self.api_key, |name| std::env::var(name).ok())
            .ok_or_else(|| {
                ScoutError::Configuration(format!(
                    "API key is required. Pass it to ClientBuilder::api_key() \
                     or set the {API_KEY_ENV} environment variable."
                ))
            })?;

        let mut api_key = HeaderValue::from_str(api_key.trim()).map_err(|_| {
            ScoutError::Configuration("API key contains invalid characters".into())
        })?;
        api_key.set_sensitive(true);

        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        Ok(Client {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            model: self.model,
            prompt: build_prompt(&self.narrative_language),
            api_key,
            http,
        })
    }
}

/// First non-blank key among the explicit one, `GEMINI_API_KEY`, and `API_KEY`.
fn resolve_api_key(
    explicit: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let non_blank = |key: &String| !key.trim().is_empty();

    explicit
        .filter(non_blank)
        .or_else(|| env(API_KEY_ENV).filter(non_blank))
        .or_else(|| env(FALLBACK_API_KEY_ENV).filter(non_blank))
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the generative model that writes scouting reports.
///
/// Each [`analyze`](Self::analyze) call is exactly one HTTP request; there
/// are no retries. Reports are not deterministic, so the same clip may
/// score differently on repeated calls.
///
/// # Example
///
/// ```no_run
/// use goalscan::{encode, Client, VideoFile};
///
/// # async fn example() -> goalscan::Result<()> {
/// let client = Client::from_env()?;
/// let payload = encode(&VideoFile::open("screamer.mp4")).await?;
/// let report = client.analyze(payload).await?;
/// println!("{}: {}/100", report.title, report.score);
/// # Ok(())
/// # }
/// ```
pub struct Client {
    base_url: String,
    model: String,
    prompt: String,
    api_key: HeaderValue,
    http: reqwest::Client,
}

impl Client {
    /// Create a client with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().api_key(api_key).build()
    }

    /// Create a client whose API key comes from the environment.
    pub fn from_env() -> Result<Self> {
        ClientBuilder::new().build()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send an encoded clip for analysis and return the validated report.
    ///
    /// # Errors
    ///
    /// - [`ScoutError::Transport`] if the service cannot be reached.
    /// - [`ScoutError::Authentication`], [`ScoutError::RateLimit`] or
    ///   [`ScoutError::Api`] for non-success statuses. Only 5xx and 429 are
    ///   classed as transport failures; other 4xx are [`FailureKind::Rejected`](crate::FailureKind::Rejected).
    /// - [`ScoutError::ModelRefusal`] if the model declined or returned nothing.
    /// - [`ScoutError::SchemaValidation`] if the reply is not a complete,
    ///   in-range report.
    pub async fn analyze(&self, payload: EncodedPayload) -> Result<AnalysisResult> {
        tracing::debug!(
            model = %self.model,
            mime_type = %payload.mime_type,
            bytes = payload.decoded_len(),
            "requesting scouting report"
        );

        let request = self.build_request(payload);
        let response = self.generate(&request).await?;

        let text = report_text_from_response(response).inspect_err(|e| {
            tracing::warn!(model = %self.model, "model returned no report: {e}");
        })?;

        let report = parse_report(&text)?;
        tracing::info!(score = report.score, title = %report.title, "scouting report received");
        Ok(report)
    }

    fn build_request(&self, payload: EncodedPayload) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: payload.mime_type,
                            data: payload.data,
                        }),
                        ..Default::default()
                    },
                    Part {
                        text: Some(self.prompt.clone()),
                        ..Default::default()
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        }
    }

    /// Execute one generateContent call and map failure statuses to typed errors.
    async fn generate(&self, body: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| {
                ScoutError::SchemaValidation(format!("unexpected response envelope: {e}"))
            });
        }

        let status_code = status.as_u16();
        let (message, api_status) = match serde_json::from_str::<ApiError>(&text) {
            Ok(err) => (err.error.message, err.error.status),
            Err(_) => (text, None),
        };

        tracing::debug!(status_code, api_status = ?api_status, "model service rejected request");

        Err(match status_code {
            401 | 403 => ScoutError::Authentication { message },
            400 if message.contains("API key") => ScoutError::Authentication { message },
            429 => ScoutError::RateLimit { message },
            _ => ScoutError::Api {
                status_code,
                message,
            },
        })
    }
}

#[async_trait]
impl Analyzer for Client {
    async fn analyze(&self, payload: EncodedPayload) -> Result<AnalysisResult> {
        Client::analyze(self, payload).await
    }
}
