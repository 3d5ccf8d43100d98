use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScoutError};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Per-category scores, each in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Breakdown {
    /// Dribbling, passing, timing.
    pub skill: f64,
    /// Finishing accuracy and power.
    pub accuracy: f64,
    /// Distance, angle, pressure.
    pub difficulty: f64,
    /// Visual flair.
    pub aesthetics: f64,
}

impl Breakdown {
    /// The four categories in display order.
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("skill", self.skill),
            ("accuracy", self.accuracy),
            ("difficulty", self.difficulty),
            ("aesthetics", self.aesthetics),
        ]
    }
}

/// A scouting report for one clip.
///
/// Every field is required; a reply missing any of them is rejected as a
/// whole rather than surfaced as a partial report.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisResult {
    /// Overall score in `[0, 100]`.
    pub score: f64,
    pub breakdown: Breakdown,
    /// Catchy headline for the clip.
    pub title: String,
    /// Long-form scouting narrative, in the configured narrative language.
    pub verdict: String,
    /// Concrete moments from the clip backing the score, in order.
    pub evidence: Vec<String>,
    /// Improvement suggestions, in order.
    pub tips: Vec<String>,
}

impl AnalysisResult {
    /// Check every score lies in `[0, 100]`.
    pub fn validate(&self) -> Result<()> {
        check_range("score", self.score)?;
        for (name, value) in self.breakdown.entries() {
            check_range(name, value)?;
        }
        Ok(())
    }

    pub fn tier(&self) -> ScoreTier {
        ScoreTier::from_score(self.score)
    }
}

fn check_range(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&value) {
        Ok(())
    } else {
        Err(ScoutError::SchemaValidation(format!(
            "{field} {value} is outside [{MIN_SCORE}, {MAX_SCORE}]"
        )))
    }
}

/// Parse the model's JSON reply into a validated report.
pub fn parse_report(text: &str) -> Result<AnalysisResult> {
    let report: AnalysisResult = serde_json::from_str(text.trim())
        .map_err(|e| ScoutError::SchemaValidation(format!("reply is not a valid report: {e}")))?;
    report.validate()?;
    Ok(report)
}

/// Score bands used when rendering a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreTier {
    /// 90 and above.
    Elite,
    /// 75 to 89.
    Strong,
    /// 50 to 74.
    Average,
    /// Below 50.
    Weak,
}

impl ScoreTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ScoreTier::Elite
        } else if score >= 75.0 {
            ScoreTier::Strong
        } else if score >= 50.0 {
            ScoreTier::Average
        } else {
            ScoreTier::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreTier::Elite => "elite",
            ScoreTier::Strong => "strong",
            ScoreTier::Average => "average",
            ScoreTier::Weak => "weak",
        }
    }
}

// ---------------------------------------------------------------------------
// generateContent wire types (not part of the public API surface)
// ---------------------------------------------------------------------------

/// Finish reasons meaning the model withheld its answer.
const REFUSAL_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

/// POST /models/{model}:generateContent request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Either inline binary content or text.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

/// generateContent response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    pub block_reason: Option<String>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Deserialize)]
pub(crate) struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Pull the report text out of a response, or explain why there is none.
pub(crate) fn report_text_from_response(resp: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ScoutError::ModelRefusal(format!("prompt blocked: {reason}")));
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ScoutError::ModelRefusal("no candidates returned".into()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if REFUSAL_FINISH_REASONS.contains(&reason) {
            return Err(ScoutError::ModelRefusal(format!("finished with {reason}")));
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ScoutError::ModelRefusal("empty response".into()));
    }

    Ok(text)
}
