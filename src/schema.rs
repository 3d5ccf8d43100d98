//! The structured-output contract sent with every analysis request.
//!
//! The schema and [`AnalysisResult`](crate::AnalysisResult) change together.
//! Adding or dropping a required field is a breaking change: bump
//! [`SCHEMA_VERSION`].

use serde_json::{json, Value};

pub const SCHEMA_VERSION: u32 = 1;

/// Top-level fields the model must always return.
pub const REQUIRED_FIELDS: &[&str] = &["score", "breakdown", "title", "verdict", "evidence", "tips"];

/// Sub-fields of `breakdown`, all required.
pub const BREAKDOWN_FIELDS: &[&str] = &["skill", "accuracy", "difficulty", "aesthetics"];

pub const DEFAULT_NARRATIVE_LANGUAGE: &str = "Arabic (العربية)";

/// The response schema in the generateContent `responseSchema` dialect.
pub fn response_schema() -> Value {
    let breakdown_props: serde_json::Map<String, Value> = BREAKDOWN_FIELDS
        .iter()
        .map(|f| (f.to_string(), json!({ "type": "NUMBER" })))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER", "description": "Total score from 0 to 100" },
            "breakdown": {
                "type": "OBJECT",
                "properties": breakdown_props,
                "required": BREAKDOWN_FIELDS,
            },
            "title": { "type": "STRING", "description": "A catchy title for the goal or clip" },
            "verdict": { "type": "STRING", "description": "Professional scouting summary" },
            "evidence": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Specific details/events from the video as proof for the score"
            },
            "tips": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Suggestions to improve the gameplay"
            }
        },
        "required": REQUIRED_FIELDS,
    })
}

/// The fixed scouting rubric, asking for narrative fields in `language`.
pub fn build_prompt(language: &str) -> String {
    format!(
        "You are a professional football analyst and eFootball/PES gaming expert.\n\
         Analyze this gameplay clip (likely a goal or highlight).\n\
         Provide a detailed evaluation based on:\n\
         1. Player skill (dribbling, passing, timing).\n\
         2. Finishing accuracy and power.\n\
         3. Difficulty of the shot (distance, angle, pressure).\n\
         4. Overall visual aesthetics and flair.\n\n\
         Provide the score out of 100 and each category score out of 100. \
         Write the title, verdict, evidence and tips in {language}, as the user reads that language.\n\
         Be critical but fair, like a professional scout. If it's a simple tap-in, score it lower. \
         If it's a 30-yard curler after a skill move, score it very high."
    )
}
