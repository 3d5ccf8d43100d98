//! # GoalScan
//!
//! Async Rust pipeline for AI scouting reports on football gameplay clips.
//! Encode a clip, send it to a Gemini model with a strict output schema, and
//! get back a validated [`AnalysisResult`]: an overall score, a category
//! breakdown, a narrative verdict, evidence, and tips.
//!
//! ## Quick start
//!
//! ```no_run
//! use goalscan::{encode, Client, VideoFile};
//!
//! #[tokio::main]
//! async fn main() -> goalscan::Result<()> {
//!     // Reads GEMINI_API_KEY (or API_KEY) from the environment.
//!     let client = Client::from_env()?;
//!
//!     let payload = encode(&VideoFile::open("top_corner.mp4")).await?;
//!     let report = client.analyze(payload).await?;
//!
//!     println!("{} - {}/100 ({})", report.title, report.score, report.tier().label());
//!     for (category, score) in report.breakdown.entries() {
//!         println!("  {category}: {score}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a UI
//!
//! ```no_run
//! use std::sync::Arc;
//! use goalscan::{AnalysisStatus, Client, Controller, VideoFile};
//!
//! # async fn example() -> goalscan::Result<()> {
//! let mut controller = Controller::new(Arc::new(Client::from_env()?));
//!
//! let task = controller.select_file(VideoFile::open("skill_move.mov"))?;
//! assert_eq!(controller.status(), AnalysisStatus::Loading);
//!
//! let completion = task.run().await;
//! controller.complete(completion);
//!
//! match controller.status() {
//!     AnalysisStatus::Success => println!("{:?}", controller.result()),
//!     _ => println!("{:?}", controller.error_message()),
//! }
//! controller.reset();
//! # Ok(())
//! # }
//! ```

mod client;
mod controller;
mod encoder;
mod errors;
mod models;
mod schema;
mod session;

pub use client::{Analyzer, Client, ClientBuilder, API_KEY_ENV, FALLBACK_API_KEY_ENV};
pub use controller::{
    AnalysisState, AnalysisStatus, AnalysisTask, Completion, Controller, PreviewHandle,
    PreviewRegistry,
};
pub use encoder::{
    encode, encode_reader, guess_media_type, is_video_media_type, normalize_media_type,
    strip_data_uri_prefix, EncodedPayload, VideoFile, VideoSource,
};
pub use errors::{FailureKind, Result, ScoutError};
pub use models::{parse_report, AnalysisResult, Breakdown, ScoreTier, MAX_SCORE, MIN_SCORE};
pub use schema::{
    build_prompt, response_schema, BREAKDOWN_FIELDS, DEFAULT_NARRATIVE_LANGUAGE, REQUIRED_FIELDS,
    SCHEMA_VERSION,
};
pub use session::{SessionStore, UserSession};
