//! Score a clip from disk.
//!
//! Run with:
//!   GEMINI_API_KEY=... cargo run --example scout -- path/to/goal.mp4
//!
//! Set `RUST_LOG=goalscan=debug` to see request details.

use std::sync::Arc;

use goalscan::{AnalysisStatus, Client, Controller, SessionStore, VideoFile};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> goalscan::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("goalscan=info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "goal.mp4".to_string());

    // -----------------------------------------------------------------------
    // 1. Local session (display name only, no credentials)
    // -----------------------------------------------------------------------
    let mut sessions = SessionStore::new();
    if let Ok(name) = std::env::var("USER") {
        if let Err(err) = sessions.login(&name) {
            tracing::warn!("skipping login: {err}");
        }
    }
    println!("{}", sessions.greeting());
    println!();

    // -----------------------------------------------------------------------
    // 2. Build the client (fails fast without an API key)
    // -----------------------------------------------------------------------
    let client = Client::from_env()?;
    let mut controller = Controller::new(Arc::new(client));

    // -----------------------------------------------------------------------
    // 3. Select, analyze, render
    // -----------------------------------------------------------------------
    let status = match controller.process(VideoFile::open(&path)).await {
        Ok(status) => status,
        Err(err) => {
            eprintln!("{}", controller.validation_message().unwrap_or(err.user_message()));
            return Err(err);
        }
    };

    match status {
        AnalysisStatus::Success => {
            if let Some(report) = controller.result() {
                println!("{} [{}]", report.title, report.tier().label());
                println!("Score: {}/100", report.score);
                for (category, score) in report.breakdown.entries() {
                    println!("  {category:<12} {score:>5.1}");
                }
                println!();
                println!("Verdict:");
                println!("  {}", report.verdict);
                println!("Evidence:");
                for (i, item) in report.evidence.iter().enumerate() {
                    println!("  {}. {item}", i + 1);
                }
                println!("Tips:");
                for tip in &report.tips {
                    println!("  - {tip}");
                }
            }
            if let Some(preview) = controller.preview() {
                println!();
                println!("Preview: {}", preview.url());
            }
        }
        _ => {
            println!("Analysis failed: {}", controller.error_message().unwrap_or("unknown error"));
        }
    }

    // -----------------------------------------------------------------------
    // 4. Back to idle
    // -----------------------------------------------------------------------
    controller.reset();
    sessions.logout();

    Ok(())
}
