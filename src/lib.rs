//! # tariff-tracker
//!
//! Pull tariff commentary out of earnings-call transcripts and PDF filings
//! with an LLM, and compare it across companies.
//!
//! ## Why this crate?
//!
//! Tariff effects are scattered through long transcripts, mixed in with
//! currency swings, demand shifts and everything else a CFO talks about.
//! This crate sends the document to an extraction model with a strict
//! instruction: report only figures the company explicitly attributes to
//! tariffs, and say so when there are none. The loosely-shaped answer is
//! normalized into a typed record and rendered as a per-company report plus
//! a side-by-side comparison.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ticker / PDF
//!  │
//!  ├─ 1. Acquire    FMP transcript GET, or pdfium text (spawn_blocking)
//!  ├─ 2. Extract    one chat-completions call, JSON mode, 40 000 chars max
//!  ├─ 3. Normalize  object→list, null→empty, fences stripped
//!  ├─ 4. Render     per-company sections + cross-company comparison
//!  └─ 5. Export     self-contained HTML + DOCX
//! ```
//!
//! Companies run one after another. A failure (no transcript for the
//! quarter, unreadable PDF, bad model reply) is recorded on that company
//! and the batch continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tariff_tracker::{report, TariffTracker, TrackerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // FMP_API_KEY and DEEPSEEK_API_KEY from the environment
//!     let config = TrackerConfig::builder_from_env().build()?;
//!     let mut tracker = TariffTracker::new(&config)?;
//!     let tickers = vec!["AAPL".to_string(), "F".to_string()];
//!     let set = tracker.analyze_transcripts(&tickers, 2025, 2).await;
//!     print!("{}", report::plain::render(&report::Report::from_set(set)));
//!     tracker.export("reports").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tariff-tracker` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! tariff-tracker = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod tracker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{AnalysisSet, CompanyEntry, ImpactEntry, Sentiment, TariffAnalysis};
pub use config::{TrackerConfig, TrackerConfigBuilder};
pub use error::{ItemError, TrackerError};
pub use export::{export_docx, export_html, write_reports, ExportPaths};
pub use pipeline::input::{
    parse_tickers, DocumentSource, RawText, TranscriptQuery, UploadedDocument,
};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::Report;
pub use tracker::TariffTracker;
