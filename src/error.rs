//! Error types for the tariff-tracker library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TrackerError`]: **Fatal**, nothing can run at all (missing
//!   credential, invalid configuration, report could not be written).
//!   Returned as `Err(TrackerError)` from constructors and exporters.
//!
//! * [`ItemError`]: **Non-fatal**, one company in the batch failed (no
//!   transcript for the period, unreadable PDF, extraction service error).
//!   Stored on the company's [`crate::analysis::CompanyEntry`] so the batch
//!   carries on with the remaining companies and the failure is shown inline
//!   next to the company it belongs to.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the tariff-tracker library.
///
/// Per-company failures use [`ItemError`] and are stored on the
/// [`crate::analysis::AnalysisSet`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TrackerError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// A required API credential is absent or empty.
    #[error("Missing credential {name}.\nSet it in the environment or in a .env file: {name}=...")]
    MissingCredential { name: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured alternate LLM provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Export errors ─────────────────────────────────────────────────────
    /// A report format could not be generated.
    #[error("Failed to generate {format} report: {detail}")]
    ExportFailed { format: &'static str, detail: String },

    /// Could not create or write an output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The branding logo could not be read.
    #[error("Failed to read logo '{path}': {source}")]
    LogoUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single company in a batch.
///
/// Each variant maps to one human-readable notice. Acquisition failures
/// (transcript, PDF) and extraction failures stay distinguishable so the
/// user can tell "no call transcript for that quarter" apart from "the
/// model returned garbage".
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    // ── Transcript acquisition ────────────────────────────────────────────
    /// The transcript request never produced a response.
    #[error("Error fetching transcript for {ticker}: {detail}")]
    TranscriptRequestFailed { ticker: String, detail: String },

    /// The transcript request exceeded its timeout.
    #[error("Transcript request for {ticker} timed out after {secs}s")]
    TranscriptTimeout { ticker: String, secs: u64 },

    /// The transcript service answered with a non-success status.
    #[error("Transcript service returned HTTP {status} for {ticker}")]
    TranscriptStatus { ticker: String, status: u16 },

    /// The service answered, but holds no transcript for that period.
    #[error("No transcript content found for {ticker} for Q{quarter} {year}")]
    NoTranscript {
        ticker: String,
        year: i32,
        quarter: u8,
    },

    /// The response body was not the expected transcript shape.
    #[error("Error parsing transcript response for {ticker}: {detail}")]
    MalformedTranscript { ticker: String, detail: String },

    // ── PDF acquisition ───────────────────────────────────────────────────
    /// The upload does not start with the PDF magic bytes.
    #[error("'{name}' is not a PDF file")]
    NotAPdf { name: String },

    /// The PDF could not be opened at all.
    #[error("An error occurred while reading '{name}': {detail}")]
    UnreadablePdf { name: String, detail: String },

    /// The PDF opened but no page yielded any text.
    #[error("No text could be extracted from '{name}'")]
    EmptyDocument { name: String },

    // ── Extraction service ────────────────────────────────────────────────
    /// Nothing to analyse; the service is not called.
    #[error("Input text is empty. Cannot perform analysis.")]
    EmptyText,

    /// The extraction request never produced a response.
    #[error("Error calling extraction service: {detail}")]
    ExtractionTransport { detail: String },

    /// The extraction request exceeded its timeout.
    #[error("Extraction service timed out after {secs}s")]
    ExtractionTimeout { secs: u64 },

    /// The extraction service answered with a non-success status.
    #[error("Extraction service returned HTTP {status}: {body}")]
    ExtractionStatus { status: u16, body: String },

    /// The response envelope or its nested JSON could not be parsed.
    #[error("Error parsing extraction service JSON response: {detail}")]
    MalformedResponse { detail: String },
}

impl ItemError {
    /// `true` for failures that happened before the extraction service was
    /// involved.
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            ItemError::TranscriptRequestFailed { .. }
                | ItemError::TranscriptTimeout { .. }
                | ItemError::TranscriptStatus { .. }
                | ItemError::NoTranscript { .. }
                | ItemError::MalformedTranscript { .. }
                | ItemError::NotAPdf { .. }
                | ItemError::UnreadablePdf { .. }
                | ItemError::EmptyDocument { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_the_variable() {
        let e = TrackerError::MissingCredential {
            name: "FMP_API_KEY",
        };
        assert!(e.to_string().contains("FMP_API_KEY"));
    }

    #[test]
    fn no_transcript_display() {
        let e = ItemError::NoTranscript {
            ticker: "AAPL".into(),
            year: 2025,
            quarter: 2,
        };
        assert_eq!(
            e.to_string(),
            "No transcript content found for AAPL for Q2 2025"
        );
    }

    #[test]
    fn network_and_no_content_are_distinguishable() {
        let network = ItemError::TranscriptRequestFailed {
            ticker: "MSFT".into(),
            detail: "connection refused".into(),
        };
        let empty = ItemError::NoTranscript {
            ticker: "MSFT".into(),
            year: 2024,
            quarter: 1,
        };
        assert_ne!(network.to_string(), empty.to_string());
        assert!(network.is_acquisition());
        assert!(empty.is_acquisition());
    }

    #[test]
    fn extraction_errors_are_not_acquisition() {
        assert!(!ItemError::EmptyText.is_acquisition());
        assert!(!ItemError::ExtractionTimeout { secs: 120 }.is_acquisition());
        let e = ItemError::ExtractionStatus {
            status: 401,
            body: "invalid key".into(),
        };
        assert!(e.to_string().contains("401"));
        assert!(!e.is_acquisition());
    }

    #[test]
    fn item_error_serialises() {
        let e = ItemError::MalformedResponse {
            detail: "expected value".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: ItemError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
