//! Batch runner and session state.
//!
//! [`TariffTracker`] owns the clients, the caches and the most recent
//! [`AnalysisSet`]. A batch runs companies one after another; a failure is
//! recorded on that company's entry and the loop moves on. Only
//! configuration problems, caught in [`TariffTracker::new`], stop anything.

use crate::analysis::{AnalysisSet, CompanyEntry};
use crate::config::{TrackerConfig, FMP_API_KEY_VAR};
use crate::error::{ItemError, TrackerError};
use crate::export::{self, ExportPaths};
use crate::pipeline::input::{DocumentSource, RawText, TranscriptQuery, UploadedDocument};
use crate::pipeline::llm::{resolve_backend, ExtractionBackend, ExtractionClient};
use crate::pipeline::pdf_text::{extract_document_text, PdfTextExtractor, PdfiumTextExtractor};
use crate::pipeline::transcript::{CachedTranscripts, FmpTranscriptClient, TranscriptSource};
use crate::progress::ProgressCallback;
use crate::report::Report;
use chrono::Datelike;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Period label used for uploaded documents.
pub const UPLOADED_PERIOD: &str = "Uploaded Docs";

/// Tariff analysis session.
///
/// # Example
/// ```rust,no_run
/// use tariff_tracker::{TariffTracker, TrackerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = TrackerConfig::builder_from_env().build()?;
///     let mut tracker = TariffTracker::new(&config)?;
///     let tickers = vec!["AAPL".to_string(), "MSFT".to_string()];
///     let set = tracker.analyze_transcripts(&tickers, 2025, 2).await;
///     println!("{} of {} analysed", set.success_count(), set.len());
///     tracker.export("reports").await?;
///     Ok(())
/// }
/// ```
pub struct TariffTracker {
    transcripts: CachedTranscripts,
    pdf: Arc<dyn PdfTextExtractor>,
    extractor: ExtractionClient,
    progress: Option<ProgressCallback>,
    logo_path: Option<PathBuf>,
    current: Option<AnalysisSet>,
}

impl TariffTracker {
    /// Build a tracker with the real HTTP clients and pdfium.
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let fmp_key = config
            .fmp_api_key
            .clone()
            .ok_or(TrackerError::MissingCredential {
                name: FMP_API_KEY_VAR,
            })?;
        let transcripts = FmpTranscriptClient::new(
            config.transcript_base_url.clone(),
            fmp_key,
            config.transcript_timeout_secs,
        )?;
        let backend = resolve_backend(config)?;
        let pdf = PdfiumTextExtractor::new(config.pdfium_lib_path.clone());
        Ok(Self::with_parts(
            Box::new(transcripts),
            Arc::new(pdf),
            backend,
            config,
        ))
    }

    /// Build a tracker from explicit collaborators.
    ///
    /// Credentials in `config` are not consulted.
    pub fn with_parts(
        transcripts: Box<dyn TranscriptSource>,
        pdf: Arc<dyn PdfTextExtractor>,
        backend: Arc<dyn ExtractionBackend>,
        config: &TrackerConfig,
    ) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            transcripts: CachedTranscripts::new(transcripts, ttl),
            pdf,
            extractor: ExtractionClient::new(backend, config.max_input_chars, ttl),
            progress: config.progress_callback.clone(),
            logo_path: config.logo_path.clone(),
            current: None,
        }
    }

    /// Get one company's document text.
    pub async fn acquire(&self, source: &DocumentSource) -> Result<RawText, ItemError> {
        match source {
            DocumentSource::RemoteQuery(query) => {
                let text = self.transcripts.fetch(query).await?;
                Ok(RawText::new(query.ticker.clone(), text))
            }
            DocumentSource::UploadedBytes(doc) => extract_document_text(&self.pdf, doc).await,
        }
    }

    /// Send already-acquired text for extraction and wrap the outcome.
    pub async fn analyze_text(&self, raw: RawText) -> CompanyEntry {
        let mut warnings = raw.warnings.clone();
        if let Some(notice) = self.extractor.truncation_notice(&raw) {
            warnings.push(notice);
        }
        match self.extractor.extract(&raw).await {
            Ok(analysis) => CompanyEntry {
                key: raw.company_key,
                analysis: Some(analysis),
                error: None,
                warnings,
            },
            Err(e) => failed(raw.company_key, e, warnings),
        }
    }

    async fn process(&self, source: &DocumentSource) -> CompanyEntry {
        match self.acquire(source).await {
            Ok(raw) => self.analyze_text(raw).await,
            Err(e) => failed(source.company_key(), e, Vec::new()),
        }
    }

    /// Run a batch and make its set the current one.
    ///
    /// The previous set is discarded before the first company starts.
    pub async fn run_batch(
        &mut self,
        sources: &[DocumentSource],
        period_source: impl Into<String>,
        year: i32,
    ) -> &AnalysisSet {
        self.current = None;
        let mut set = AnalysisSet::new(period_source, year);
        let total = sources.len();
        let start = Instant::now();
        info!("Starting batch of {} companies ({})", total, set.period_source);

        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        for (i, source) in sources.iter().enumerate() {
            let index = i + 1;
            let key = source.company_key();
            if let Some(ref cb) = self.progress {
                cb.on_company_start(&key, index, total);
            }

            let entry = self.process(source).await;

            if let Some(ref cb) = self.progress {
                match &entry.error {
                    None => cb.on_company_complete(&entry.key, index, total),
                    Some(e) => cb.on_company_error(&entry.key, index, total, &e.to_string()),
                }
            }
            set.insert(entry);
        }

        info!(
            "Batch complete: {}/{} companies analysed in {:?}",
            set.success_count(),
            total,
            start.elapsed()
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, set.success_count());
        }

        self.current.insert(set)
    }

    /// Fetch and analyse earnings-call transcripts.
    ///
    /// Period label is `"{year} Q{quarter} / Earnings Call"`.
    pub async fn analyze_transcripts(
        &mut self,
        tickers: &[String],
        year: i32,
        quarter: u8,
    ) -> &AnalysisSet {
        let sources: Vec<DocumentSource> = tickers
            .iter()
            .map(|t| DocumentSource::RemoteQuery(TranscriptQuery::new(t.clone(), year, quarter)))
            .collect();
        let period = format!("{} Q{} / Earnings Call", year, quarter);
        self.run_batch(&sources, period, year).await
    }

    /// Analyse uploaded PDFs. Guidance is labelled against the current year.
    pub async fn analyze_uploads(&mut self, docs: Vec<UploadedDocument>) -> &AnalysisSet {
        let year = chrono::Local::now().year();
        let sources: Vec<DocumentSource> =
            docs.into_iter().map(DocumentSource::UploadedBytes).collect();
        self.run_batch(&sources, UPLOADED_PERIOD, year).await
    }

    /// Results of the most recent batch.
    pub fn current(&self) -> Option<&AnalysisSet> {
        self.current.as_ref()
    }

    /// Report model of the most recent batch.
    pub fn report(&self) -> Option<Report> {
        self.current.as_ref().map(Report::from_set)
    }

    /// Write the HTML and DOCX reports of the most recent batch into `dir`.
    pub async fn export(&self, dir: impl AsRef<Path>) -> Result<ExportPaths, TrackerError> {
        let set = self
            .current
            .as_ref()
            .ok_or_else(|| TrackerError::Internal("no analysis to export".into()))?;
        export::write_reports(set, dir, self.logo_path.as_deref()).await
    }
}

fn failed(key: String, error: ItemError, warnings: Vec<String>) -> CompanyEntry {
    warn!("{}: {}", key, error);
    CompanyEntry {
        key,
        analysis: None,
        error: Some(error),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pdf_text::PageText;
    use futures::future::BoxFuture;

    struct Transcripts;

    impl TranscriptSource for Transcripts {
        fn fetch<'a>(
            &'a self,
            query: &'a TranscriptQuery,
        ) -> BoxFuture<'a, Result<String, ItemError>> {
            Box::pin(async move { Ok(format!("{} says tariffs cost $5M.", query.ticker)) })
        }
    }

    struct OnePage;

    impl PdfTextExtractor for OnePage {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<PageText>, String> {
            Ok(vec![PageText {
                page_num: 1,
                text: Ok("Tariffs hit margins.".into()),
            }])
        }
    }

    struct Echo;

    impl ExtractionBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn complete<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, ItemError>> {
            Box::pin(async { Ok(r#"{"summary":"ok"}"#.to_string()) })
        }
    }

    fn tracker() -> TariffTracker {
        TariffTracker::with_parts(
            Box::new(Transcripts),
            Arc::new(OnePage),
            Arc::new(Echo),
            &TrackerConfig::default(),
        )
    }

    #[tokio::test]
    async fn transcript_batch_labels_period() {
        let mut t = tracker();
        let set = t
            .analyze_transcripts(&["AAPL".into(), "MSFT".into()], 2025, 2)
            .await;
        assert_eq!(set.period_source, "2025 Q2 / Earnings Call");
        assert_eq!(set.year, 2025);
        assert_eq!(set.success_count(), 2);
    }

    #[tokio::test]
    async fn upload_batch_uses_file_stem_and_current_year() {
        let mut t = tracker();
        let set = t
            .analyze_uploads(vec![
                UploadedDocument::new("Siemens_Q2.pdf", b"%PDF-1.7".to_vec()),
                UploadedDocument::new("notes.txt", b"plain".to_vec()),
            ])
            .await;
        assert_eq!(set.period_source, UPLOADED_PERIOD);
        assert_eq!(set.year, chrono::Local::now().year());
        assert!(set.get("Siemens_Q2").unwrap().analysis.is_some());
        assert_eq!(
            set.get("notes").unwrap().error,
            Some(ItemError::NotAPdf {
                name: "notes.txt".into()
            })
        );
    }

    #[tokio::test]
    async fn new_batch_replaces_previous_set() {
        let mut t = tracker();
        t.analyze_transcripts(&["AAPL".into()], 2025, 2).await;
        t.analyze_transcripts(&["TSLA".into()], 2024, 4).await;
        let set = t.current().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get("AAPL").is_none());
        assert_eq!(set.period_source, "2024 Q4 / Earnings Call");
    }

    #[tokio::test]
    async fn export_without_batch_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(tracker().export(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn truncation_is_noted_on_entry() {
        let config = TrackerConfig {
            max_input_chars: 4,
            ..TrackerConfig::default()
        };
        let t = TariffTracker::with_parts(
            Box::new(Transcripts),
            Arc::new(OnePage),
            Arc::new(Echo),
            &config,
        );
        let entry = t.analyze_text(RawText::new("ACME", "long text")).await;
        assert!(entry.analysis.is_some());
        assert_eq!(entry.warnings.len(), 1);
        assert!(entry.warnings[0].contains("first 4 of 9"));
    }
}
