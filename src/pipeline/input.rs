//! Input types: where a company's text comes from and what it looks like
//! once acquired.
//!
//! A [`DocumentSource`] is created per user action and consumed by
//! acquisition. The resulting [`RawText`] is owned by the pipeline until it
//! has been sent for extraction.

use std::path::Path;

/// Remote transcript lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranscriptQuery {
    /// Upper-case ticker symbol.
    pub ticker: String,
    pub year: i32,
    /// Fiscal quarter, 1–4.
    pub quarter: u8,
}

impl TranscriptQuery {
    pub fn new(ticker: impl Into<String>, year: i32, quarter: u8) -> Self {
        Self {
            ticker: ticker.into(),
            year,
            quarter,
        }
    }
}

/// A user-supplied PDF held in memory.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Original file name, e.g. `Siemens_Q2.pdf`.
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Read a PDF from disk, keeping only its file name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, content })
    }

    /// Company key for this upload: the file name without its extension.
    pub fn company_key(&self) -> String {
        company_key_from_filename(&self.name)
    }
}

/// Where one company's document text comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    RemoteQuery(TranscriptQuery),
    UploadedBytes(UploadedDocument),
}

impl DocumentSource {
    /// Key the company is filed under in the [`crate::analysis::AnalysisSet`].
    pub fn company_key(&self) -> String {
        match self {
            DocumentSource::RemoteQuery(q) => q.ticker.clone(),
            DocumentSource::UploadedBytes(doc) => doc.company_key(),
        }
    }
}

/// Document text for one company, ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText {
    pub company_key: String,
    pub text: String,
    /// Non-fatal notices raised while acquiring the text.
    pub warnings: Vec<String>,
}

impl RawText {
    pub fn new(company_key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            company_key: company_key.into(),
            text: text.into(),
            warnings: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Cut `text` to at most `max_chars` characters.
///
/// Returns the kept prefix and whether anything was cut. Counts `char`s,
/// not bytes, so multi-byte text is never split mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Split a comma-separated ticker list, trimming and upper-casing each.
///
/// Empty items are dropped, so `"aapl, ,msft,"` gives `["AAPL", "MSFT"]`.
pub fn parse_tickers(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// File name without its final extension: `"ACME Q2.pdf"` → `"ACME Q2"`.
pub fn company_key_from_filename(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| name.to_string())
}

/// `true` if `bytes` start with the `%PDF` magic.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}
