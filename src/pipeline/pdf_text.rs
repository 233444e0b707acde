//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is not safe to call
//! from async contexts. [`extract_document_text`] moves the work onto
//! tokio's blocking pool so the runtime keeps serving other tasks while a
//! large filing is parsed.
//!
//! ## Page failures
//!
//! A page whose text layer cannot be read is reported and skipped. Only a
//! document that cannot be opened at all fails the upload.

use crate::error::ItemError;
use crate::pipeline::input::{has_pdf_magic, RawText, UploadedDocument};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text of one page, or the reason it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed.
    pub page_num: usize,
    pub text: Result<String, String>,
}

/// Anything that can split a PDF into per-page text.
///
/// Returns `Err` only when the document cannot be opened.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, String>;
}

/// [`PdfTextExtractor`] backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextExtractor {
    /// Explicit library path; falls back to the system library when `None`.
    lib_path: Option<PathBuf>,
}

impl PdfiumTextExtractor {
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match &self.lib_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| format!("failed to load pdfium library: {:?}", e))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PdfTextExtractor for PdfiumTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, String> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| format!("{:?}", e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let mut results = Vec::with_capacity(total_pages);
        for idx in 0..total_pages {
            let text = pages
                .get(idx as u16)
                .map_err(|e| format!("{:?}", e))
                .and_then(|page| {
                    page.text()
                        .map(|t| t.all())
                        .map_err(|e| format!("{:?}", e))
                });
            results.push(PageText {
                page_num: idx + 1,
                text,
            });
        }
        Ok(results)
    }
}

/// Join readable pages in document order, each followed by a newline.
///
/// Returns the text and one warning per unreadable page.
pub fn assemble_pages(name: &str, pages: Vec<PageText>) -> (String, Vec<String>) {
    let mut text = String::new();
    let mut warnings = Vec::new();
    for page in pages {
        match page.text {
            Ok(t) => {
                text.push_str(&t);
                text.push('\n');
            }
            Err(e) => {
                warn!("'{}': page {} could not be read: {}", name, page.page_num, e);
                warnings.push(format!(
                    "Page {} of '{}' could not be read: {}",
                    page.page_num, name, e
                ));
            }
        }
    }
    (text, warnings)
}

/// Extract the text of an uploaded PDF.
///
/// Fails with [`ItemError::NotAPdf`] before touching pdfium when the magic
/// bytes are wrong, [`ItemError::UnreadablePdf`] when the document cannot
/// be opened, and [`ItemError::EmptyDocument`] when no page yields text.
pub async fn extract_document_text(
    extractor: &Arc<dyn PdfTextExtractor>,
    doc: &UploadedDocument,
) -> Result<RawText, ItemError> {
    if !has_pdf_magic(&doc.content) {
        return Err(ItemError::NotAPdf {
            name: doc.name.clone(),
        });
    }

    let ext = Arc::clone(extractor);
    let bytes = doc.content.clone();
    let pages = tokio::task::spawn_blocking(move || ext.extract_pages(&bytes))
        .await
        .map_err(|e| ItemError::UnreadablePdf {
            name: doc.name.clone(),
            detail: format!("extraction task panicked: {}", e),
        })?
        .map_err(|detail| ItemError::UnreadablePdf {
            name: doc.name.clone(),
            detail,
        })?;

    let (text, warnings) = assemble_pages(&doc.name, pages);
    if text.trim().is_empty() {
        return Err(ItemError::EmptyDocument {
            name: doc.name.clone(),
        });
    }
    debug!("'{}': {} chars of text", doc.name, text.chars().count());

    Ok(RawText {
        company_key: doc.company_key(),
        text,
        warnings,
    })
}
