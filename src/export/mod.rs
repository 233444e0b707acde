//! Report export: a self-contained HTML document and a DOCX document.
//!
//! Both are generated on demand from the current [`AnalysisSet`], which is
//! only borrowed. Writing to disk goes through a temp file and a rename so
//! a crash never leaves a half-written report behind.

pub mod docx;

use crate::analysis::AnalysisSet;
use crate::error::TrackerError;
use crate::report::{html, Report};
use base64::Engine;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const HTML_FILE_NAME: &str = "tariff_impact_report.html";
pub const DOCX_FILE_NAME: &str = "tariff_impact_report.docx";

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()
}

/// HTML export. `logo_base64` is an already-encoded PNG.
pub fn export_html(set: &AnalysisSet, logo_base64: Option<&str>) -> String {
    html::render_document(&Report::from_set(set), logo_base64, &timestamp())
}

/// DOCX export.
pub fn export_docx(set: &AnalysisSet) -> Result<Vec<u8>, TrackerError> {
    docx::render(&Report::from_set(set), &timestamp())
}

/// Read a logo file and base64-encode it for a data URI.
pub async fn load_logo(path: &Path) -> Result<String, TrackerError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TrackerError::LogoUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Where [`write_reports`] put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub html: PathBuf,
    pub docx: PathBuf,
}

/// Write both reports into `dir`, creating it if needed.
pub async fn write_reports(
    set: &AnalysisSet,
    dir: impl AsRef<Path>,
    logo_path: Option<&Path>,
) -> Result<ExportPaths, TrackerError> {
    let dir = dir.as_ref();
    let logo = match logo_path {
        Some(p) => Some(load_logo(p).await?),
        None => None,
    };

    let paths = ExportPaths {
        html: dir.join(HTML_FILE_NAME),
        docx: dir.join(DOCX_FILE_NAME),
    };

    let html = export_html(set, logo.as_deref());
    write_atomic(&paths.html, html.as_bytes()).await?;
    let docx = export_docx(set)?;
    write_atomic(&paths.docx, &docx).await?;

    info!(
        "Reports written: {} and {}",
        paths.html.display(),
        paths.docx.display()
    );
    Ok(paths)
}

/// Write to `{path}.tmp`, then rename over `path`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TrackerError> {
    let write_err = |e| TrackerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
