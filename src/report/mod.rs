//! Report model: what gets shown, independent of how.
//!
//! An [`AnalysisSet`] is first turned into a [`Report`], a tree of plain
//! strings with every placeholder already applied. The renderers in
//! [`html`] and [`plain`] and the DOCX writer in [`crate::export`] only walk
//! that tree, so the three outputs always carry the same headings, the same
//! fallbacks and the same company order.
//!
//! ```text
//! AnalysisSet ──▶ Report ──┬──▶ html   (app view + HTML export)
//!                          ├──▶ plain  (terminal)
//!                          └──▶ docx   (export)
//! ```

pub mod html;
pub mod plain;
pub mod text;

use crate::analysis::{AnalysisSet, CompanyEntry, ImpactEntry, TariffAnalysis};
use text::NOT_AVAILABLE;

// ── Fixed labels ────────────────────────────────────────────────────────────

/// Branding header of the exported documents.
pub const BRAND_TITLE: &str = "Tariff Impact Tracker";
pub const EXECUTIVE_SUMMARY: &str = "Executive Summary";
pub const QUARTERLY_IMPACT: &str = "Quarterly Financial Impact";
pub const FORWARD_GUIDANCE: &str = "Forward Guidance Impact";
pub const QUALITATIVE_IMPACTS: &str = "Qualitative Impacts";
pub const MITIGATION_STRATEGIES: &str = "Mitigation Strategies";
pub const COMPARISON_HEADING: &str = "Cross-Company Comparison";
pub const COMPARISON_TABLE_HEADING: &str = "Comparison Summary";

pub const SENTIMENT_LABEL: &str = "Overall Sentiment on Tariffs:";
pub const NO_SUMMARY: &str = "No summary provided.";
pub const NO_IMPACTS: &str =
    "No specific financial impacts from tariffs were mentioned in the document.";
pub const NO_COMPARISON_DATA: &str = "No data available for comparison.";
pub const NOT_SPECIFIED: &str = "Not specified";

pub const IMPACT_COLUMNS: [&str; 4] = ["Metric", "Impact", "Unit", "Source Quote"];
pub const COMPARISON_COLUMNS: [&str; 4] = [
    "Company",
    "Period / Source",
    "Tariff Impact Summary",
    "Mitigation",
];

// ── Model ───────────────────────────────────────────────────────────────────

/// Everything rendered for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// One per set entry, in insertion order.
    pub companies: Vec<CompanyReport>,
    /// Present only for multi-company batches.
    pub comparison: Option<Comparison>,
}

/// Rendered view of one company.
#[derive(Debug, Clone, PartialEq)]
pub enum CompanyReport {
    /// The pipeline produced nothing for this company.
    Missing {
        key: String,
        /// `No analysis data to display for {key}.`
        notice: String,
        /// The failure, when one was recorded.
        reason: Option<String>,
    },
    Present {
        key: String,
        /// `Tariff Impact Analysis: {name}`
        title: String,
        sections: Vec<Section>,
        /// Non-fatal acquisition notices.
        warnings: Vec<String>,
    },
}

impl CompanyReport {
    pub fn key(&self) -> &str {
        match self {
            CompanyReport::Missing { key, .. } | CompanyReport::Present { key, .. } => key,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, CompanyReport::Present { .. })
    }

    /// Title followed by section headings; empty for missing companies.
    pub fn headings(&self) -> Vec<&str> {
        match self {
            CompanyReport::Missing { .. } => Vec::new(),
            CompanyReport::Present { title, sections, .. } => std::iter::once(title.as_str())
                .chain(sections.iter().map(|s| s.heading))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: &'static str,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    /// Sentiment line plus summary paragraph.
    Summary { sentiment: String, summary: String },
    /// Impact table. Empty rows render [`NO_IMPACTS`] instead of a table.
    Impacts(Vec<ImpactRow>),
    Paragraph(String),
}

/// One impact table row with placeholders applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactRow {
    pub metric: String,
    pub impact: String,
    pub unit: String,
    pub source_quote: String,
}

impl ImpactRow {
    /// Cells in [`IMPACT_COLUMNS`] order.
    pub fn cells(&self) -> [&str; 4] {
        [&self.metric, &self.impact, &self.unit, &self.source_quote]
    }
}

impl From<&ImpactEntry> for ImpactRow {
    fn from(e: &ImpactEntry) -> Self {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            metric: or_na(&e.metric),
            impact: or_na(&e.impact_value),
            unit: or_na(&e.unit),
            source_quote: or_na(&e.source_quote),
        }
    }
}

/// Cross-company comparison table.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Only companies with an analysis. Empty renders [`NO_COMPARISON_DATA`].
    pub rows: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub company: String,
    pub period_source: String,
    /// Lines separated by `'\n'`, see [`text::comparison_summary`].
    pub impact_summary: String,
    /// Empty renders [`NOT_SPECIFIED`].
    pub mitigation: Vec<String>,
}

// ── Building ────────────────────────────────────────────────────────────────

impl Report {
    /// Build the report for a whole set. Never fails; every absent field has
    /// a placeholder.
    pub fn from_set(set: &AnalysisSet) -> Self {
        Self {
            companies: set.entries().iter().map(company_report).collect(),
            comparison: comparison(set),
        }
    }

    /// Companies that have an analysis, in order.
    pub fn present(&self) -> impl Iterator<Item = &CompanyReport> {
        self.companies.iter().filter(|c| c.is_present())
    }
}

/// Report for one set entry.
pub fn company_report(entry: &CompanyEntry) -> CompanyReport {
    match &entry.analysis {
        None => CompanyReport::Missing {
            key: entry.key.clone(),
            notice: format!("No analysis data to display for {}.", entry.key),
            reason: entry.error.as_ref().map(ToString::to_string),
        },
        Some(analysis) => CompanyReport::Present {
            key: entry.key.clone(),
            title: format!(
                "Tariff Impact Analysis: {}",
                analysis.display_name(&entry.key)
            ),
            sections: analysis_sections(analysis),
            warnings: entry.warnings.clone(),
        },
    }
}

/// Sections of one analysis, in display order.
///
/// The summary and both impact tables always appear; qualitative impacts
/// and mitigation only when there is something to say.
pub fn analysis_sections(analysis: &TariffAnalysis) -> Vec<Section> {
    let mut sections = vec![
        Section {
            heading: EXECUTIVE_SUMMARY,
            body: SectionBody::Summary {
                sentiment: analysis
                    .overall_sentiment
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                summary: analysis
                    .summary
                    .clone()
                    .unwrap_or_else(|| NO_SUMMARY.to_string()),
            },
        },
        Section {
            heading: QUARTERLY_IMPACT,
            body: SectionBody::Impacts(analysis.quarterly_impact.iter().map(Into::into).collect()),
        },
        Section {
            heading: FORWARD_GUIDANCE,
            body: SectionBody::Impacts(
                analysis
                    .forward_guidance_impact
                    .iter()
                    .map(Into::into)
                    .collect(),
            ),
        },
    ];

    if let Some(paragraph) = text::qualitative_paragraph(&analysis.qualitative_impacts) {
        sections.push(Section {
            heading: QUALITATIVE_IMPACTS,
            body: SectionBody::Paragraph(paragraph),
        });
    }
    if let Some(sentence) = text::mitigation_sentence(&analysis.mitigation_strategies) {
        sections.push(Section {
            heading: MITIGATION_STRATEGIES,
            body: SectionBody::Paragraph(sentence),
        });
    }
    sections
}

/// Comparison for sets with more than one entry, else `None`.
pub fn comparison(set: &AnalysisSet) -> Option<Comparison> {
    if !set.has_comparison() {
        return None;
    }
    let rows = set
        .analyses()
        .map(|(key, analysis)| ComparisonRow {
            company: analysis.display_name(key).to_string(),
            period_source: set.period_source.clone(),
            impact_summary: text::comparison_summary(analysis, set.year),
            mitigation: analysis.mitigation_strategies.clone(),
        })
        .collect();
    Some(Comparison { rows })
}
