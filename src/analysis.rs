//! Typed extraction results and the per-batch result set.
//!
//! Everything in this module is already normalized: the untyped JSON from
//! the extraction service never gets past [`crate::pipeline::normalize`].
//! Optional scalars stay `None` here; placeholders such as "N/A" are a
//! rendering concern and live in [`crate::report`].

use crate::error::ItemError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Company sentiment regarding tariffs, as judged by the extraction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Case-insensitive parse; anything outside the three labels is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        };
        f.write_str(s)
    }
}

/// One financial effect explicitly attributed to tariffs.
///
/// Values are display text. The model is free to answer `"+5%"`, `5` or
/// `0.05`; all of them are kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactEntry {
    pub metric: Option<String>,
    pub impact_value: Option<String>,
    pub unit: Option<String>,
    pub source_quote: Option<String>,
}

/// Structured tariff commentary for one company.
///
/// `quarterly_impact` and `forward_guidance_impact` are empty, never absent,
/// when the document holds no tariff-attributable figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffAnalysis {
    pub company_name: Option<String>,
    pub quarterly_impact: Vec<ImpactEntry>,
    pub forward_guidance_impact: Vec<ImpactEntry>,
    pub qualitative_impacts: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    pub overall_sentiment: Option<Sentiment>,
    pub summary: Option<String>,
}

impl TariffAnalysis {
    /// Name to show for this company: the extracted name, else `key`.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.company_name.as_deref().unwrap_or(key)
    }
}

/// Outcome of the pipeline for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyEntry {
    /// Ticker or filename-derived name.
    pub key: String,
    /// `None` when acquisition or extraction failed.
    pub analysis: Option<TariffAnalysis>,
    /// The failure that left `analysis` empty, if any.
    pub error: Option<ItemError>,
    /// Non-fatal notices, e.g. PDF pages that could not be read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// All results of one fetch/upload action.
///
/// Entries keep insertion order. The set is built once per batch and then
/// only read; exporters take `&AnalysisSet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSet {
    /// Label shown in the comparison's "Period / Source" column.
    pub period_source: String,
    /// Base year; guidance is labelled `FY{year + 1}`.
    pub year: i32,
    entries: Vec<CompanyEntry>,
}

impl AnalysisSet {
    pub fn new(period_source: impl Into<String>, year: i32) -> Self {
        Self {
            period_source: period_source.into(),
            year,
            entries: Vec::new(),
        }
    }

    /// Insert or replace the entry for `entry.key`.
    ///
    /// A repeated key keeps its original position, like a map that
    /// remembers insertion order.
    pub fn insert(&mut self, entry: CompanyEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CompanyEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CompanyEntry] {
        &self.entries
    }

    /// Companies with a usable analysis, in insertion order.
    pub fn analyses(&self) -> impl Iterator<Item = (&str, &TariffAnalysis)> {
        self.entries
            .iter()
            .filter_map(|e| e.analysis.as_ref().map(|a| (e.key.as_str(), a)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that carry an analysis.
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.analysis.is_some()).count()
    }

    /// The comparison view only exists for multi-company batches.
    pub fn has_comparison(&self) -> bool {
        self.entries.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(key: &str) -> CompanyEntry {
        CompanyEntry {
            key: key.into(),
            analysis: Some(TariffAnalysis::default()),
            error: None,
            warnings: vec![],
        }
    }

    #[test]
    fn sentiment_parse_is_case_insensitive() {
        assert_eq!(Sentiment::parse("negative"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::parse(" Positive "), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("NEUTRAL"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::parse("Mixed"), None);
    }

    #[test]
    fn insert_keeps_order_and_replaces_in_place() {
        let mut set = AnalysisSet::new("Uploaded Docs", 2025);
        set.insert(ok("AAPL"));
        set.insert(ok("MSFT"));
        set.insert(CompanyEntry {
            key: "AAPL".into(),
            analysis: None,
            error: Some(ItemError::EmptyText),
            warnings: vec![],
        });

        let keys: Vec<&str> = set.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["AAPL", "MSFT"]);
        assert!(set.get("AAPL").unwrap().analysis.is_none());
        assert_eq!(set.success_count(), 1);
    }

    #[test]
    fn analyses_skip_failed_entries() {
        let mut set = AnalysisSet::new("2025 Q2 / Earnings Call", 2025);
        set.insert(ok("A"));
        set.insert(CompanyEntry {
            key: "B".into(),
            analysis: None,
            error: Some(ItemError::EmptyText),
            warnings: vec![],
        });
        set.insert(ok("C"));

        let keys: Vec<&str> = set.analyses().map(|(k, _)| k).collect();
        assert_eq!(keys, ["A", "C"]);
        assert!(set.has_comparison());
    }

    #[test]
    fn display_name_falls_back_to_key() {
        let mut a = TariffAnalysis::default();
        assert_eq!(a.display_name("ACME"), "ACME");
        a.company_name = Some("Acme Corp".into());
        assert_eq!(a.display_name("ACME"), "Acme Corp");
    }
}
