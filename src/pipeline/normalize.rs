//! Normalization: untyped model output → [`TariffAnalysis`].
//!
//! The extraction model is asked for a fixed JSON shape but does not always
//! deliver it. A single finding may come back as an object instead of a
//! one-element list, empty fields may be `null` or missing, and numbers show
//! up where strings were requested. Every such variation is folded here,
//! once, right after parsing; nothing downstream ever sees a
//! `serde_json::Value`.
//!
//! Rules:
//! 1. Strip an outer Markdown code fence (chatty providers add one)
//! 2. Parse JSON; the top level must be an object
//! 3. Impact lists: object → `[object]`, `null`/missing → `[]`,
//!    non-object items dropped
//! 4. String lists: string → `[string]`, `null`/missing → `[]`,
//!    scalars rendered to text
//! 5. Scalars: `null`, missing and blank strings → `None`
//! 6. Sentiment: case-insensitive Positive/Neutral/Negative, else `None`

use crate::analysis::{ImpactEntry, Sentiment, TariffAnalysis};
use crate::error::ItemError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

/// Parse the model's content string into a [`TariffAnalysis`].
pub fn parse_analysis(content: &str) -> Result<TariffAnalysis, ItemError> {
    let json = strip_code_fence(content);
    let value: Value = serde_json::from_str(json).map_err(|e| ItemError::MalformedResponse {
        detail: format!("content is not valid JSON: {}", e),
    })?;
    normalize_analysis(&value)
}

/// Apply the normalization rules to an already-parsed value.
pub fn normalize_analysis(value: &Value) -> Result<TariffAnalysis, ItemError> {
    let obj = value.as_object().ok_or_else(|| ItemError::MalformedResponse {
        detail: "expected a JSON object at the top level".into(),
    })?;

    Ok(TariffAnalysis {
        company_name: text_field(obj, "company_name"),
        quarterly_impact: impact_list(obj, "quarterly_impact"),
        forward_guidance_impact: impact_list(obj, "forward_guidance_impact"),
        qualitative_impacts: string_list(obj, "qualitative_impacts"),
        mitigation_strategies: string_list(obj, "mitigation_strategies"),
        overall_sentiment: text_field(obj, "overall_sentiment")
            .as_deref()
            .and_then(Sentiment::parse),
        summary: text_field(obj, "summary"),
    })
}

// ── Rule 1: Strip outer code fence ──────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*)\n```\s*$").unwrap());

fn strip_code_fence(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => trimmed,
    }
}

// ── Rules 3–5: Field coercion ───────────────────────────────────────────────

/// Render a JSON scalar as display text. Blank strings and `null` → `None`.
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(display_text)
}

fn impact_list(obj: &Map<String, Value>, key: &str) -> Vec<ImpactEntry> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(entry)) => vec![impact_entry(entry)],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(entry) => Some(impact_entry(entry)),
                Value::Null => None,
                other => {
                    warn!("Dropping non-object entry in '{}': {}", key, other);
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!("Ignoring '{}': expected a list, got {}", key, other);
            Vec::new()
        }
    }
}

fn impact_entry(entry: &Map<String, Value>) -> ImpactEntry {
    ImpactEntry {
        metric: text_field(entry, "metric"),
        impact_value: text_field(entry, "impact_value"),
        unit: text_field(entry, "unit"),
        source_quote: text_field(entry, "source_quote"),
    }
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(display_text).collect(),
        Some(single) => display_text(single).into_iter().collect(),
    }
}
