//! Sentence-level text helpers shared by every renderer.

use crate::analysis::{ImpactEntry, TariffAnalysis};

/// Placeholder for a missing scalar.
pub const NOT_AVAILABLE: &str = "N/A";

/// Join items as English prose.
///
/// One item is returned as-is, two are joined with "and", three or more use
/// commas with a final ", and".
///
/// ```rust
/// use tariff_tracker::report::text::join_natural;
///
/// assert_eq!(join_natural(&["A"]), "A");
/// assert_eq!(join_natural(&["A", "B"]), "A and B");
/// assert_eq!(join_natural(&["A", "B", "C"]), "A, B, and C");
/// ```
pub fn join_natural<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [a, b] => format!("{} and {}", a.as_ref(), b.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// `"The company is mitigating tariff impacts through strategies including …."`
///
/// `None` when there are no strategies.
pub fn mitigation_sentence(strategies: &[String]) -> Option<String> {
    if strategies.is_empty() {
        return None;
    }
    Some(format!(
        "The company is mitigating tariff impacts through strategies including {}.",
        join_natural(strategies)
    ))
}

/// Qualitative impacts as one flowing paragraph.
pub fn qualitative_paragraph(impacts: &[String]) -> Option<String> {
    if impacts.is_empty() {
        None
    } else {
        Some(impacts.join(" "))
    }
}

/// `"metric: value; metric: value"` with `N/A` for missing parts.
fn impact_pairs(entries: &[ImpactEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "{}: {}",
                e.metric.as_deref().unwrap_or(NOT_AVAILABLE),
                e.impact_value.as_deref().unwrap_or(NOT_AVAILABLE)
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Text of the comparison's "Tariff Impact Summary" cell.
///
/// A `Q2 Impact:` line when quarterly figures exist, a `FY{year + 1}
/// Guidance:` line when guidance exists, joined by `'\n'`. Renderers turn
/// the newline into their own line break.
pub fn comparison_summary(analysis: &TariffAnalysis, year: i32) -> String {
    let mut lines = Vec::with_capacity(2);
    if !analysis.quarterly_impact.is_empty() {
        lines.push(format!("Q2 Impact: {}", impact_pairs(&analysis.quarterly_impact)));
    }
    if !analysis.forward_guidance_impact.is_empty() {
        lines.push(format!(
            "FY{} Guidance: {}",
            year + 1,
            impact_pairs(&analysis.forward_guidance_impact)
        ));
    }
    if lines.is_empty() {
        "No specific impact mentioned.".to_string()
    } else {
        lines.join("\n")
    }
}
