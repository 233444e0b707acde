//! Plain-text rendering for the terminal.

use super::{
    Comparison, CompanyReport, Report, SectionBody, COMPARISON_HEADING, COMPARISON_TABLE_HEADING,
    IMPACT_COLUMNS, NOT_SPECIFIED, NO_COMPARISON_DATA, NO_IMPACTS, SENTIMENT_LABEL,
};
use std::fmt::Write;

const RULE: &str = "────────────────────────────────────────────────────────────";

/// Render one company block.
pub fn company_text(report: &CompanyReport) -> String {
    let mut out = String::new();
    match report {
        CompanyReport::Missing { notice, reason, .. } => {
            let _ = writeln!(out, "! {}", notice);
            if let Some(reason) = reason {
                let _ = writeln!(out, "  {}", reason);
            }
        }
        CompanyReport::Present {
            title,
            sections,
            warnings,
            ..
        } => {
            let _ = writeln!(out, "{}\n{}", title, "=".repeat(title.chars().count()));
            for w in warnings {
                let _ = writeln!(out, "! {}", w);
            }
            for s in sections {
                let _ = writeln!(out, "\n## {}", s.heading);
                match &s.body {
                    SectionBody::Summary { sentiment, summary } => {
                        let _ = writeln!(out, "{} {}\n{}", SENTIMENT_LABEL, sentiment, summary);
                    }
                    SectionBody::Impacts(rows) if rows.is_empty() => {
                        let _ = writeln!(out, "{}", NO_IMPACTS);
                    }
                    SectionBody::Impacts(rows) => {
                        for row in rows {
                            let cells = row.cells();
                            let _ = writeln!(
                                out,
                                "- {}: {} ({}: {})",
                                cells[0], cells[1], IMPACT_COLUMNS[2], cells[2]
                            );
                            let _ = writeln!(out, "  \"{}\"", cells[3]);
                        }
                    }
                    SectionBody::Paragraph(text) => {
                        let _ = writeln!(out, "{}", text);
                    }
                }
            }
        }
    }
    out
}

/// Render the comparison block.
pub fn comparison_text(cmp: &Comparison) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n{}", COMPARISON_HEADING, "=".repeat(COMPARISON_HEADING.len()));
    if cmp.rows.is_empty() {
        let _ = writeln!(out, "{}", NO_COMPARISON_DATA);
        return out;
    }
    let _ = writeln!(out, "\n## {}", COMPARISON_TABLE_HEADING);
    for row in &cmp.rows {
        let _ = writeln!(out, "\n{} [{}]", row.company, row.period_source);
        for line in row.impact_summary.lines() {
            let _ = writeln!(out, "  {}", line);
        }
        if row.mitigation.is_empty() {
            let _ = writeln!(out, "  Mitigation: {}", NOT_SPECIFIED);
        } else {
            let _ = writeln!(out, "  Mitigation:");
            for m in &row.mitigation {
                let _ = writeln!(out, "    • {}", m);
            }
        }
    }
    out
}

/// Whole report, companies separated by rules.
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    for company in &report.companies {
        out.push_str(&company_text(company));
        let _ = writeln!(out, "\n{}\n", RULE);
    }
    if let Some(cmp) = &report.comparison {
        out.push_str(&comparison_text(cmp));
    }
    out
}
