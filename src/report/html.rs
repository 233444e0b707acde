//! HTML rendering of the report model.
//!
//! Every piece of document-derived text goes through [`html_escape`] before
//! it reaches markup. Line breaks inside cells become `<br>` only after
//! escaping.

use super::{
    Comparison, CompanyReport, ImpactRow, Report, Section, SectionBody, BRAND_TITLE,
    COMPARISON_COLUMNS, COMPARISON_HEADING, COMPARISON_TABLE_HEADING, IMPACT_COLUMNS,
    NOT_SPECIFIED, NO_COMPARISON_DATA, NO_IMPACTS, SENTIMENT_LABEL,
};
use std::fmt::Write;

const STYLESHEET: &str = r#"
body { font-family: 'Poppins', 'Segoe UI', Helvetica, Arial, sans-serif; color: #1e1e1e; margin: 0; padding: 2rem 3rem; }
h1, h2, h3 { font-weight: 600; color: #1e1e1e; }
.brand-header { display: flex; justify-content: space-between; align-items: center; padding-bottom: 1rem; border-bottom: 2px solid #f0f2f6; margin-bottom: 2rem; }
.brand-title { font-size: 2rem; font-weight: 700; }
.brand-logo img { height: 40px; object-fit: contain; }
.report-card { background: #ffffff; border: 1px solid #e0e0e0; border-left: 5px solid #00416A; border-radius: 8px; padding: 20px; margin-bottom: 20px; box-shadow: 0 2px 4px rgba(0,0,0,0.05); }
.report-card h3 { margin-top: 0; color: #00416A; }
.report-card table { width: 100%; border-collapse: collapse; }
.report-card th, .report-card td { padding: 10px 15px; text-align: left; border-bottom: 1px solid #e0e0e0; vertical-align: top; }
.report-card th { background: #f9f9f9; }
.report-card ul { padding-left: 20px; margin-top: 0; }
.notice { background: #fff8e1; border: 1px solid #ffe082; border-radius: 8px; padding: 12px 16px; margin-bottom: 20px; }
.generated { color: #777; font-size: 0.85rem; }
hr { border: none; border-top: 1px solid #e0e0e0; margin: 2rem 0; }
"#;

/// Escape HTML special characters: `& < > " '`.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Escape, then turn `'\n'` into `<br>`.
fn escape_lines(s: &str) -> String {
    s.split('\n')
        .map(html_escape)
        .collect::<Vec<_>>()
        .join("<br>")
}

// `write!` into a `String` cannot fail; results are discarded with `let _`.

fn impact_table(out: &mut String, rows: &[ImpactRow]) {
    if rows.is_empty() {
        let _ = write!(out, "<p><i>{}</i></p>", NO_IMPACTS);
        return;
    }
    out.push_str("<table><thead><tr>");
    for col in IMPACT_COLUMNS {
        let _ = write!(out, "<th>{}</th>", col);
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row.cells() {
            let _ = write!(out, "<td>{}</td>", html_escape(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn section(out: &mut String, section: &Section) {
    let _ = write!(out, "<div class=\"report-card\"><h3>{}</h3>", section.heading);
    match &section.body {
        SectionBody::Summary { sentiment, summary } => {
            let _ = write!(
                out,
                "<p><strong>{}</strong> {}</p><p>{}</p>",
                SENTIMENT_LABEL,
                html_escape(sentiment),
                escape_lines(summary)
            );
        }
        SectionBody::Impacts(rows) => impact_table(out, rows),
        SectionBody::Paragraph(text) => {
            let _ = write!(out, "<p>{}</p>", escape_lines(text));
        }
    }
    out.push_str("</div>\n");
}

/// HTML for one company, as shown in the app view.
pub fn company_fragment(report: &CompanyReport) -> String {
    let mut out = String::new();
    match report {
        CompanyReport::Missing { notice, reason, .. } => {
            let _ = write!(out, "<div class=\"notice\"><p>{}</p>", html_escape(notice));
            if let Some(reason) = reason {
                let _ = write!(out, "<p>{}</p>", html_escape(reason));
            }
            out.push_str("</div>\n");
        }
        CompanyReport::Present {
            title,
            sections,
            warnings,
            ..
        } => {
            let _ = writeln!(out, "<h2>{}</h2>", html_escape(title));
            for w in warnings {
                let _ = writeln!(out, "<div class=\"notice\"><p>{}</p></div>", html_escape(w));
            }
            for s in sections {
                section(&mut out, s);
            }
        }
    }
    out
}

/// HTML for the comparison block.
pub fn comparison_fragment(cmp: &Comparison) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<h2>{}</h2>", COMPARISON_HEADING);
    if cmp.rows.is_empty() {
        let _ = writeln!(out, "<div class=\"notice\"><p>{}</p></div>", NO_COMPARISON_DATA);
        return out;
    }

    let _ = write!(
        out,
        "<div class=\"report-card\"><h3>{}</h3><table><thead><tr>",
        COMPARISON_TABLE_HEADING
    );
    for col in COMPARISON_COLUMNS {
        let _ = write!(out, "<th>{}</th>", col);
    }
    out.push_str("</tr></thead><tbody>");
    for row in &cmp.rows {
        let _ = write!(
            out,
            "<tr><td><strong>{}</strong></td><td>{}</td><td>{}</td><td>",
            html_escape(&row.company),
            html_escape(&row.period_source),
            escape_lines(&row.impact_summary)
        );
        if row.mitigation.is_empty() {
            out.push_str(NOT_SPECIFIED);
        } else {
            out.push_str("<ul>");
            for m in &row.mitigation {
                let _ = write!(out, "<li>{}</li>", html_escape(m));
            }
            out.push_str("</ul>");
        }
        out.push_str("</td></tr>");
    }
    out.push_str("</tbody></table></div>\n");
    out
}

/// Self-contained HTML document for export.
///
/// Companies without an analysis are left out. `logo_base64` is a PNG
/// already encoded for a data URI.
pub fn render_document(report: &Report, logo_base64: Option<&str>, generated_at: &str) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{css}</style>\n</head>\n<body>\n\
         <div class=\"brand-header\"><div class=\"brand-title\">{title}</div>",
        title = BRAND_TITLE,
        css = STYLESHEET
    );
    if let Some(logo) = logo_base64 {
        let _ = write!(
            out,
            "<div class=\"brand-logo\"><img src=\"data:image/png;base64,{}\" alt=\"Logo\"></div>",
            logo
        );
    }
    out.push_str("</div>\n");
    let _ = writeln!(
        out,
        "<p class=\"generated\">Generated {}</p>",
        html_escape(generated_at)
    );

    for company in report.present() {
        out.push_str(&company_fragment(company));
        out.push_str("<hr>\n");
    }
    if let Some(cmp) = &report.comparison {
        out.push_str(&comparison_fragment(cmp));
    }
    out.push_str("</body>\n</html>\n");
    out
}
