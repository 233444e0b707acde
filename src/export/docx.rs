//! DOCX writer for the report model.
//!
//! Word needs heading styles and a bullet numbering definition declared up
//! front; both are registered once in [`document`]. All text enters the
//! document through [`run`], which drops what XML 1.0 cannot carry.

use crate::error::TrackerError;
use crate::report::{
    Comparison, CompanyReport, ImpactRow, Report, SectionBody, BRAND_TITLE, COMPARISON_COLUMNS,
    COMPARISON_HEADING, COMPARISON_TABLE_HEADING, IMPACT_COLUMNS, NOT_SPECIFIED,
    NO_COMPARISON_DATA, NO_IMPACTS, SENTIMENT_LABEL,
};
use docx_rs::{
    AbstractNumbering, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat, Numbering,
    NumberingId, Paragraph, Run, SpecialIndentType, Start, Style, StyleType, Table, TableCell,
    TableRow,
};
use std::borrow::Cow;
use std::io::Cursor;

const BULLET_ID: usize = 1;

// Half-points.
const TITLE_SIZE: usize = 40;
const HEADING1_SIZE: usize = 32;
const HEADING2_SIZE: usize = 26;

fn styles(docx: Docx) -> Docx {
    docx.add_style(
        Style::new("Title", StyleType::Paragraph)
            .name("Title")
            .size(TITLE_SIZE)
            .bold(),
    )
    .add_style(
        Style::new("Heading1", StyleType::Paragraph)
            .name("Heading 1")
            .size(HEADING1_SIZE)
            .bold(),
    )
    .add_style(
        Style::new("Heading2", StyleType::Paragraph)
            .name("Heading 2")
            .size(HEADING2_SIZE)
            .bold()
            .color("00416A"),
    )
}

fn bullets(docx: Docx) -> Docx {
    docx.add_abstract_numbering(
        AbstractNumbering::new(BULLET_ID).add_level(
            Level::new(
                0,
                Start::new(1),
                NumberFormat::new("bullet"),
                LevelText::new("•"),
                LevelJc::new("left"),
            )
            .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
        ),
    )
    .add_numbering(Numbering::new(BULLET_ID, BULLET_ID))
}

fn is_xml_illegal(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

/// Text with XML 1.0 illegal characters removed.
///
/// Control characters (pdfium emits form feeds at page breaks) become
/// spaces so neighbouring words stay apart; U+FFFE and U+FFFF are dropped.
/// Tab, newline and carriage return are kept.
fn xml_text(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_xml_illegal) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.chars()
            .filter_map(|c| match c {
                '\u{FFFE}' | '\u{FFFF}' => None,
                c if is_xml_illegal(c) => Some(' '),
                c => Some(c),
            })
            .collect(),
    )
}

fn run(text: &str) -> Run {
    Run::new().add_text(xml_text(text))
}

fn heading(text: &str, style: &str) -> Paragraph {
    Paragraph::new().add_run(run(text)).style(style)
}

fn text(text: &str) -> Paragraph {
    Paragraph::new().add_run(run(text))
}

fn italic(text: &str) -> Paragraph {
    Paragraph::new().add_run(run(text).italic())
}

fn bold(text: &str) -> Paragraph {
    Paragraph::new().add_run(run(text).bold())
}

fn bullet(text: &str) -> Paragraph {
    Paragraph::new()
        .add_run(run(text))
        .numbering(NumberingId::new(BULLET_ID), IndentLevel::new(0))
}

fn header_row(columns: &[&str]) -> TableRow {
    TableRow::new(
        columns
            .iter()
            .map(|c| TableCell::new().add_paragraph(bold(c)))
            .collect(),
    )
}

fn impact_table(rows: &[ImpactRow]) -> Table {
    let mut table_rows = vec![header_row(&IMPACT_COLUMNS)];
    table_rows.extend(rows.iter().map(|row| {
        TableRow::new(
            row.cells()
                .iter()
                .map(|cell| TableCell::new().add_paragraph(text(cell)))
                .collect(),
        )
    }));
    Table::new(table_rows).set_grid(vec![2000, 1400, 1000, 4600])
}

fn company(mut docx: Docx, report: &CompanyReport) -> Docx {
    let CompanyReport::Present {
        title,
        sections,
        warnings,
        ..
    } = report
    else {
        return docx;
    };

    docx = docx.add_paragraph(heading(title, "Heading1"));
    for w in warnings {
        docx = docx.add_paragraph(italic(w));
    }
    for section in sections {
        docx = docx.add_paragraph(heading(section.heading, "Heading2"));
        docx = match &section.body {
            SectionBody::Summary { sentiment, summary } => docx
                .add_paragraph(
                    Paragraph::new()
                        .add_run(run(SENTIMENT_LABEL).bold())
                        .add_run(run(&format!(" {}", sentiment))),
                )
                .add_paragraph(text(summary)),
            SectionBody::Impacts(rows) if rows.is_empty() => docx.add_paragraph(italic(NO_IMPACTS)),
            SectionBody::Impacts(rows) => docx.add_table(impact_table(rows)),
            SectionBody::Paragraph(p) => docx.add_paragraph(text(p)),
        };
    }
    docx
}

fn comparison(docx: Docx, cmp: &Comparison) -> Docx {
    let docx = docx.add_paragraph(heading(COMPARISON_HEADING, "Heading1"));
    if cmp.rows.is_empty() {
        return docx.add_paragraph(italic(NO_COMPARISON_DATA));
    }

    let mut rows = vec![header_row(&COMPARISON_COLUMNS)];
    for row in &cmp.rows {
        let mut summary = TableCell::new();
        for line in row.impact_summary.lines() {
            summary = summary.add_paragraph(text(line));
        }
        let mut mitigation = TableCell::new();
        if row.mitigation.is_empty() {
            mitigation = mitigation.add_paragraph(text(NOT_SPECIFIED));
        } else {
            for m in &row.mitigation {
                mitigation = mitigation.add_paragraph(bullet(m));
            }
        }
        rows.push(TableRow::new(vec![
            TableCell::new().add_paragraph(bold(&row.company)),
            TableCell::new().add_paragraph(text(&row.period_source)),
            summary,
            mitigation,
        ]));
    }

    docx.add_paragraph(heading(COMPARISON_TABLE_HEADING, "Heading2"))
        .add_table(Table::new(rows).set_grid(vec![1800, 1800, 3200, 2200]))
}

/// Assemble the document without serializing it.
pub fn document(report: &Report, generated_at: &str) -> Docx {
    let mut docx = bullets(styles(Docx::new()))
        .add_paragraph(heading(BRAND_TITLE, "Title"))
        .add_paragraph(italic(&format!("Generated {}", generated_at)));

    for c in report.present() {
        docx = company(docx, c);
    }
    if let Some(cmp) = &report.comparison {
        docx = comparison(docx, cmp);
    }
    docx
}

/// Serialize the report as DOCX bytes.
pub fn render(report: &Report, generated_at: &str) -> Result<Vec<u8>, TrackerError> {
    let mut buf = Cursor::new(Vec::new());
    document(report, generated_at)
        .build()
        .pack(&mut buf)
        .map_err(|e| TrackerError::ExportFailed {
            format: "DOCX",
            detail: e.to_string(),
        })?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisSet, CompanyEntry, ImpactEntry, TariffAnalysis};
    use std::io::Read;

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn render_produces_zip_container() {
        let mut set = AnalysisSet::new("Uploaded Docs", 2025);
        set.insert(CompanyEntry {
            key: "ACME".into(),
            analysis: Some(TariffAnalysis {
                mitigation_strategies: vec!["Dual sourcing".into()],
                ..Default::default()
            }),
            error: None,
            warnings: vec![],
        });
        let bytes = render(&Report::from_set(&set), "2025-06-01 10:00").unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn xml_text_replaces_control_characters() {
        assert!(matches!(xml_text("plain\ttext\n"), Cow::Borrowed(_)));
        assert_eq!(xml_text("page one\u{0C}page two"), "page one page two");
        assert_eq!(xml_text("a\u{0}b\u{1F}c"), "a b c");
        assert_eq!(xml_text("x\u{FFFE}y\u{FFFF}"), "xy");
    }

    #[test]
    fn control_characters_never_reach_document_xml() {
        let mut set = AnalysisSet::new("Uploaded Docs", 2025);
        set.insert(CompanyEntry {
            key: "ACME\u{7}".into(),
            analysis: Some(TariffAnalysis {
                summary: Some("Tariffs\u{0C}page two\u{0B}".into()),
                quarterly_impact: vec![ImpactEntry {
                    metric: Some("COGS".into()),
                    impact_value: Some("+5%".into()),
                    unit: None,
                    source_quote: Some("costs rose\u{0C}5%".into()),
                }],
                mitigation_strategies: vec!["Dual\u{1}sourcing".into()],
                ..Default::default()
            }),
            error: None,
            warnings: vec![],
        });
        set.insert(CompanyEntry {
            key: "BETA".into(),
            analysis: Some(TariffAnalysis::default()),
            error: None,
            warnings: vec![],
        });

        let bytes = render(&Report::from_set(&set), "2025-06-01 10:00").unwrap();
        let xml = document_xml(&bytes);
        let bad: Vec<char> = xml.chars().filter(|c| is_xml_illegal(*c)).collect();
        assert!(bad.is_empty(), "illegal characters in document.xml: {:?}", bad);
        assert!(xml.contains("Tariffs page two"));
        assert!(xml.contains("costs rose 5%"));
        assert!(xml.contains("Dual sourcing"));
    }
}
