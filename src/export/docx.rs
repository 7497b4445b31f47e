//! Word export for both record shapes, built with `docx-rs`.

use super::ooxml::clean_text;
use crate::error::ExtractError;
use crate::record::{NotesExtraction, TabularExtraction};
use docx_rs::{
    AlignmentType, BreakType, Docx, LineSpacing, Paragraph, Run, Shading, Style, StyleType,
    Table, TableCell, TableRow, WidthType,
};
use std::io::Cursor;

const HEADER_FILL: &str = "4472C4";
const HEADING_STYLE: &str = "Heading2";
/// Title size for notes documents, in half-points (16pt).
const TITLE_HALF_POINTS: usize = 32;
/// Usable page width in twips for an A4 page with 1" margins.
const TEXT_WIDTH_TWIPS: usize = 9026;

/// A run of text; embedded line breaks become explicit breaks.
fn run(text: &str) -> Run {
    let text = clean_text(text);
    let mut run = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line.trim_end_matches('\r'));
    }
    run
}

fn spaced(after: u32) -> LineSpacing {
    LineSpacing::new().after(after)
}

/// Bold `key: ` followed by the plain value.
fn label_value(key: &str, value: &str) -> Paragraph {
    Paragraph::new()
        .add_run(run(&format!("{key}: ")).bold())
        .add_run(run(value))
        .line_spacing(spaced(100))
}

fn heading(text: &str) -> Paragraph {
    Paragraph::new()
        .add_run(run(text))
        .style(HEADING_STYLE)
        .line_spacing(spaced(200))
}

fn table(record: &TabularExtraction) -> Table {
    let col_width = TEXT_WIDTH_TWIPS / record.table_headers.len().max(1);

    let header = TableRow::new(
        record
            .table_headers
            .iter()
            .map(|h| {
                TableCell::new()
                    .width(col_width, WidthType::Dxa)
                    .shading(Shading::new().fill(HEADER_FILL))
                    .add_paragraph(
                        Paragraph::new()
                            .add_run(run(h).bold())
                            .align(AlignmentType::Center),
                    )
            })
            .collect(),
    );

    let rows = record.table_data.iter().map(|row| {
        TableRow::new(
            record
                .table_headers
                .iter()
                .map(|h| {
                    let value = TabularExtraction::display_cell(row, h);
                    TableCell::new()
                        .width(col_width, WidthType::Dxa)
                        .add_paragraph(
                            Paragraph::new()
                                .add_run(run(&value))
                                .align(AlignmentType::Center),
                        )
                })
                .collect(),
        )
    });

    Table::new(std::iter::once(header).chain(rows).collect())
        .set_grid(vec![col_width; record.table_headers.len()])
}

fn document() -> Docx {
    Docx::new().add_style(
        Style::new(HEADING_STYLE, StyleType::Paragraph)
            .name("Heading 2")
            .bold()
            .size(26)
            .color("2F5496"),
    )
}

fn pack(docx: Docx) -> Result<Vec<u8>, ExtractError> {
    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| ExtractError::Export(format!("docx: {e}")))?;
    Ok(buf.into_inner())
}

/// Encode a tabular record as a `.docx` document.
pub fn tabular_to_docx(record: &TabularExtraction) -> Result<Vec<u8>, ExtractError> {
    let mut docx = document();

    if !record.metadata.is_empty() {
        for (key, value) in &record.metadata {
            docx = docx.add_paragraph(label_value(key, value));
        }
        docx = docx.add_paragraph(Paragraph::new().line_spacing(spaced(200)));
    }

    if !record.table_headers.is_empty() {
        docx = docx
            .add_table(table(record))
            .add_paragraph(Paragraph::new().line_spacing(spaced(300)));
    }

    if !record.summary.is_empty() {
        docx = docx.add_paragraph(heading("Summary"));
        for (key, value) in &record.summary {
            docx = docx.add_paragraph(label_value(key, &value.to_string()));
        }
        docx = docx.add_paragraph(Paragraph::new().line_spacing(spaced(200)));
    }

    if !record.remarks.is_empty() {
        docx = docx.add_paragraph(heading("Remarks"));
        for (key, value) in &record.remarks {
            docx = docx
                .add_paragraph(
                    Paragraph::new()
                        .add_run(run(&format!("{key}:")).bold())
                        .line_spacing(spaced(100)),
                )
                .add_paragraph(Paragraph::new().add_run(run(value)).line_spacing(spaced(200)));
        }
    }

    pack(docx)
}

/// Encode a notes record as a `.docx` document, one paragraph per content line.
pub fn notes_to_docx(record: &NotesExtraction) -> Result<Vec<u8>, ExtractError> {
    let mut docx = document();

    if let Some(title) = record.title.as_deref().filter(|t| !t.is_empty()) {
        docx = docx.add_paragraph(
            Paragraph::new().add_run(run(title).bold().size(TITLE_HALF_POINTS)),
        );
    }

    let header_lines: Vec<String> = [
        ("Date", &record.date),
        ("From", &record.from),
        ("To", &record.to),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| format!("{label}: {v}"))
    })
    .collect();

    if !header_lines.is_empty() {
        docx = docx.add_paragraph(Paragraph::new());
        for line in &header_lines {
            docx = docx.add_paragraph(Paragraph::new().add_run(run(line)));
        }
    }

    docx = docx.add_paragraph(Paragraph::new());
    for line in record.content.split('\n') {
        docx = docx.add_paragraph(Paragraph::new().add_run(run(line)));
    }

    pack(docx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::word_paragraphs;
    use crate::export::ooxml::read_part;
    use crate::record::{Row, Scalar};

    #[test]
    fn tabular_sections_in_order() {
        let mut r = TabularExtraction::default();
        r.metadata.insert("Student".into(), "Ada & Co".into());
        r.table_headers = vec!["Subject".into(), "Score".into()];
        let mut row = Row::new();
        row.insert("Subject".into(), Scalar::from("Maths"));
        r.table_data.push(row);
        r.summary.insert("Total".into(), Scalar::from(91_i64));
        r.remarks.insert("Teacher".into(), "Well done".into());

        let bytes = tabular_to_docx(&r).unwrap();
        let paragraphs: Vec<String> = word_paragraphs(&bytes)
            .unwrap()
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        assert_eq!(
            paragraphs,
            vec![
                "Student: Ada & Co",
                "Subject",
                "Score",
                "Maths",
                // Missing Score cell renders as the placeholder
                "-",
                "Summary",
                "Total: 91",
                "Remarks",
                "Teacher:",
                "Well done",
            ]
        );

        let xml = read_part(&bytes, "word/document.xml").unwrap();
        assert!(xml.contains(HEADER_FILL));
        assert!(xml.contains("<w:tbl"));
        assert!(xml.contains(HEADING_STYLE));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let bytes = tabular_to_docx(&TabularExtraction::default()).unwrap();
        assert!(word_paragraphs(&bytes).unwrap().is_empty());

        let mut only_summary = TabularExtraction::default();
        only_summary.summary.insert("Total".into(), Scalar::from(1_i64));
        let bytes = tabular_to_docx(&only_summary).unwrap();
        let xml = read_part(&bytes, "word/document.xml").unwrap();
        assert!(!xml.contains("<w:tbl"));
        assert!(!xml.contains("Remarks"));
    }

    #[test]
    fn notes_layout() {
        let n = NotesExtraction {
            title: Some("Memo".into()),
            content: "Line 1\nLine 2".into(),
            date: Some("2024-01-01".into()),
            ..Default::default()
        };
        let bytes = notes_to_docx(&n).unwrap();
        assert_eq!(
            word_paragraphs(&bytes).unwrap(),
            vec!["Memo", "", "Date: 2024-01-01", "", "Line 1", "Line 2"]
        );
        let xml = read_part(&bytes, "word/document.xml").unwrap();
        assert!(xml.contains(r#"w:val="32""#));
    }

    #[test]
    fn notes_without_header_fields_skip_first_blank() {
        let n = NotesExtraction {
            content: "only".into(),
            ..Default::default()
        };
        let bytes = notes_to_docx(&n).unwrap();
        assert_eq!(word_paragraphs(&bytes).unwrap(), vec!["", "only"]);
    }

    #[test]
    fn embedded_breaks_and_control_characters() {
        let mut r = TabularExtraction::default();
        r.remarks.insert("Note".into(), "two\nlines\u{0007}".into());
        let bytes = tabular_to_docx(&r).unwrap();
        let paragraphs = word_paragraphs(&bytes).unwrap();
        assert!(paragraphs.contains(&"two\nlines".to_string()));
    }
}
