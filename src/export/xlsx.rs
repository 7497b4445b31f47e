//! Spreadsheet export: one worksheet named "Extracted Data".
//!
//! Layout, top to bottom, each section omitted when empty:
//!
//! 1. metadata: bold label in column A, value in B
//! 2. table: styled header row, then one row per entry (`"-"` for missing cells)
//! 3. summary: like metadata
//! 4. remarks: bold label on one row, text on the next
//!
//! Two blank rows separate sections. Column A is 20 wide, the rest 15.
//! Placement is computed first ([`layout`]) and handed to `rust_xlsxwriter`
//! afterwards.

use super::ooxml::clean_text;
use crate::error::ExtractError;
use crate::record::{Scalar, TabularExtraction, MISSING_CELL};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};

pub const SHEET_NAME: &str = "Extracted Data";

const FIRST_COLUMN_WIDTH: f64 = 20.0;
const COLUMN_WIDTH: f64 = 15.0;
const HEADER_FILL: u32 = 0x4472C4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellStyle {
    Plain,
    Label,
    Header,
    Data,
}

#[derive(Debug, Clone, PartialEq)]
enum CellValue {
    Text(String),
    Number(f64),
}

impl From<&Scalar> for CellValue {
    fn from(s: &Scalar) -> Self {
        match s.as_number().and_then(|n| n.as_f64()) {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(s.to_string()),
        }
    }
}

/// One placed cell, 0-based row and column.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    row: u32,
    col: u16,
    value: CellValue,
    style: CellStyle,
}

#[derive(Debug, Default)]
struct Placement {
    cells: Vec<Cell>,
    columns: u16,
}

impl Placement {
    fn put(&mut self, row: u32, col: usize, value: CellValue, style: CellStyle) {
        let col = u16::try_from(col).unwrap_or(u16::MAX);
        self.columns = self.columns.max(col.saturating_add(1));
        self.cells.push(Cell {
            row,
            col,
            value,
            style,
        });
    }

    fn text(&mut self, row: u32, col: usize, text: &str, style: CellStyle) {
        self.put(row, col, CellValue::Text(text.to_string()), style);
    }
}

fn layout(record: &TabularExtraction) -> Placement {
    let mut out = Placement::default();
    let mut row = 0u32;

    if !record.metadata.is_empty() {
        for (key, value) in &record.metadata {
            out.text(row, 0, key, CellStyle::Label);
            out.text(row, 1, value, CellStyle::Plain);
            row += 1;
        }
        row += 2;
    }

    if !record.table_headers.is_empty() {
        for (col, header) in record.table_headers.iter().enumerate() {
            out.text(row, col, header, CellStyle::Header);
        }
        row += 1;

        for data in &record.table_data {
            for (col, header) in record.table_headers.iter().enumerate() {
                let value = TabularExtraction::cell(data, header)
                    .map(CellValue::from)
                    .unwrap_or_else(|| CellValue::Text(MISSING_CELL.into()));
                out.put(row, col, value, CellStyle::Data);
            }
            row += 1;
        }
        row += 2;
    }

    if !record.summary.is_empty() {
        for (key, value) in &record.summary {
            out.text(row, 0, key, CellStyle::Label);
            out.put(row, 1, CellValue::from(value), CellStyle::Plain);
            row += 1;
        }
        row += 2;
    }

    for (key, value) in &record.remarks {
        out.text(row, 0, key, CellStyle::Label);
        row += 1;
        out.text(row, 0, value, CellStyle::Plain);
        row += 2;
    }

    out
}

fn xlsx_err(e: XlsxError) -> ExtractError {
    ExtractError::Export(format!("xlsx: {e}"))
}

/// Encode a tabular record as an `.xlsx` workbook.
pub fn to_xlsx(record: &TabularExtraction) -> Result<Vec<u8>, ExtractError> {
    let placement = layout(record);

    let plain = Format::new();
    let label = Format::new().set_bold();
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    let data = Format::new()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_err)?;

    for col in 0..placement.columns {
        let width = if col == 0 { FIRST_COLUMN_WIDTH } else { COLUMN_WIDTH };
        sheet.set_column_width(col, width).map_err(xlsx_err)?;
    }

    for cell in &placement.cells {
        let format = match cell.style {
            CellStyle::Plain => &plain,
            CellStyle::Label => &label,
            CellStyle::Header => &header,
            CellStyle::Data => &data,
        };
        match &cell.value {
            CellValue::Text(t) => {
                sheet.write_string_with_format(cell.row, cell.col, clean_text(t), format)
            }
            CellValue::Number(n) => sheet.write_number_with_format(cell.row, cell.col, *n, format),
        }
        .map_err(xlsx_err)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ooxml::read_part;
    use crate::record::Row;

    fn sample() -> TabularExtraction {
        let mut r = TabularExtraction::default();
        r.metadata.insert("Name".into(), "Ada".into());
        r.table_headers = vec!["Subject".into(), "Score".into()];
        let mut row = Row::new();
        row.insert("Subject".into(), Scalar::from("Maths"));
        row.insert("Score".into(), Scalar::from(91_i64));
        r.table_data.push(row);
        let mut partial = Row::new();
        partial.insert("Subject".into(), Scalar::from("Art"));
        r.table_data.push(partial);
        r.summary.insert("Total".into(), Scalar::from(91_i64));
        r.remarks.insert("Teacher".into(), "Good work".into());
        r
    }

    fn at(p: &Placement, row: u32, col: u16) -> &Cell {
        p.cells
            .iter()
            .find(|c| c.row == row && c.col == col)
            .unwrap()
    }

    #[test]
    fn sections_are_laid_out_in_order() {
        let p = layout(&sample());
        let mut rows: Vec<u32> = p.cells.iter().map(|c| c.row).collect();
        rows.dedup();
        // metadata 0, gap, header 3, data 4-5, gap, summary 8, gap, remark 11-12
        assert_eq!(rows, vec![0, 3, 4, 5, 8, 11, 12]);
        assert_eq!(at(&p, 0, 0).style, CellStyle::Label);
        assert_eq!(at(&p, 3, 0).value, CellValue::Text("Subject".into()));
        assert_eq!(at(&p, 3, 0).style, CellStyle::Header);
        assert_eq!(at(&p, 4, 1).value, CellValue::Number(91.0));
        assert_eq!(at(&p, 5, 1).value, CellValue::Text("-".into()));
        assert_eq!(at(&p, 12, 0).value, CellValue::Text("Good work".into()));
        assert_eq!(p.columns, 2);
    }

    #[test]
    fn empty_sections_leave_no_rows() {
        let mut r = TabularExtraction::default();
        r.table_headers = vec!["A".into()];
        let p = layout(&r);
        assert_eq!(p.cells.len(), 1);
        assert_eq!(p.cells[0].row, 0);

        assert!(layout(&TabularExtraction::default()).cells.is_empty());
        assert!(to_xlsx(&TabularExtraction::default()).is_ok());
    }

    #[test]
    fn text_summary_values_stay_text() {
        assert_eq!(
            CellValue::from(&Scalar::from("n/a")),
            CellValue::Text("n/a".into())
        );
    }

    #[test]
    fn workbook_parts_are_present() {
        let bytes = to_xlsx(&sample()).unwrap();
        let workbook = read_part(&bytes, "xl/workbook.xml").unwrap();
        assert!(workbook.contains(r#"name="Extracted Data""#));

        let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml").unwrap();
        assert!(sheet.contains(r#"width="20"#));
        assert!(sheet.contains(r#"width="15"#));

        let strings = read_part(&bytes, "xl/sharedStrings.xml").unwrap();
        assert!(strings.contains("Maths"));
        assert!(strings.contains("Good work"));

        let styles = read_part(&bytes, "xl/styles.xml").unwrap();
        assert!(styles.contains("4472C4"));
    }
}
