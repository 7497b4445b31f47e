//! Delimited-text export.
//!
//! Sections follow the spreadsheet order and are separated by one blank
//! line; there is no trailing blank line after the last section. Missing
//! table cells are empty here, not `"-"`.

use crate::record::TabularExtraction;
use std::borrow::Cow;

/// Quote a field when it contains a comma, quote or line break.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn pair_line(key: &str, value: &str) -> String {
    format!("{},{}", escape_field(key), escape_field(value))
}

/// Encode a tabular record as CSV text, lines joined with `\n`.
pub fn to_csv(record: &TabularExtraction) -> String {
    let mut sections: Vec<Vec<String>> = Vec::new();

    if !record.metadata.is_empty() {
        sections.push(
            record
                .metadata
                .iter()
                .map(|(k, v)| pair_line(k, v))
                .collect(),
        );
    }

    if !record.table_headers.is_empty() {
        let mut lines = Vec::with_capacity(record.table_data.len() + 1);
        lines.push(
            record
                .table_headers
                .iter()
                .map(|h| escape_field(h))
                .collect::<Vec<_>>()
                .join(","),
        );
        for row in &record.table_data {
            let cells: Vec<String> = record
                .table_headers
                .iter()
                .map(|h| {
                    TabularExtraction::cell(row, h)
                        .map(|v| escape_field(&v.to_string()).into_owned())
                        .unwrap_or_default()
                })
                .collect();
            lines.push(cells.join(","));
        }
        sections.push(lines);
    }

    if !record.summary.is_empty() {
        sections.push(
            record
                .summary
                .iter()
                .map(|(k, v)| pair_line(k, &v.to_string()))
                .collect(),
        );
    }

    if !record.remarks.is_empty() {
        sections.push(
            record
                .remarks
                .iter()
                .map(|(k, v)| pair_line(k, v))
                .collect(),
        );
    }

    sections
        .into_iter()
        .map(|lines| lines.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}
