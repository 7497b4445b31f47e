//! Export adapters: merged record → file bytes.
//!
//! | format | tabular | notes | MIME |
//! |---|---|---|---|
//! | [`ExportFormat::Spreadsheet`] | `extracted-data.xlsx` | n/a | spreadsheetml |
//! | [`ExportFormat::Word`] | `extracted-data.docx` | `extracted-notes.docx` | wordprocessingml |
//! | [`ExportFormat::Csv`] | `extracted-data.csv` | n/a | `text/csv` |
//! | [`ExportFormat::PlainText`] | n/a | `extracted-text.txt` | `text/plain` |
//! | [`ExportFormat::Pdf`] | n/a | `extracted-notes.pdf` | `application/pdf` |
//!
//! Every adapter is total over valid records: empty maps drop their
//! section, empty headers drop the table, missing cells render as `"-"`
//! (or empty in CSV).

pub mod csv;
pub mod docx;
pub(crate) mod ooxml;
pub mod pdf;
pub mod text;
pub mod xlsx;

use crate::config::ExtractionMode;
use crate::error::ExtractError;
use crate::record::{NotesExtraction, Record, TabularExtraction};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Target file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Spreadsheet,
    Word,
    Csv,
    PlainText,
    Pdf,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Csv => "text/csv",
            ExportFormat::PlainText => "text/plain",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::Word => "docx",
            ExportFormat::Csv => "csv",
            ExportFormat::PlainText => "txt",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Suggested download name for this format in `mode`.
    pub fn default_filename(&self, mode: ExtractionMode) -> &'static str {
        match (mode, self) {
            (ExtractionMode::Notes, ExportFormat::Word) => "extracted-notes.docx",
            (_, ExportFormat::PlainText) => "extracted-text.txt",
            (_, ExportFormat::Spreadsheet) => "extracted-data.xlsx",
            (_, ExportFormat::Word) => "extracted-data.docx",
            (_, ExportFormat::Csv) => "extracted-data.csv",
            (_, ExportFormat::Pdf) => "extracted-notes.pdf",
        }
    }

    /// Whether records of `mode` can be written in this format.
    pub fn supports(&self, mode: ExtractionMode) -> bool {
        matches!(
            (mode, self),
            (ExtractionMode::Tabular, ExportFormat::Spreadsheet)
                | (ExtractionMode::Tabular, ExportFormat::Csv)
                | (_, ExportFormat::Word)
                | (ExtractionMode::Notes, ExportFormat::PlainText)
                | (ExtractionMode::Notes, ExportFormat::Pdf)
        )
    }

    fn unsupported(&self, mode: ExtractionMode) -> ExtractError {
        ExtractError::UnsupportedExport {
            format: self.to_string(),
            mode: mode.to_string(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            "docx" | "word" => Ok(ExportFormat::Word),
            "csv" => Ok(ExportFormat::Csv),
            "txt" | "text" => Ok(ExportFormat::PlainText),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ExtractError::InvalidConfig(format!(
                "unknown export format '{other}' (expected xlsx, docx, csv, txt or pdf)"
            ))),
        }
    }
}

/// Encode a tabular record.
pub fn export_tabular(
    record: &TabularExtraction,
    format: ExportFormat,
) -> Result<Vec<u8>, ExtractError> {
    match format {
        ExportFormat::Spreadsheet => xlsx::to_xlsx(record),
        ExportFormat::Word => docx::tabular_to_docx(record),
        ExportFormat::Csv => Ok(csv::to_csv(record).into_bytes()),
        ExportFormat::PlainText | ExportFormat::Pdf => {
            Err(format.unsupported(ExtractionMode::Tabular))
        }
    }
}

/// Encode a notes record.
pub fn export_notes(record: &NotesExtraction, format: ExportFormat) -> Result<Vec<u8>, ExtractError> {
    match format {
        ExportFormat::PlainText => Ok(text::notes_to_text(record).into_bytes()),
        ExportFormat::Word => docx::notes_to_docx(record),
        ExportFormat::Pdf => pdf::notes_to_pdf(record),
        ExportFormat::Spreadsheet | ExportFormat::Csv => {
            Err(format.unsupported(ExtractionMode::Notes))
        }
    }
}

/// Encode either record shape.
pub fn export(record: &Record, format: ExportFormat) -> Result<Vec<u8>, ExtractError> {
    match record {
        Record::Tabular(t) => export_tabular(t, format),
        Record::Notes(n) => export_notes(n, format),
    }
}

/// Encode `record` and write it to `path` (temp file + rename).
///
/// Parent directories are created. Returns the number of bytes written.
pub async fn export_to_file(
    record: &Record,
    format: ExportFormat,
    path: impl AsRef<Path>,
) -> Result<usize, ExtractError> {
    let bytes = export(record, format)?;
    write_output(path.as_ref(), &bytes).await
}

/// Write `bytes` to `path` through a sibling temp file, creating parents.
pub(crate) async fn write_output(path: &Path, bytes: &[u8]) -> Result<usize, ExtractError> {
    let write_err = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_path_for(path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes.len())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
