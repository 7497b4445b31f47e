//! Output types for extraction runs.

use crate::record::{NotesExtraction, Record, TabularExtraction};
use serde::Serialize;

/// One successfully extracted page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// 1-indexed position in the run.
    pub page_num: usize,
    /// Source label ("scan.pdf#2", "photo.jpg").
    pub label: String,
    /// Byte length of the model's raw text answer.
    pub raw_len: usize,
    /// Wall-clock time for the vision call plus parsing.
    pub duration_ms: u64,
    /// Parsed record for this page alone, before merging.
    pub record: Record,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_pages: usize,
    pub total_raw_chars: usize,
    pub total_duration_ms: u64,
}

impl RunStats {
    pub(crate) fn record(&mut self, page: &PageResult) {
        self.total_pages += 1;
        self.total_raw_chars += page.raw_len;
        self.total_duration_ms += page.duration_ms;
    }
}

/// The merged result of a multi-page run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutput {
    /// Merged record across all pages, in page order.
    pub record: Record,
    pub stats: RunStats,
}

impl DocumentOutput {
    pub fn tabular(&self) -> Option<&TabularExtraction> {
        match &self.record {
            Record::Tabular(t) => Some(t),
            Record::Notes(_) => None,
        }
    }

    pub fn notes(&self) -> Option<&NotesExtraction> {
        match &self.record {
            Record::Notes(n) => Some(n),
            Record::Tabular(_) => None,
        }
    }
}
