//! Multi-page merge: fold per-page records into one document record.
//!
//! Both mergers are explicit left folds. The first page seeds the
//! accumulator verbatim and every later page is folded in with its 1-based
//! page number, which is what the metadata prefix and the notes separator
//! are keyed on. Pages must therefore arrive in order, one at a time.
//!
//! # Tabular policy
//!
//! | field | policy |
//! |---|---|
//! | `tableHeaders` | first non-empty wins |
//! | `tableData` | appended in page order, no de-duplication |
//! | `metadata` | page *n* ≥ 2 keys are inserted as `File{n}_{key}` |
//! | `summary` | numeric sum, only for keys already numeric in the accumulator |
//! | `remarks` | last page wins per key |
//!
//! # Notes policy
//!
//! `content` is concatenated with a `--- Document {n} ---` separator;
//! scalar fields come from the last page.

use crate::config::ExtractionMode;
use crate::error::ExtractError;
use crate::record::{NotesExtraction, Record, TabularExtraction};
use tracing::debug;

/// Separator placed before the content of page `page_num` (1-based).
pub fn notes_separator(page_num: usize) -> String {
    format!("\n\n--- Document {page_num} ---\n\n")
}

/// Prefixed metadata key for page `page_num` (1-based).
pub fn metadata_key(page_num: usize, key: &str) -> String {
    format!("File{page_num}_{key}")
}

// ── Tabular ──────────────────────────────────────────────────────────────

/// Streaming accumulator for tabular records.
#[derive(Debug, Default)]
pub struct TabularMerger {
    acc: Option<TabularExtraction>,
    pages: usize,
}

impl TabularMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages folded in so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Fold in the next page.
    pub fn push(&mut self, record: TabularExtraction) {
        self.pages += 1;
        let page_num = self.pages;
        match self.acc.as_mut() {
            None => self.acc = Some(record),
            Some(acc) => fold_tabular(acc, record, page_num),
        }
    }

    /// The merged record, or [`ExtractError::EmptyInput`] if nothing was pushed.
    pub fn finish(self) -> Result<TabularExtraction, ExtractError> {
        self.acc.ok_or(ExtractError::EmptyInput)
    }
}

fn fold_tabular(acc: &mut TabularExtraction, page: TabularExtraction, page_num: usize) {
    if acc.table_headers.is_empty() {
        acc.table_headers = page.table_headers;
    }

    let rows = page.table_data.len();
    acc.table_data.extend(page.table_data);

    for (key, value) in page.metadata {
        acc.metadata.insert(metadata_key(page_num, &key), value);
    }

    for (key, value) in &page.summary {
        if let Some(current) = acc.summary.get_mut(key) {
            if let Some(sum) = current.checked_add(value) {
                *current = sum;
            }
        }
    }

    for (key, value) in page.remarks {
        acc.remarks.insert(key, value);
    }

    debug!(
        "Merged page {}: +{} rows ({} total)",
        page_num,
        rows,
        acc.table_data.len()
    );
}

/// Merge tabular records given in page order.
pub fn merge_all(
    records: impl IntoIterator<Item = TabularExtraction>,
) -> Result<TabularExtraction, ExtractError> {
    let mut merger = TabularMerger::new();
    for record in records {
        merger.push(record);
    }
    merger.finish()
}

// ── Notes ────────────────────────────────────────────────────────────────

/// Streaming accumulator for notes records.
#[derive(Debug, Default)]
pub struct NotesMerger {
    acc: Option<NotesExtraction>,
    pages: usize,
}

impl NotesMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn push(&mut self, record: NotesExtraction) {
        self.pages += 1;
        let page_num = self.pages;
        match self.acc.as_mut() {
            None => self.acc = Some(record),
            Some(acc) => {
                acc.content.push_str(&notes_separator(page_num));
                acc.content.push_str(&record.content);
                acc.title = record.title;
                acc.kind = record.kind;
                acc.date = record.date;
                acc.from = record.from;
                acc.to = record.to;
            }
        }
    }

    pub fn finish(self) -> Result<NotesExtraction, ExtractError> {
        self.acc.ok_or(ExtractError::EmptyInput)
    }
}

/// Merge notes records given in page order.
pub fn merge_all_notes(
    records: impl IntoIterator<Item = NotesExtraction>,
) -> Result<NotesExtraction, ExtractError> {
    let mut merger = NotesMerger::new();
    for record in records {
        merger.push(record);
    }
    merger.finish()
}

// ── Either shape ─────────────────────────────────────────────────────────

/// Accumulator for whichever record shape a run produces.
#[derive(Debug)]
pub enum DocumentMerger {
    Tabular(TabularMerger),
    Notes(NotesMerger),
}

impl DocumentMerger {
    pub fn for_mode(mode: ExtractionMode) -> Self {
        match mode {
            ExtractionMode::Tabular => DocumentMerger::Tabular(TabularMerger::new()),
            ExtractionMode::Notes => DocumentMerger::Notes(NotesMerger::new()),
        }
    }

    /// Fold in the next page; the record must match the merger's shape.
    pub fn push(&mut self, record: Record) -> Result<(), ExtractError> {
        match (self, record) {
            (DocumentMerger::Tabular(m), Record::Tabular(r)) => m.push(r),
            (DocumentMerger::Notes(m), Record::Notes(r)) => m.push(r),
            (_, other) => {
                return Err(ExtractError::Internal(format!(
                    "cannot merge a {} record into this run",
                    other.mode_name()
                )))
            }
        }
        Ok(())
    }

    pub fn pages(&self) -> usize {
        match self {
            DocumentMerger::Tabular(m) => m.pages(),
            DocumentMerger::Notes(m) => m.pages(),
        }
    }

    pub fn finish(self) -> Result<Record, ExtractError> {
        match self {
            DocumentMerger::Tabular(m) => m.finish().map(Record::Tabular),
            DocumentMerger::Notes(m) => m.finish().map(Record::Notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Row, Scalar};
    use indexmap::IndexMap;

    fn row(cells: &[(&str, &str)]) -> Row {
        cells.iter().map(|(k, v)| (k.to_string(), Scalar::from(*v))).collect()
    }

    fn table(headers: &[&str], rows: Vec<Row>) -> TabularExtraction {
        TabularExtraction {
            table_headers: headers.iter().map(|h| h.to_string()).collect(),
            table_data: rows,
            ..Default::default()
        }
    }

    fn text_map(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn first_page_headers_win_and_rows_append() {
        let merged = merge_all(vec![
            table(&["A", "B"], vec![row(&[("A", "1"), ("B", "2")])]),
            table(&["X", "Y"], vec![row(&[("X", "9"), ("Y", "8")])]),
        ])
        .unwrap();
        assert_eq!(merged.table_headers, vec!["A", "B"]);
        assert_eq!(merged.table_data.len(), 2);
        assert_eq!(merged.table_data[0]["A"], Scalar::from("1"));
        assert_eq!(merged.table_data[1]["X"], Scalar::from("9"));
    }

    #[test]
    fn headers_adopted_from_first_non_empty_page() {
        let merged = merge_all(vec![
            table(&[], vec![]),
            table(&["Subject", "Score"], vec![]),
            table(&["Other"], vec![]),
        ])
        .unwrap();
        assert_eq!(merged.table_headers, vec!["Subject", "Score"]);
    }

    #[test]
    fn metadata_is_prefixed_per_page() {
        let mut p1 = table(&[], vec![]);
        p1.metadata = text_map(&[("Name", "x")]);
        let mut p2 = p1.clone();
        let mut p3 = p1.clone();
        p2.metadata = text_map(&[("Name", "y")]);
        p3.metadata = text_map(&[("Name", "z"), ("Class", "5B")]);

        let merged = merge_all(vec![p1, p2, p3]).unwrap();
        let keys: Vec<&str> = merged.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Name", "File2_Name", "File3_Name", "File3_Class"]);
        assert_eq!(merged.metadata["Name"], "x");
        assert_eq!(merged.metadata["File2_Name"], "y");
    }

    #[test]
    fn summary_sums_only_existing_numeric_keys() {
        let mut acc = table(&[], vec![]);
        acc.summary.insert("Total".into(), Scalar::from(10_i64));
        acc.summary.insert("Grade".into(), Scalar::from("A"));
        let mut page = table(&[], vec![]);
        page.summary.insert("Total".into(), Scalar::from(5_i64));
        page.summary.insert("Extra".into(), Scalar::from(3_i64));
        page.summary.insert("Grade".into(), Scalar::from(4_i64));

        let merged = merge_all(vec![acc, page]).unwrap();
        assert_eq!(merged.summary.len(), 2);
        assert_eq!(merged.summary["Total"], Scalar::from(15_i64));
        assert_eq!(merged.summary["Grade"], Scalar::from("A"));
        assert!(!merged.summary.contains_key("Extra"));
    }

    #[test]
    fn summary_mixes_integers_and_floats() {
        let mut acc = table(&[], vec![]);
        acc.summary.insert("Average".into(), Scalar::from(70_i64));
        let mut page = table(&[], vec![]);
        page.summary.insert("Average".into(), Scalar::from(2.5));
        let merged = merge_all(vec![acc, page]).unwrap();
        assert_eq!(merged.summary["Average"].to_string(), "72.5");
    }

    #[test]
    fn remarks_last_page_wins() {
        let mut p1 = table(&[], vec![]);
        p1.remarks = text_map(&[("Note", "first"), ("Keep", "me")]);
        let mut p2 = table(&[], vec![]);
        p2.remarks = text_map(&[("Note", "second")]);
        let merged = merge_all(vec![p1, p2]).unwrap();
        assert_eq!(merged.remarks["Note"], "second");
        assert_eq!(merged.remarks["Keep"], "me");
    }

    #[test]
    fn single_page_is_returned_verbatim() {
        let mut p = table(&["A"], vec![row(&[("A", "1")])]);
        p.metadata = text_map(&[("Name", "x")]);
        assert_eq!(merge_all(vec![p.clone()]).unwrap(), p);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(merge_all(Vec::new()), Err(ExtractError::EmptyInput)));
        assert!(matches!(merge_all_notes(Vec::new()), Err(ExtractError::EmptyInput)));
    }

    fn note(content: &str, title: Option<&str>, date: Option<&str>) -> NotesExtraction {
        NotesExtraction {
            content: content.into(),
            title: title.map(Into::into),
            date: date.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn notes_content_joined_with_document_separator() {
        let merged = merge_all_notes(vec![
            note("one", Some("First"), Some("2024-01-01")),
            note("two", None, None),
            note("three", Some("Last"), None),
        ])
        .unwrap();
        assert_eq!(
            merged.content,
            "one\n\n--- Document 2 ---\n\ntwo\n\n--- Document 3 ---\n\nthree"
        );
        assert_eq!(merged.title.as_deref(), Some("Last"));
        // Last page wins even when it has no value
        assert_eq!(merged.date, None);
    }

    #[test]
    fn merger_counts_pages() {
        let mut merger = NotesMerger::new();
        merger.push(note("a", None, None));
        merger.push(note("b", None, None));
        assert_eq!(merger.pages(), 2);
        assert_eq!(merger.finish().unwrap().content, "a\n\n--- Document 2 ---\n\nb");
    }

    #[test]
    fn document_merger_rejects_mixed_shapes() {
        let mut merger = DocumentMerger::for_mode(ExtractionMode::Tabular);
        merger.push(Record::Tabular(table(&["A"], vec![]))).unwrap();
        let err = merger.push(Record::Notes(note("x", None, None))).unwrap_err();
        assert!(matches!(err, ExtractError::Internal(_)));
        assert_eq!(merger.pages(), 1);
        assert!(matches!(merger.finish().unwrap(), Record::Tabular(_)));
    }
}
