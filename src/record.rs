//! Extraction records: the structured shapes a page is reduced to.
//!
//! Two shapes exist, one per extraction mode:
//!
//! * [`TabularExtraction`]: mark sheets, invoices, result sheets: a header
//!   block, one table, aggregates and comments.
//! * [`NotesExtraction`]: letters, memos, handwritten notes: a few scalar
//!   fields and one free-text body.
//!
//! Maps keep insertion order ([`IndexMap`]) because exports list labels in
//! the order the model returned them. Label lookup itself is
//! order-insensitive.
//!
//! Deserialisation is lenient where models are sloppy: a number or boolean
//! given for a string field is kept as its text, and `null` table cells are
//! treated as missing. Nothing is invented.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Placeholder rendered for a table cell the row does not carry.
pub const MISSING_CELL: &str = "-";

// ── Scalar ───────────────────────────────────────────────────────────────

/// A table cell or summary value: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn as_number(&self) -> Option<&serde_json::Number> {
        match self {
            Scalar::Number(n) => Some(n),
            Scalar::Text(_) => None,
        }
    }

    /// Sum two numbers, keeping integers exact.
    ///
    /// Returns `None` when either side is text or the float result is not finite.
    pub fn checked_add(&self, other: &Scalar) -> Option<Scalar> {
        let (a, b) = (self.as_number()?, other.as_number()?);
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            if let Some(sum) = x.checked_add(y) {
                return Some(Scalar::Number(sum.into()));
            }
        }
        let sum = a.as_f64()? + b.as_f64()?;
        serde_json::Number::from_f64(sum).map(Scalar::Number)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => match n.as_f64() {
                // Whole floats print without a trailing ".0"
                Some(v) if n.is_f64() && v.fract() == 0.0 && v.abs() < 1e15 => {
                    write!(f, "{}", v as i64)
                }
                _ => write!(f, "{n}"),
            },
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n.into())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(Scalar::Number)
            .unwrap_or_else(|| Scalar::Text(n.to_string()))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        scalar_from_value(value)
            .ok_or_else(|| serde::de::Error::custom("expected a string or number, found null"))
    }
}

/// Map a JSON value onto a scalar; `null` has no scalar form.
fn scalar_from_value(value: serde_json::Value) -> Option<Scalar> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::Number(n) => Some(Scalar::Number(n)),
        Value::String(s) => Some(Scalar::Text(s)),
        Value::Bool(b) => Some(Scalar::Text(b.to_string())),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(Scalar::Text(nested.to_string())),
    }
}

fn text_from_value(value: serde_json::Value) -> Option<String> {
    scalar_from_value(value).map(|s| s.to_string())
}

// ── Lenient field deserialisers ─────────────────────────────────────────

fn lenient_text_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| text_from_value(v).map(|v| (k, v)))
        .collect())
}

fn lenient_scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, Scalar>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_from_value(v).map(|v| (k, v)))
        .collect())
}

fn lenient_rows<'de, D>(deserializer: D) -> Result<Vec<Row>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<IndexMap<String, serde_json::Value>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(k, v)| scalar_from_value(v).map(|v| (k, v)))
                .collect()
        })
        .collect())
}

fn lenient_headers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(text_from_value)
        .collect())
}

fn lenient_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(text_from_value))
}

// ── TabularExtraction ───────────────────────────────────────────────────

/// One table row: header name → cell value. Absent keys are missing cells.
pub type Row = IndexMap<String, Scalar>;

/// Result of the "table" extraction mode.
///
/// `table_headers` and `table_data` are always present (possibly empty);
/// the three maps may be empty, which exports treat as "section absent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularExtraction {
    #[serde(default, deserialize_with = "lenient_text_map", skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,

    #[serde(default, deserialize_with = "lenient_headers")]
    pub table_headers: Vec<String>,

    #[serde(default, deserialize_with = "lenient_rows")]
    pub table_data: Vec<Row>,

    #[serde(default, deserialize_with = "lenient_scalar_map", skip_serializing_if = "IndexMap::is_empty")]
    pub summary: IndexMap<String, Scalar>,

    #[serde(default, deserialize_with = "lenient_text_map", skip_serializing_if = "IndexMap::is_empty")]
    pub remarks: IndexMap<String, String>,
}

impl TabularExtraction {
    /// Cell for `header` in `row`, or `None` when the row lacks it.
    pub fn cell<'a>(row: &'a Row, header: &str) -> Option<&'a Scalar> {
        row.get(header)
    }

    /// Display text for a cell: the value, or [`MISSING_CELL`].
    pub fn display_cell(row: &Row, header: &str) -> String {
        row.get(header)
            .map(|v| v.to_string())
            .unwrap_or_else(|| MISSING_CELL.to_string())
    }

    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
            && self.table_headers.is_empty()
            && self.table_data.is_empty()
            && self.summary.is_empty()
            && self.remarks.is_empty()
    }
}

// ── NotesExtraction ─────────────────────────────────────────────────────

/// Result of the "notes/letters" extraction mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotesExtraction {
    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Full text body; line breaks are real `\n` characters once parsed.
    pub content: String,

    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

// ── Record ──────────────────────────────────────────────────────────────

/// A parsed extraction result of either shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Tabular(TabularExtraction),
    Notes(NotesExtraction),
}

impl Record {
    pub fn into_tabular(self) -> Option<TabularExtraction> {
        match self {
            Record::Tabular(t) => Some(t),
            Record::Notes(_) => None,
        }
    }

    pub fn into_notes(self) -> Option<NotesExtraction> {
        match self {
            Record::Notes(n) => Some(n),
            Record::Tabular(_) => None,
        }
    }

    /// Short name of the shape, used in log lines and error messages.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Record::Tabular(_) => "tabular",
            Record::Notes(_) => "notes",
        }
    }
}

impl From<TabularExtraction> for Record {
    fn from(t: TabularExtraction) -> Self {
        Record::Tabular(t)
    }
}

impl From<NotesExtraction> for Record {
    fn from(n: NotesExtraction) -> Self {
        Record::Notes(n)
    }
}
