//! Response parsing: reduce raw model text to a typed record.
//!
//! Vision models are told to answer with a bare JSON object and frequently
//! don't: the object arrives inside a ```` ```json ```` fence, after a
//! sentence of prose, or with raw line breaks and quotes inside strings.
//! Parsing therefore runs in stages:
//!
//! 1. **Isolate** a candidate: first fenced block, else the span from the
//!    first `{` to the last `}`, else the trimmed text itself.
//! 2. **Strict** JSON parse of the candidate into the requested shape.
//! 3. **Repair** (notes shape only): recover `title`/`type`/`date`/`from`/`to`
//!    with anchored patterns and scan `content` by hand, since a regex
//!    cannot tell an unescaped interior quote from the closing one.
//!
//! Nothing is ever synthesised: a field the text does not contain stays
//! absent.

use crate::config::ExtractionMode;
use crate::error::ExtractError;
use crate::record::{NotesExtraction, Record, TabularExtraction};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Parse raw model text into the record shape for `mode`.
pub fn parse(raw: &str, mode: ExtractionMode) -> Result<Record, ExtractError> {
    match mode {
        ExtractionMode::Tabular => parse_tabular(raw).map(Record::Tabular),
        ExtractionMode::Notes => parse_notes(raw).map(Record::Notes),
    }
}

/// Parse raw model text as a [`TabularExtraction`].
///
/// Missing `tableHeaders` / `tableData` default to empty. There is no
/// repair fallback for this shape: a table cannot be recovered field by
/// field.
pub fn parse_tabular(raw: &str) -> Result<TabularExtraction, ExtractError> {
    let candidate = isolate_candidate(raw)?;
    let record: TabularExtraction = parse_strict(candidate)?;
    debug!(
        "Parsed tabular record: {} headers, {} rows",
        record.table_headers.len(),
        record.table_data.len()
    );
    Ok(record)
}

/// Parse raw model text as a [`NotesExtraction`], falling back to repair mode.
pub fn parse_notes(raw: &str) -> Result<NotesExtraction, ExtractError> {
    let candidate = isolate_candidate(raw)?;
    match parse_strict::<NotesExtraction>(candidate) {
        Ok(record) => Ok(record),
        Err(strict_err) => {
            warn!(
                "Strict parse failed ({}), attempting repair of: {}",
                strict_err,
                preview(candidate, 300)
            );
            repair_notes(candidate).ok_or_else(|| {
                ExtractError::unparsable(format!(
                    "no content or title could be recovered ({strict_err})"
                ))
            })
        }
    }
}

// ── Stage 1: candidate isolation ─────────────────────────────────────────

static RE_FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?i:json)?\s*(.*?)```").unwrap());

/// Pick the part of `raw` most likely to be the JSON object.
fn isolate_candidate(raw: &str) -> Result<&str, ExtractError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::unparsable("response text is empty"));
    }

    if let Some(inner) = RE_FENCED_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
        return Ok(inner.as_str().trim());
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return Ok(&trimmed[start..=end]);
        }
    }

    Ok(trimmed)
}

// ── Stage 2: strict parse ────────────────────────────────────────────────

fn parse_strict<T: DeserializeOwned>(candidate: &str) -> Result<T, ExtractError> {
    let value: serde_json::Value = serde_json::from_str(candidate)
        .map_err(|e| ExtractError::unparsable(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ExtractError::unparsable("expected a JSON object"));
    }
    serde_json::from_value(value)
        .map_err(|e| ExtractError::unparsable(format!("unexpected shape: {e}")))
}

// ── Stage 3: repair ──────────────────────────────────────────────────────

/// Short scalar fields recovered by pattern.
const SCALAR_FIELDS: [&str; 5] = ["title", "type", "date", "from", "to"];

static RE_SCALAR_FIELDS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SCALAR_FIELDS
        .iter()
        .map(|field| {
            let pattern = format!(r#"(?i)"{field}"\s*:\s*"((?:[^"\\]|\\.)*)""#);
            (*field, Regex::new(&pattern).unwrap())
        })
        .collect()
});

fn repair_notes(candidate: &str) -> Option<NotesExtraction> {
    let mut record = NotesExtraction::default();

    for (field, re) in RE_SCALAR_FIELDS.iter() {
        let Some(value) = re.captures(candidate).and_then(|c| c.get(1)) else {
            continue;
        };
        let value = Some(unescape_fragment(value.as_str()));
        match *field {
            "title" => record.title = value,
            "type" => record.kind = value,
            "date" => record.date = value,
            "from" => record.from = value,
            "to" => record.to = value,
            _ => {}
        }
    }

    // An empty string recovers nothing
    record.title = record.title.filter(|t| !t.is_empty());
    let content = scan_content(candidate).filter(|c| !c.is_empty());
    if content.is_none() && record.title.is_none() {
        return None;
    }
    debug!(
        "Repaired notes record: title={}, content={} chars",
        record.title.is_some(),
        content.as_ref().map_or(0, |c| c.chars().count())
    );
    record.content = content.unwrap_or_default();
    Some(record)
}

const CONTENT_KEY: &str = "\"content\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingKey,
    SeekingValueStart,
    InValue,
    ValueEnded,
}

/// Recover the `content` string by hand.
///
/// The value ends at the first unescaped quote whose next non-whitespace
/// character is `,` or `}`. Interior quotes and raw newlines are kept. An
/// unterminated value (truncated response) is not recovered.
fn scan_content(candidate: &str) -> Option<String> {
    let mut state = ScanState::SeekingKey;
    let mut pos = 0usize;
    let mut value = String::new();

    loop {
        match state {
            ScanState::SeekingKey => {
                let at = candidate[pos..].find(CONTENT_KEY)?;
                pos += at + CONTENT_KEY.len();
                state = ScanState::SeekingValueStart;
            }
            ScanState::SeekingValueStart => {
                let rest = &candidate[pos..];
                let after_ws = rest.trim_start();
                let Some(after_colon) = after_ws.strip_prefix(':') else {
                    // `"content"` was a value, not a key; keep looking.
                    state = ScanState::SeekingKey;
                    continue;
                };
                let after_colon_ws = after_colon.trim_start();
                if !after_colon_ws.starts_with('"') {
                    state = ScanState::SeekingKey;
                    continue;
                }
                pos += rest.len() - after_colon_ws.len() + 1;
                state = ScanState::InValue;
            }
            ScanState::InValue => {
                let mut escaped = false;
                let mut ended = false;
                for (offset, c) in candidate[pos..].char_indices() {
                    if escaped {
                        value.push(c);
                        escaped = false;
                        continue;
                    }
                    match c {
                        '\\' => {
                            value.push(c);
                            escaped = true;
                        }
                        '"' if closes_value(&candidate[pos + offset + 1..]) => {
                            ended = true;
                            break;
                        }
                        _ => value.push(c),
                    }
                }
                if !ended {
                    return None;
                }
                state = ScanState::ValueEnded;
            }
            ScanState::ValueEnded => return Some(unescape_fragment(&value)),
        }
    }
}

fn closes_value(rest: &str) -> bool {
    matches!(rest.trim_start().chars().next(), Some(',') | Some('}'))
}

/// Decode JSON string escapes in a recovered fragment.
///
/// Raw control characters pass through; unknown escapes are kept verbatim.
fn unescape_fragment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => out.push(decoded),
                    _ => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
