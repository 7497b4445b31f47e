//! Plain-text export for notes records.

use crate::record::NotesExtraction;

/// `Title:`/`Date:`/`From:`/`To:` lines for present fields, a blank line,
/// then the content.
pub fn notes_to_text(record: &NotesExtraction) -> String {
    let mut out = String::new();
    for (label, value) in [
        ("Title", &record.title),
        ("Date", &record.date),
        ("From", &record.from),
        ("To", &record.to),
    ] {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            out.push_str(label);
            out.push_str(": ");
            out.push_str(v);
            out.push('\n');
        }
    }
    out.push('\n');
    out.push_str(&record.content);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lines_only_for_present_fields() {
        let n = NotesExtraction {
            title: Some("Memo".into()),
            to: Some("Team".into()),
            date: Some(String::new()),
            content: "Body\ntext".into(),
            ..Default::default()
        };
        assert_eq!(notes_to_text(&n), "Title: Memo\nTo: Team\n\nBody\ntext");
    }

    #[test]
    fn bare_content_still_gets_leading_blank_line() {
        let n = NotesExtraction {
            content: "x".into(),
            ..Default::default()
        };
        assert_eq!(notes_to_text(&n), "\nx");
    }
}
