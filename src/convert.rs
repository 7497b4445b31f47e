//! Word → PDF conversion.
//!
//! Text only: paragraphs are collected from `word/document.xml` (the
//! `<w:t>` runs of each `<w:p>`, with `<w:br/>` as a line break and
//! `<w:tab/>` as a tab) and laid out by [`crate::export::pdf::text_to_pdf`].
//! Styling, tables as tables, images, headers and footers are not carried over.

use crate::error::ExtractError;
use crate::export::ooxml::{read_part, unescape};
use crate::export::{pdf, write_output};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DOCUMENT_PART: &str = "word/document.xml";

/// A self-closing (empty) paragraph, or a paragraph with its body captured.
static RE_PARAGRAPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*[^/>])?>(.*?)</w:p>").unwrap()
});

static RE_PARAGRAPH_PROPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:pPr(?:\s[^>]*[^/>])?>.*?</w:pPr>").unwrap());

static RE_RUN_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<w:t(?:\s[^>]*[^/>])?>(?P<text>.*?)</w:t>|(?P<brk><w:(?:br|cr)\b[^>]*/>)|(?P<tab><w:tab\b[^>]*/>)",
    )
    .unwrap()
});

fn paragraph_text(body: &str) -> String {
    let body = RE_PARAGRAPH_PROPS.replace_all(body, "");
    let mut text = String::new();
    for part in RE_RUN_PART.captures_iter(&body) {
        if let Some(t) = part.name("text") {
            text.push_str(&unescape(t.as_str()));
        } else if part.name("brk").is_some() {
            text.push('\n');
        } else if part.name("tab").is_some() {
            text.push('\t');
        }
    }
    text
}

/// Body paragraphs of a `.docx` file, in document order. Table cells
/// contribute one paragraph each.
pub fn word_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let xml = read_part(bytes, DOCUMENT_PART)
        .map_err(|e| ExtractError::WordReadFailed(e.to_string()))?;

    let paragraphs: Vec<String> = RE_PARAGRAPH
        .captures_iter(&xml)
        .map(|p| p.get(1).map(|b| paragraph_text(b.as_str())).unwrap_or_default())
        .collect();
    debug!("Read {} paragraph(s) from {}", paragraphs.len(), DOCUMENT_PART);
    Ok(paragraphs)
}

/// The document as plain text, one line per paragraph.
pub fn word_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    Ok(word_paragraphs(bytes)?.join("\n"))
}

/// Convert `.docx` bytes into a PDF titled `title`.
pub fn word_to_pdf(bytes: &[u8], title: &str) -> Result<Vec<u8>, ExtractError> {
    pdf::text_to_pdf(title, &word_to_text(bytes)?)
}

/// Default output path: `input` with its `.docx` extension swapped for `.pdf`.
pub fn pdf_path_for(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

/// Convert the Word file at `input` and write the PDF to `output`.
///
/// Returns the number of bytes written.
pub async fn word_file_to_pdf(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<usize, ExtractError> {
    let input = input.as_ref();
    let is_docx = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    if !is_docx {
        return Err(ExtractError::UnsupportedInput {
            path: input.to_path_buf(),
            reason: "only .docx files can be converted to PDF".into(),
        });
    }

    let bytes = tokio::fs::read(input).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
            path: input.to_path_buf(),
        },
        _ => ExtractError::WordReadFailed(format!("{}: {e}", input.display())),
    })?;

    let title = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let pdf = word_to_pdf(&bytes, title)?;
    info!("Converted {} to PDF", input.display());
    write_output(output.as_ref(), &pdf).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::docx::notes_to_docx;
    use crate::record::NotesExtraction;
    use std::io::Write;

    /// A minimal package holding only the given document body.
    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(DOCUMENT_PART, options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="x"><w:body>{body}</w:body></w:document>"#
        )
        .unwrap();
        zip.finish().unwrap();
        buf.into_inner()
    }

    #[test]
    fn runs_are_joined_per_paragraph() {
        let bytes = docx_with_body(
            r#"<w:p w:rsidR="00A1"><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Fish </w:t></w:r><w:proofErr w:type="spellStart"/><w:r><w:t xml:space="preserve">&amp; chips</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>"#,
        );
        assert_eq!(
            word_paragraphs(&bytes).unwrap(),
            vec!["Fish & chips", "", "a\tb\nc"]
        );
        assert_eq!(word_to_text(&bytes).unwrap(), "Fish & chips\n\na\tb\nc");
    }

    #[test]
    fn empty_text_elements_are_skipped() {
        let bytes = docx_with_body(r#"<w:p><w:r><w:t xml:space="preserve" /></w:r><w:r><w:t>x</w:t></w:r></w:p>"#);
        assert_eq!(word_paragraphs(&bytes).unwrap(), vec!["x"]);
    }

    #[test]
    fn written_notes_read_back() {
        let notes = NotesExtraction {
            title: Some("Q3 <draft>".into()),
            content: "first\nsecond \"quoted\"".into(),
            ..Default::default()
        };
        let bytes = notes_to_docx(&notes).unwrap();
        assert_eq!(
            word_paragraphs(&bytes).unwrap(),
            vec!["Q3 <draft>", "", "first", "second \"quoted\""]
        );
        assert!(word_to_pdf(&bytes, "notes").unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn non_word_bytes_fail() {
        assert!(matches!(
            word_paragraphs(b"plain text"),
            Err(ExtractError::WordReadFailed(_))
        ));
    }

    #[tokio::test]
    async fn converts_a_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("letter.docx");
        let notes = NotesExtraction {
            content: "Dear reader".into(),
            ..Default::default()
        };
        std::fs::write(&input, notes_to_docx(&notes).unwrap()).unwrap();

        let output = pdf_path_for(&input);
        assert_eq!(output, dir.path().join("letter.pdf"));
        let written = word_file_to_pdf(&input, &output).await.unwrap();
        let on_disk = std::fs::read(&output).unwrap();
        assert_eq!(written, on_disk.len());
        assert!(on_disk.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn rejects_other_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.docx");
        assert!(matches!(
            word_file_to_pdf(&missing, dir.path().join("gone.pdf")).await,
            Err(ExtractError::FileNotFound { .. })
        ));
        assert!(matches!(
            word_file_to_pdf(dir.path().join("scan.png"), dir.path().join("x.pdf")).await,
            Err(ExtractError::UnsupportedInput { .. })
        ));
    }
}
