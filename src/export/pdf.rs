//! Text-only PDF output: notes records and converted Word documents.
//!
//! A4 pages, builtin Helvetica. Lines are placed first (distance from the
//! top edge, in mm) and drawn with `printpdf` afterwards. A new page starts
//! when the cursor has passed the bottom limit before a line is drawn.
//! Builtin fonts only cover WinAnsi; other characters do not render.

use crate::error::ExtractError;
use crate::record::NotesExtraction;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::BufWriter;
use tracing::debug;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LAYER: &str = "Text";

#[derive(Debug, Clone, Copy)]
struct PageStyle {
    left: f32,
    top: f32,
    bottom: f32,
    font_size: f32,
    line_height: f32,
    wrap_chars: usize,
}

/// 20mm margins, 10pt body.
const NOTES: PageStyle = PageStyle {
    left: 20.0,
    top: 20.0,
    bottom: PAGE_HEIGHT - 20.0,
    font_size: 10.0,
    line_height: 6.0,
    wrap_chars: 96,
};
const TITLE_SIZE: f32 = 16.0;
const TITLE_ADVANCE: f32 = 10.0;
const HEADER_GAP: f32 = 4.0;

/// 10mm margins, 16pt body.
const PLAIN: PageStyle = PageStyle {
    left: 10.0,
    top: 10.0,
    bottom: 280.0,
    font_size: 16.0,
    line_height: 7.0,
    wrap_chars: 63,
};

#[derive(Debug, Clone, PartialEq)]
struct Line {
    text: String,
    size: f32,
    bold: bool,
    x: f32,
    y: f32,
}

struct Layout {
    style: PageStyle,
    pages: Vec<Vec<Line>>,
    current: Vec<Line>,
    y: f32,
}

impl Layout {
    fn new(style: PageStyle) -> Self {
        Self {
            style,
            pages: Vec::new(),
            current: Vec::new(),
            y: style.top,
        }
    }

    fn line(&mut self, text: &str, size: f32, bold: bool, advance: f32) {
        if self.y > self.style.bottom {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = self.style.top;
        }
        // Blank lines only move the cursor
        if !text.is_empty() {
            self.current.push(Line {
                text: text.to_string(),
                size,
                bold,
                x: self.style.left,
                y: self.y,
            });
        }
        self.y += advance;
    }

    fn body_line(&mut self, text: &str) {
        let (size, advance) = (self.style.font_size, self.style.line_height);
        self.line(text, size, false, advance);
    }

    fn wrapped(&mut self, text: &str) {
        for line in wrap_text(text, self.style.wrap_chars) {
            self.body_line(&line);
        }
    }

    fn finish(self) -> Vec<Vec<Line>> {
        let Layout {
            mut pages, current, ..
        } = self;
        pages.push(current);
        pages
    }
}

/// Greedy word wrap by character count. Words longer than a line are split.
/// Empty input gives one empty line.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0usize;

    for word in text.split_whitespace().flat_map(|w| split_long(w, max_chars)) {
        let len = word.chars().count();
        if width > 0 && width + 1 + len > max_chars {
            lines.push(std::mem::take(&mut current));
            width = 0;
        }
        if width > 0 {
            current.push(' ');
            width += 1;
        }
        current.push_str(word);
        width += len;
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_long(word: &str, max_chars: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in word.char_indices().enumerate() {
        if count > 0 && count % max_chars == 0 {
            parts.push(&word[start..idx]);
            start = idx;
        }
    }
    parts.push(&word[start..]);
    parts
}

fn notes_layout(record: &NotesExtraction) -> Vec<Vec<Line>> {
    let mut layout = Layout::new(NOTES);

    if let Some(title) = record.title.as_deref().filter(|t| !t.is_empty()) {
        layout.line(title, TITLE_SIZE, true, TITLE_ADVANCE);
    }
    for (label, value) in [
        ("Date", &record.date),
        ("From", &record.from),
        ("To", &record.to),
    ] {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            layout.body_line(&format!("{label}: {v}"));
        }
    }
    layout.y += HEADER_GAP;

    for line in record.content.split('\n') {
        layout.wrapped(line.trim_end_matches('\r'));
    }
    layout.finish()
}

fn text_layout(text: &str) -> Vec<Vec<Line>> {
    let mut layout = Layout::new(PLAIN);
    for line in text.lines() {
        layout.wrapped(line);
    }
    layout.finish()
}

fn pdf_err(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Export(format!("pdf: {e}"))
}

fn render(title: &str, pages: &[Vec<Line>]) -> Result<Vec<u8>, ExtractError> {
    let (doc, page1, layer1) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;

    let mut first = Some((page1, layer1));
    for lines in pages {
        let (page, layer) = match first.take() {
            Some(indices) => indices,
            None => doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER),
        };
        let layer = doc.get_page(page).get_layer(layer);
        for line in lines {
            let font = if line.bold { &bold } else { &regular };
            layer.use_text(
                line.text.as_str(),
                line.size,
                Mm(line.x),
                Mm(PAGE_HEIGHT - line.y),
                font,
            );
        }
    }
    debug!("Rendered PDF '{}': {} page(s)", title, pages.len());

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(pdf_err)?;
    buf.into_inner().map_err(pdf_err)
}

/// Encode a notes record as a PDF: bold title, `Date:`/`From:`/`To:`
/// lines, then the wrapped content.
pub fn notes_to_pdf(record: &NotesExtraction) -> Result<Vec<u8>, ExtractError> {
    let title = record
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("Extracted notes");
    render(title, &notes_layout(record))
}

/// Lay plain text out as wrapped PDF pages.
pub fn text_to_pdf(title: &str, text: &str) -> Result<Vec<u8>, ExtractError> {
    render(title, &text_layout(text))
}
