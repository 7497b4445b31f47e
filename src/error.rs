//! Error types for the scan2data library.
//!
//! A single error type, [`ExtractError`], covers every failure. Runs are
//! all-or-nothing: when page *i* of a multi-page run fails, the caller gets
//! [`ExtractError::PageFailed`] and no merged record, even though pages
//! `1..i` extracted fine.
//!
//! Three kinds matter to callers across the boundary:
//!
//! * [`ExtractError::Transport`]: the vision endpoint answered with a
//!   non-success status. The upstream body is kept verbatim.
//! * [`ExtractError::UnparsableResponse`]: the model text could not be
//!   reduced to a record, even after repair mode.
//! * [`ExtractError::EmptyResponse`]: the call succeeded but there was no
//!   text at the expected response path. Handled like an unparsable response.
//!
//! Everything else (file input, PDF rasterisation, export encoding) is
//! ambient plumbing around those three.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the scan2data library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Provider errors ───────────────────────────────────────────────────
    /// The vision endpoint returned a non-2xx status.
    #[error("{provider} API error (HTTP {status}): {body}")]
    Transport {
        provider: String,
        status: u16,
        body: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, timeout).
    #[error("{provider} request failed: {detail}")]
    Network { provider: String, detail: String },

    /// The transport succeeded but no text was found at the response path.
    #[error("No response text from {provider}")]
    EmptyResponse { provider: String },

    /// The model text could not be reduced to a record.
    #[error("Failed to parse extracted data: {detail}")]
    UnparsableResponse { detail: String },

    /// A page of a multi-page run failed; the whole run is aborted.
    #[error("Page {page} of {total} failed: {source}")]
    PageFailed {
        page: usize,
        total: usize,
        #[source]
        source: Box<ExtractError>,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// A document run or merge was given no pages.
    #[error("No pages to process")]
    EmptyInput,

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The input is neither a supported image nor a PDF.
    #[error("Unsupported input '{path}': {reason}")]
    UnsupportedInput { path: PathBuf, reason: String },

    /// Image bytes could not be decoded or re-encoded.
    #[error("Image encoding failed: {0}")]
    ImageEncoding(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open or rasterise the document.
    #[error("PDF rasterisation failed{}: {detail}", page_suffix(.page))]
    PdfRenderFailed { page: Option<usize>, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Export errors ─────────────────────────────────────────────────────
    /// The requested format does not exist for this record shape.
    #[error("{format} export is not available for {mode} records")]
    UnsupportedExport { format: String, mode: String },

    /// An export encoder (xlsx, docx, pdf) failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// A `.docx` input could not be opened or its body read.
    #[error("Could not read Word document: {0}")]
    WordReadFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// True for failures to turn model output into a record.
    ///
    /// An empty response is grouped with unparsable ones, including when it
    /// is wrapped in [`ExtractError::PageFailed`].
    pub fn is_unparsable(&self) -> bool {
        match self {
            ExtractError::UnparsableResponse { .. } | ExtractError::EmptyResponse { .. } => true,
            ExtractError::PageFailed { source, .. } => source.is_unparsable(),
            _ => false,
        }
    }

    /// True when the vision endpoint rejected the request.
    pub fn is_transport(&self) -> bool {
        match self {
            ExtractError::Transport { .. } => true,
            ExtractError::PageFailed { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    pub(crate) fn unparsable(detail: impl Into<String>) -> Self {
        ExtractError::UnparsableResponse {
            detail: detail.into(),
        }
    }
}

fn page_suffix(page: &Option<usize>) -> String {
    page.map(|p| format!(" for page {p}")).unwrap_or_default()
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(e: zip::result::ZipError) -> Self {
        ExtractError::Export(e.to_string())
    }
}
