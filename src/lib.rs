//! # scan2data
//!
//! Turn photographed or scanned documents into structured, exportable data
//! using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Mark sheets, invoices and handwritten letters come in as photos. Instead
//! of running a local OCR model, each page image is sent to a hosted VLM
//! (Groq or Gemini) with a prompt demanding one JSON object. The answers
//! are parsed tolerantly, merged across pages, and exported as a
//! spreadsheet, a Word document, CSV, plain text or PDF. Word files can
//! also be converted to text-only PDFs without any model call.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images / PDF
//!  │
//!  ├─ 1. Input   read files in order; rasterise PDF pages via pdfium
//!  ├─ 2. Encode  bytes → base64 payload with MIME type
//!  ├─ 3. VLM     one call per page, strictly sequential
//!  ├─ 4. Parse   isolate JSON, strict parse, repair notes
//!  ├─ 5. Merge   left fold across pages (tabular or notes policy)
//!  └─ 6. Export  xlsx / docx / csv / txt / pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2data::{extract_files, export, ExportFormat, ExtractionConfig, ProviderCredentials};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let credentials = ProviderCredentials::gemini(std::env::var("GEMINI_API_KEY")?);
//!     let output = extract_files(&[PathBuf::from("marksheet.jpg")], &credentials, &config).await?;
//!     let xlsx = export(&output.record, ExportFormat::Spreadsheet)?;
//!     std::fs::write("extracted-data.xlsx", xlsx)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2data` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scan2data = { version = "0.1", default-features = false }
//! ```
//!
//! ## Providers
//!
//! | Provider | Default model | Key env (CLI only) |
//! |----------|---------------|--------------------|
//! | `gemini` | `gemini-2.0-flash` | `GEMINI_API_KEY` |
//! | `groq`   | `meta-llama/llama-4-scout-17b-16e-instruct` | `GROQ_API_KEY` |
//!
//! The library never reads the environment: credentials are passed into
//! every call as [`ProviderCredentials`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod extract;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod stream;
pub mod testing;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, ExtractionMode, Provider, ProviderCredentials,
};
pub use convert::{word_file_to_pdf, word_to_pdf, word_to_text};
pub use error::ExtractError;
pub use export::{export, export_notes, export_tabular, export_to_file, ExportFormat};
pub use extract::{extract_document, extract_files, extract_files_sync, extract_to_file};
pub use merge::{merge_all, merge_all_notes, DocumentMerger, NotesMerger, TabularMerger};
pub use output::{DocumentOutput, PageResult, RunStats};
pub use pipeline::encode::{ImagePayload, PageImage};
pub use pipeline::llm::{ExtractionClient, VisionModel};
pub use pipeline::parse::parse;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{NotesExtraction, Record, Row, Scalar, TabularExtraction};
pub use stream::{extract_files_stream, extract_stream, PageStream};
