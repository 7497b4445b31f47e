//! Pipeline stages for turning one page image into one record.
//!
//! Each submodule implements one step and is tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ parse
//! (paths)   (pdfium)   (base64)   (VLM)   (JSON → record)
//! ```
//!
//! 1. [`input`]: read files in order; PDFs go through [`render`]
//! 2. [`render`]: rasterise PDF pages in `spawn_blocking`
//! 3. [`encode`]: base64-wrap page bytes for the request body
//! 4. [`llm`]: one vision call per page, Groq or Gemini
//! 5. [`parse`]: isolate the JSON candidate, parse strictly, repair notes

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
pub mod render;
