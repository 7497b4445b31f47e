//! Eager (whole-document) extraction entry points.
//!
//! Pages are extracted one at a time, in order, and folded into a
//! [`DocumentMerger`] as they arrive. The first failing page aborts the
//! run: the caller gets [`ExtractError::PageFailed`] and nothing else.
//! Use [`crate::stream::extract_stream`] to see per-page records as they
//! complete.

use crate::config::{ExtractionConfig, ProviderCredentials};
use crate::error::ExtractError;
use crate::export::{export_to_file, ExportFormat};
use crate::merge::DocumentMerger;
use crate::output::{DocumentOutput, RunStats};
use crate::pipeline::encode::PageImage;
use crate::pipeline::input;
use crate::pipeline::llm::{process_page, ExtractionClient, VisionModel};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Extract and merge already-loaded page images through `model`.
///
/// # Errors
/// - [`ExtractError::EmptyInput`] when `pages` is empty
/// - [`ExtractError::PageFailed`] wrapping the first page failure
pub async fn extract_document<M: VisionModel + ?Sized>(
    model: &M,
    pages: &[PageImage],
    credentials: &ProviderCredentials,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, ExtractError> {
    let total = pages.len();
    if total == 0 {
        return Err(ExtractError::EmptyInput);
    }

    let run_start = Instant::now();
    info!(
        "Extracting {} page(s) in {} mode via {}",
        total, config.mode, credentials.provider
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    let mut merger = DocumentMerger::for_mode(config.mode);
    let mut stats = RunStats::default();

    for (idx, image) in pages.iter().enumerate() {
        let page_num = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total);
        }

        let page = match process_page(model, page_num, image, credentials, config).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Page {}/{} failed, aborting run: {}", page_num, total, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                return Err(ExtractError::PageFailed {
                    page: page_num,
                    total,
                    source: Box::new(e),
                });
            }
        };

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, total, page.raw_len);
        }
        stats.record(&page);
        merger.push(page.record)?;
    }

    let record = merger.finish()?;
    stats.total_duration_ms = run_start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {} page(s), {}ms",
        stats.total_pages, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total);
    }

    Ok(DocumentOutput { record, stats })
}

/// Load image/PDF files in order and extract them over HTTP.
///
/// This is the primary entry point for the library.
pub async fn extract_files(
    paths: &[PathBuf],
    credentials: &ProviderCredentials,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, ExtractError> {
    let pages = input::load_inputs(paths, config.render_width).await?;
    let client = ExtractionClient::new(config.clone())?;
    extract_document(&client, &pages, credentials, config).await
}

/// Extract files and write the merged record straight to `output_path`.
pub async fn extract_to_file(
    paths: &[PathBuf],
    output_path: impl AsRef<Path>,
    format: ExportFormat,
    credentials: &ProviderCredentials,
    config: &ExtractionConfig,
) -> Result<RunStats, ExtractError> {
    if !format.supports(config.mode) {
        return Err(ExtractError::UnsupportedExport {
            format: format.to_string(),
            mode: config.mode.to_string(),
        });
    }
    let output = extract_files(paths, credentials, config).await?;
    export_to_file(&output.record, format, output_path).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`extract_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_files_sync(
    paths: &[PathBuf],
    credentials: &ProviderCredentials,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_files(paths, credentials, config))
}
