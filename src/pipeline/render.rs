//! PDF rasterisation: render every page of a PDF to a PNG [`PageImage`].
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does CPU-heavy work. `tokio::task::spawn_blocking` keeps that
//! off the Tokio worker threads.
//!
//! ## Binding
//!
//! `PDFIUM_LIB_PATH` (a directory) is tried first, then the system library
//! search path. A missing library is reported as
//! [`ExtractError::PdfiumBindingFailed`] instead of panicking.

use crate::error::ExtractError;
use crate::pipeline::encode::{encode_png, PageImage};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Environment variable naming a directory that contains libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Rasterise all pages of `pdf_bytes` at `target_width` pixels wide.
///
/// Page images are labelled `"{label}#{n}"` with `n` 1-indexed.
pub async fn render_pdf(
    pdf_bytes: Vec<u8>,
    label: &str,
    target_width: u32,
) -> Result<Vec<PageImage>, ExtractError> {
    let label = label.to_string();
    tokio::task::spawn_blocking(move || render_pdf_blocking(&pdf_bytes, &label, target_width))
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))?
}

fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(dir) if !dir.is_empty() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
                .or_else(|_| Pdfium::bind_to_system_library())
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn render_pdf_blocking(
    pdf_bytes: &[u8],
    label: &str,
    target_width: u32,
) -> Result<Vec<PageImage>, ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| ExtractError::PdfRenderFailed {
            page: None,
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("{}: {} PDF pages", label, total);

    let render_config = PdfRenderConfig::new().set_target_width(target_width as i32);

    let mut images = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| ExtractError::PdfRenderFailed {
                    page: Some(page_num),
                    detail: format!("{:?}", e),
                })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered {} page {} → {}x{} px",
            label,
            page_num,
            image.width(),
            image.height()
        );
        images.push(encode_png(&image, format!("{label}#{page_num}"))?);
    }

    Ok(images)
}
