//! Input resolution: turn user-supplied file paths into ordered page images.
//!
//! Images pass through as-is. PDFs are rasterised page by page, so one PDF
//! contributes as many pages as it has. Order is preserved: the pages of
//! the first path come first, and within a PDF pages stay in page order.
//! That order is the merge order downstream.

use crate::error::ExtractError;
use crate::pipeline::encode::{sniff_mime, PageImage, FALLBACK_MIME};
use crate::pipeline::render::render_pdf;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions accepted as images when the magic bytes are unknown.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "heic", "heif",
];

/// Load every path in order. `render_width` applies to PDF pages.
pub async fn load_inputs(
    paths: &[PathBuf],
    render_width: u32,
) -> Result<Vec<PageImage>, ExtractError> {
    if paths.is_empty() {
        return Err(ExtractError::EmptyInput);
    }

    let mut pages = Vec::new();
    for path in paths {
        pages.extend(load_input(path, render_width).await?);
    }
    info!("{} input file(s) → {} page image(s)", paths.len(), pages.len());
    Ok(pages)
}

/// Load one path: a single image, or every page of a PDF.
pub async fn load_input(path: &Path, render_width: u32) -> Result<Vec<PageImage>, ExtractError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ExtractError::UnsupportedInput {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    if bytes.is_empty() {
        return Err(ExtractError::UnsupportedInput {
            path: path.to_path_buf(),
            reason: "file is empty".into(),
        });
    }

    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match sniff_mime(&bytes) {
        "application/pdf" => {
            debug!("{}: PDF, rasterising", label);
            render_pdf(bytes, &label, render_width).await
        }
        FALLBACK_MIME if !looks_like_jpeg(&bytes) => {
            if has_image_extension(path) {
                debug!("{}: unknown magic bytes, assuming {}", label, FALLBACK_MIME);
                Ok(vec![PageImage::with_mime(bytes, FALLBACK_MIME, label)])
            } else {
                Err(ExtractError::UnsupportedInput {
                    path: path.to_path_buf(),
                    reason: "not an image or PDF".into(),
                })
            }
        }
        mime => {
            debug!("{}: {} ({} bytes)", label, mime, bytes.len());
            Ok(vec![PageImage::from_bytes(bytes, label)])
        }
    }
}

fn looks_like_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        crate::pipeline::encode::encode_png(&img, "x").unwrap().bytes
    }

    #[tokio::test]
    async fn images_load_in_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, png_bytes()).unwrap();
        std::fs::write(&b, [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap();

        let pages = load_inputs(&[b.clone(), a.clone()], 1000).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].label, "b.jpg");
        assert_eq!(pages[0].mime_type, "image/jpeg");
        assert_eq!(pages[1].label, "a.png");
        assert_eq!(pages[1].mime_type, "image/png");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_input(Path::new("/definitely/not/here.png"), 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_bytes_with_image_extension_fall_back_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("photo.heic");
        std::fs::write(&p, b"....ftypheic").unwrap();
        let pages = load_input(&p, 1000).await.unwrap();
        assert_eq!(pages[0].mime_type, FALLBACK_MIME);
    }

    #[tokio::test]
    async fn text_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.txt");
        std::fs::write(&p, b"hello").unwrap();
        let err = load_input(&p, 1000).await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedInput { .. }));

        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            load_input(&empty, 1000).await.unwrap_err(),
            ExtractError::UnsupportedInput { .. }
        ));
    }

    #[tokio::test]
    async fn no_paths_is_empty_input() {
        assert!(matches!(
            load_inputs(&[], 1000).await.unwrap_err(),
            ExtractError::EmptyInput
        ));
    }
}
