//! Image encoding: page bytes → base64 payload for the vision request.
//!
//! Groq takes the image as a `data:` URL inside an `image_url` part; Gemini
//! takes the bare base64 string plus MIME type as `inline_data`. Both come
//! from the same [`ImagePayload`].

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type assumed when the bytes do not identify themselves.
pub const FALLBACK_MIME: &str = "image/jpeg";

/// One page image as raw bytes plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Where the page came from, for status lines ("scan.pdf#3", "photo.jpg").
    pub label: String,
}

impl PageImage {
    /// Wrap bytes, sniffing the MIME type from magic bytes.
    pub fn from_bytes(bytes: Vec<u8>, label: impl Into<String>) -> Self {
        let mime_type = sniff_mime(&bytes).to_string();
        Self {
            bytes,
            mime_type,
            label: label.into(),
        }
    }

    /// Wrap bytes with an explicit MIME type.
    pub fn with_mime(bytes: Vec<u8>, mime_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            label: label.into(),
        }
    }

    /// Base64-encode for transport.
    pub fn to_payload(&self) -> ImagePayload {
        let data = STANDARD.encode(&self.bytes);
        debug!(
            "Encoded {} ({} bytes) → {} bytes base64",
            self.label,
            self.bytes.len(),
            data.len()
        );
        ImagePayload {
            mime_type: self.mime_type.clone(),
            data,
        }
    }
}

/// Base64 image data ready to embed in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    /// `data:<mime>;base64,<data>` form.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Best-effort MIME type from the leading bytes; [`FALLBACK_MIME`] otherwise.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        return "application/pdf";
    }
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        Ok(image::ImageFormat::Tiff) => "image/tiff",
        _ => FALLBACK_MIME,
    }
}

/// PNG-encode a rasterised page.
///
/// PNG is lossless, so rendered glyph edges stay crisp for the model.
pub fn encode_png(img: &DynamicImage, label: impl Into<String>) -> Result<PageImage, ExtractError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::ImageEncoding(e.to_string()))?;
    Ok(PageImage::with_mime(buf, "image/png", label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let page = encode_png(&img, "test").expect("encode should succeed");
        assert_eq!(page.mime_type, "image/png");
        assert_eq!(sniff_mime(&page.bytes), "image/png");

        let payload = page.to_payload();
        let decoded = STANDARD.decode(&payload.data).expect("valid base64");
        assert_eq!(decoded, page.bytes);
    }

    #[test]
    fn data_url_shape() {
        let page = PageImage::with_mime(vec![1, 2, 3], "image/jpeg", "x");
        assert_eq!(page.to_payload().to_data_url(), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn sniff_falls_back_to_jpeg() {
        assert_eq!(sniff_mime(b"not an image"), FALLBACK_MIME);
        assert_eq!(sniff_mime(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), "image/jpeg");
    }
}
