//! Streaming extraction API: emit each page's record as it completes.
//!
//! Pages are still processed strictly one after another, in page order.
//! The stream yields the per-page record (before merging) so callers can
//! show partial results, and it ends right after the first error: a page
//! failure is the last item, matching the abort-on-failure policy of
//! [`crate::extract::extract_document`].
//!
//! Fold the `Ok` items through a [`crate::merge::DocumentMerger`] to get
//! the same merged record the eager API returns.

use crate::config::{ExtractionConfig, ProviderCredentials};
use crate::error::ExtractError;
use crate::output::PageResult;
use crate::pipeline::encode::PageImage;
use crate::pipeline::input;
use crate::pipeline::llm::{process_page, ExtractionClient, VisionModel};
use futures::stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, ExtractError>> + Send>>;

/// Stream per-page records for already-loaded page images.
///
/// Nothing is sent until the stream is polled.
pub fn extract_stream(
    model: Arc<dyn VisionModel>,
    pages: Vec<PageImage>,
    credentials: ProviderCredentials,
    config: ExtractionConfig,
) -> PageStream {
    let total = pages.len();
    info!("Starting streaming extraction of {} page(s)", total);

    // State: remaining pages, and whether the previous page failed.
    let state = (pages.into_iter().enumerate(), false);
    let s = stream::unfold(state, move |(mut remaining, failed)| {
        let model = Arc::clone(&model);
        let credentials = credentials.clone();
        let config = config.clone();
        async move {
            if failed {
                return None;
            }
            let (idx, image) = remaining.next()?;
            let page_num = idx + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(page_num, total);
            }
            let item = match process_page(&*model, page_num, &image, &credentials, &config).await {
                Ok(page) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_complete(page_num, total, page.raw_len);
                    }
                    Ok(page)
                }
                Err(e) => {
                    warn!("Page {}/{} failed, ending stream: {}", page_num, total, e);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_error(page_num, total, &e.to_string());
                    }
                    Err(ExtractError::PageFailed {
                        page: page_num,
                        total,
                        source: Box::new(e),
                    })
                }
            };
            let failed = item.is_err();
            Some((item, (remaining, failed)))
        }
    });

    Box::pin(s)
}

/// Load files in order and stream their per-page records over HTTP.
///
/// # Errors
/// Fails up front for input problems (missing file, unsupported type,
/// PDF rasterisation) and invalid client settings.
pub async fn extract_files_stream(
    paths: &[PathBuf],
    credentials: &ProviderCredentials,
    config: &ExtractionConfig,
) -> Result<PageStream, ExtractError> {
    let pages = input::load_inputs(paths, config.render_width).await?;
    let client = ExtractionClient::new(config.clone())?;
    Ok(extract_stream(
        Arc::new(client),
        pages,
        credentials.clone(),
        config.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractionMode, Provider};
    use crate::merge::DocumentMerger;
    use crate::testing::ScriptedVisionModel;
    use futures::StreamExt;

    fn pages(n: usize) -> Vec<PageImage> {
        (1..=n)
            .map(|i| PageImage::with_mime(vec![1, 2, 3], "image/png", format!("p{i}")))
            .collect()
    }

    fn notes_config() -> ExtractionConfig {
        ExtractionConfig::builder()
            .mode(ExtractionMode::Notes)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn yields_pages_in_order() {
        let model = Arc::new(
            ScriptedVisionModel::new()
                .with_text(r#"{"content": "a"}"#)
                .with_text(r#"{"content": "b"}"#),
        );
        let results: Vec<_> = extract_stream(
            model.clone(),
            pages(2),
            ProviderCredentials::groq("k"),
            notes_config(),
        )
        .collect()
        .await;

        assert_eq!(results.len(), 2);
        let mut merger = DocumentMerger::for_mode(ExtractionMode::Notes);
        for r in results {
            merger.push(r.unwrap().record).unwrap();
        }
        let merged = merger.finish().unwrap().into_notes().unwrap();
        assert_eq!(merged.content, "a\n\n--- Document 2 ---\n\nb");
    }

    #[tokio::test]
    async fn ends_after_first_error() {
        let model = Arc::new(
            ScriptedVisionModel::new()
                .with_text("no json here at all")
                .with_text(r#"{"content": "never"}"#),
        );
        let mut s = extract_stream(
            model.clone(),
            pages(2),
            ProviderCredentials::new(Provider::Gemini, "k"),
            notes_config(),
        );

        let first = s.next().await.unwrap().unwrap_err();
        assert!(first.is_unparsable());
        assert!(s.next().await.is_none());
        assert_eq!(model.remaining(), 1);
    }
}
