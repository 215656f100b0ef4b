//! PDF text extraction.

use super::types::ExtractionError;
use axum::body::Bytes;
use std::sync::Arc;

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Converts PDF bytes into the text of all pages, in page order.
pub trait TextExtractor: Send + Sync {
    /// Extract text from an in-memory PDF.
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractionError>;
}

/// Extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractionError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(pdf)
            .map_err(|error| ExtractionError::Parse(error.to_string()))?;
        Ok(join_pages(&pages))
    }
}

/// Join per-page text so the last word of a page never runs into the first word of the next.
fn join_pages(pages: &[String]) -> String {
    pages.join(PAGE_SEPARATOR)
}

/// Run an extractor on the blocking pool and trim the result.
///
/// Parsing is CPU-bound and the parser may panic on hostile input; both are contained here so a
/// bad upload surfaces as an [`ExtractionError`] instead of stalling or killing a runtime worker.
pub(crate) async fn extract_on_blocking_pool(
    extractor: Arc<dyn TextExtractor>,
    pdf: Bytes,
) -> Result<String, ExtractionError> {
    let text = tokio::task::spawn_blocking(move || extractor.extract_text(&pdf))
        .await
        .map_err(|error| ExtractionError::Aborted(error.to_string()))??;
    Ok(text.trim().to_string())
}
