//! Request-scoped data types and error definitions for the summary pipeline.

use crate::summarization::SummarizationClientError;
use axum::body::Bytes;
use thiserror::Error;

/// Errors produced while turning PDF bytes into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The parser rejected the document (malformed, encrypted, unsupported).
    #[error("Error extracting text from PDF: {0}")]
    Parse(String),
    /// The extraction task died before producing text.
    #[error("Extraction task aborted: {0}")]
    Aborted(String),
}

/// Errors emitted by the summary pipeline.
///
/// Both variants collapse to the same opaque response at the HTTP boundary; the split only
/// matters for logs and metrics.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text extraction failed.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// The summarization provider failed.
    #[error("Error getting summary: {0}")]
    Summarization(#[from] SummarizationClientError),
}

/// A PDF accepted by the gateway, buffered in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Raw file contents.
    pub bytes: Bytes,
    /// Media type declared by the client, if any.
    pub content_type: Option<String>,
    /// Filename declared by the client, if any.
    pub file_name: Option<String>,
}

impl Upload {
    /// Size of the buffered file in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Successful pipeline result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Provider output, returned to the client unchanged.
    pub summary: String,
    /// Number of characters extracted from the PDF.
    pub extracted_chars: usize,
}
