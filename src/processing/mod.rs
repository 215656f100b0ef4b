//! Summary pipeline: PDF text extraction followed by a single summarization call.

pub mod extract;
pub mod prompt;
mod service;
pub mod types;

pub use extract::{PdfTextExtractor, TextExtractor};
pub use service::{SummaryApi, SummaryPipeline};
pub use types::{ExtractionError, PipelineError, SummaryOutcome, Upload};
