//! Summary pipeline coordinating text extraction and the summarization provider.

use crate::{
    config::Config,
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        extract::{PdfTextExtractor, TextExtractor, extract_on_blocking_pool},
        prompt::build_summary_prompt,
        types::{PipelineError, SummaryOutcome, Upload},
    },
    summarization::{
        SummarizationClient, SummarizationClientError, SummarizationRequest,
        get_summarization_client,
    },
};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs the extract-then-summarize sequence for one upload.
///
/// The pipeline owns long-lived handles to the extractor, the provider client and the metrics
/// registry. Construct it once near process start and share it through an `Arc`.
pub struct SummaryPipeline {
    extractor: Arc<dyn TextExtractor>,
    summarizer: Box<dyn SummarizationClient>,
    model: String,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Extract the upload's text and summarize it.
    async fn summarize_pdf(&self, upload: Upload) -> Result<SummaryOutcome, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummaryPipeline {
    /// Build the production pipeline: `pdf-extract` plus the configured Gemini client.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        tracing::info!(model = %config.gemini_model, "Initializing summarization client");
        let summarizer = get_summarization_client(config)?;
        Ok(Self::new(
            Arc::new(PdfTextExtractor),
            summarizer,
            config.gemini_model.clone(),
        ))
    }

    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        summarizer: Box<dyn SummarizationClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            summarizer,
            model: model.into(),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Extract text from the upload and summarize it with a single provider call.
    pub async fn summarize_pdf(&self, upload: Upload) -> Result<SummaryOutcome, PipelineError> {
        tracing::info!(
            file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
            size = upload.size(),
            "Getting summary"
        );

        let text = match extract_on_blocking_pool(self.extractor.clone(), upload.bytes).await {
            Ok(text) => text,
            Err(error) => {
                self.metrics.record_extraction_failure();
                return Err(error.into());
            }
        };
        let extracted_chars = text.chars().count();
        tracing::info!(extracted_chars, "Text extracted");

        let request = SummarizationRequest {
            model: self.model.clone(),
            prompt: build_summary_prompt(&text),
        };
        let summary = match self.summarizer.generate_summary(request).await {
            Ok(summary) => summary,
            Err(error) => {
                self.metrics.record_summarization_failure();
                return Err(error.into());
            }
        };

        self.metrics.record_summary();
        tracing::info!(summary_chars = summary.chars().count(), "Summary generated");

        Ok(SummaryOutcome {
            summary,
            extracted_chars,
        })
    }
}

#[async_trait]
impl SummaryApi for SummaryPipeline {
    async fn summarize_pdf(&self, upload: Upload) -> Result<SummaryOutcome, PipelineError> {
        SummaryPipeline::summarize_pdf(self, upload).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
