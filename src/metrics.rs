use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline outcomes since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    summaries_generated: AtomicU64,
    extraction_failures: AtomicU64,
    summarization_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request that produced a summary.
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that failed while extracting text.
    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that failed while calling the summarization provider.
    pub fn record_summarization_failure(&self) {
        self.summarization_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            summarization_failures: self.summarization_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Summaries returned to clients.
    pub summaries_generated: u64,
    /// Uploads whose text could not be extracted.
    pub extraction_failures: u64,
    /// Summarization calls that failed.
    pub summarization_failures: u64,
}
