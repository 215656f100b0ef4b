#![deny(missing_docs)]

//! Core library for the PDF summary server and its command-line client.

/// HTTP routing and request handlers.
pub mod api;
/// Upload form state machine and HTTP client.
pub mod client;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline outcome counters.
pub mod metrics;
/// Extract-then-summarize pipeline.
pub mod processing;
/// Per-client request rate limiting.
pub mod rate_limit;
/// Summarization provider clients.
pub mod summarization;
/// Multipart upload intake.
pub mod upload;
