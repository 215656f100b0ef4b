//! Client side of the upload flow.
//!
//! [`ClientSession`] models what the user sees: a file selection guarded by the size cap, a single
//! in-flight submission, and either a summary or one error banner that expires after
//! [`ERROR_DISPLAY_DURATION`]. [`SummaryClient`] performs the actual multipart request. The two
//! are independent so the session can be driven by any front end.

use reqwest::{Client, multipart};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Client-side upload cap (10 MiB). Advisory; the server enforces its own limit.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
/// How long an error banner stays visible.
pub const ERROR_DISPLAY_DURATION: Duration = Duration::from_secs(2);
/// Shown when a selected file exceeds [`MAX_UPLOAD_BYTES`].
pub const FILE_TOO_LARGE_MESSAGE: &str = "File size exceeds the 10MB limit.";
/// Shown when the server could not be reached or sent no usable message.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error, please try again.";

/// Errors raised on the client side of the flow.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The selected file is larger than [`MAX_UPLOAD_BYTES`].
    #[error("File of {size} bytes exceeds the {max} byte limit")]
    FileTooLarge {
        /// Size of the rejected file.
        size: u64,
        /// Client-side cap.
        max: u64,
    },
    /// The file could not be read from disk.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The server answered with a non-success status.
    #[error("Server responded with {status}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// `msg` from the response body, when present.
        message: Option<String>,
    },
    /// The request never produced a usable response.
    #[error("Request failed: {0}")]
    Network(String),
}

impl ClientError {
    /// Text to show the user for this error.
    pub fn display_message(&self) -> String {
        match self {
            Self::FileTooLarge { .. } => FILE_TOO_LARGE_MESSAGE.to_string(),
            Self::Server {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Io { path, .. } => format!("Could not read {path}"),
            Self::Server { message: None, .. } | Self::Network(_) => {
                NETWORK_ERROR_MESSAGE.to_string()
            }
        }
    }
}

/// A file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Name sent as the multipart filename.
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Wrap in-memory contents.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// Read a file from disk, checking its size before loading it.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let io_error = |source| ClientError::Io {
            path: path.display().to_string(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_error)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(ClientError::FileTooLarge {
                size,
                max: MAX_UPLOAD_BYTES,
            });
        }
        let bytes = tokio::fs::read(path).await.map_err(io_error)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        Ok(Self { name, size, bytes })
    }
}

/// Body of a successful `POST /api/summary`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryResponse {
    /// Status message from the server.
    pub msg: String,
    /// Markdown summary.
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    msg: Option<String>,
}

/// Observable state of a [`ClientSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Nothing selected, nothing shown.
    Idle,
    /// A file is accepted and ready to submit.
    FileSelected,
    /// A submission is in flight.
    Loading,
    /// A summary is on screen.
    SummaryShown,
    /// An error banner is on screen.
    ErrorShown,
}

#[derive(Debug, Clone)]
struct ShownError {
    message: String,
    shown_at: Instant,
}

/// State machine behind the upload form.
#[derive(Debug, Default)]
pub struct ClientSession {
    file: Option<SelectedFile>,
    summary: Option<String>,
    error: Option<ShownError>,
    loading: bool,
}

impl ClientSession {
    /// Start with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, with errors taking precedence over a selected file.
    pub fn state(&self) -> ClientState {
        if self.loading {
            ClientState::Loading
        } else if self.error.is_some() {
            ClientState::ErrorShown
        } else if self.summary.is_some() {
            ClientState::SummaryShown
        } else if self.file.is_some() {
            ClientState::FileSelected
        } else {
            ClientState::Idle
        }
    }

    /// Accepted file, if any.
    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    /// Summary currently shown, if any.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Error banner text currently shown, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|error| error.message.as_str())
    }

    /// Whether the submit action is enabled.
    pub fn can_submit(&self) -> bool {
        self.file.is_some() && !self.loading
    }

    /// Offer a file to the form. Oversized files are refused and leave the previous selection
    /// untouched; nothing can be selected while a submission is in flight.
    pub fn select_file(&mut self, file: SelectedFile, now: Instant) -> bool {
        if self.loading {
            return false;
        }
        if file.size > MAX_UPLOAD_BYTES {
            self.show_error(FILE_TOO_LARGE_MESSAGE.to_string(), now);
            return false;
        }
        self.file = Some(file);
        self.summary = None;
        true
    }

    /// Record a file rejected before it could be offered (for example by a metadata check).
    pub fn reject_file(&mut self, error: &ClientError, now: Instant) {
        self.show_error(error.display_message(), now);
    }

    /// Enter `Loading` and hand back the file to send, or `None` when submit is disabled.
    pub fn begin_submit(&mut self) -> Option<SelectedFile> {
        if !self.can_submit() {
            return None;
        }
        self.error = None;
        self.summary = None;
        self.loading = true;
        self.file.clone()
    }

    /// Leave `Loading` with the outcome of the request.
    pub fn finish_submit(&mut self, outcome: Result<SummaryResponse, ClientError>, now: Instant) {
        self.loading = false;
        match outcome {
            Ok(response) => {
                tracing::debug!(msg = %response.msg, "Summary received");
                self.summary = Some(response.summary);
            }
            Err(error) => {
                tracing::debug!(error = %error, "Summary request failed");
                self.show_error(error.display_message(), now);
            }
        }
    }

    /// Clear the error banner once it has been visible for [`ERROR_DISPLAY_DURATION`].
    /// Returns `true` when a banner was dismissed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .error
            .as_ref()
            .is_some_and(|error| now.duration_since(error.shown_at) >= ERROR_DISPLAY_DURATION);
        if expired {
            self.error = None;
        }
        expired
    }

    fn show_error(&mut self, message: String, now: Instant) {
        self.error = Some(ShownError {
            message,
            shown_at: now,
        });
    }
}

/// HTTP client for `POST /api/summary`.
pub struct SummaryClient {
    http: Client,
    base_url: String,
}

impl SummaryClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent("pdfsummary/client")
            .build()
            .map_err(|error| ClientError::Network(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/summary", self.base_url.trim_end_matches('/'))
    }

    /// Upload `file` and wait for its summary.
    pub async fn request_summary(&self, file: &SelectedFile) -> Result<SummaryResponse, ClientError> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str("application/pdf")
            .map_err(|error| ClientError::Network(error.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|error| ClientError::Network(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.msg);
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SummaryResponse>()
            .await
            .map_err(|error| ClientError::Network(format!("unexpected response body: {error}")))
    }
}
