//! Multipart upload intake for `POST /api/summary`.
//!
//! The reader walks the multipart stream, keeps the single `file` field and buffers it chunk by
//! chunk so an oversized upload is cut off as soon as it crosses the cap. The buffer is owned by
//! the returned [`Upload`] and freed with it at the end of the request.

use crate::processing::Upload;
use axum::{
    body::Bytes,
    extract::multipart::{Field, Multipart, MultipartError},
    http::StatusCode,
};
use thiserror::Error;

/// Name of the multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Reasons an upload is refused before it reaches the pipeline.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request carried no `file` field.
    #[error("No file provided")]
    MissingFile,
    /// More than one `file` field was sent.
    #[error("Only one file may be uploaded")]
    MultipleFiles,
    /// The file or the request body exceeded the configured cap.
    #[error("File too large (limit {max} bytes)")]
    TooLarge {
        /// Configured per-file cap.
        max: usize,
    },
    /// The declared media type is not a PDF.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    /// The multipart stream could not be parsed.
    #[error("Malformed upload: {0}")]
    Malformed(String),
}

impl UploadError {
    /// HTTP status used when this error reaches the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::MultipleFiles | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    /// Client-facing message.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::MissingFile => "No file provided",
            Self::MultipleFiles => "Only one file may be uploaded",
            Self::TooLarge { .. } => "File too large",
            Self::UnsupportedMediaType(_) => "Only PDF files are supported",
            Self::Malformed(_) => "Malformed upload",
        }
    }

    fn from_multipart(error: MultipartError, max: usize) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge { max }
        } else {
            Self::Malformed(error.body_text())
        }
    }
}

/// Read the single PDF upload out of a multipart body.
pub async fn read_pdf_upload(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<Upload, UploadError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| UploadError::from_multipart(error, max_file_size))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if upload.is_some() {
            return Err(UploadError::MultipleFiles);
        }
        upload = Some(read_file_field(field, max_file_size).await?);
    }

    upload.ok_or(UploadError::MissingFile)
}

async fn read_file_field(mut field: Field<'_>, max_file_size: usize) -> Result<Upload, UploadError> {
    let content_type = field.content_type().map(str::to_string);
    let file_name = field.file_name().map(str::to_string);
    ensure_pdf(content_type.as_deref(), file_name.as_deref())?;

    let mut buffer = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|error| UploadError::from_multipart(error, max_file_size))?
    {
        if buffer.len() + chunk.len() > max_file_size {
            tracing::warn!(
                file_name = file_name.as_deref().unwrap_or("<unnamed>"),
                max_file_size,
                "Upload exceeds size limit"
            );
            return Err(UploadError::TooLarge { max: max_file_size });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(Upload {
        bytes: Bytes::from(buffer),
        content_type,
        file_name,
    })
}

fn ensure_pdf(content_type: Option<&str>, file_name: Option<&str>) -> Result<(), UploadError> {
    match content_type {
        Some(declared) => {
            let essence = declared.split(';').next().unwrap_or_default().trim();
            if essence.eq_ignore_ascii_case(PDF_MEDIA_TYPE) {
                Ok(())
            } else {
                Err(UploadError::UnsupportedMediaType(declared.to_string()))
            }
        }
        None if file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf")) => Ok(()),
        None => Err(UploadError::UnsupportedMediaType("<undeclared>".into())),
    }
}
