//! HTTP surface for the summary service.
//!
//! - `POST /api/summary`: multipart upload with a single `file` field holding a PDF. Responds
//!   with `{ "msg": "Summary extracted", "summary": "..." }` or `{ "msg": "..." }` on failure.
//!   Rate limited per client; the limiter runs before the body is read.
//! - `GET /test`: plaintext liveness probe.
//! - `GET /metrics`: pipeline counters since startup.
//!
//! CORS admits only the configured client origin, for GET and POST.

use crate::config::Config;
use crate::metrics::MetricsSnapshot;
use crate::processing::{PipelineError, SummaryApi};
use crate::rate_limit::{RateLimiter, enforce_rate_limit};
use crate::upload::{UploadError, read_pdf_upload};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::Instrument;
use uuid::Uuid;

/// Liveness probe body.
pub const LIVENESS_MESSAGE: &str = "Server is working...";

const SUCCESS_MESSAGE: &str = "Summary extracted";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Limits applied by the gateway, taken from [`Config`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// The only browser origin allowed by CORS.
    pub client_origin: String,
    /// Largest accepted PDF, in bytes.
    pub max_file_size: usize,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
}

impl From<&Config> for GatewaySettings {
    fn from(config: &Config) -> Self {
        Self {
            client_origin: config.client_origin.clone(),
            max_file_size: config.max_file_size,
            max_body_size: config.max_body_size,
        }
    }
}

struct GatewayState<S> {
    service: Arc<S>,
    max_file_size: usize,
}

impl<S> Clone for GatewayState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            max_file_size: self.max_file_size,
        }
    }
}

/// Build the HTTP router.
pub fn create_router<S>(service: Arc<S>, settings: GatewaySettings, limiter: RateLimiter) -> Router
where
    S: SummaryApi + 'static,
{
    let state = GatewayState {
        service,
        max_file_size: settings.max_file_size,
    };

    let summary_routes = Router::new()
        .route("/api/summary", post(get_summary::<S>))
        .route_layer(middleware::from_fn_with_state(limiter, enforce_rate_limit))
        .layer(DefaultBodyLimit::max(settings.max_body_size));

    Router::new()
        .merge(summary_routes)
        .route("/test", get(liveness))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(state)
        .layer(cors_layer(&settings.client_origin))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(AllowOrigin::list([origin])),
        Err(error) => {
            tracing::warn!(origin, error = %error, "Invalid client origin; cross-origin requests disabled");
            layer
        }
    }
}

/// Success response for `POST /api/summary`.
#[derive(Debug, Serialize)]
struct SummaryResponse {
    msg: &'static str,
    summary: String,
}

/// Error body shared by every failure response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    msg: &'static str,
}

/// Summarize an uploaded PDF.
async fn get_summary<S>(
    State(state): State<GatewayState<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("summary_request", %request_id);

    async move {
        let multipart = multipart.map_err(|rejection| {
            tracing::info!(reason = %rejection.body_text(), "Request is not a multipart upload");
            UploadError::MissingFile
        })?;
        let upload = read_pdf_upload(multipart, state.max_file_size).await?;
        let outcome = state.service.summarize_pdf(upload).await?;
        tracing::info!(extracted_chars = outcome.extracted_chars, "Summary request completed");
        Ok::<_, AppError>(Json(SummaryResponse {
            msg: SUCCESS_MESSAGE,
            summary: outcome.summary,
        }))
    }
    .instrument(span)
    .await
}

async fn liveness() -> &'static str {
    tracing::debug!("Liveness probe");
    LIVENESS_MESSAGE
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(state): State<GatewayState<S>>) -> Json<MetricsSnapshot>
where
    S: SummaryApi,
{
    Json(state.service.metrics_snapshot())
}

#[derive(Debug)]
enum AppError {
    Upload(UploadError),
    Pipeline(PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Upload(error) => {
                tracing::info!(error = %error, "Upload rejected");
                let body = ErrorBody {
                    msg: error.client_message(),
                };
                (error.status_code(), Json(body)).into_response()
            }
            Self::Pipeline(error) => {
                tracing::error!(error = %error, "Summary pipeline failed");
                let body = ErrorBody {
                    msg: INTERNAL_ERROR_MESSAGE,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        Self::Upload(inner)
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{ExtractionError, SummaryOutcome, Upload};
    use crate::summarization::SummarizationClientError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        extract::connect_info::MockConnectInfo,
        http::{Request, header},
    };
    use serde_json::Value;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "summary-test-boundary";
    const ORIGIN: &str = "http://localhost:5173";

    #[derive(Clone, Copy)]
    enum StubBehavior {
        Succeed,
        FailExtraction,
        FailSummarization,
    }

    #[derive(Clone)]
    struct StubSummaryService {
        calls: Arc<Mutex<Vec<Upload>>>,
        behavior: StubBehavior,
    }

    impl StubSummaryService {
        fn new(behavior: StubBehavior) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                behavior,
            }
        }

        async fn recorded_calls(&self) -> Vec<Upload> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummaryApi for StubSummaryService {
        async fn summarize_pdf(&self, upload: Upload) -> Result<SummaryOutcome, PipelineError> {
            self.calls.lock().await.push(upload);
            match self.behavior {
                StubBehavior::Succeed => Ok(SummaryOutcome {
                    summary: "**Key points**\n- one".into(),
                    extracted_chars: 42,
                }),
                StubBehavior::FailExtraction => {
                    Err(ExtractionError::Parse("bad xref".into()).into())
                }
                StubBehavior::FailSummarization => {
                    Err(SummarizationClientError::GenerationFailed("quota".into()).into())
                }
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                summaries_generated: 3,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn settings(max_file_size: usize) -> GatewaySettings {
        GatewaySettings {
            client_origin: ORIGIN.into(),
            max_file_size,
            max_body_size: max_file_size + 4096,
        }
    }

    fn router(service: Arc<StubSummaryService>) -> Router {
        create_router(
            service,
            settings(1024),
            RateLimiter::in_memory(20, Duration::from_secs(900)),
        )
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, content_type, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/summary")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn pdf_request() -> Request<Body> {
        upload_request(multipart_body(&[(
            "file",
            Some("doc.pdf"),
            "application/pdf",
            &b"%PDF-1.7 fake"[..],
        )]))
    }

    async fn json_body(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn summary_route_returns_pipeline_output() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let response = router(service.clone())
            .oneshot(pdf_request())
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("ratelimit"));
        let json = json_body(response).await;
        assert_eq!(json["msg"], "Summary extracted");
        assert_eq!(json["summary"], "**Key points**\n- one");

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(&calls[0].bytes[..], b"%PDF-1.7 fake");
        assert_eq!(calls[0].file_name.as_deref(), Some("doc.pdf"));
        assert_eq!(calls[0].content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn missing_file_field_is_a_bad_request() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let body = multipart_body(&[("note", None, "", &b"hello"[..])]);

        let response = router(service.clone())
            .oneshot(upload_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, serde_json::json!({ "msg": "No file provided" }));
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn non_multipart_body_is_treated_as_missing_file() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/summary")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .expect("request");

        let response = router(service).oneshot(request).await.expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["msg"], "No file provided");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_the_pipeline() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let data = vec![b'x'; 2048];
        let body = multipart_body(&[("file", Some("big.pdf"), "application/pdf", &data[..])]);

        let response = router(service.clone())
            .oneshot(upload_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["msg"], "File too large");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn body_over_request_limit_is_payload_too_large() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let data = vec![b'x'; 64 * 1024];
        let body = multipart_body(&[("file", Some("huge.pdf"), "application/pdf", &data[..])]);

        let response = router(service.clone())
            .oneshot(upload_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn non_pdf_upload_is_unsupported() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let body = multipart_body(&[("file", Some("photo.png"), "image/png", &b"\x89PNG"[..])]);

        let response = router(service.clone())
            .oneshot(upload_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn second_file_field_is_rejected() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let body = multipart_body(&[
            ("file", Some("a.pdf"), "application/pdf", &b"%PDF a"[..]),
            ("file", Some("b.pdf"), "application/pdf", &b"%PDF b"[..]),
        ]);

        let response = router(service.clone())
            .oneshot(upload_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["msg"], "Only one file may be uploaded");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn pipeline_failures_are_opaque_internal_errors() {
        for behavior in [StubBehavior::FailExtraction, StubBehavior::FailSummarization] {
            let service = Arc::new(StubSummaryService::new(behavior));
            let response = router(service)
                .oneshot(pdf_request())
                .await
                .expect("router response");

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let json = json_body(response).await;
            assert_eq!(json, serde_json::json!({ "msg": "Internal server error" }));
        }
    }

    #[tokio::test]
    async fn twenty_first_request_is_rate_limited() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let app = router(service.clone()).layer(MockConnectInfo(SocketAddr::from((
            [203, 0, 113, 7],
            4000,
        ))));

        for _ in 0..20 {
            let response = app.clone().oneshot(pdf_request()).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }

        // Invalid payload on purpose: the limiter answers before the body is inspected.
        let request = upload_request(multipart_body(&[("note", None, "", &b"x"[..])]));
        let response = app.clone().oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["ratelimit-policy"], "20;w=900");
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "msg": "Too many requests, please try again later." })
        );
        assert_eq!(service.recorded_calls().await.len(), 20);
    }

    #[tokio::test]
    async fn liveness_route_is_not_rate_limited() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let app = create_router(
            service,
            settings(1024),
            RateLimiter::in_memory(1, Duration::from_secs(900)),
        );

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(Request::get("/test").body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            assert!(!response.headers().contains_key("ratelimit"));
            let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
            assert_eq!(&body[..], LIVENESS_MESSAGE.as_bytes());
        }
    }

    #[tokio::test]
    async fn metrics_route_exposes_snapshot() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let response = router(service)
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["summaries_generated"], 3);
        assert_eq!(json["extraction_failures"], 0);
    }

    #[tokio::test]
    async fn cors_admits_only_the_client_origin() {
        let service = Arc::new(StubSummaryService::new(StubBehavior::Succeed));
        let app = router(service);

        let allowed = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/summary")
                    .header(header::ORIGIN, ORIGIN)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            ORIGIN
        );

        let foreign = app
            .oneshot(
                Request::get("/test")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert!(!foreign
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
