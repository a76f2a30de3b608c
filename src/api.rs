//! HTTP API for PiiGuard
//!
//! Thin axum surface over the redaction pipeline.
//!
//! ## Endpoint Map
//!
//! | Method | Path           | Description                                   |
//! |--------|----------------|-----------------------------------------------|
//! | GET    | `/health`      | Liveness check                                |
//! | POST   | `/redact`      | Upload as a multipart `file` part or raw body |
//! | POST   | `/redact-text` | JSON `{"text": ...}` processed as plain text  |

use crate::config::ServerConfig;
use crate::error::Error;
use crate::pipeline::Pipeline;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Content type assumed when an upload does not declare one
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Multipart part carrying the uploaded document
const FILE_FIELD: &str = "file";

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the complete HTTP application
pub fn build_app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/redact", post(redact_upload))
        .route("/redact-text", post(redact_text))
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    id = %uuid::Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(build_cors(&server.cors_origins))
}

// =============================================================================
// Request / Response types
// =============================================================================

/// Request body for `/redact-text`
#[derive(Debug, Deserialize)]
pub struct RedactTextRequest {
    pub text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiErrorDetail {
                code: "BAD_REQUEST".to_string(),
                message: message.into(),
            },
        }
    }

    /// Error for a request body axum refused to read
    fn rejected(status: StatusCode, message: String) -> Self {
        let code = match status {
            StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
            _ => "BAD_REQUEST",
        };
        Self {
            status,
            error: ApiErrorDetail {
                code: code.to_string(),
                message,
            },
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::rejected(err.status(), err.body_text())
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(code = err.code(), status = status.as_u16(), "Request failed");
        Self {
            status,
            error: ApiErrorDetail {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn redact_upload(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let declared = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();

    let (data, content_type) = if is_multipart(&declared) {
        let mut multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|r| ApiError::rejected(r.status(), r.body_text()))?;
        read_file_part(&mut multipart).await?
    } else {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|r| ApiError::rejected(r.status(), r.body_text()))?;
        (body, declared)
    };

    if data.is_empty() {
        return Err(ApiError::bad_request("Empty file"));
    }

    let result = state.pipeline.process(data, &content_type).await?;
    Ok(Json(result).into_response())
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("multipart/form-data"))
}

/// Read the `file` part and the content type it declares
async fn read_file_part(multipart: &mut Multipart) -> Result<(Bytes, String), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await?;
        return Ok((data, content_type));
    }
    Err(ApiError::bad_request("Missing file field"))
}

async fn redact_text(
    State(state): State<AppState>,
    Json(request): Json<RedactTextRequest>,
) -> Result<Response, ApiError> {
    let result = state
        .pipeline
        .process(Bytes::from(request.text), "text/plain")
        .await?;
    Ok(Json(result).into_response())
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use crate::config::{
        ContextHintsConfig, ExtractionConfig, NerConfig, OcrConfig, UnknownContentMode,
    };
    use crate::extract::TextExtractor;
    use crate::ocr::OcrClient;
    use crate::privacy::{PolicyStore, PrivacyEngines};
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    const POLICY: &str = r#"
entities:
  - name: US_SSN
    replace_with: "[SSN_REDACTED]"
  - name: EMAIL_ADDRESS
    replace_with: "[EMAIL_REDACTED]"
"#;

    fn make_app(policy: &NamedTempFile, mode: UnknownContentMode, max_upload_bytes: usize) -> Router {
        let extractor = TextExtractor::new(
            OcrClient::new(OcrConfig::default()).unwrap(),
            ExtractionConfig {
                unknown_content: mode,
                ..ExtractionConfig::default()
            },
        );
        let pipeline = Pipeline::from_parts(
            extractor,
            PolicyStore::new(policy.path()),
            Arc::new(PrivacyEngines::from_config(&NerConfig::default())),
            ContextHintsConfig::default(),
        );
        let server = ServerConfig {
            max_upload_bytes,
            ..ServerConfig::default()
        };
        build_app(
            AppState {
                pipeline: Arc::new(pipeline),
            },
            &server,
        )
    }

    fn policy_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(POLICY.as_bytes()).unwrap();
        file
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 1024);
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_redact_text() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 1024);
        let resp = app
            .oneshot(post(
                "/redact-text",
                "application/json",
                r#"{"text":"John's SSN is 123-45-6789 and email john.doe@example.com"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["content_type"], "text/plain");
        assert_eq!(
            json["redacted_text"],
            "John's SSN is [SSN_REDACTED] and email [EMAIL_REDACTED]"
        );
        assert_eq!(json["entities"].as_array().unwrap().len(), 2);
        assert_eq!(json["entities"][0]["entity"], "US_SSN");
        assert_eq!(json["aoai_hints"]["enabled"], false);
    }

    #[tokio::test]
    async fn test_redact_upload_keeps_declared_content_type() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 1024);
        let resp = app
            .oneshot(post(
                "/redact",
                "text/plain; charset=utf-8",
                "contact: jane@example.org",
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["content_type"], "text/plain; charset=utf-8");
        assert_eq!(json["redacted_text"], "contact: [EMAIL_REDACTED]");
        assert_eq!(json["ocr_meta_present"], false);
    }

    #[tokio::test]
    async fn test_redact_empty_upload() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 1024);
        let resp = app
            .oneshot(post("/redact", "text/plain", Body::empty()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert_eq!(json["error"]["message"], "Empty file");
    }

    #[tokio::test]
    async fn test_redact_strict_unknown_type() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Strict, 1024);
        let resp = app
            .oneshot(post("/redact", "application/zip", "PK\u{3}\u{4}"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "UNSUPPORTED_CONTENT_TYPE");
    }

    #[tokio::test]
    async fn test_redact_pdf_without_ocr_config() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 1024);
        let resp = app
            .oneshot(post("/redact", "application/pdf", "%PDF-1.7"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 16);
        let resp = app
            .oneshot(post("/redact", "text/plain", "x".repeat(64)))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    const BOUNDARY: &str = "XBOUNDARY";

    fn form_part(name: &str, content_type: &str, data: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n{data}\r\n"
        )
    }

    fn form(parts: &[String]) -> String {
        format!("{}--{BOUNDARY}--\r\n", parts.concat())
    }

    fn form_content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[tokio::test]
    async fn test_redact_multipart_file_part() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Strict, 1024);
        let body = form(&[
            form_part("note", "text/plain", "ignored"),
            form_part("file", "text/plain", "SSN 123-45-6789"),
        ]);
        let resp = app
            .oneshot(post("/redact", &form_content_type(), body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["content_type"], "text/plain");
        assert_eq!(json["redacted_text"], "SSN [SSN_REDACTED]");
        assert_eq!(json["entities"][0]["entity"], "US_SSN");
    }

    #[tokio::test]
    async fn test_redact_multipart_missing_file_part() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 1024);
        let body = form(&[form_part("document", "text/plain", "SSN 123-45-6789")]);
        let resp = app
            .oneshot(post("/redact", &form_content_type(), body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["message"], "Missing file field");
    }

    #[tokio::test]
    async fn test_redact_multipart_empty_file_part() {
        let policy = policy_file();
        let app = make_app(&policy, UnknownContentMode::Permissive, 1024);
        let body = form(&[form_part("file", "text/plain", "")]);
        let resp = app
            .oneshot(post("/redact", &form_content_type(), body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["message"], "Empty file");
    }
}
