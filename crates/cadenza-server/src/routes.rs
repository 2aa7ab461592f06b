//! HTTP routes.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cadenza_core::{Error, ProviderAttempt, QualityTier, ResolutionRequest, ResolutionResult};
use cadenza_resolver::{ProviderStatus, ResolutionEngine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

const EXHAUSTED_MESSAGE: &str = "Audio download failed for all providers/qualities.";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<ResolutionEngine>,
}

impl AppState {
    pub fn new(engine: ResolutionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/resolve-audio", post(resolve_audio))
        .route("/a-dl", post(resolve_audio))
        .route("/health", get(health))
        .route("/providers", get(providers))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Error body: `{status: false, error, details}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Vec<ProviderAttempt>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Every provider failed at every tier; `details` lists each slot.
    pub fn exhausted(details: Vec<ProviderAttempt>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: EXHAUSTED_MESSAGE.to_string(),
            details,
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(message) => Self::bad_request(message),
            Error::Exhausted(details) => Self::exhausted(details),
            other => Self::internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: bool,
    error: &'a str,
    details: &'a [ProviderAttempt],
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: false,
            error: &self.message,
            details: &self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub quality: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub status: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub metadata: Map<String, Value>,
    pub quality: QualityTier,
    pub provider: String,
}

/// Success bodies carry the resolved fields; failed results become a 502
/// with the per-slot details.
impl TryFrom<ResolutionResult> for ResolveResponse {
    type Error = ApiError;

    fn try_from(result: ResolutionResult) -> ApiResult<Self> {
        if !result.success {
            return Err(ApiError::exhausted(result.failure_details));
        }
        let (Some(url), Some(quality), Some(provider)) =
            (result.url, result.quality_used, result.provider_used)
        else {
            return Err(ApiError::internal("resolution result is incomplete"));
        };
        Ok(Self {
            status: true,
            url,
            filename: result.filename,
            metadata: result.metadata.unwrap_or_default(),
            quality,
            provider,
        })
    }
}

async fn resolve_audio(
    State(state): State<AppState>,
    body: Result<Json<ResolveBody>, JsonRejection>,
) -> ApiResult<Json<ResolveResponse>> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let url = body
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("url is required"))?;

    let mut request = ResolutionRequest::new(url);
    if let Some(quality) = body.quality {
        request = request.with_preferred_quality(QualityTier::try_from(quality)?);
    }

    let result = ResolutionResult::from_outcome(state.engine.resolve(&request).await)?;
    if !result.success {
        warn!(
            "All providers failed for {}: {} attempts",
            request.locator,
            result.failure_details.len()
        );
    }
    Ok(Json(ResolveResponse::try_from(result)?))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn providers(State(state): State<AppState>) -> Json<Vec<ProviderStatus>> {
    Json(state.engine.registry().statuses().to_vec())
}

/// One span per request, tagged with a fresh request id.
async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "request",
        id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let start = Instant::now();
        let response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "handled"
        );
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cadenza_core::{ProviderError, Resolution, ResolvedAudio};

    #[test]
    fn test_error_status_mapping() {
        let input: ApiError = Error::InvalidInput("locator is required".into()).into();
        assert_eq!(input.status(), StatusCode::BAD_REQUEST);

        let attempt = ProviderAttempt::failed(
            "vreden",
            QualityTier::Kbps320,
            2,
            &ProviderError::transient("down"),
        );
        let exhausted: ApiError = Error::Exhausted(vec![attempt]).into();
        assert_eq!(exhausted.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(exhausted.details.len(), 1);
        assert_eq!(exhausted.message, EXHAUSTED_MESSAGE);

        let other: ApiError = Error::Config("bad".into()).into();
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_response_from_result() {
        let resolution = Resolution::new(
            ResolvedAudio::new("https://cdn.example/a.m4a")
                .with_filename("a.m4a")
                .with_metadata("title", "Song"),
            "innertube",
            QualityTier::Kbps128,
            1,
        );
        let response = ResolveResponse::try_from(ResolutionResult::from(resolution)).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], true);
        assert_eq!(json["url"], "https://cdn.example/a.m4a");
        assert_eq!(json["filename"], "a.m4a");
        assert_eq!(json["metadata"]["title"], "Song");
        assert_eq!(json["quality"], 128);
        assert_eq!(json["provider"], "innertube");

        let attempt = ProviderAttempt::failed(
            "savetube",
            QualityTier::Kbps92,
            2,
            &ProviderError::invalid("no download url"),
        );
        let err = ResolveResponse::try_from(ResolutionResult::exhausted(vec![attempt.clone()]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, EXHAUSTED_MESSAGE);
        assert_eq!(err.details, vec![attempt]);

        let mut incomplete = ResolutionResult::exhausted(Vec::new());
        incomplete.success = true;
        let err = ResolveResponse::try_from(incomplete).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_resolve_body_is_lenient() {
        let body: ResolveBody = serde_json::from_str("{}").unwrap();
        assert!(body.url.is_none());
        assert!(body.quality.is_none());

        let body: ResolveBody =
            serde_json::from_str(r#"{"url": "https://youtu.be/x", "quality": 128}"#).unwrap();
        assert_eq!(body.quality, Some(128));
    }
}
