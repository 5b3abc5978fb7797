use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::error;

use super::SharedState;
use crate::catalog::ModelDescriptor;
use crate::error::AppError;
use crate::pipeline::{SummarizeParams, TaggingParams, TaggingResult};

/// Build the application router
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/summarize", post(summarize))
        .route("/summaries/:id/tags", post(extract_tags))
        .route("/models", get(list_models))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /summarize request body
#[derive(Debug, Deserialize)]
pub struct SummarizeBody {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_caller")]
    pub caller_id: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub source_context: Option<Value>,
    #[serde(default)]
    pub preferred_model_id: Option<String>,
}

/// POST /summaries/{id}/tags request body
#[derive(Debug, Deserialize)]
pub struct TagsBody {
    #[serde(default = "default_caller")]
    pub caller_id: String,
}

fn default_caller() -> String {
    "anonymous".to_string()
}

/// Stable JSON error envelope.
///
/// Internal causes stay in server logs; the body carries only a generic
/// message plus the retry hint for rate-limited callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Wrapper mapping pipeline errors onto HTTP responses
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            AppError::Validation { .. } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: self.0.to_string(),
                    retry_after_seconds: None,
                },
            ),
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    error: "rate limit exceeded".to_string(),
                    retry_after_seconds: Some(*retry_after_secs),
                },
            ),
            AppError::Invocation(e) => {
                error!(error = %e, "Backend invocation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "AI backend invocation failed".to_string(),
                        retry_after_seconds: None,
                    },
                )
            }
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal server error".to_string(),
                        retry_after_seconds: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// POST /summarize
pub async fn summarize(
    State(state): State<SharedState>,
    Json(body): Json<SummarizeBody>,
) -> Result<Response, ApiError> {
    let mut params = SummarizeParams::new(body.text, body.caller_id);
    params.team_id = body.team_id;
    params.source_context = body.source_context;
    params.preferred_model_id = body.preferred_model_id;

    let result = state.summarize.process(params).await?;
    Ok(Json(result).into_response())
}

/// POST /summaries/{id}/tags
///
/// Premium denial and a missing summary are normal outcomes, returned in
/// the 200 success envelope rather than as HTTP errors.
pub async fn extract_tags(
    State(state): State<SharedState>,
    Path(summary_id): Path<String>,
    Json(body): Json<TagsBody>,
) -> Result<Response, ApiError> {
    let summary = state
        .storage
        .get_summary(&summary_id)
        .await
        .map_err(AppError::from)?;

    let Some(summary) = summary else {
        return Ok(Json(TaggingResult {
            success: false,
            tags: None,
            error: Some("summary not found".to_string()),
            processing_time_ms: 0,
        })
        .into_response());
    };

    let result = state
        .tagging
        .extract(TaggingParams {
            summary_id,
            summary_text: summary.text,
            caller_id: body.caller_id,
        })
        .await?;

    Ok(Json(result).into_response())
}

/// GET /models response
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelDescriptor>,
}

/// GET /models
pub async fn list_models(State(state): State<SharedState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.catalog.models().to_vec(),
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "recap-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
