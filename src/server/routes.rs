use super::error::ApiError;
use crate::app::AppState;
use crate::models::{AnalysisRequest, AnalysisResponse, HealthResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub(super) async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let request_id = request_id(&headers);
    let span = info_span!("analyze", request_id = %request_id);

    async move {
        let Json(request) = payload.map_err(|rejection| {
            warn!("Rejecting /api/analyze body: {}", rejection.body_text());
            let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            ApiError::new(
                status,
                "validation",
                format!("Invalid request body: {}", rejection.body_text()),
            )
        })?;

        info!(images = request.images.len(), "Received /api/analyze request");

        match state.analyzer().analyze(request).await {
            Ok(result_text) => {
                info!("Analysis completed ({} chars)", result_text.len());
                Ok(Json(AnalysisResponse { result_text }))
            }
            Err(e) if e.is_client_side() => {
                warn!(kind = %e.kind(), "Analysis rejected: {}", e);
                Err(e.into())
            }
            Err(e) => {
                error!(kind = %e.kind(), "Analysis failed: {}", e);
                Err(e.into())
            }
        }
    }
    .instrument(span)
    .await
}

pub(super) async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

pub(super) async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Correlation id set by the request-id layer, or a fresh one.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
