//! Intent endpoint: maps the request/response contract onto the dataset's classifier.
//!
//! Input rejections become 400 with a human-readable `detail`; embedding provider
//! failures become 503 so callers can tell "bad message" from "service degraded".

use crate::AppState;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use intent_core::{ClassificationResult, ClassifyError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct IntentRequest {
    pub(crate) user_message: String,
    /// Knowledge base to classify against. Missing or unknown names use the default dataset.
    #[serde(default)]
    pub(crate) dataset: Option<String>,
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        let status = if err.is_input() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            axum::Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// POST /api/v1/intent (alias POST /encontrar-intencion)
pub(crate) async fn find_intent(
    State(state): State<AppState>,
    Json(req): Json<IntentRequest>,
) -> Result<axum::Json<ClassificationResult>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let classifier = state.datasets.resolve(req.dataset.as_deref());
    tracing::info!(
        %request_id,
        dataset = classifier.context().dataset(),
        chars = req.user_message.chars().count(),
        "Intent request received"
    );

    match classifier.classify(&req.user_message).await {
        Ok(result) => {
            tracing::info!(
                %request_id,
                intent = result.intent.as_str(),
                confidence = result.confidence,
                method = ?result.method,
                "Intent resolved"
            );
            Ok(axum::Json(result))
        }
        Err(e) => {
            if e.is_input() {
                tracing::info!(%request_id, reason = %e, "Intent request rejected");
            } else {
                tracing::error!(%request_id, error = %e, "Intent classification failed");
            }
            Err(ApiError::from(e))
        }
    }
}
