use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::extractors::AppJson;
use crate::metrics::record_explanation;
use crate::models::{ExplainErrorBody, ExplainRequest, ExplainResponse};
use crate::services::completion_service::CompletionError;
use crate::services::AppState;

pub const EXPLAIN_FAILED: &str = "Failed to generate explanation";

#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("{0}")]
    InvalidBody(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("{0}")]
    Unauthorized(String),
}

impl IntoResponse for ExplainError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ExplainError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ExplainError::InvalidBody(_) | ExplainError::Completion(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, EXPLAIN_FAILED)
            }
        };

        let body = ExplainErrorBody {
            error: error.to_string(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn explain(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ExplainRequest>,
) -> Result<Json<ExplainResponse>, ExplainError> {
    tracing::info!(
        "Explanation requested: {} lines of code, expected output {:?}",
        req.code.lines().count(),
        req.correct_output
    );

    match state.completion.explain(&req.code, &req.correct_output).await {
        Ok(explanation) => {
            record_explanation("success");
            Ok(Json(ExplainResponse { explanation }))
        }
        Err(e) => {
            tracing::error!("Failed to generate explanation: {}", e);
            record_explanation("error");
            Err(e.into())
        }
    }
}
