//! Question answering endpoint

use axum::extract::State;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, AskRequest, AskResponse, Json};

/// POST /v1/ask
///
/// A client disconnect drops this future, which abandons the in-flight run.
pub async fn ask(State(state): State<AppState>, Json(body): Json<AskRequest>) -> Result<Json<AskResponse>, ApiError> {
    info!(
        question_chars = body.question.chars().count(),
        max_iterations = ?body.max_iterations,
        custom_weights = body.weights.is_some(),
        "Processing ask request"
    );

    let request = state.request(body.question, body.weights, body.max_iterations);
    let answer = state.pipeline.run(request).await?;

    Ok(Json(AskResponse::new(answer, body.include_diagnostics)))
}
