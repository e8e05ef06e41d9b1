use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new().route("/attempts/:attempt_id/grade", post(grade_attempt))
}

/// Run the grading pass for an attempt and finalize it.
pub async fn grade_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let total = state.grader.grade_attempt(attempt_id).await?;
    let finalized = state.store.finalize_attempt(attempt_id).await?;

    info!(attempt_id, total, finalized, "grading complete");
    Ok(StatusCode::NO_CONTENT)
}
