use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use sqlab_models::SqlabError;
use sqlab_sandbox::connect::{connect, ConnectTarget};
use sqlab_sandbox::executor::execute_batch_fetch;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new().route(
        "/attempts/:attempt_id/questions/:question_id/expected",
        post(expected_results),
    )
}

#[derive(Debug, Serialize)]
pub struct ExpectedResultsResponse {
    pub status: &'static str,
    pub rows: Vec<Value>,
}

/// Replay the question's stored expected-result query in the learner's
/// schema with administrative credentials and return the rows.
pub async fn expected_results(
    State(state): State<AppState>,
    Path((attempt_id, question_id)): Path<(i64, i64)>,
) -> ApiResult<Json<ExpectedResultsResponse>> {
    let attempt = state
        .store
        .get_attempt(attempt_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("attempt", attempt_id))?;

    let activity = state
        .store
        .get_activity(attempt.activity_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("activity", attempt.activity_id))?;

    let question = state
        .store
        .get_question(question_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("question", question_id))?;

    let result_sql = question.result_data.as_deref().ok_or_else(|| {
        SqlabError::validation(format!(
            "question {} has no stored expected results",
            question_id
        ))
    })?;

    let credential = state
        .store
        .get_credentials(attempt.user_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("credentials", attempt.user_id))?;

    let conn = connect(&ConnectTarget::admin(
        &state.sandbox,
        credential.database_name(),
    ))
    .await?;

    let result = execute_batch_fetch(&conn, &activity.schema_name(), result_sql).await;
    conn.close().await;

    Ok(Json(ExpectedResultsResponse {
        status: "success",
        rows: result?,
    }))
}
