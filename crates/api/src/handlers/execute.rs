use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use sqlab_models::{AttemptState, ExecutionRecord, SqlabError, StatementOutcome};
use sqlab_sandbox::executor::execute_interactive;

use crate::error::ApiResult;
use crate::state::AppState;

/// Action marking a submission as an answer rather than exploratory work.
const ACTION_EVALUATE: &str = "evaluate";

pub fn create_router() -> Router<AppState> {
    Router::new().route("/attempts/:attempt_id/execute", post(execute_sql))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub sql: String,
    pub action: String,
    pub question_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub status: &'static str,
    pub results: Vec<StatementOutcome>,
}

/// Run learner SQL against their own sandbox database. An `evaluate` action
/// additionally stores the text as the answer for the given question.
pub async fn execute_sql(
    State(state): State<AppState>,
    Path(attempt_id): Path<i64>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Json<ExecuteResponse>> {
    if request.sql.trim().is_empty() {
        return Err(SqlabError::validation("sql must not be empty").into());
    }

    let attempt = state
        .store
        .get_attempt(attempt_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("attempt", attempt_id))?;

    if attempt.state != AttemptState::InProgress {
        return Err(SqlabError::validation(format!(
            "attempt {} is not in progress (state: {})",
            attempt_id,
            attempt.state.as_str()
        ))
        .into());
    }

    let activity = state
        .store
        .get_activity(attempt.activity_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("activity", attempt.activity_id))?;

    let credential = state
        .store
        .get_credentials(attempt.user_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("credentials", attempt.user_id))?;

    let results = execute_interactive(
        &state.sandbox,
        &state.vault,
        &credential,
        &activity.schema_name(),
        &request.sql,
    )
    .await?;

    if request.action == ACTION_EVALUATE {
        let question_id = request.question_id.ok_or_else(|| {
            SqlabError::validation("questionId is required when action is evaluate")
        })?;
        let question = state
            .store
            .get_question(question_id)
            .await?
            .ok_or_else(|| SqlabError::not_found("question", question_id))?;

        state
            .store
            .upsert_response(
                attempt_id,
                question_id,
                attempt.user_id,
                &request.sql,
                question.max_grade,
            )
            .await?;
    }

    // The audit trail must not take down a successful execution.
    let record = ExecutionRecord {
        user_id: attempt.user_id,
        attempt_id,
        executed_sql: request.sql.clone(),
        action: request.action.clone(),
        received_reply: serde_json::to_value(&results).unwrap_or_default(),
        timestamp: Utc::now(),
    };
    if let Err(e) = state.store.insert_execution_record(&record).await {
        warn!(attempt_id, error = %e, "failed to record execution");
    }

    Ok(Json(ExecuteResponse {
        status: "success",
        results,
    }))
}
