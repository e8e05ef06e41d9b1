use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use sqlab_models::{AttemptState, QuestionFixture, SqlabError, TenantCredential};
use sqlab_sandbox::connect::{connect, ConnectTarget, SandboxConnection};
use sqlab_sandbox::executor::execute_batch;
use sqlab_sandbox::schema;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/attempts", post(create_attempt))
        .route("/attempts/:attempt_id/finish", post(finish_attempt))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttemptRequest {
    pub activity_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttemptResponse {
    pub status: &'static str,
    pub attempt_id: i64,
    pub attempt: i32,
}

/// Start an attempt: record it, make sure the activity schema exists in the
/// learner's sandbox, and load every question's fixtures into it so
/// interactive execution has tables to work against.
pub async fn create_attempt(
    State(state): State<AppState>,
    Json(request): Json<CreateAttemptRequest>,
) -> ApiResult<Json<CreateAttemptResponse>> {
    let activity = state
        .store
        .get_activity(request.activity_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("activity", request.activity_id))?;
    state
        .store
        .get_user(request.user_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("user", request.user_id))?;

    let credential = state
        .store
        .get_credentials(request.user_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("credentials", request.user_id))?;

    let questions = state.store.get_questions(request.activity_id).await?;
    if questions.is_empty() {
        return Err(SqlabError::not_found("questions", request.activity_id).into());
    }

    let attempt = state
        .store
        .create_attempt(request.activity_id, request.user_id)
        .await?;

    prepare_sandbox(&state, &activity.schema_name(), &credential, &questions).await?;

    info!(
        attempt_id = attempt.id,
        user_id = attempt.user_id,
        activity_id = attempt.activity_id,
        number = attempt.attempt,
        "attempt started"
    );

    Ok(Json(CreateAttemptResponse {
        status: "success",
        attempt_id: attempt.id,
        attempt: attempt.attempt,
    }))
}

/// Create the activity schema (idempotent) and replay the question fixtures
/// with administrative credentials. The connection is closed on every exit
/// path.
async fn prepare_sandbox(
    state: &AppState,
    schema_name: &str,
    credential: &TenantCredential,
    questions: &[QuestionFixture],
) -> ApiResult<()> {
    let conn = connect(&ConnectTarget::admin(
        &state.sandbox,
        credential.database_name(),
    ))
    .await?;

    let result = replay_fixtures(&conn, schema_name, &credential.role_name, questions).await;
    conn.close().await;
    Ok(result?)
}

async fn replay_fixtures(
    conn: &SandboxConnection,
    schema_name: &str,
    role: &str,
    questions: &[QuestionFixture],
) -> Result<(), SqlabError> {
    schema::create_for_activity(conn, schema_name, role).await?;
    for batch in fixture_batches(questions) {
        execute_batch(conn, schema_name, batch).await?;
    }
    Ok(())
}

/// Fixture SQL in load order: every question's relational schema first, then
/// every question's seed data, so data scripts may reference tables defined
/// by any question.
fn fixture_batches(questions: &[QuestionFixture]) -> Vec<&str> {
    let schemas = questions
        .iter()
        .filter_map(|q| q.relational_schema.as_deref());
    let data = questions.iter().filter_map(|q| q.data_sql.as_deref());
    schemas.chain(data).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishAttemptRequest {
    /// Set when the activity deadline expired before submission.
    #[serde(default)]
    pub time_up: bool,
}

#[derive(Debug, Serialize)]
pub struct FinishAttemptResponse {
    pub status: &'static str,
    pub state: AttemptState,
}

pub async fn finish_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<i64>,
    Json(request): Json<FinishAttemptRequest>,
) -> ApiResult<Json<FinishAttemptResponse>> {
    let attempt = state
        .store
        .get_attempt(attempt_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("attempt", attempt_id))?;

    let final_state = if request.time_up {
        state
            .store
            .update_attempt_state(attempt_id, AttemptState::Overdue)
            .await?;
        AttemptState::Overdue
    } else {
        let finalized = state.store.finalize_attempt(attempt_id).await?;
        if !finalized {
            return Err(SqlabError::validation(format!(
                "attempt {} is not in progress (state: {})",
                attempt_id,
                attempt.state.as_str()
            ))
            .into());
        }
        AttemptState::Finished
    };

    Ok(Json(FinishAttemptResponse {
        status: "success",
        state: final_state,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, schema: Option<&str>, data: Option<&str>) -> QuestionFixture {
        QuestionFixture {
            id,
            activity_id: 1,
            position: id as i32,
            relational_schema: schema.map(str::to_string),
            data_sql: data.map(str::to_string),
            result_data: None,
            solution: None,
            sqlcheck: String::new(),
            sqlcheckrun: String::new(),
            decrease_attempt: 0.0,
            min_grade: 0.0,
            max_grade: 10.0,
        }
    }

    #[test]
    fn all_schemas_load_before_any_data() {
        let questions = vec![
            question(1, Some("CREATE TABLE a (id int);"), Some("INSERT INTO a VALUES (1);")),
            question(2, Some("CREATE TABLE b (id int);"), Some("INSERT INTO b VALUES (2);")),
        ];
        let batches = fixture_batches(&questions);
        assert_eq!(
            batches,
            vec![
                "CREATE TABLE a (id int);",
                "CREATE TABLE b (id int);",
                "INSERT INTO a VALUES (1);",
                "INSERT INTO b VALUES (2);",
            ]
        );
    }

    #[test]
    fn questions_without_fixtures_are_skipped() {
        let questions = vec![
            question(1, None, None),
            question(2, Some("CREATE TABLE t (id int);"), None),
            question(3, None, Some("INSERT INTO t VALUES (3);")),
        ];
        let batches = fixture_batches(&questions);
        assert_eq!(
            batches,
            vec!["CREATE TABLE t (id int);", "INSERT INTO t VALUES (3);"]
        );
    }
}
