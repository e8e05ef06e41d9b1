//! Attempt grading: replays fixtures and learner answers inside a clean
//! activity schema, compares result views row by row and persists grades.

pub mod compare;

use std::sync::Arc;

use tracing::{info, warn};

use sqlab_models::{QuestionFixture, QuestionResponse, SqlabError, SqlabResult, TenantCredential};
use sqlab_sandbox::connect::{connect, ConnectTarget, SandboxConfig, SandboxConnection};
use sqlab_sandbox::executor::{execute_batch, execute_batch_fetch, execution_error};
use sqlab_sandbox::schema;
use sqlab_sandbox::util::quote_ident;
use sqlab_storage::LabStore;

use compare::{
    decayed_max_grade, extract_view_names, render_feedback_table, ComparisonRow,
    ALL_CORRECT_FEEDBACK, COMPARISON_FUNCTION_SQL, NO_RESPONSE_FEEDBACK,
};

/// Lock key serializing grading against interactive execution for one
/// learner and activity.
fn advisory_key(user_id: i64, activity_id: i64) -> i64 {
    (user_id << 32) ^ (activity_id & 0xFFFF_FFFF)
}

/// Grades whole attempts. Stateless; all connection parameters come from the
/// injected sandbox config.
pub struct GradingEngine {
    config: SandboxConfig,
    store: Arc<dyn LabStore>,
}

impl GradingEngine {
    pub fn new(config: SandboxConfig, store: Arc<dyn LabStore>) -> Self {
        Self { config, store }
    }

    /// Run the grading pass for one attempt and return the grade total.
    ///
    /// On any failure no grades are persisted, but the activity schema is
    /// dropped, the advisory lock released and the connection closed before
    /// the error is returned.
    pub async fn grade_attempt(&self, attempt_id: i64) -> SqlabResult<f64> {
        let attempt = self
            .store
            .get_attempt(attempt_id)
            .await?
            .ok_or_else(|| SqlabError::not_found("attempt", attempt_id))?;

        let activity = self
            .store
            .get_activity(attempt.activity_id)
            .await?
            .ok_or_else(|| SqlabError::not_found("activity", attempt.activity_id))?;

        let credential = self
            .store
            .get_credentials(attempt.user_id)
            .await?
            .ok_or_else(|| SqlabError::not_found("credentials", attempt.user_id))?;

        let schema_name = activity.schema_name();
        if schema_name.is_empty() {
            return Err(SqlabError::validation(
                "activity name yields an empty schema name",
            ));
        }

        let questions = self.store.get_questions(activity.id).await?;
        let responses = self.store.list_responses(attempt_id).await?;

        let conn = connect(&ConnectTarget::admin(&self.config, credential.database_name())).await?;

        let lock_key = advisory_key(attempt.user_id, attempt.activity_id);
        let lock_result = conn
            .client
            .execute("SELECT pg_advisory_lock($1)", &[&lock_key])
            .await
            .map_err(|e| execution_error(&e));

        let result = match lock_result {
            Ok(_) => {
                let result = self
                    .run_pass(&conn, &schema_name, &credential, &questions, &responses, attempt_id)
                    .await;

                if let Err(e) = schema::drop_schema(&conn, &schema_name).await {
                    warn!(attempt_id, error = %e, "post-grading schema drop failed");
                }
                if let Err(e) = conn
                    .client
                    .execute("SELECT pg_advisory_unlock($1)", &[&lock_key])
                    .await
                {
                    warn!(attempt_id, error = %e, "advisory unlock failed");
                }
                result
            }
            Err(e) => Err(e),
        };

        conn.close().await;

        if let Ok(total) = &result {
            info!(attempt_id, total, "attempt graded");
        }
        result
    }

    async fn run_pass(
        &self,
        conn: &SandboxConnection,
        schema_name: &str,
        credential: &TenantCredential,
        questions: &[QuestionFixture],
        responses: &[QuestionResponse],
        attempt_id: i64,
    ) -> SqlabResult<f64> {
        schema::drop_schema(conn, schema_name).await?;
        schema::create_for_activity(conn, schema_name, &credential.role_name).await?;

        let mut total = 0.0;
        let mut grades = Vec::with_capacity(responses.len());

        for response in responses {
            let question = questions
                .iter()
                .find(|q| q.id == response.question_id)
                .ok_or_else(|| SqlabError::not_found("question", response.question_id))?;

            let (grade, feedback) = grade_question(conn, schema_name, question, response).await?;
            grades.push((response.id, grade, feedback));
            total += grade;
        }

        // Persist only after every question graded cleanly.
        for (response_id, grade, feedback) in grades {
            self.store
                .set_response_grade(response_id, grade, &feedback)
                .await?;
        }
        self.store.set_attempt_sum_grades(attempt_id, total).await?;

        Ok(total)
    }
}

/// Grade one response inside the prepared schema. Returns the grade and the
/// feedback text.
async fn grade_question(
    conn: &SandboxConnection,
    schema_name: &str,
    question: &QuestionFixture,
    response: &QuestionResponse,
) -> SqlabResult<(f64, String)> {
    if response.response.trim().is_empty() {
        return Ok((0.0, NO_RESPONSE_FEEDBACK.to_string()));
    }

    let max_grade = decayed_max_grade(
        response.current_max_grade,
        response.execution_count,
        question.decrease_attempt,
        question.min_grade,
    );

    if let Some(ddl) = &question.relational_schema {
        execute_batch(conn, schema_name, ddl).await?;
    }
    if let Some(data) = &question.data_sql {
        execute_batch(conn, schema_name, data).await?;
    }

    // Replay the learner's answer, then install the evaluator and the
    // question's comparison views.
    execute_batch(conn, schema_name, &response.response).await?;
    execute_batch(conn, schema_name, COMPARISON_FUNCTION_SQL).await?;
    execute_batch(conn, schema_name, &question.sqlcheck).await?;

    let (view1, view2) = extract_view_names(&question.sqlcheckrun)?;

    let raw_rows = execute_batch_fetch(conn, schema_name, &question.sqlcheckrun).await?;
    let rows = raw_rows
        .iter()
        .map(ComparisonRow::from_value)
        .collect::<SqlabResult<Vec<_>>>()?;
    let all_correct = rows.iter().all(|r| r.is_row_correct);

    // The views would collide with the next question's check otherwise.
    let drop_views = format!(
        "DROP VIEW IF EXISTS {}, {};",
        quote_ident(&view1),
        quote_ident(&view2)
    );
    execute_batch(conn, schema_name, &drop_views).await?;

    if all_correct {
        Ok((max_grade, ALL_CORRECT_FEEDBACK.to_string()))
    } else {
        Ok((0.0, render_feedback_table(&rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_keys_differ_across_users_and_activities() {
        let a = advisory_key(1, 10);
        let b = advisory_key(2, 10);
        let c = advisory_key(1, 11);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, advisory_key(1, 10));
    }
}
