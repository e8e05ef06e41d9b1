use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::info;

use sqlab_models::{
    Activity, Attempt, AttemptState, ExecutionRecord, QuestionFixture, QuestionResponse,
    SqlabError, SqlabResult, TenantCredential, UserProfile,
};

use crate::LabStore;

/// Database row for the attempts table
#[derive(Debug, FromRow)]
struct AttemptRow {
    id: i64,
    activity_id: i64,
    user_id: i64,
    attempt: i32,
    state: String,
    time_start: DateTime<Utc>,
    time_finish: Option<DateTime<Utc>>,
    sum_grades: f64,
}

impl AttemptRow {
    fn into_model(self) -> SqlabResult<Attempt> {
        let state = AttemptState::parse(&self.state).ok_or_else(|| {
            SqlabError::storage(format!("unknown attempt state '{}'", self.state))
        })?;
        Ok(Attempt {
            id: self.id,
            activity_id: self.activity_id,
            user_id: self.user_id,
            attempt: self.attempt,
            state,
            time_start: self.time_start,
            time_finish: self.time_finish,
            sum_grades: self.sum_grades,
        })
    }
}

/// Database row for the responses table
#[derive(Debug, FromRow)]
struct ResponseRow {
    id: i64,
    attempt_id: i64,
    question_id: i64,
    user_id: i64,
    response: String,
    execution_count: i32,
    current_max_grade: f64,
    grade_obtained: Option<f64>,
    feedback: Option<String>,
}

impl From<ResponseRow> for QuestionResponse {
    fn from(row: ResponseRow) -> Self {
        QuestionResponse {
            id: row.id,
            attempt_id: row.attempt_id,
            question_id: row.question_id,
            user_id: row.user_id,
            response: row.response,
            execution_count: row.execution_count,
            current_max_grade: row.current_max_grade,
            grade_obtained: row.grade_obtained,
            feedback: row.feedback,
        }
    }
}

/// Database row for the questions table
#[derive(Debug, FromRow)]
struct QuestionRow {
    id: i64,
    activity_id: i64,
    slot: i32,
    relational_schema: Option<String>,
    data_sql: Option<String>,
    result_data: Option<String>,
    solution: Option<String>,
    sqlcheck: String,
    sqlcheckrun: String,
    decrease_attempt: f64,
    min_grade: f64,
    max_grade: f64,
}

impl From<QuestionRow> for QuestionFixture {
    fn from(row: QuestionRow) -> Self {
        QuestionFixture {
            id: row.id,
            activity_id: row.activity_id,
            position: row.slot,
            relational_schema: row.relational_schema,
            data_sql: row.data_sql,
            result_data: row.result_data,
            solution: row.solution,
            sqlcheck: row.sqlcheck,
            sqlcheckrun: row.sqlcheckrun,
            decrease_attempt: row.decrease_attempt,
            min_grade: row.min_grade,
            max_grade: row.max_grade,
        }
    }
}

/// Database row for the credentials table
#[derive(Debug, FromRow)]
struct CredentialRow {
    user_id: i64,
    role_name: String,
    encrypted_password: String,
    created_at: DateTime<Utc>,
}

impl From<CredentialRow> for TenantCredential {
    fn from(row: CredentialRow) -> Self {
        TenantCredential {
            user_id: row.user_id,
            role_name: row.role_name,
            encrypted_password: row.encrypted_password,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: i64,
    name: String,
}

fn db_err(e: sqlx::Error) -> SqlabError {
    SqlabError::storage(e.to_string())
}

/// PostgreSQL-backed platform store.
pub struct PgLabStore {
    pool: PgPool,
}

impl PgLabStore {
    pub async fn new(database_url: &str) -> SqlabResult<Self> {
        info!("Connecting to platform database");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| SqlabError::storage(format!("database connect failed: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| SqlabError::storage(format!("migrations failed: {}", e)))?;

        info!("Platform database ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const QUESTION_COLUMNS: &str = "id, activity_id, slot, relational_schema, data_sql, \
     result_data, solution, sqlcheck, sqlcheckrun, decrease_attempt, min_grade, max_grade";

const ATTEMPT_COLUMNS: &str =
    "id, activity_id, user_id, attempt, state, time_start, time_finish, sum_grades";

const RESPONSE_COLUMNS: &str = "id, attempt_id, question_id, user_id, response, \
     execution_count, current_max_grade, grade_obtained, feedback";

#[async_trait::async_trait]
impl LabStore for PgLabStore {
    async fn get_user(&self, user_id: i64) -> SqlabResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, first_name, last_name FROM sqlab_users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|r| UserProfile {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
        }))
    }

    async fn get_activity(&self, activity_id: i64) -> SqlabResult<Option<Activity>> {
        let row =
            sqlx::query_as::<_, ActivityRow>("SELECT id, name FROM sqlab_activities WHERE id = $1")
                .bind(activity_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(|r| Activity {
            id: r.id,
            name: r.name,
        }))
    }

    async fn get_questions(&self, activity_id: i64) -> SqlabResult<Vec<QuestionFixture>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM sqlab_questions WHERE activity_id = $1 ORDER BY slot",
            QUESTION_COLUMNS
        ))
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_question(&self, question_id: i64) -> SqlabResult<Option<QuestionFixture>> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM sqlab_questions WHERE id = $1",
            QUESTION_COLUMNS
        ))
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Into::into))
    }

    async fn create_attempt(&self, activity_id: i64, user_id: i64) -> SqlabResult<Attempt> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "INSERT INTO sqlab_attempts (activity_id, user_id, attempt, state) \
             SELECT $1, $2, COALESCE(MAX(attempt), 0) + 1, 'inprogress' \
             FROM sqlab_attempts WHERE activity_id = $1 AND user_id = $2 \
             RETURNING {}",
            ATTEMPT_COLUMNS
        ))
        .bind(activity_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.into_model()
    }

    async fn get_attempt(&self, attempt_id: i64) -> SqlabResult<Option<Attempt>> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM sqlab_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(AttemptRow::into_model).transpose()
    }

    async fn finalize_attempt(&self, attempt_id: i64) -> SqlabResult<bool> {
        let result = sqlx::query(
            "UPDATE sqlab_attempts SET state = 'finished', time_finish = now() \
             WHERE id = $1 AND state = 'inprogress'",
        )
        .bind(attempt_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_attempt_state(&self, attempt_id: i64, state: AttemptState) -> SqlabResult<()> {
        sqlx::query("UPDATE sqlab_attempts SET state = $2 WHERE id = $1")
            .bind(attempt_id)
            .bind(state.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_attempt_sum_grades(&self, attempt_id: i64, sum: f64) -> SqlabResult<()> {
        sqlx::query("UPDATE sqlab_attempts SET sum_grades = $2 WHERE id = $1")
            .bind(attempt_id)
            .bind(sum)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_response(
        &self,
        attempt_id: i64,
        question_id: i64,
        user_id: i64,
        response: &str,
        max_grade: f64,
    ) -> SqlabResult<QuestionResponse> {
        let row = sqlx::query_as::<_, ResponseRow>(&format!(
            "INSERT INTO sqlab_responses \
             (attempt_id, question_id, user_id, response, execution_count, current_max_grade) \
             VALUES ($1, $2, $3, $4, 0, $5) \
             ON CONFLICT (attempt_id, question_id, user_id) DO UPDATE SET \
             response = EXCLUDED.response, \
             execution_count = sqlab_responses.execution_count + 1 \
             RETURNING {}",
            RESPONSE_COLUMNS
        ))
        .bind(attempt_id)
        .bind(question_id)
        .bind(user_id)
        .bind(response)
        .bind(max_grade)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.into())
    }

    async fn list_responses(&self, attempt_id: i64) -> SqlabResult<Vec<QuestionResponse>> {
        let rows = sqlx::query_as::<_, ResponseRow>(&format!(
            "SELECT r.{} FROM sqlab_responses r \
             JOIN sqlab_questions q ON q.id = r.question_id \
             WHERE r.attempt_id = $1 ORDER BY q.slot",
            RESPONSE_COLUMNS.replace(", ", ", r."),
        ))
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_response_grade(
        &self,
        response_id: i64,
        grade: f64,
        feedback: &str,
    ) -> SqlabResult<()> {
        sqlx::query("UPDATE sqlab_responses SET grade_obtained = $2, feedback = $3 WHERE id = $1")
            .bind(response_id)
            .bind(grade)
            .bind(feedback)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_credentials(&self, user_id: i64) -> SqlabResult<Option<TenantCredential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT user_id, role_name, encrypted_password, created_at \
             FROM sqlab_db_credentials WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Into::into))
    }

    async fn insert_credentials(
        &self,
        user_id: i64,
        role_name: &str,
        encrypted_password: &str,
    ) -> SqlabResult<TenantCredential> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "INSERT INTO sqlab_db_credentials (user_id, role_name, encrypted_password) \
             VALUES ($1, $2, $3) \
             RETURNING user_id, role_name, encrypted_password, created_at",
        )
        .bind(user_id)
        .bind(role_name)
        .bind(encrypted_password)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.into())
    }

    async fn insert_execution_record(&self, record: &ExecutionRecord) -> SqlabResult<()> {
        sqlx::query(
            "INSERT INTO sqlab_code_executions \
             (user_id, attempt_id, executed_sql, action, received_reply, executed_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.user_id)
        .bind(record.attempt_id)
        .bind(&record.executed_sql)
        .bind(&record.action)
        .bind(&record.received_reply)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
