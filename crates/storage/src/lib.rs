//! Platform-side persistence: users, activities, question fixtures,
//! attempts, responses, sandbox credentials and the execution audit log.

use sqlab_models::{
    Activity, Attempt, AttemptState, ExecutionRecord, QuestionFixture, QuestionResponse,
    SqlabResult, TenantCredential, UserProfile,
};

mod postgres;
pub use postgres::PgLabStore;

/// Storage seam for the grading service.
#[async_trait::async_trait]
pub trait LabStore: Send + Sync {
    async fn get_user(&self, user_id: i64) -> SqlabResult<Option<UserProfile>>;
    async fn get_activity(&self, activity_id: i64) -> SqlabResult<Option<Activity>>;

    /// Fixtures of an activity in question order.
    async fn get_questions(&self, activity_id: i64) -> SqlabResult<Vec<QuestionFixture>>;
    async fn get_question(&self, question_id: i64) -> SqlabResult<Option<QuestionFixture>>;

    /// Start a new attempt with the next 1-based attempt number for this
    /// learner and activity.
    async fn create_attempt(&self, activity_id: i64, user_id: i64) -> SqlabResult<Attempt>;
    async fn get_attempt(&self, attempt_id: i64) -> SqlabResult<Option<Attempt>>;

    /// Move an in-progress attempt to `finished`, stamping the finish time.
    /// Returns false when the attempt was not in progress.
    async fn finalize_attempt(&self, attempt_id: i64) -> SqlabResult<bool>;

    /// Externally driven state change (deadline expiry and the like).
    async fn update_attempt_state(&self, attempt_id: i64, state: AttemptState) -> SqlabResult<()>;

    async fn set_attempt_sum_grades(&self, attempt_id: i64, sum: f64) -> SqlabResult<()>;

    /// Store the learner's answer for a question. First submission inserts
    /// with an execution count of zero; later submissions overwrite the text
    /// and increment the count.
    async fn upsert_response(
        &self,
        attempt_id: i64,
        question_id: i64,
        user_id: i64,
        response: &str,
        max_grade: f64,
    ) -> SqlabResult<QuestionResponse>;

    async fn list_responses(&self, attempt_id: i64) -> SqlabResult<Vec<QuestionResponse>>;

    async fn set_response_grade(
        &self,
        response_id: i64,
        grade: f64,
        feedback: &str,
    ) -> SqlabResult<()>;

    async fn get_credentials(&self, user_id: i64) -> SqlabResult<Option<TenantCredential>>;
    async fn insert_credentials(
        &self,
        user_id: i64,
        role_name: &str,
        encrypted_password: &str,
    ) -> SqlabResult<TenantCredential>;

    async fn insert_execution_record(&self, record: &ExecutionRecord) -> SqlabResult<()>;
}
