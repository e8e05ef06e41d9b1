use serde::Serialize;

/// A lab activity. Its sanitized name doubles as the per-activity schema
/// name inside every learner database.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
}

impl Activity {
    pub fn schema_name(&self) -> String {
        crate::naming::format_activity_name(&self.name)
    }
}

/// Authoring-side definition of one question: the fixture SQL, the solution,
/// the check query and the grading parameters.
#[derive(Debug, Clone)]
pub struct QuestionFixture {
    pub id: i64,
    pub activity_id: i64,
    pub position: i32,
    /// DDL establishing the tables the question works against.
    pub relational_schema: Option<String>,
    /// Seed rows loaded after the schema.
    pub data_sql: Option<String>,
    /// SQL producing the expected result set, shown to learners on demand.
    pub result_data: Option<String>,
    /// Reference answer, usually a CREATE VIEW over the expected output.
    pub solution: Option<String>,
    /// DDL creating the comparison views used by `sqlcheckrun`.
    pub sqlcheck: String,
    /// Query invoking the comparison function over those views.
    pub sqlcheckrun: String,
    pub decrease_attempt: f64,
    pub min_grade: f64,
    pub max_grade: f64,
}

/// Minimal learner profile, enough to derive a sandbox database name.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl UserProfile {
    pub fn database_name(&self) -> String {
        crate::naming::format_database_name(&self.first_name, &self.last_name, self.id)
    }
}
