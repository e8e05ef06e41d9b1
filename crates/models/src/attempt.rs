use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an attempt. The transition to `Overdue` is driven by an
/// external deadline, never by the grading core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptState {
    InProgress,
    Finished,
    Overdue,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::InProgress => "inprogress",
            AttemptState::Finished => "finished",
            AttemptState::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inprogress" => Some(AttemptState::InProgress),
            "finished" => Some(AttemptState::Finished),
            "overdue" => Some(AttemptState::Overdue),
            _ => None,
        }
    }
}

/// One attempt of an activity by one learner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub activity_id: i64,
    pub user_id: i64,
    /// 1-based, monotonic per (user, activity).
    pub attempt: i32,
    pub state: AttemptState,
    pub time_start: DateTime<Utc>,
    pub time_finish: Option<DateTime<Utc>>,
    pub sum_grades: f64,
}

/// A learner's stored answer for one question within an attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub user_id: i64,
    pub response: String,
    /// Incremented once per evaluate action, not per run.
    pub execution_count: i32,
    pub current_max_grade: f64,
    pub grade_obtained: Option<f64>,
    pub feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_state_round_trips_through_text() {
        for state in [
            AttemptState::InProgress,
            AttemptState::Finished,
            AttemptState::Overdue,
        ] {
            assert_eq!(AttemptState::parse(state.as_str()), Some(state));
        }
        assert_eq!(AttemptState::parse("abandoned"), None);
    }
}
