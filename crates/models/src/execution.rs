use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire-format outcome of one executed statement.
///
/// The error variant is listed first so that untagged deserialization does
/// not mistake an error payload for a success with extra fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementOutcome {
    Error {
        error: bool,
        message: String,
        sqlstate: Option<String>,
    },
    Success {
        data: Vec<Value>,
        #[serde(rename = "affectedRows")]
        affected_rows: u64,
        #[serde(rename = "type")]
        kind: String,
    },
}

impl StatementOutcome {
    pub fn error(message: impl Into<String>, sqlstate: Option<String>) -> Self {
        StatementOutcome::Error {
            error: true,
            message: message.into(),
            sqlstate,
        }
    }

    pub fn success(data: Vec<Value>, affected_rows: u64, kind: impl Into<String>) -> Self {
        StatementOutcome::Success {
            data,
            affected_rows,
            kind: kind.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatementOutcome::Error { .. })
    }
}

/// Audit row recorded for every SQL execution made on a learner's behalf.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub user_id: i64,
    pub attempt_id: i64,
    pub executed_sql: String,
    pub action: String,
    pub received_reply: Value,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_outcome_serializes_with_wire_field_names() {
        let outcome = StatementOutcome::success(vec![json!({"id": 1})], 1, "SELECT");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["affectedRows"], 1);
        assert_eq!(value["type"], "SELECT");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn error_outcome_carries_sqlstate() {
        let outcome = StatementOutcome::error("relation missing", Some("42P01".into()));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["error"], true);
        assert_eq!(value["sqlstate"], "42P01");
    }
}
