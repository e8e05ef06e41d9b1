use thiserror::Error;

/// Error taxonomy for the sqlab core.
#[derive(Error, Debug)]
pub enum SqlabError {
    #[error("Validation error: {reason}")]
    Validation { reason: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Sandbox connection error: {reason}")]
    Connection { reason: String },

    #[error("SQL execution error: {message}")]
    Execution {
        message: String,
        sqlstate: Option<String>,
    },

    #[error("Schema operation failed: {reason}")]
    Schema { reason: String },

    #[error("Comparison setup failed: {reason}")]
    ComparisonSetup { reason: String },

    #[error("Crypto error: {reason}")]
    Crypto { reason: String },

    #[error("Provisioning failed: {reason}")]
    Provisioning { reason: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

impl SqlabError {
    pub fn validation(reason: impl Into<String>) -> Self {
        SqlabError::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        SqlabError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn connection(reason: impl Into<String>) -> Self {
        SqlabError::Connection {
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>, sqlstate: Option<String>) -> Self {
        SqlabError::Execution {
            message: message.into(),
            sqlstate,
        }
    }

    pub fn crypto(reason: impl Into<String>) -> Self {
        SqlabError::Crypto {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        SqlabError::Storage {
            reason: reason.into(),
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            SqlabError::Validation { .. } => 400,
            SqlabError::NotFound { .. } => 404,
            SqlabError::Execution { .. } => 422,
            SqlabError::ComparisonSetup { .. } => 422,
            SqlabError::Connection { .. } => 503,
            SqlabError::Schema { .. } => 500,
            SqlabError::Crypto { .. } => 500,
            SqlabError::Provisioning { .. } => 500,
            SqlabError::Storage { .. } => 500,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self {
            SqlabError::Validation { .. } => "validation",
            SqlabError::NotFound { .. } => "not_found",
            SqlabError::Connection { .. } => "connection",
            SqlabError::Execution { .. } => "execution",
            SqlabError::Schema { .. } => "schema",
            SqlabError::ComparisonSetup { .. } => "comparison",
            SqlabError::Crypto { .. } => "crypto",
            SqlabError::Provisioning { .. } => "provisioning",
            SqlabError::Storage { .. } => "storage",
        }
    }
}

/// Result type alias for sqlab operations
pub type SqlabResult<T> = Result<T, SqlabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_error_classes() {
        assert_eq!(SqlabError::validation("empty sql").status_code(), 400);
        assert_eq!(SqlabError::not_found("attempt", 7).status_code(), 404);
        assert_eq!(SqlabError::connection("refused").status_code(), 503);
        assert_eq!(
            SqlabError::execution("syntax error", Some("42601".into())).status_code(),
            422
        );
    }

    #[test]
    fn not_found_message_names_resource_and_id() {
        let err = SqlabError::not_found("attempt", 42);
        assert_eq!(err.to_string(), "attempt not found: 42");
        assert_eq!(err.category(), "not_found");
    }
}
