use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use sqlab_models::SqlabError;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub category: &'static str,
}

/// Handler-level error wrapper mapping the domain taxonomy to HTTP.
#[derive(Debug)]
pub struct ApiError(pub SqlabError);

impl From<SqlabError> for ApiError {
    fn from(err: SqlabError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            status: "error",
            message: self.0.to_string(),
            category: self.0.category(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404_with_category() {
        let response = ApiError(SqlabError::not_found("attempt", 9)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn execution_errors_are_unprocessable() {
        let err = ApiError(SqlabError::execution("syntax error", Some("42601".into())));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
