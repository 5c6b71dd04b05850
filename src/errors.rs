// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for the trip location service

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Every variant maps to an HTTP status code and a JSON error body.
/// Pipeline stages that only enrich data (photo lookups, coordinate backfill)
/// log these instead of returning them to callers.
#[derive(Error, Debug)]
pub enum TripError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden access")]
    Forbidden,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl TripError {
    fn code(&self) -> &'static str {
        match self {
            TripError::NotFound(_) => "NOT_FOUND",
            TripError::DatabaseError(_) => "DATABASE_ERROR",
            TripError::InvalidInput(_) => "INVALID_INPUT",
            TripError::ValidationError(_) => "VALIDATION_ERROR",
            TripError::Unauthorized => "UNAUTHORIZED",
            TripError::Forbidden => "FORBIDDEN",
            TripError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            TripError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }
}

/// Convert TripError to HTTP response
impl ResponseError for TripError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            TripError::NotFound(_) => StatusCode::NOT_FOUND,
            TripError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TripError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TripError::ValidationError(_) => StatusCode::BAD_REQUEST,
            TripError::Unauthorized => StatusCode::UNAUTHORIZED,
            TripError::Forbidden => StatusCode::FORBIDDEN,
            TripError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            TripError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<sqlx::Error> for TripError {
    fn from(e: sqlx::Error) -> Self {
        log::error!("Database operation failed: {}", e);
        TripError::DatabaseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TripError::NotFound("1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TripError::ExternalApiError("boom".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            TripError::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(TripError::Unauthorized.code(), "UNAUTHORIZED");
        assert_eq!(TripError::ValidationError("x".to_string()).code(), "VALIDATION_ERROR");
    }
}
