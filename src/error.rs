// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::models::ValidationError;
use crate::database::DatabaseError;
use crate::filter::FilterError;

/// HTTP API error with its status code and response body
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 403 Forbidden: no `Authorization: Bearer` header
    AuthMissing,

    // 403 Forbidden: token failed verification
    AuthInvalid(String),

    // 403 Forbidden: ownership rules
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error, message passed through
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthMissing => StatusCode::FORBIDDEN,
            ApiError::AuthInvalid(_) => StatusCode::FORBIDDEN,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::AuthMissing => "Not authorized. No token provided",
            ApiError::AuthInvalid(_) => "Wrong or expired token",
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Auth failures answer with `{ msg, error? }`, everything else with `{ error }`.
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::AuthMissing => json!({ "msg": self.message() }),
            ApiError::AuthInvalid(reason) => json!({
                "msg": self.message(),
                "error": reason
            }),
            _ => json!({ "error": self.message() }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn auth_invalid(reason: impl Into<String>) -> Self {
        ApiError::AuthInvalid(reason.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::internal_server_error(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::AuthInvalid(reason) => write!(f, "{}: {}", self.message(), reason),
            _ => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
