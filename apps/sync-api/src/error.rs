//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                                │
//! │  Result<T, ApiError>                                                    │
//! │       │                                                                 │
//! │       ├── SyncError::InvalidSignature ──────► 401 INVALID_SIGNATURE     │
//! │       ├── SyncError::Forbidden ─────────────► 403 FORBIDDEN             │
//! │       ├── SyncError::InvalidPayload ────────► 400 INVALID_PAYLOAD       │
//! │       ├── SyncError::UnsupportedEvent ──────► 400 UNSUPPORTED_EVENT     │
//! │       ├── SyncError::WebhookNotConfigured ──► 503 WEBHOOK_NOT_CONFIGURED│
//! │       ├── ERP / transport errors ───────────► 502 ERP_ERROR             │
//! │       └── database / internal ──────────────► 500                       │
//! │                                                                         │
//! │  Body: { "success": false, "message": "...", "code": "..." }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use stockbridge_db::DbError;
use stockbridge_sync::SyncError;

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    InvalidPayload,
    UnsupportedEvent,
    ValidationError,
    InvalidSignature,
    Forbidden,
    WebhookNotConfigured,
    ErpAuthFailed,
    ErpError,
    DatabaseError,
    ConfigError,
    Internal,
}

/// Error returned from handlers.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    code: ErrorCode,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Internal,
            message,
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::InvalidSignature => {
                ApiError::new(StatusCode::UNAUTHORIZED, ErrorCode::InvalidSignature, message)
            }
            SyncError::Forbidden => {
                ApiError::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
            }
            SyncError::InvalidPayload(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidPayload, message)
            }
            SyncError::UnsupportedEvent(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::UnsupportedEvent, message)
            }
            SyncError::Validation(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
            }
            SyncError::WebhookNotConfigured => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::WebhookNotConfigured,
                message,
            ),
            SyncError::InvalidToken | SyncError::AuthenticationFailed(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, ErrorCode::ErpAuthFailed, message)
            }
            SyncError::ConnectionFailed(_)
            | SyncError::Timeout(_)
            | SyncError::HttpStatus { .. }
            | SyncError::ErpRejected(_)
            | SyncError::InvalidResponse(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, ErrorCode::ErpError, message)
            }
            SyncError::Database(detail) => {
                tracing::error!(error = %detail, "Database error");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DatabaseError,
                    "Database operation failed",
                )
            }
            SyncError::InvalidConfig(_)
            | SyncError::InvalidUrl(_)
            | SyncError::ConfigLoadFailed(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ConfigError,
                message,
            ),
            SyncError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Database error");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::DatabaseError,
            "Database operation failed",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_status_mapping() {
        let cases = [
            (SyncError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (SyncError::Forbidden, StatusCode::FORBIDDEN),
            (
                SyncError::InvalidPayload("bad json".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                SyncError::UnsupportedEvent("order.created".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                SyncError::WebhookNotConfigured,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (SyncError::Timeout(30), StatusCode::BAD_GATEWAY),
            (
                SyncError::Database("pool closed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_database_detail_not_exposed() {
        let err = ApiError::from(SyncError::Database("password authentication failed".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("password"));
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::WebhookNotConfigured).unwrap();
        assert_eq!(json, "\"WEBHOOK_NOT_CONFIGURED\"");
    }
}
