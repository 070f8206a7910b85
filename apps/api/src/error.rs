//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler -> ApiResult<T>                                                │
//! │       │                                                                 │
//! │       ├── ValidationError (warren-core) ───────────► 400               │
//! │       ├── CoreError (stock, transition, slip) ─────► 409               │
//! │       ├── DbError::NotFound ───────────────────────► 404               │
//! │       ├── DbError::UniqueViolation / FK ───────────► 409               │
//! │       ├── Rejection (bad JSON, multipart, path) ───► 400 / 413 / 415   │
//! │       └── anything else ───────────────────────────► 500, logged       │
//! │                                                                         │
//! │  Body: {"code": "NOT_FOUND", "message": "Rabbit not found: 7"}         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures never leak their detail to clients: the real error is
//! logged and the body carries a generic message.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};
use warren_core::{CoreError, ValidationError};
use warren_db::DbError;

/// Error body returned by every failing endpoint.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for product-4: available 1, requested 3" }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or invalid input (400)
    ValidationError,

    /// Missing or wrong admin token (401)
    Unauthorized,

    /// Resource not found (404)
    NotFound,

    /// Duplicate, referenced, or otherwise conflicting state (409)
    Conflict,

    /// Not enough stock, or the rabbit is already taken (409)
    InsufficientStock,

    /// Order or loan cannot move to the requested status (409)
    InvalidTransition,

    /// Upload exceeds the configured size limit (413)
    PayloadTooLarge,

    /// Upload is not an accepted image type (415)
    UnsupportedMediaType,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict | ErrorCode::InsufficientStock | ErrorCode::InvalidTransition => {
                StatusCode::CONFLICT
            }
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized() -> Self {
        ApiError::new(ErrorCode::Unauthorized, "Missing or invalid admin token")
    }

    /// Logs `detail` and returns an error with a generic message.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        ApiError::new(ErrorCode::Internal, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Maps an axum extractor rejection, keeping its status class.
    fn from_rejection(status: StatusCode, text: String) -> Self {
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::new(ErrorCode::PayloadTooLarge, text),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                ApiError::new(ErrorCode::UnsupportedMediaType, text)
            }
            s if s.is_server_error() => ApiError::internal(text),
            _ => ApiError::validation(text),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                warn!(%message, "Foreign key violation");
                ApiError::new(
                    ErrorCode::Conflict,
                    "Record is still referenced by other records",
                )
            }
            DbError::Domain(core) => core.into(),
            DbError::PoolExhausted => {
                error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again")
            }
            other => {
                // Log the actual error but return a generic message
                error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(v) => v.into(),
            CoreError::InsufficientStock { .. } | CoreError::RabbitUnavailable { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::InvalidTransition { .. } => {
                ApiError::new(ErrorCode::InvalidTransition, message)
            }
            CoreError::NotABreeder(_)
            | CoreError::ItemNotForSale(_)
            | CoreError::MissingSlip(_)
            | CoreError::TooManyLines { .. } => ApiError::new(ErrorCode::Conflict, message),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::from_rejection(err.status(), err.body_text())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(err)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let (status, body) = body_json(DbError::not_found("Rabbit", 7).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "Rabbit not found: 7");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let err: ApiError = DbError::QueryFailed("no such column: secret_col".into()).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "DATABASE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("secret_col"));
    }

    #[test]
    fn test_domain_errors_map_to_conflict() {
        let stock: ApiError = DbError::Domain(CoreError::InsufficientStock {
            item: "product-4".into(),
            available: 1,
            requested: 3,
        })
        .into();
        assert_eq!(stock.code, ErrorCode::InsufficientStock);
        assert_eq!(stock.status(), StatusCode::CONFLICT);

        let transition: ApiError = CoreError::InvalidTransition {
            entity: "order".into(),
            from: "completed".into(),
            action: "cancel".into(),
        }
        .into();
        assert_eq!(transition.status(), StatusCode::CONFLICT);

        let duplicate: ApiError = DbError::duplicate("email", "a@b.test").into();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = ValidationError::Required {
            field: "phone".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "phone is required");

        let wrapped: ApiError = CoreError::Validation(ValidationError::MustBePositive {
            field: "quantity".into(),
        })
        .into();
        assert_eq!(wrapped.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_rejection_status_classes() {
        assert_eq!(
            ApiError::from_rejection(StatusCode::PAYLOAD_TOO_LARGE, "big".into()).code,
            ErrorCode::PayloadTooLarge
        );
        assert_eq!(
            ApiError::from_rejection(StatusCode::UNPROCESSABLE_ENTITY, "bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
