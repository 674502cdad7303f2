use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth and user directory errors
/// - E2xxx: Catalog (car listing) errors
/// - E3xxx: Rating errors
/// - E4xxx: Report errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    UserNotFound,

    // Catalog (E2xxx)
    CarNotFound,
    InvalidStatusTransition,
    NotListingOwner,

    // Ratings (E3xxx)
    RatingNotFound,
    RatingOutOfRange,
    NotRatingAuthor,
    CannotRateSelf,

    // Reports (E4xxx)
    ReportNotFound,
    UnknownReportReason,
    CannotReportSelf,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0006",
            Self::BadRequest => "E0007",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1003",
            Self::TokenInvalid => "E1004",
            Self::UserNotFound => "E1005",

            // Catalog
            Self::CarNotFound => "E2001",
            Self::InvalidStatusTransition => "E2002",
            Self::NotListingOwner => "E2003",

            // Ratings
            Self::RatingNotFound => "E3001",
            Self::RatingOutOfRange => "E3002",
            Self::NotRatingAuthor => "E3003",
            Self::CannotRateSelf => "E3004",

            // Reports
            Self::ReportNotFound => "E4001",
            Self::UnknownReportReason => "E4002",
            Self::CannotReportSelf => "E4003",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ValidationError | Self::BadRequest | Self::RatingOutOfRange
            | Self::UnknownReportReason => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::CarNotFound
            | Self::RatingNotFound | Self::ReportNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotListingOwner | Self::NotRatingAuthor
            | Self::CannotRateSelf | Self::CannotReportSelf => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists | Self::InvalidStatusTransition => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("storage error: {0}")]
    Storage(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The domain code carried by this error, if it is a known one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            AppError::Validation(_) => Some(ErrorCode::ValidationError),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Storage(err) => {
                tracing::error!(error = %err, "storage backend error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiErrorResponse::new("E0006", "storage backend unavailable"),
                )
            }
            AppError::Serialization(err) => {
                tracing::error!(error = %err, "state serialization error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::ServiceUnavailable,
            ErrorCode::BadRequest,
            ErrorCode::InvalidCredentials,
            ErrorCode::EmailAlreadyExists,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::UserNotFound,
            ErrorCode::CarNotFound,
            ErrorCode::InvalidStatusTransition,
            ErrorCode::NotListingOwner,
            ErrorCode::RatingNotFound,
            ErrorCode::RatingOutOfRange,
            ErrorCode::NotRatingAuthor,
            ErrorCode::CannotRateSelf,
            ErrorCode::ReportNotFound,
            ErrorCode::UnknownReportReason,
            ErrorCode::CannotReportSelf,
        ];
        let mut seen = std::collections::HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn known_error_maps_to_status() {
        let resp = AppError::new(ErrorCode::ReportNotFound, "report not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::new(ErrorCode::InvalidStatusTransition, "nope").into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_variant_reports_validation_code() {
        let err = AppError::Validation("bad".into());
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
