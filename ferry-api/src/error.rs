use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ferry_catalog::{CapacityError, PricingError, ScheduleError};
use ferry_core::CoreError;
use ferry_order::BookingError;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication failed: {0}")]
    AuthenticationError(String),
    #[error("forbidden: {0}")]
    AuthorizationError(String),
    #[error("validation failed: {0}")]
    ValidationError(String),
    #[error("not found: {0}")]
    NotFoundError(String),
    /// Business-rule violation. `details` carries the offending values.
    #[error("conflict: {message}")]
    ConflictError { message: String, details: Value },
    #[error("internal error: {0}")]
    InternalServerError(String),
    #[error(transparent)]
    Anyhow(anyhow::Error),
}

impl AppError {
    fn conflict(message: impl Into<String>, details: Value) -> Self {
        AppError::ConflictError { message: message.into(), details }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg, Value::Null),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg, Value::Null),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, Value::Null),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, Value::Null),
            AppError::ConflictError { message, details } => {
                (StatusCode::CONFLICT, message, details)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    Value::Null,
                )
            },
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    Value::Null,
                )
            },
        };

        let body = if details.is_null() {
            Json(json!({ "error": error_message }))
        } else {
            Json(json!({ "error": error_message, "details": details }))
        };

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::BookingInvalid(_) | BookingError::InvalidSeat { .. } => {
                AppError::ValidationError(message)
            }
            BookingError::NotFound(_) => AppError::NotFoundError(message),
            BookingError::SeatsUnavailable { leg, requested, remaining } => AppError::conflict(
                message,
                json!({ "leg": leg, "requested": requested, "remaining": remaining }),
            ),
            BookingError::SeatCountMismatch { expected, got } => {
                AppError::conflict(message, json!({ "expected": expected, "got": got }))
            }
            BookingError::SeatConflict(seat) => {
                AppError::conflict(message, json!({ "seat": seat }))
            }
            BookingError::InvalidState(_) => AppError::conflict(message, Value::Null),
            BookingError::NotPermitted(_) => AppError::AuthorizationError(message),
            BookingError::Persistence(_) => AppError::InternalServerError(message),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        let message = err.to_string();
        match err {
            PricingError::InvalidPrice(_) | PricingError::InvalidCapacity(_) => {
                AppError::ValidationError(message)
            }
            PricingError::RouteNotFound(_) => AppError::NotFoundError(message),
            PricingError::Persistence(_) => AppError::InternalServerError(message),
        }
    }
}

impl From<CapacityError> for AppError {
    fn from(err: CapacityError) -> Self {
        let message = err.to_string();
        match err {
            CapacityError::SeatsUnavailable { requested, remaining } => AppError::conflict(
                message,
                json!({ "requested": requested, "remaining": remaining }),
            ),
            CapacityError::Persistence(_) => AppError::InternalServerError(message),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            ScheduleError::Capacity(inner) => inner.into(),
            ScheduleError::Persistence(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
