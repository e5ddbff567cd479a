use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Standard error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Why a coupon cannot be applied. During checkout these degrade to a zero
/// discount; on the validation endpoint they surface as HTTP errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CouponError {
    #[error("Invalid coupon code")]
    UnknownCode,

    #[error("This coupon has expired")]
    Expired,

    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,

    #[error("Minimum order of ₹{0} required")]
    MinOrderNotMet(Decimal),
}

impl CouponError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownCode => StatusCode::NOT_FOUND,
            Self::Expired | Self::UsageLimitReached | Self::MinOrderNotMet(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Coupon code already exists")]
    DuplicateCouponCode,

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("Payment gateway error, please try again.")]
    PaymentGateway(String),

    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::EventError(_) | Self::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::EmptyCart
            | Self::DuplicateCouponCode
            | Self::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Coupon(err) => err.status_code(),
            Self::PaymentGateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for HTTP responses. Internal errors return generic
    /// messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalServerError => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(err)).into_response()
    }
}
