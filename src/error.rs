use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ownership mismatch for order {0}")]
    OwnershipMismatch(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already completed: {0}")]
    OrderCompleted(String),

    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        ApiError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Gateway(err.to_string())
    }
}

impl ApiError {
    /// Stable machine-readable code callers can branch on
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::OwnershipMismatch(_) => "OWNERSHIP_MISMATCH",
            ApiError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ApiError::OrderCompleted(_) => "ORDER_COMPLETED",
            ApiError::InvalidNotification(_) => "INVALID_NOTIFICATION",
            ApiError::InvalidCurrency(_) => "INVALID_CURRENCY",
            ApiError::Gateway(_) => "GATEWAY_ERROR",
            ApiError::Persistence(_) => "PERSISTENCE_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidToken(_) => "INVALID_TOKEN",
            ApiError::ExpiredToken => "TOKEN_EXPIRED",
            ApiError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::OwnershipMismatch(_) => StatusCode::FORBIDDEN,
            ApiError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::OrderCompleted(_) => StatusCode::CONFLICT,
            ApiError::InvalidNotification(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCurrency(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::ExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match self {
            ApiError::Persistence(ref msg) => {
                tracing::error!("Persistence error: {}", msg);
                "An internal storage error occurred".to_string()
            }
            ApiError::Gateway(ref msg) => {
                tracing::error!("Payment gateway error: {}", msg);
                "Payment provider temporarily unavailable".to_string()
            }
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            // Never reveal whether the referenced order exists
            ApiError::InvalidNotification(_) => "Notification could not be verified".to_string(),
            ApiError::InvalidInput(ref msg)
            | ApiError::Unauthorized(ref msg)
            | ApiError::InvalidToken(ref msg)
            | ApiError::InvalidCurrency(ref msg) => msg.clone(),
            ApiError::OwnershipMismatch(ref order_id) => {
                format!("Order {} does not belong to the requesting user", order_id)
            }
            ApiError::OrderNotFound(ref order_id) => format!("Order {} not found", order_id),
            ApiError::OrderCompleted(ref order_id) => {
                format!("Order {} has already been paid", order_id)
            }
            ApiError::ExpiredToken => "Access token has expired".to_string(),
            ApiError::RateLimitExceeded => "Too many requests, please try again later".to_string(),
        };

        let body = json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
