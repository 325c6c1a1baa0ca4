use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::common::SuccessResponse;
use crate::error::{ApiError, Result};
use crate::services::pricing::{MAX_CREDITS, MIN_CREDITS};

/// POST /orders request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: Option<String>,

    #[validate(range(min = 5, max = 250))]
    pub credits: Option<i32>,
}

/// PUT /orders/{order_id} request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: Option<String>,

    #[validate(range(min = 5, max = 250))]
    pub credits: Option<i32>,
}

/// POST /orders/{order_id}/cancel request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: Option<String>,
}

impl CreateOrderRequest {
    /// Validate and unwrap into `(user_id, credits)`
    pub fn into_parts(self) -> Result<(String, i32)> {
        self.validate().map_err(validation_error)?;
        let credits = require(self.credits, "credits")?;
        let user_id = require(self.user_id, "userId")?;
        Ok((user_id, credits))
    }
}

impl UpdateOrderRequest {
    pub fn into_parts(self) -> Result<(String, i32)> {
        self.validate().map_err(validation_error)?;
        let credits = require(self.credits, "credits")?;
        let user_id = require(self.user_id, "userId")?;
        Ok((user_id, credits))
    }
}

impl CancelOrderRequest {
    pub fn into_user_id(self) -> Result<String> {
        self.validate().map_err(validation_error)?;
        require(self.user_id, "userId")
    }
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| ApiError::InvalidInput(format!("{} is required", field)))
}

fn validation_error(errors: ValidationErrors) -> ApiError {
    if errors.field_errors().contains_key("credits") {
        return ApiError::InvalidInput(format!(
            "credits must be between {} and {}",
            MIN_CREDITS, MAX_CREDITS
        ));
    }
    ApiError::InvalidInput(format!("Validation error: {}", errors))
}

/// Result of a successful create
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: String,
    pub client_secret: String,
    pub amount: i64,
}

/// Result of a successful amount update
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdated {
    pub order_id: String,
    pub amount: i64,
}

/// Result of a successful cancel
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCanceled {
    pub order_id: String,
    pub canceled: bool,
}

pub type CreateOrderResponse = SuccessResponse<OrderCreated>;
pub type UpdateOrderResponse = SuccessResponse<OrderUpdated>;
pub type CancelOrderResponse = SuccessResponse<OrderCanceled>;
