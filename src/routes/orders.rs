use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    middleware::UserIdentity,
    models::{
        common::SuccessResponse,
        orders::{
            CancelOrderRequest, CancelOrderResponse, CreateOrderRequest, CreateOrderResponse,
            UpdateOrderRequest, UpdateOrderResponse,
        },
    },
};

/// POST /api/v1/orders
#[instrument(skip(state, request))]
pub async fn create_order(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    let (user_id, credits) = request.into_parts()?;
    identity.ensure_acts_for(&user_id)?;

    let created = state.order_service.create_order(&user_id, credits).await?;

    Ok(Json(SuccessResponse::new(created)))
}

/// PUT /api/v1/orders/{order_id}
#[instrument(skip(state, request))]
pub async fn update_order(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<UpdateOrderResponse>> {
    let (user_id, credits) = request.into_parts()?;
    identity.ensure_acts_for(&user_id)?;

    let updated = state
        .order_service
        .update_order(&order_id, credits, &user_id)
        .await?;

    Ok(Json(SuccessResponse::new(updated)))
}

/// POST /api/v1/orders/{order_id}/cancel
#[instrument(skip(state, request))]
pub async fn cancel_order(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(order_id): Path<String>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<CancelOrderResponse>> {
    let user_id = request.into_user_id()?;
    identity.ensure_acts_for(&user_id)?;

    let canceled = state.order_service.cancel_order(&order_id, &user_id).await?;

    Ok(Json(SuccessResponse::new(canceled)))
}
