// Route modules
pub mod health;
pub mod orders;
pub mod webhooks;

use crate::{
    app_state::AppState,
    middleware::{create_rate_limiter, jwt_auth_middleware, logging_middleware},
};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api_v1_routes(state.clone()))
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: AppState) -> Router<AppState> {
    // Order lifecycle: authenticated and rate limited per user
    let rate_limiter =
        create_rate_limiter(state.redis.clone(), state.config.rate_limit.clone());
    let order_routes = Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/{order_id}", put(orders::update_order))
        .route("/orders/{order_id}/cancel", post(orders::cancel_order))
        .route_layer(middleware::from_fn(rate_limiter))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    // Gateway notifications authenticate by signature, not JWT
    let webhook_routes =
        Router::new().route("/webhooks/payments", post(webhooks::payment_webhook));

    Router::new()
        .merge(order_routes)
        .merge(webhook_routes)
        .layer(middleware::from_fn(logging_middleware))
}
