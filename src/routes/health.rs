use axum::{extract::State, Json};

use crate::{app_state::AppState, error::Result, models::common::HealthResponse};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    state.db.ping().await?;
    Ok(Json(HealthResponse { status: "ok" }))
}
