use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use tracing::{info, instrument};

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::common::{Acknowledged, SuccessResponse},
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/v1/webhooks/payments
///
/// 2xx acknowledges the delivery; any error status makes the sender redeliver.
#[instrument(skip(state, headers, body))]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SuccessResponse<Acknowledged>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidNotification("Missing signature header".to_string()))?;

    let outcome = state
        .settlement_service
        .handle_notification(&body, signature)
        .await?;

    info!("Notification handled: {:?}", outcome);

    Ok(Json(SuccessResponse::new(Acknowledged { received: true })))
}
