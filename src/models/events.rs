//! Payment gateway notification events
//!
//! Notifications arrive as `{"id": ..., "type": ..., "data": {"object": {...}}}`.
//! Only the kinds this service acts on get their own variant; everything else
//! lands in [`GatewayEvent::Unknown`] and is acknowledged without side effects.

use serde::Deserialize;

use crate::error::{ApiError, Result};

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_CANCELED: &str = "payment_intent.canceled";

/// The payment authorization object carried by payment notifications
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PaymentIntentPayload {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Funds were captured for the authorization; triggers settlement
    PaymentSucceeded(PaymentIntentPayload),
    PaymentCanceled { order_id: String },
    Unknown { event_type: String },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

impl GatewayEvent {
    /// Parse an already-authenticated notification body
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| ApiError::InvalidNotification(format!("Malformed event: {}", e)))?;

        match raw.event_type.as_str() {
            PAYMENT_SUCCEEDED => {
                let intent: PaymentIntentPayload = serde_json::from_value(raw.data.object)
                    .map_err(|e| {
                        ApiError::InvalidNotification(format!("Malformed payment intent: {}", e))
                    })?;
                Ok(GatewayEvent::PaymentSucceeded(intent))
            }
            PAYMENT_CANCELED => {
                let order_id = raw
                    .data
                    .object
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        ApiError::InvalidNotification("Canceled event without id".to_string())
                    })?
                    .to_string();
                Ok(GatewayEvent::PaymentCanceled { order_id })
            }
            _ => Ok(GatewayEvent::Unknown {
                event_type: raw.event_type,
            }),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            GatewayEvent::PaymentSucceeded(_) => PAYMENT_SUCCEEDED,
            GatewayEvent::PaymentCanceled { .. } => PAYMENT_CANCELED,
            GatewayEvent::Unknown { event_type } => event_type,
        }
    }
}
