//! Settlement of captured payments into user credit balances
//!
//! Notifications are delivered at least once and possibly out of order. The
//! order's completion flag is the exactly-once guard: it is checked on load
//! and again inside the settlement transaction, so a duplicate delivery
//! either short-circuits here or aborts in the store without crediting.

use crate::{
    error::{ApiError, Result},
    models::events::{GatewayEvent, PaymentIntentPayload, PAYMENT_CANCELED},
    services::{
        order_store::{OrderStore, SettleOutcome},
        webhook_verifier::WebhookVerifier,
    },
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What handling a notification did. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Credited {
        order_id: String,
        user_id: String,
        credits: i32,
    },
    /// Duplicate delivery of an already settled order
    AlreadySettled { order_id: String },
    /// Event kind this service takes no action on
    Ignored { event_type: String },
}

pub struct SettlementService {
    store: Arc<dyn OrderStore>,
    verifier: WebhookVerifier,
    currency: String,
}

impl SettlementService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        verifier: WebhookVerifier,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            verifier,
            currency: currency.into(),
        }
    }

    /// Authenticate and dispatch one raw notification
    #[instrument(skip(self, payload, signature_header), fields(payload_len = payload.len()))]
    pub async fn handle_notification(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<SettlementOutcome> {
        if let Err(e) = self.verifier.verify(payload, signature_header) {
            warn!("Rejected notification: {}", e);
            return Err(e);
        }

        let event = GatewayEvent::parse(payload)?;

        match event {
            GatewayEvent::PaymentSucceeded(intent) => self.settle_payment(intent).await,
            GatewayEvent::PaymentCanceled { order_id } => {
                info!("Payment intent {} canceled at the gateway", order_id);
                Ok(SettlementOutcome::Ignored {
                    event_type: PAYMENT_CANCELED.to_string(),
                })
            }
            GatewayEvent::Unknown { event_type } => {
                info!("Received event {}", event_type);
                Ok(SettlementOutcome::Ignored { event_type })
            }
        }
    }

    #[instrument(skip(self, intent), fields(order_id = %intent.id))]
    async fn settle_payment(&self, intent: PaymentIntentPayload) -> Result<SettlementOutcome> {
        if !intent.currency.eq_ignore_ascii_case(&self.currency) {
            warn!(
                "Captured currency {} is not {}",
                intent.currency, self.currency
            );
            return Err(ApiError::InvalidCurrency(format!(
                "Currency must be {}",
                self.currency.to_uppercase()
            )));
        }

        let order = self
            .store
            .get(&intent.id)
            .await?
            .ok_or_else(|| {
                error!("Capture for unknown order {}", intent.id);
                ApiError::OrderNotFound(intent.id.clone())
            })?;

        if order.complete {
            info!("Order {} already settled, acknowledging duplicate", order.order_id);
            return Ok(SettlementOutcome::AlreadySettled {
                order_id: order.order_id,
            });
        }

        if order.amount != intent.amount {
            warn!(
                "Captured amount {} differs from order amount {} for {}",
                intent.amount, order.amount, order.order_id
            );
        }

        match self
            .store
            .settle(&order.order_id, &order.user_id, order.credits)
            .await?
        {
            SettleOutcome::Applied => {
                info!(
                    "Credited {} credits to user {} for order {}",
                    order.credits, order.user_id, order.order_id
                );
                Ok(SettlementOutcome::Credited {
                    order_id: order.order_id,
                    user_id: order.user_id,
                    credits: order.credits,
                })
            }
            SettleOutcome::Aborted => {
                // A concurrent delivery may have won the race
                let current = self.store.get(&order.order_id).await?;
                match current {
                    Some(current) if current.complete => {
                        Ok(SettlementOutcome::AlreadySettled {
                            order_id: current.order_id,
                        })
                    }
                    _ => Err(ApiError::Persistence(format!(
                        "Settlement transaction aborted for order {}",
                        order.order_id
                    ))),
                }
            }
        }
    }
}
