//! Purchase order lifecycle: create, amount update, cancel
//!
//! Each operation touches two systems that fail independently. The gateway
//! authorization is always mutated before the local record on create and
//! update, and after it on cancel. The windows this leaves open are logged
//! with the order id so they can be reconciled:
//!
//! - create: authorization exists, order write failed (orphaned authorization)
//! - update: authorization amount changed, order write failed (re-invoke to converge)
//! - cancel: order deleted, authorization cancel failed (reported as a gateway error)

use crate::{
    error::{ApiError, Result},
    models::{
        orders::{OrderCanceled, OrderCreated, OrderUpdated},
        purchase_order_ext::PurchaseOrderExt,
    },
    services::{
        order_store::{rejection_reason, NewPurchaseOrder, OrderAmendment, OrderStore},
        payment_gateway::PaymentGateway,
        pricing::{price_for_credits, validate_credits},
    },
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            currency: currency.into(),
        }
    }

    /// Authorize a payment for `credits` and record the open order
    #[instrument(skip(self))]
    pub async fn create_order(&self, user_id: &str, credits: i32) -> Result<OrderCreated> {
        validate_credits(credits)?;
        let user_id = require_user_id(user_id)?;

        let amount = price_for_credits(credits);
        let authorization = self
            .gateway
            .create_authorization(amount, &self.currency)
            .await?;

        let new_order = NewPurchaseOrder {
            order_id: authorization.id.clone(),
            user_id: user_id.to_string(),
            credits,
            amount,
        };

        match self.store.put_if_absent(new_order).await {
            Ok(true) => {}
            Ok(false) => {
                error!(
                    order_id = %authorization.id,
                    "Orphaned authorization: gateway returned an id that is already recorded"
                );
                return Err(ApiError::Persistence(format!(
                    "Order {} already exists",
                    authorization.id
                )));
            }
            Err(e) => {
                error!(
                    order_id = %authorization.id,
                    amount,
                    "Orphaned authorization: failed to persist order: {}",
                    e
                );
                return Err(e);
            }
        }

        info!(
            "Created order {}: user={}, credits={}, amount={}",
            authorization.id, user_id, credits, amount
        );

        Ok(OrderCreated {
            order_id: authorization.id,
            client_secret: authorization.client_secret,
            amount: authorization.amount,
        })
    }

    /// Change the credit count of an open order owned by `owner_id`
    #[instrument(skip(self))]
    pub async fn update_order(
        &self,
        order_id: &str,
        credits: i32,
        owner_id: &str,
    ) -> Result<OrderUpdated> {
        validate_credits(credits)?;
        let owner_id = require_user_id(owner_id)?;
        let order_id = require_order_id(order_id)?;

        // Refuse before touching the gateway; the conditional write below still guards races
        let current = self.store.get(order_id).await?;
        match current {
            Some(ref order) if order.is_owned_by(owner_id) && order.is_open() => {}
            _ => {
                let err = rejection_reason(order_id, owner_id, current.as_ref());
                warn!("Rejected update of order {}: {}", order_id, err);
                return Err(err);
            }
        }

        let amount = price_for_credits(credits);
        let authorization = self
            .gateway
            .update_authorization(order_id, amount, &self.currency)
            .await?;

        if let Err(e) = self
            .store
            .update_if_owner(order_id, owner_id, OrderAmendment { credits, amount })
            .await
        {
            warn!(
                order_id = %order_id,
                amount,
                "Authorization updated but order record was not: {}",
                e
            );
            return Err(e);
        }

        info!(
            "Updated order {}: credits={}, amount={}",
            order_id, credits, amount
        );

        Ok(OrderUpdated {
            order_id: order_id.to_string(),
            amount: authorization.amount,
        })
    }

    /// Delete an open order owned by `owner_id` and cancel its authorization
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str, owner_id: &str) -> Result<OrderCanceled> {
        let owner_id = require_user_id(owner_id)?;
        let order_id = require_order_id(order_id)?;

        if let Err(e) = self.store.delete_if_owner(order_id, owner_id).await {
            warn!("Rejected cancel of order {}: {}", order_id, e);
            return Err(e);
        }

        // The local record is already gone; the caller still has to learn the
        // authorization is live, since a payment against it can no longer settle
        if let Err(e) = self.gateway.cancel_authorization(order_id).await {
            error!(
                order_id = %order_id,
                "Order deleted but authorization cancel failed: {}",
                e
            );
            return Err(e);
        }

        info!("Canceled order {} for user {}", order_id, owner_id);

        Ok(OrderCanceled {
            order_id: order_id.to_string(),
            canceled: true,
        })
    }
}

fn require_user_id(user_id: &str) -> Result<&str> {
    if user_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("userId is required".to_string()));
    }
    Ok(user_id)
}

fn require_order_id(order_id: &str) -> Result<&str> {
    if order_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("orderId is required".to_string()));
    }
    Ok(order_id)
}
