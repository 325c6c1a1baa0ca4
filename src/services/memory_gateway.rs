use crate::{
    error::{ApiError, Result},
    services::payment_gateway::{Authorization, PaymentGateway},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Gateway-side state of an authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Created,
    Updated,
    Captured,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAuthorization {
    pub amount: i64,
    pub currency: String,
    pub status: AuthorizationStatus,
}

#[derive(Default)]
struct Faults {
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    fail_cancel: AtomicBool,
}

/// Deterministic gateway double: ids are `pi_1`, `pi_2`, ... in creation order.
#[derive(Default, Clone)]
pub struct InMemoryGateway {
    next_id: Arc<AtomicU64>,
    authorizations: Arc<RwLock<HashMap<String, RecordedAuthorization>>>,
    faults: Arc<Faults>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self, fail: bool) {
        self.faults.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.faults.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cancel(&self, fail: bool) {
        self.faults.fail_cancel.store(fail, Ordering::SeqCst);
    }

    pub async fn authorization(&self, id: &str) -> Option<RecordedAuthorization> {
        self.authorizations.read().await.get(id).cloned()
    }

    /// Simulate the customer paying: the authorization is captured
    pub async fn capture(&self, id: &str) -> Result<RecordedAuthorization> {
        let mut authorizations = self.authorizations.write().await;
        let authorization = authorizations
            .get_mut(id)
            .ok_or_else(|| ApiError::Gateway(format!("No such payment intent: {}", id)))?;
        authorization.status = AuthorizationStatus::Captured;
        Ok(authorization.clone())
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_authorization(&self, amount: i64, currency: &str) -> Result<Authorization> {
        if self.faults.fail_create.load(Ordering::SeqCst) {
            return Err(ApiError::Gateway("injected create failure".to_string()));
        }

        let id = format!("pi_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.authorizations.write().await.insert(
            id.clone(),
            RecordedAuthorization {
                amount,
                currency: currency.to_string(),
                status: AuthorizationStatus::Created,
            },
        );

        Ok(Authorization {
            client_secret: format!("{}_secret", id),
            id,
            amount,
            currency: currency.to_string(),
        })
    }

    async fn update_authorization(
        &self,
        id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Authorization> {
        if self.faults.fail_update.load(Ordering::SeqCst) {
            return Err(ApiError::Gateway("injected update failure".to_string()));
        }

        let mut authorizations = self.authorizations.write().await;
        let authorization = authorizations
            .get_mut(id)
            .ok_or_else(|| ApiError::Gateway(format!("No such payment intent: {}", id)))?;

        if matches!(
            authorization.status,
            AuthorizationStatus::Captured | AuthorizationStatus::Canceled
        ) {
            return Err(ApiError::Gateway(format!(
                "Payment intent {} can no longer be updated",
                id
            )));
        }

        authorization.amount = amount;
        authorization.currency = currency.to_string();
        authorization.status = AuthorizationStatus::Updated;

        Ok(Authorization {
            id: id.to_string(),
            client_secret: format!("{}_secret", id),
            amount,
            currency: currency.to_string(),
        })
    }

    async fn cancel_authorization(&self, id: &str) -> Result<()> {
        if self.faults.fail_cancel.load(Ordering::SeqCst) {
            return Err(ApiError::Gateway("injected cancel failure".to_string()));
        }

        let mut authorizations = self.authorizations.write().await;
        let authorization = authorizations
            .get_mut(id)
            .ok_or_else(|| ApiError::Gateway(format!("No such payment intent: {}", id)))?;
        authorization.status = AuthorizationStatus::Canceled;
        Ok(())
    }
}
