use crate::{
    error::{ApiError, Result},
    models::purchase_order_ext::PurchaseOrderExt,
    services::order_store::{
        rejection_reason, NewPurchaseOrder, OrderAmendment, OrderStore, SettleOutcome,
    },
};
use async_trait::async_trait;
use entity::purchase_orders;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    orders: HashMap<String, purchase_orders::Model>,
    balances: HashMap<String, i64>,
}

#[derive(Default)]
struct Faults {
    fail_next_put: AtomicBool,
    fail_order_completion: AtomicBool,
    fail_reads: AtomicBool,
}

/// A thread-safe in-memory store for orders and balances.
///
/// Both tables sit behind one lock so `settle` stages and applies its two
/// writes as a unit. Faults can be injected to exercise failure paths.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
    mutations: Arc<AtomicU64>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user account, as the on-boarding flow would
    pub async fn insert_user(&self, user_id: &str, balance: i64) {
        let mut tables = self.tables.write().await;
        tables.balances.insert(user_id.to_string(), balance);
    }

    /// Make the next `put_if_absent` fail with a persistence error
    pub fn fail_next_put(&self) {
        self.faults.fail_next_put.store(true, Ordering::SeqCst);
    }

    /// Make the order-completion half of `settle` fail until cleared
    pub fn fail_order_completion(&self, fail: bool) {
        self.faults.fail_order_completion.store(fail, Ordering::SeqCst);
    }

    /// Make every `get` fail until cleared
    pub fn fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of writes applied so far
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn put_if_absent(&self, order: NewPurchaseOrder) -> Result<bool> {
        if self.faults.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(ApiError::Persistence("injected put failure".to_string()));
        }

        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.order_id) {
            return Ok(false);
        }

        let now = time::OffsetDateTime::now_utc();
        tables.orders.insert(
            order.order_id.clone(),
            purchase_orders::Model {
                order_id: order.order_id,
                user_id: order.user_id,
                credits: order.credits,
                amount: order.amount,
                complete: false,
                created_at: now,
                updated_at: now,
            },
        );
        self.record_mutation();
        Ok(true)
    }

    async fn get(&self, order_id: &str) -> Result<Option<purchase_orders::Model>> {
        if self.faults.fail_reads.load(Ordering::SeqCst) {
            return Err(ApiError::Persistence("injected read failure".to_string()));
        }

        let tables = self.tables.read().await;
        Ok(tables.orders.get(order_id).cloned())
    }

    async fn update_if_owner(
        &self,
        order_id: &str,
        owner_id: &str,
        amendment: OrderAmendment,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;

        match tables.orders.get_mut(order_id) {
            Some(order) if order.is_owned_by(owner_id) && order.is_open() => {
                order.credits = amendment.credits;
                order.amount = amendment.amount;
                order.updated_at = time::OffsetDateTime::now_utc();
            }
            current => {
                let current = current.map(|o| &*o);
                return Err(rejection_reason(order_id, owner_id, current));
            }
        }

        self.record_mutation();
        Ok(())
    }

    async fn delete_if_owner(&self, order_id: &str, owner_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;

        match tables.orders.get(order_id) {
            Some(order) if order.is_owned_by(owner_id) && order.is_open() => {}
            current => return Err(rejection_reason(order_id, owner_id, current)),
        }

        tables.orders.remove(order_id);
        self.record_mutation();
        Ok(())
    }

    async fn settle(&self, order_id: &str, user_id: &str, credits: i32) -> Result<SettleOutcome> {
        let mut tables = self.tables.write().await;

        // Stage both writes; nothing is applied unless both preconditions hold
        let new_balance = tables.balances.get(user_id).copied().unwrap_or(0) + i64::from(credits);

        let order_open = tables
            .orders
            .get(order_id)
            .map(|o| o.is_owned_by(user_id) && o.is_open())
            .unwrap_or(false);

        if !order_open {
            return Ok(SettleOutcome::Aborted);
        }

        if self.faults.fail_order_completion.load(Ordering::SeqCst) {
            return Err(ApiError::Persistence(
                "injected failure completing order".to_string(),
            ));
        }

        tables.balances.insert(user_id.to_string(), new_balance);
        if let Some(order) = tables.orders.get_mut(order_id) {
            order.complete = true;
            order.updated_at = time::OffsetDateTime::now_utc();
        }
        self.record_mutation();

        Ok(SettleOutcome::Applied)
    }

    async fn get_balance(&self, user_id: &str) -> Result<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables.balances.get(user_id).copied())
    }
}
