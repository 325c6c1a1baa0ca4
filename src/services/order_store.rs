//! Durable storage for purchase orders and user balances
//!
//! Every write that depends on ownership is expressed as a single conditional
//! statement so concurrent invocations for the same order cannot interleave
//! between a check and a write.

use crate::{
    error::{ApiError, Result},
    models::purchase_order_ext::PurchaseOrderExt,
};
use async_trait::async_trait;
use entity::{purchase_orders, user_accounts};
use sea_orm::{
    entity::*, query::*, sea_query::Expr, sea_query::OnConflict, DatabaseConnection,
    TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

/// Fields of a newly created order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchaseOrder {
    pub order_id: String,
    pub user_id: String,
    pub credits: i32,
    pub amount: i64,
}

/// Fields rewritten by an amount update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAmendment {
    pub credits: i32,
    pub amount: i64,
}

/// Result of the settlement transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Balance incremented and order marked complete
    Applied,
    /// A precondition failed; nothing was written
    Aborted,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order unless one with the same id exists. Returns whether it was inserted.
    async fn put_if_absent(&self, order: NewPurchaseOrder) -> Result<bool>;

    async fn get(&self, order_id: &str) -> Result<Option<purchase_orders::Model>>;

    /// Rewrite credits and amount of an open order owned by `owner_id`
    async fn update_if_owner(
        &self,
        order_id: &str,
        owner_id: &str,
        amendment: OrderAmendment,
    ) -> Result<()>;

    /// Delete an open order owned by `owner_id`
    async fn delete_if_owner(&self, order_id: &str, owner_id: &str) -> Result<()>;

    /// Atomically add `credits` to the user's balance and mark the order complete.
    /// The order must still be open and owned by `user_id`.
    async fn settle(&self, order_id: &str, user_id: &str, credits: i32) -> Result<SettleOutcome>;

    async fn get_balance(&self, user_id: &str) -> Result<Option<i64>>;
}

/// Explain why a conditional write on `order_id` matched no row
pub(crate) fn rejection_reason(
    order_id: &str,
    owner_id: &str,
    current: Option<&purchase_orders::Model>,
) -> ApiError {
    match current {
        None => ApiError::OrderNotFound(order_id.to_string()),
        Some(order) if !order.is_owned_by(owner_id) => {
            ApiError::OwnershipMismatch(order_id.to_string())
        }
        Some(_) => ApiError::OrderCompleted(order_id.to_string()),
    }
}

/// Postgres-backed store
pub struct SeaOrmOrderStore {
    db: DatabaseConnection,
}

impl SeaOrmOrderStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderStore for SeaOrmOrderStore {
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    async fn put_if_absent(&self, order: NewPurchaseOrder) -> Result<bool> {
        let now = time::OffsetDateTime::now_utc();

        let new_order = purchase_orders::ActiveModel {
            order_id: Set(order.order_id),
            user_id: Set(order.user_id),
            credits: Set(order.credits),
            amount: Set(order.amount),
            complete: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = purchase_orders::Entity::insert(new_order)
            .on_conflict(
                OnConflict::column(purchase_orders::Column::OrderId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted == 1)
    }

    #[instrument(skip(self))]
    async fn get(&self, order_id: &str) -> Result<Option<purchase_orders::Model>> {
        let order = purchase_orders::Entity::find_by_id(order_id.to_string())
            .one(&self.db)
            .await?;
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn update_if_owner(
        &self,
        order_id: &str,
        owner_id: &str,
        amendment: OrderAmendment,
    ) -> Result<()> {
        let result = purchase_orders::Entity::update_many()
            .col_expr(purchase_orders::Column::Credits, Expr::value(amendment.credits))
            .col_expr(purchase_orders::Column::Amount, Expr::value(amendment.amount))
            .col_expr(
                purchase_orders::Column::UpdatedAt,
                Expr::value(time::OffsetDateTime::now_utc()),
            )
            .filter(purchase_orders::Column::OrderId.eq(order_id))
            .filter(purchase_orders::Column::UserId.eq(owner_id))
            .filter(purchase_orders::Column::Complete.eq(false))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            let current = self.get(order_id).await?;
            return Err(rejection_reason(order_id, owner_id, current.as_ref()));
        }

        debug!("Updated order {}: {:?}", order_id, amendment);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_if_owner(&self, order_id: &str, owner_id: &str) -> Result<()> {
        let result = purchase_orders::Entity::delete_many()
            .filter(purchase_orders::Column::OrderId.eq(order_id))
            .filter(purchase_orders::Column::UserId.eq(owner_id))
            .filter(purchase_orders::Column::Complete.eq(false))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            let current = self.get(order_id).await?;
            return Err(rejection_reason(order_id, owner_id, current.as_ref()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn settle(&self, order_id: &str, user_id: &str, credits: i32) -> Result<SettleOutcome> {
        let txn = self.db.begin().await?;
        let now = time::OffsetDateTime::now_utc();

        // 1. Credit the owner in one statement; the row is created if on-boarding
        //    has not written it yet
        let account = user_accounts::ActiveModel {
            user_id: Set(user_id.to_string()),
            balance: Set(i64::from(credits)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        user_accounts::Entity::insert(account)
            .on_conflict(
                OnConflict::column(user_accounts::Column::UserId)
                    .value(
                        user_accounts::Column::Balance,
                        Expr::col((user_accounts::Entity, user_accounts::Column::Balance))
                            .add(i64::from(credits)),
                    )
                    .value(user_accounts::Column::UpdatedAt, Expr::value(now))
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        // 2. Complete the order, only if it is still open
        let completed = purchase_orders::Entity::update_many()
            .col_expr(purchase_orders::Column::Complete, Expr::value(true))
            .col_expr(purchase_orders::Column::UpdatedAt, Expr::value(now))
            .filter(purchase_orders::Column::OrderId.eq(order_id))
            .filter(purchase_orders::Column::UserId.eq(user_id))
            .filter(purchase_orders::Column::Complete.eq(false))
            .exec(&txn)
            .await?;

        if completed.rows_affected != 1 {
            txn.rollback().await?;
            warn!("Settlement of order {} aborted: order not open", order_id);
            return Ok(SettleOutcome::Aborted);
        }

        txn.commit().await?;

        info!(
            "Settled order {}: user={}, credits={}",
            order_id, user_id, credits
        );

        Ok(SettleOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, user_id: &str) -> Result<Option<i64>> {
        let account = user_accounts::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?;
        Ok(account.map(|a| a.balance))
    }
}
