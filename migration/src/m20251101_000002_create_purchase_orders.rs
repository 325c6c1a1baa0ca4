use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // order_id is the payment gateway's authorization id
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(string(PurchaseOrders::OrderId).primary_key())
                    .col(string(PurchaseOrders::UserId).not_null())
                    .col(integer(PurchaseOrders::Credits).not_null())
                    .col(big_integer(PurchaseOrders::Amount).not_null())
                    .col(boolean(PurchaseOrders::Complete).default(false).not_null())
                    .col(
                        timestamp_with_time_zone(PurchaseOrders::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(PurchaseOrders::UpdatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Operators look up open orders per user when reconciling with the gateway
        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_user_id")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    OrderId,
    UserId,
    Credits,
    Amount,
    Complete,
    CreatedAt,
    UpdatedAt,
}
