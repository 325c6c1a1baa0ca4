pub use sea_orm_migration::prelude::*;

mod m20251101_000001_create_user_accounts;
mod m20251101_000002_create_purchase_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251101_000001_create_user_accounts::Migration),
            Box::new(m20251101_000002_create_purchase_orders::Migration),
        ]
    }
}
