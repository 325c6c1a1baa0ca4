//! `SeaORM` entities for the credit purchase tables

pub mod prelude;

pub mod purchase_orders;
pub mod user_accounts;
