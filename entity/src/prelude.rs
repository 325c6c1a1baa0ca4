pub use super::purchase_orders::Entity as PurchaseOrders;
pub use super::user_accounts::Entity as UserAccounts;
