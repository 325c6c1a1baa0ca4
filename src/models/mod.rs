// Model modules
pub mod common;
pub mod events;
pub mod orders;
pub mod purchase_order_ext;
