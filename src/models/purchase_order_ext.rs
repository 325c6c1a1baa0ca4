/// Extension methods for purchase_orders entity
///
/// Business rules that complement the generated entity in entity/src/purchase_orders.rs
use entity::purchase_orders;

pub trait PurchaseOrderExt {
    /// Check whether `user_id` owns this order
    fn is_owned_by(&self, user_id: &str) -> bool;

    /// Check whether the order still awaits settlement
    fn is_open(&self) -> bool;
}

impl PurchaseOrderExt for purchase_orders::Model {
    fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    fn is_open(&self) -> bool {
        !self.complete
    }
}
