use crate::error::Result;
use async_trait::async_trait;

/// Gateway-side authorization for a fixed amount. `id` becomes the order id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
}

/// External payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_authorization(&self, amount: i64, currency: &str) -> Result<Authorization>;

    async fn update_authorization(
        &self,
        id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Authorization>;

    async fn cancel_authorization(&self, id: &str) -> Result<()>;
}
