use crate::{
    config::Config,
    services::{
        JWTService, OrderService, OrderStore, PaymentGateway, SeaOrmOrderStore, SettlementService,
        StripeGateway, WebhookVerifier,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: Arc<redis::Client>,
    pub order_service: Arc<OrderService>,
    pub settlement_service: Arc<SettlementService>,
    pub jwt_service: Arc<JWTService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        // Connect to Redis
        let redis = Arc::new(redis::Client::open(config.redis.url.as_str())?);

        // Collaborators shared by both saga halves
        let store: Arc<dyn OrderStore> = Arc::new(SeaOrmOrderStore::new(db.clone()));
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.stripe)?);

        // Initialize services
        let order_service = Arc::new(OrderService::new(
            store.clone(),
            gateway,
            config.stripe.currency.clone(),
        ));
        let settlement_service = Arc::new(SettlementService::new(
            store,
            WebhookVerifier::new(
                config.stripe.webhook_secret.clone(),
                config.stripe.webhook_tolerance_seconds,
            ),
            config.stripe.currency.clone(),
        ));
        let jwt_service = Arc::new(JWTService::new(&config.auth));

        Ok(Self {
            db,
            redis,
            order_service,
            settlement_service,
            jwt_service,
            config: Arc::new(config),
        })
    }
}
