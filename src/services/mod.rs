// Service modules
pub mod jwt_service;
pub mod memory_gateway;
pub mod memory_store;
pub mod order_service;
pub mod order_store;
pub mod payment_gateway;
pub mod pricing;
pub mod settlement_service;
pub mod stripe_gateway;
pub mod webhook_verifier;

pub use jwt_service::JWTService;
pub use memory_gateway::InMemoryGateway;
pub use memory_store::InMemoryOrderStore;
pub use order_service::OrderService;
pub use order_store::{OrderStore, SeaOrmOrderStore};
pub use payment_gateway::PaymentGateway;
pub use settlement_service::{SettlementOutcome, SettlementService};
pub use stripe_gateway::StripeGateway;
pub use webhook_verifier::WebhookVerifier;
