//! HTTP surface over in-memory collaborators. Only routes that reach
//! neither Postgres nor Redis are exercised here.

use crate::common::{harness, succeeded_event, TOLERANCE_SECONDS, WEBHOOK_SECRET};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use creditpay::{
    config::{
        AuthConfig, Config, DatabaseConfig, RateLimitSettings, RedisConfig, ServerConfig,
        StripeConfig,
    },
    routes::{create_router, webhooks::SIGNATURE_HEADER},
    services::{
        InMemoryGateway, InMemoryOrderStore, JWTService, OrderService, OrderStore,
        SettlementService, WebhookVerifier,
    },
    AppState,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const JWT_SECRET: &str = "test-secret-key-with-minimum-32-characters-required";

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            run_migrations: false,
        },
        redis: RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
        },
        stripe: StripeConfig {
            secret_key: "sk_test_unused".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
            currency: "usd".to_string(),
            webhook_tolerance_seconds: TOLERANCE_SECONDS,
            request_timeout_ms: 1_000,
        },
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
        },
        rate_limit: RateLimitSettings::default(),
    }
}

fn app(store: &InMemoryOrderStore, gateway: &InMemoryGateway) -> Router {
    let config = test_config();
    let state = AppState {
        db: DatabaseConnection::Disconnected,
        // Client::open only parses the url; nothing connects until a command runs
        redis: Arc::new(redis::Client::open(config.redis.url.as_str()).unwrap()),
        order_service: Arc::new(OrderService::new(
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
            "usd",
        )),
        settlement_service: Arc::new(SettlementService::new(
            Arc::new(store.clone()),
            WebhookVerifier::new(WEBHOOK_SECRET, TOLERANCE_SECONDS),
            "usd",
        )),
        jwt_service: Arc::new(JWTService::new(&config.auth)),
        config: Arc::new(config),
    };
    create_router(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_signed_notification_is_acknowledged() {
    let h = harness();
    h.orders.create_order("u1", 20).await.unwrap();
    let app = app(&h.store, &h.gateway);

    let payload = succeeded_event("pi_1", 1975, "usd");
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/payments")
        .header(SIGNATURE_HEADER, h.sign(&payload))
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["received"], true);
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(20));
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let h = harness();
    h.orders.create_order("u1", 20).await.unwrap();
    let app = app(&h.store, &h.gateway);

    let payload = succeeded_event("pi_1", 1975, "usd");
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/payments")
        .header(SIGNATURE_HEADER, "t=1,v1=00ff")
        .body(Body::from(payload))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_NOTIFICATION");
    assert!(!h.store.get("pi_1").await.unwrap().unwrap().complete);
}

#[tokio::test]
async fn test_missing_signature_header_is_rejected() {
    let h = harness();
    let app = app(&h.store, &h.gateway);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/payments")
        .body(Body::from(succeeded_event("pi_1", 1975, "usd")))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_routes_require_token() {
    let h = harness();
    let app = app(&h.store, &h.gateway);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/orders")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"userId":"u1","credits":20}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(h.gateway.authorization("pi_1").await.is_none());
}

#[tokio::test]
async fn test_order_routes_reject_malformed_token() {
    let h = harness();
    let app = app(&h.store, &h.gateway);

    let request = Request::builder()
        .method("PUT")
        .uri("/api/v1/orders/pi_1")
        .header("authorization", "Bearer not.a.jwt")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"userId":"u1","credits":20}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}
