use crate::common::{event_of_type, harness, now, succeeded_event, TOLERANCE_SECONDS};
use creditpay::{
    services::{OrderStore, SettlementOutcome},
    ApiError,
};

#[tokio::test]
async fn test_purchase_then_capture_credits_user() {
    let h = harness();
    h.store.insert_user("u1", 0).await;

    let created = h.orders.create_order("u1", 20).await.unwrap();
    assert_eq!(created.order_id, "pi_1");
    assert_eq!(created.amount, 1975);
    h.gateway.capture("pi_1").await.unwrap();

    let payload = succeeded_event("pi_1", 1975, "usd");
    let outcome = h
        .settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SettlementOutcome::Credited {
            order_id: "pi_1".to_string(),
            user_id: "u1".to_string(),
            credits: 20,
        }
    );
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(20));
    assert!(h.store.get("pi_1").await.unwrap().unwrap().complete);
}

#[tokio::test]
async fn test_duplicate_delivery_credits_once() {
    let h = harness();
    h.store.insert_user("u1", 0).await;
    h.orders.create_order("u1", 20).await.unwrap();

    let payload = succeeded_event("pi_1", 1975, "usd");
    let header = h.sign(&payload);

    let first = h
        .settlement
        .handle_notification(&payload, &header)
        .await
        .unwrap();
    assert!(matches!(first, SettlementOutcome::Credited { .. }));

    let mutations = h.store.mutation_count();
    let second = h
        .settlement
        .handle_notification(&payload, &header)
        .await
        .unwrap();

    assert_eq!(
        second,
        SettlementOutcome::AlreadySettled {
            order_id: "pi_1".to_string()
        }
    );
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(20));
    assert_eq!(h.store.mutation_count(), mutations);
}

#[tokio::test]
async fn test_concurrent_deliveries_credit_once() {
    let h = std::sync::Arc::new(harness());
    h.store.insert_user("u1", 0).await;
    h.orders.create_order("u1", 20).await.unwrap();

    let payload = succeeded_event("pi_1", 1975, "usd");
    let header = h.sign(&payload);

    let deliveries = (0..5).map(|_| {
        let h = h.clone();
        let payload = payload.clone();
        let header = header.clone();
        tokio::spawn(async move { h.settlement.handle_notification(&payload, &header).await })
    });

    let outcomes = futures::future::join_all(deliveries).await;

    let credited = outcomes
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(|outcome| matches!(outcome, SettlementOutcome::Credited { .. }))
        .count();

    assert_eq!(credited, 1);
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(20));
}

#[tokio::test]
async fn test_balance_row_created_on_first_credit() {
    let h = harness();
    h.orders.create_order("u9", 5).await.unwrap();

    let payload = succeeded_event("pi_1", 725, "usd");
    h.settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap();

    assert_eq!(h.store.get_balance("u9").await.unwrap(), Some(5));
}

#[tokio::test]
async fn test_failed_completion_applies_nothing() {
    let h = harness();
    h.store.insert_user("u1", 7).await;
    h.orders.create_order("u1", 20).await.unwrap();
    h.store.fail_order_completion(true);

    let payload = succeeded_event("pi_1", 1975, "usd");
    let header = h.sign(&payload);
    let err = h
        .settlement
        .handle_notification(&payload, &header)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Persistence(_)));
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(7));
    assert!(!h.store.get("pi_1").await.unwrap().unwrap().complete);

    // Redelivery after recovery settles exactly once
    h.store.fail_order_completion(false);
    h.settlement
        .handle_notification(&payload, &header)
        .await
        .unwrap();
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(27));
}

#[tokio::test]
async fn test_read_failure_is_reported_for_redelivery() {
    let h = harness();
    h.store.insert_user("u1", 0).await;
    h.orders.create_order("u1", 20).await.unwrap();
    let mutations = h.store.mutation_count();
    h.store.fail_reads(true);

    let payload = succeeded_event("pi_1", 1975, "usd");
    let header = h.sign(&payload);
    let err = h
        .settlement
        .handle_notification(&payload, &header)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Persistence(_)));
    assert_eq!(h.store.mutation_count(), mutations);
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(0));

    h.store.fail_reads(false);
    let outcome = h
        .settlement
        .handle_notification(&payload, &header)
        .await
        .unwrap();
    assert!(matches!(outcome, SettlementOutcome::Credited { credits: 20, .. }));

    let outcome = h
        .settlement
        .handle_notification(&payload, &header)
        .await
        .unwrap();
    assert!(matches!(outcome, SettlementOutcome::AlreadySettled { .. }));
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(20));
}

#[tokio::test]
async fn test_tampered_payload_rejected_without_effects() {
    let h = harness();
    h.store.insert_user("u1", 0).await;
    h.orders.create_order("u1", 20).await.unwrap();
    let mutations = h.store.mutation_count();

    let signed = succeeded_event("pi_1", 1975, "usd");
    let header = h.sign(&signed);
    let tampered = succeeded_event("pi_1", 1, "usd");

    let err = h
        .settlement
        .handle_notification(&tampered, &header)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidNotification(_)));
    assert_eq!(h.store.mutation_count(), mutations);
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_malformed_and_stale_signatures_rejected() {
    let h = harness();
    h.orders.create_order("u1", 20).await.unwrap();
    let payload = succeeded_event("pi_1", 1975, "usd");

    for header in ["", "garbage", "t=abc,v1=00", "v1=deadbeef"] {
        let err = h
            .settlement
            .handle_notification(&payload, header)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ApiError::InvalidNotification(_)),
            "header={:?}",
            header
        );
    }

    let stale = h
        .signer
        .sign(&payload, now() - TOLERANCE_SECONDS - 60)
        .unwrap();
    let err = h
        .settlement
        .handle_notification(&payload, &stale)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidNotification(_)));
    assert!(!h.store.get("pi_1").await.unwrap().unwrap().complete);
}

#[tokio::test]
async fn test_unsupported_currency_rejected() {
    let h = harness();
    h.store.insert_user("u1", 0).await;
    h.orders.create_order("u1", 20).await.unwrap();

    let payload = succeeded_event("pi_1", 1975, "eur");
    let err = h
        .settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidCurrency(_)));
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(0));
    assert!(!h.store.get("pi_1").await.unwrap().unwrap().complete);
}

#[tokio::test]
async fn test_capture_for_unknown_order() {
    let h = harness();

    let payload = succeeded_event("pi_404", 1975, "usd");
    let err = h
        .settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::OrderNotFound(_)));
    assert_eq!(h.store.mutation_count(), 0);
}

#[tokio::test]
async fn test_other_events_acknowledged_without_effects() {
    let h = harness();
    h.orders.create_order("u1", 20).await.unwrap();
    let mutations = h.store.mutation_count();

    let payload = event_of_type("customer.created", "cus_1");
    let outcome = h
        .settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SettlementOutcome::Ignored {
            event_type: "customer.created".to_string()
        }
    );

    let payload = event_of_type("payment_intent.canceled", "pi_1");
    let outcome = h
        .settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap();
    assert!(matches!(outcome, SettlementOutcome::Ignored { .. }));

    assert_eq!(h.store.mutation_count(), mutations);
}

#[tokio::test]
async fn test_completed_order_cannot_be_changed() {
    let h = harness();
    h.orders.create_order("u1", 20).await.unwrap();

    let payload = succeeded_event("pi_1", 1975, "usd");
    h.settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap();

    let err = h.orders.update_order("pi_1", 50, "u1").await.unwrap_err();
    assert!(matches!(err, ApiError::OrderCompleted(_)));

    let err = h.orders.cancel_order("pi_1", "u1").await.unwrap_err();
    assert!(matches!(err, ApiError::OrderCompleted(_)));

    let order = h.store.get("pi_1").await.unwrap().unwrap();
    assert!(order.complete);
    assert_eq!(order.credits, 20);
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(20));
}

#[tokio::test]
async fn test_canceled_order_never_settles() {
    let h = harness();
    h.store.insert_user("u1", 0).await;
    h.orders.create_order("u1", 20).await.unwrap();
    h.orders.cancel_order("pi_1", "u1").await.unwrap();

    let payload = succeeded_event("pi_1", 1975, "usd");
    let err = h
        .settlement
        .handle_notification(&payload, &h.sign(&payload))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::OrderNotFound(_)));
    assert_eq!(h.store.get_balance("u1").await.unwrap(), Some(0));
}
