//! Integration tests for order creation, history, lookup and cancellation.
//!
//! Each test runs against its own in-process mock backend.

use rust_decimal::Decimal;
use serde_json::{Value, json};
use voltparts_core::{OrderId, OrderKind, OrderStatus, Pricing, UserId};
use voltparts_integration_tests::fixtures::{item, order_request};
use voltparts_integration_tests::{Failures, MockBackend, PASSWORD};
use voltparts_storefront::services::OrderError;

async fn backend() -> MockBackend {
    MockBackend::start().await.expect("Failed to start mock backend")
}

/// A minimal guest order row as the backend stores it.
fn guest_row(status: &str, day: u32) -> Value {
    json!({
        "status": status,
        "items": [
            { "product_id": "res-10k", "product_name": "10k Resistor (pack of 100)", "quantity": 2, "unit_price": "45.00" }
        ],
        "shipping_cost": 100,
        "tax": "16.20",
        "delivery_address": { "full_name": "Guest Buyer", "phone": "9123456780", "address_line1": "2 Park Street", "city": "Kolkata", "state": "West Bengal", "pincode": "700016" },
        "created_at": format!("2026-03-{day:02}T10:00:00Z"),
    })
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_order_updates_list_and_mirror() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");
    let orders = storefront.orders();

    let request = order_request(
        None,
        vec![
            item("arduino-uno", "Arduino Uno R3", 650, 2),
            item("hc-sr04", "HC-SR04 Ultrasonic Sensor", 120, 1),
        ],
    );
    let expected_total = request.pricing.total;
    let order = orders.create_order(request).await.expect("order created");

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.kind, OrderKind::Purchase);
    assert!(order.order_number.starts_with("VP-2026-"));
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.pricing.subtotal, Decimal::from(1420));
    assert_eq!(order.pricing.total, expected_total);
    assert!(order.pricing.is_consistent());

    assert_eq!(orders.orders().first().map(|o| &o.id), Some(&order.id));
    assert_eq!(orders.local_orders(None), vec![order.clone()]);
    assert_eq!(backend.hits("orders/create"), 1);

    let stored = backend.orders();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["order_type"], "purchase");
    assert_eq!(stored[0]["payment_method"], "cod");
}

#[tokio::test]
async fn test_inconsistent_pricing_makes_no_request() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");

    let mut request = order_request(None, vec![item("arduino-uno", "Arduino Uno R3", 650, 1)]);
    request.pricing = Pricing {
        total: request.pricing.total + Decimal::ONE,
        ..request.pricing
    };

    let err = storefront
        .orders()
        .create_order(request)
        .await
        .expect_err("pricing mismatch rejected");
    assert!(matches!(err, OrderError::InconsistentPricing(_)));
    assert_eq!(backend.total_hits(), 0);
    assert!(storefront.orders().orders().is_empty());
}

#[tokio::test]
async fn test_create_failure_leaves_state_untouched() {
    let backend = backend().await;
    backend.set_failures(Failures {
        create_order: true,
        ..Failures::default()
    });
    let storefront = backend.storefront().expect("storefront");

    let err = storefront
        .orders()
        .create_order(order_request(None, vec![item("arduino-uno", "Arduino Uno R3", 650, 1)]))
        .await
        .expect_err("backend failure surfaces");
    assert!(matches!(err, OrderError::Api(_)));
    assert!(storefront.orders().orders().is_empty());
    assert!(storefront.orders().local_orders(None).is_empty());
}

// ============================================================================
// History & Pagination
// ============================================================================

#[tokio::test]
async fn test_history_pages() {
    let backend = backend().await;
    for day in 1..=7 {
        backend.seed_order(guest_row("confirmed", day));
    }
    let storefront = backend.storefront().expect("storefront");

    let first = storefront.orders().get_user_orders(None, 5, 1).await;
    assert_eq!(first.items.len(), 5);
    assert_eq!(first.pagination.total, 7);
    assert_eq!(first.pagination.total_pages(), 2);
    assert!(first.pagination.has_next());
    assert!(first.items[0].created_at > first.items[4].created_at);

    let second = storefront.orders().get_user_orders(None, 5, 2).await;
    assert_eq!(second.items.len(), 2);
    assert!(!second.pagination.has_next());
    assert_eq!(storefront.orders().orders(), second.items);

    // Both pages stay in the mirror.
    assert_eq!(storefront.orders().local_orders(None).len(), 7);
}

#[tokio::test]
async fn test_history_truncated_to_limit() {
    let backend = backend().await;
    for day in 1..=6 {
        backend.seed_order(guest_row("pending", day));
    }
    backend.set_ignore_limit(true);
    let storefront = backend.storefront().expect("storefront");

    let page = storefront.orders().get_user_orders(None, 4, 1).await;
    assert_eq!(page.items.len(), 4);
    assert_eq!(page.pagination.total, 6);

    backend.set_omit_pagination(true);
    let page = storefront.orders().get_user_orders(None, 4, 1).await;
    assert_eq!(page.items.len(), 4);
    assert_eq!(page.pagination.total, 6);
}

#[tokio::test]
async fn test_history_derives_missing_amounts() {
    let backend = backend().await;
    backend.seed_order(guest_row("processing", 3));
    let storefront = backend.storefront().expect("storefront");

    let page = storefront.orders().get_user_orders(None, 10, 1).await;
    let order = page.items.first().expect("one order");
    assert_eq!(order.pricing.subtotal, Decimal::from(90));
    assert_eq!(order.pricing.total, Decimal::new(20_620, 2));
    assert_eq!(order.customer.name, "Guest Buyer");
    assert_eq!(order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_history_failure_yields_empty_page() {
    let backend = backend().await;
    backend.seed_order(guest_row("pending", 1));
    backend.set_failures(Failures {
        history: true,
        ..Failures::default()
    });
    let storefront = backend.storefront().expect("storefront");

    let page = storefront.orders().get_user_orders(None, 10, 3).await;
    assert!(page.items.is_empty());
    assert_eq!(page.pagination.page, 3);
    assert_eq!(page.pagination.total, 0);
    assert_eq!(backend.hits("orders/history"), 1);
}

#[tokio::test]
async fn test_user_history_sends_token_and_user_id() {
    let backend = backend().await;
    backend.seed_order(json!({ "user_id": 7, "status": "delivered", "total_amount": 499 }));
    backend.seed_order(guest_row("pending", 2));
    let storefront = backend.storefront().expect("storefront");

    let user = storefront
        .auth()
        .login("anita@example.in", PASSWORD)
        .await
        .expect("login");
    let page = storefront
        .orders()
        .get_user_orders(Some(&user.id), 10, 1)
        .await;

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].user_id, Some(UserId::new("7")));
    assert_eq!(page.items[0].status, OrderStatus::Delivered);
    assert!(backend.last_token().is_some());
    assert_eq!(
        storefront.storage().get_item("authToken"),
        backend.last_token()
    );
}

// ============================================================================
// Lookup & Tracking
// ============================================================================

#[tokio::test]
async fn test_get_order_prefers_cache() {
    let backend = backend().await;
    let id = backend.seed_order(guest_row("confirmed", 5));
    let storefront = backend.storefront().expect("storefront");
    let id = OrderId::new(id);

    let fetched = storefront.orders().get_order(&id).await.expect("order");
    assert_eq!(fetched.status, OrderStatus::Confirmed);
    assert_eq!(backend.hits("orders/get"), 1);

    backend.set_order_status(id.as_str(), "shipped");
    let cached = storefront.orders().get_order(&id).await.expect("cached order");
    assert_eq!(cached.status, OrderStatus::Confirmed);
    assert_eq!(backend.hits("orders/get"), 1);
}

#[tokio::test]
async fn test_get_order_missing_or_failing_is_none() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");

    assert!(storefront.orders().get_order(&OrderId::new("404")).await.is_none());

    let id = backend.seed_order(guest_row("confirmed", 5));
    backend.set_failures(Failures {
        get_order: true,
        ..Failures::default()
    });
    assert!(storefront.orders().get_order(&OrderId::new(id)).await.is_none());
}

#[tokio::test]
async fn test_tracking_timeline_is_chronological() {
    let backend = backend().await;
    let mut row = guest_row("shipped", 8);
    row["tracking_number"] = json!("DTDC7731200");
    row["tracking_events"] = json!([
        { "status": "shipped", "timestamp": "2026-03-10T08:00:00Z", "location": "Kolkata hub" },
        { "status": "pending", "timestamp": "2026-03-08T10:00:00Z", "description": "Order placed" },
        { "status": "confirmed", "timestamp": "2026-03-09T09:30:00Z" },
    ]);
    let id = backend.seed_order(row);
    let storefront = backend.storefront().expect("storefront");

    let tracking = storefront
        .orders()
        .get_order_tracking(&OrderId::new(id))
        .await
        .expect("tracking");
    assert_eq!(tracking.status, OrderStatus::Shipped);
    assert_eq!(tracking.tracking_number.as_deref(), Some("DTDC7731200"));
    let statuses: Vec<OrderStatus> = tracking.events.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Shipped]
    );
    assert_eq!(tracking.latest().and_then(|e| e.location.as_deref()), Some("Kolkata hub"));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancellation_survives_refresh() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");
    let order = storefront
        .orders()
        .create_order(order_request(None, vec![item("esp32-devkit", "ESP32 DevKit V1", 450, 3)]))
        .await
        .expect("order created");

    let cancelled = storefront
        .orders()
        .cancel_order(&order.id, Some("ordered twice".to_string()))
        .await
        .expect("cancelled");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    // The backend still says pending; the local cancellation wins.
    let page = storefront.orders().get_user_orders(None, 10, 1).await;
    let listed = page.items.first().expect("order listed");
    assert_eq!(listed.status, OrderStatus::Cancelled);
    assert_eq!(listed.cancellation_reason.as_deref(), Some("ordered twice"));

    // Once the warehouse ships it, the backend status wins.
    backend.set_order_status(order.id.as_str(), "shipped");
    let page = storefront.orders().get_user_orders(None, 10, 1).await;
    assert_eq!(page.items[0].status, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_shipped_order_cannot_be_cancelled() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");
    let order = storefront
        .orders()
        .create_order(order_request(None, vec![item("esp32-devkit", "ESP32 DevKit V1", 450, 1)]))
        .await
        .expect("order created");

    backend.set_order_status(order.id.as_str(), "shipped");
    storefront.orders().get_user_orders(None, 10, 1).await;

    let err = storefront
        .orders()
        .cancel_order(&order.id, None)
        .await
        .expect_err("shipped orders stay");
    assert!(matches!(
        err,
        OrderError::NotCancellable {
            status: OrderStatus::Shipped,
            ..
        }
    ));
    assert_eq!(
        storefront.orders().local_orders(None)[0].status,
        OrderStatus::Shipped
    );
}

#[tokio::test]
async fn test_cancel_unknown_order() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");

    let err = storefront
        .orders()
        .cancel_order(&OrderId::new("9999"), None)
        .await
        .expect_err("nothing to cancel");
    assert!(matches!(err, OrderError::NotFound(_)));
    assert_eq!(backend.total_hits(), 0);
}
