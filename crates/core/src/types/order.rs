//! Order aggregate.
//!
//! Orders are created once at checkout and then only change status. They are
//! never deleted; a withdrawn order is marked `cancelled`. Line items are
//! snapshots of the product at purchase time, not live catalog references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address::DeliveryAddress;
use super::id::{OrderId, ProductId, UserId};
use super::price::Pricing;
use super::status::{OrderKind, OrderStatus, PaymentMethod, PaymentStatus};
use super::tracking::TrackingEvent;

/// Product details frozen into a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// One order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: ProductSnapshot,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl OrderItem {
    /// Create a line item, computing its subtotal.
    #[must_use]
    pub fn new(product: ProductSnapshot, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            product,
            quantity,
            unit_price,
            subtotal: unit_price * Decimal::from(quantity),
        }
    }
}

/// Customer contact details captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Human-facing number (e.g. `VP-20260118-0042`).
    pub order_number: String,
    /// `None` for guest checkouts.
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub kind: OrderKind,
    pub items: Vec<OrderItem>,
    pub customer: CustomerSnapshot,
    pub delivery_address: DeliveryAddress,
    pub pricing: Pricing,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracking_events: Vec<TrackingEvent>,
}

/// Why a status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelError {
    /// The order has progressed too far to cancel.
    #[error("order cannot be cancelled once it is {0}")]
    NotCancellable(OrderStatus),
    /// The requested move is not a forward lifecycle step.
    #[error("order cannot move from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, item| count.saturating_add(item.quantity))
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn items_subtotal(&self) -> Decimal {
        self.items.iter().map(|item| item.subtotal).sum()
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Returns `CancelError::NotCancellable` unless the order is pending,
    /// confirmed or processing. The order is left untouched on error.
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<(), CancelError> {
        if !self.status.is_cancellable() {
            return Err(CancelError::NotCancellable(self.status));
        }
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = reason;
        self.updated_at = now;
        Ok(())
    }

    /// Move the order forward in its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `CancelError::IllegalTransition` for backwards or repeated
    /// moves and `CancelError::NotCancellable` when cancelling too late.
    pub fn transition_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), CancelError> {
        if next == OrderStatus::Cancelled {
            return self.cancel(None, now);
        }
        if !self.status.can_transition_to(next) {
            return Err(CancelError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        if next == OrderStatus::Delivered {
            self.delivered_at = Some(now);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;

    pub(crate) fn sample_order(status: OrderStatus) -> Order {
        let created = Utc.with_ymd_and_hms(2026, 1, 18, 10, 30, 0).unwrap();
        let item = OrderItem::new(
            ProductSnapshot {
                product_id: ProductId::new("esp32-devkit"),
                name: "ESP32 DevKit V1".to_string(),
                sku: Some("VP-ESP32-01".to_string()),
                brand: Some("Espressif".to_string()),
                image_url: None,
            },
            4,
            Decimal::from(750),
        );
        Order {
            id: OrderId::new("1042"),
            order_number: "VP-20260118-1042".to_string(),
            user_id: Some(UserId::new("7")),
            kind: OrderKind::Purchase,
            items: vec![item],
            customer: CustomerSnapshot {
                name: "Anita Rao".to_string(),
                email: Some("anita@example.in".to_string()),
                phone: Some("9876543210".to_string()),
            },
            delivery_address: DeliveryAddress::default(),
            pricing: Pricing::for_subtotal(Decimal::from(3000), Decimal::ZERO),
            status,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: created,
            updated_at: created,
            cancelled_at: None,
            cancellation_reason: None,
            delivered_at: None,
            estimated_delivery: None,
            tracking_number: None,
            tracking_events: Vec::new(),
        }
    }

    #[test]
    fn test_item_subtotal_computed() {
        let order = sample_order(OrderStatus::Pending);
        assert_eq!(order.items[0].subtotal, Decimal::from(3000));
        assert_eq!(order.item_count(), 4);
        assert_eq!(order.items_subtotal(), order.pricing.subtotal);
    }

    #[test]
    fn test_item_count_saturates() {
        let mut order = sample_order(OrderStatus::Pending);
        let mut bulk = order.items[0].clone();
        bulk.quantity = u32::MAX;
        order.items.push(bulk);
        assert_eq!(order.item_count(), u32::MAX);
    }

    #[test]
    fn test_cancel_pending_order() {
        let mut order = sample_order(OrderStatus::Confirmed);
        let now = Utc::now();
        order
            .cancel(Some("ordered wrong part".to_string()), now)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancelled_at, Some(now));
        assert_eq!(order.cancellation_reason.as_deref(), Some("ordered wrong part"));
    }

    #[test]
    fn test_cancel_refused_after_dispatch() {
        for status in [
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let mut order = sample_order(status);
            let before = order.clone();
            assert_eq!(
                order.cancel(None, Utc::now()),
                Err(CancelError::NotCancellable(status))
            );
            assert_eq!(order, before);
        }
    }

    #[test]
    fn test_transition_to_delivered_stamps_time() {
        let mut order = sample_order(OrderStatus::OutForDelivery);
        let now = Utc::now();
        order.transition_to(OrderStatus::Delivered, now).unwrap();
        assert_eq!(order.delivered_at, Some(now));
        assert!(matches!(
            order.transition_to(OrderStatus::Shipped, now),
            Err(CancelError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample_order(OrderStatus::Pending)).unwrap();
        assert!(json.get("orderNumber").is_some());
        assert!(json.get("paymentMethod").is_some());
        assert_eq!(json["status"], "pending");
    }
}
