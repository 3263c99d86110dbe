//! Ecommerce analytics events.
//!
//! Events follow the GA4 ecommerce shape and are emitted as structured logs
//! on the `analytics` target, where a collector can pick them up.

use rust_decimal::Decimal;
use serde::Serialize;

use voltparts_core::{BasketItem, CurrencyCode, Order};

/// One product in an analytics event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsItem {
    pub item_id: String,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_brand: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

/// An analytics event ready to ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub currency: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    pub items: Vec<AnalyticsItem>,
}

/// Builds and emits analytics events.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsService {
    currency: CurrencyCode,
}

impl AnalyticsService {
    #[must_use]
    pub const fn new(currency: CurrencyCode) -> Self {
        Self { currency }
    }

    /// Track a completed purchase.
    pub fn purchase(&self, order: &Order) -> AnalyticsEvent {
        let event = AnalyticsEvent {
            name: "purchase",
            transaction_id: Some(order.order_number.clone()),
            value: order.pricing.total,
            currency: self.currency.code(),
            tax: order.pricing.tax,
            shipping: order.pricing.shipping,
            items: order
                .items
                .iter()
                .map(|item| AnalyticsItem {
                    item_id: item.product.product_id.to_string(),
                    item_name: item.product.name.clone(),
                    item_brand: item.product.brand.clone(),
                    price: item.unit_price,
                    quantity: item.quantity,
                })
                .collect(),
        };
        emit(&event);
        event
    }

    /// Track an item added to the cart.
    pub fn add_to_cart(&self, item: &BasketItem) -> AnalyticsEvent {
        let event = AnalyticsEvent {
            name: "add_to_cart",
            transaction_id: None,
            value: item.subtotal(),
            currency: self.currency.code(),
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            items: vec![AnalyticsItem {
                item_id: item.product.product_id.to_string(),
                item_name: item.product.name.clone(),
                item_brand: item.product.brand.clone(),
                price: item.unit_price,
                quantity: item.quantity,
            }],
        };
        emit(&event);
        event
    }
}

fn emit(event: &AnalyticsEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => tracing::info!(target: "analytics", event = event.name, %payload, "Analytics event"),
        Err(e) => tracing::warn!(target: "analytics", event = event.name, error = %e, "Failed to encode analytics event"),
    }
}
