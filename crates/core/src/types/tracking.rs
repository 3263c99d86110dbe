//! Shipment tracking view of an order.
//!
//! The backend does not run a tracking feed yet. When an order carries no
//! events a single event is synthesized from its current status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::OrderId;
use super::order::Order;
use super::status::OrderStatus;

/// One step in a shipment timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub description: String,
}

/// Tracking timeline for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub events: Vec<TrackingEvent>,
}

impl OrderTracking {
    /// Build the tracking view for an order.
    ///
    /// Events are returned oldest first.
    #[must_use]
    pub fn for_order(order: &Order) -> Self {
        let events = if order.tracking_events.is_empty() {
            vec![TrackingEvent {
                status: order.status,
                timestamp: order.updated_at,
                location: None,
                description: describe(order.status).to_string(),
            }]
        } else {
            let mut events = order.tracking_events.clone();
            events.sort_by_key(|event| event.timestamp);
            events
        };

        Self {
            order_id: order.id.clone(),
            status: order.status,
            tracking_number: order.tracking_number.clone(),
            events,
        }
    }

    /// The most recent event.
    #[must_use]
    pub fn latest(&self) -> Option<&TrackingEvent> {
        self.events.last()
    }
}

const fn describe(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Your order has been placed",
        OrderStatus::Confirmed => "Your order has been confirmed",
        OrderStatus::Processing => "Your order is being packed",
        OrderStatus::Shipped => "Your order has been shipped",
        OrderStatus::OutForDelivery => "Your order is out for delivery",
        OrderStatus::Delivered => "Your order has been delivered",
        OrderStatus::Cancelled => "Your order was cancelled",
    }
}
