//! Conversions between backend rows and domain types.

use std::str::FromStr;

use chrono::Utc;
use tracing::warn;

use voltparts_core::{
    CustomerSnapshot, DeliveryAddress, Email, Order, OrderItem, OrderKind, OrderStatus,
    PaymentStatus, Pricing, ProductSnapshot, SavedAddress, TrackingEvent, User, UserRole,
};

use super::ApiError;
use super::wire::{
    AddressRow, CreateOrderBody, CreateOrderItemBody, OrderItemRow, OrderRow, SavedAddressRow,
    TrackingEventRow, UserRow,
};
use crate::services::orders::CreateOrderRequest;

/// Parse a backend enum string, falling back to the default on unknown input.
fn parse_or_default<T>(raw: Option<&str>, field: &'static str) -> T
where
    T: FromStr + Default,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return T::default();
    };
    raw.parse().unwrap_or_else(|e| {
        warn!(field, value = raw, error = %e, "Unknown value from backend, using default");
        T::default()
    })
}

fn parse_kind(raw: Option<&str>) -> OrderKind {
    match raw.map(str::trim) {
        Some(kind) if kind.eq_ignore_ascii_case("quote") => OrderKind::Quote,
        _ => OrderKind::Purchase,
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Convert a backend order row.
///
/// Missing amounts are derived: the subtotal from the lines and the total
/// from the other components.
#[must_use]
pub fn convert_order(row: OrderRow) -> Order {
    let items: Vec<OrderItem> = row.items.into_iter().map(convert_order_item).collect();
    let delivery_address = row.delivery_address.map(convert_address).unwrap_or_default();

    let subtotal = row
        .subtotal
        .unwrap_or_else(|| items.iter().map(|item| item.subtotal).sum());
    let shipping = row.shipping_cost.unwrap_or_default();
    let tax = row.tax.unwrap_or_default();
    let discount = row.discount.unwrap_or_default();
    let pricing = Pricing {
        subtotal,
        shipping,
        tax,
        discount,
        total: row
            .total_amount
            .unwrap_or(subtotal + shipping + tax - discount),
    };

    let customer = CustomerSnapshot {
        name: row
            .customer_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| delivery_address.full_name.clone()),
        email: row.customer_email.filter(|e| !e.is_empty()),
        phone: row
            .customer_phone
            .filter(|p| !p.is_empty())
            .or_else(|| Some(delivery_address.phone.clone()).filter(|p| !p.is_empty())),
    };

    let created_at = row.created_at.or(row.updated_at).unwrap_or_else(Utc::now);
    let updated_at = row.updated_at.unwrap_or(created_at);

    Order {
        order_number: row
            .order_number
            .unwrap_or_else(|| format!("VP-{}", row.id)),
        id: row.id,
        user_id: row.user_id,
        kind: parse_kind(row.order_type.as_deref()),
        items,
        customer,
        delivery_address,
        pricing,
        status: parse_or_default(row.status.as_deref(), "status"),
        payment_method: parse_or_default(row.payment_method.as_deref(), "payment_method"),
        payment_status: parse_or_default::<PaymentStatus>(
            row.payment_status.as_deref(),
            "payment_status",
        ),
        notes: row.notes.filter(|n| !n.is_empty()),
        created_at,
        updated_at,
        cancelled_at: row.cancelled_at,
        cancellation_reason: row.cancellation_reason,
        delivered_at: row.delivered_at,
        estimated_delivery: row.estimated_delivery,
        tracking_number: row.tracking_number.filter(|t| !t.is_empty()),
        tracking_events: row
            .tracking_events
            .into_iter()
            .map(convert_tracking_event)
            .collect(),
    }
}

fn convert_order_item(row: OrderItemRow) -> OrderItem {
    let name = row
        .product_name
        .unwrap_or_else(|| row.product_id.to_string());
    let item = OrderItem::new(
        ProductSnapshot {
            product_id: row.product_id,
            name,
            sku: row.sku,
            brand: row.brand,
            image_url: row.image_url,
        },
        row.quantity,
        row.unit_price,
    );
    if let Some(subtotal) = row.subtotal
        && subtotal != item.subtotal
    {
        warn!(
            product_id = %item.product.product_id,
            backend = %subtotal,
            computed = %item.subtotal,
            "Line subtotal disagrees with unit price x quantity"
        );
    }
    item
}

fn convert_tracking_event(row: TrackingEventRow) -> TrackingEvent {
    let status: OrderStatus = parse_or_default(Some(&row.status), "tracking_status");
    TrackingEvent {
        status,
        timestamp: row.timestamp,
        location: row.location,
        description: row
            .description
            .unwrap_or_else(|| status.label().to_string()),
    }
}

// =============================================================================
// Addresses
// =============================================================================

#[must_use]
pub fn convert_address(row: AddressRow) -> DeliveryAddress {
    DeliveryAddress {
        full_name: row.full_name,
        phone: row.phone,
        line1: row.address_line1,
        line2: row.address_line2.filter(|s| !s.is_empty()),
        landmark: row.landmark.filter(|s| !s.is_empty()),
        city: row.city,
        state: row.state,
        pincode: row.pincode,
        country: row
            .country
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "India".to_string()),
    }
}

#[must_use]
pub fn address_row(address: &DeliveryAddress) -> AddressRow {
    AddressRow {
        full_name: address.full_name.clone(),
        phone: address.phone.clone(),
        address_line1: address.line1.clone(),
        address_line2: address.line2.clone(),
        landmark: address.landmark.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        pincode: address.pincode.clone(),
        country: Some(address.country.clone()),
    }
}

#[must_use]
pub fn convert_saved_address(row: SavedAddressRow) -> SavedAddress {
    SavedAddress {
        id: row.id,
        address: convert_address(row.address),
        is_default: row.is_default,
    }
}

// =============================================================================
// Users
// =============================================================================

/// Convert a backend user row.
///
/// # Errors
///
/// Returns `ApiError::MissingData` if the backend sent an unusable email.
pub fn convert_user(row: UserRow) -> Result<User, ApiError> {
    let email = Email::parse(&row.email)
        .map_err(|e| ApiError::MissingData(format!("valid user email ({e})")))?;
    let name = row
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.as_str().split('@').next().unwrap_or_default().to_string());
    Ok(User {
        id: row.id,
        name,
        email,
        phone: row.phone.filter(|p| !p.is_empty()),
        role: parse_or_default::<UserRole>(row.role.as_deref(), "role"),
        created_at: row.created_at,
    })
}

// =============================================================================
// Requests
// =============================================================================

/// Build the backend body for an order creation request.
#[must_use]
pub fn create_order_body(request: &CreateOrderRequest) -> CreateOrderBody {
    CreateOrderBody {
        user_id: request.user_id.clone(),
        order_type: request.kind.as_str(),
        items: request
            .items
            .iter()
            .map(|item| CreateOrderItemBody {
                product_id: item.product.product_id.clone(),
                product_name: item.product.name.clone(),
                sku: item.product.sku.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal(),
            })
            .collect(),
        customer_name: request.customer.name.clone(),
        customer_email: request.customer.email.clone(),
        customer_phone: request.customer.phone.clone(),
        delivery_address: address_row(&request.delivery_address),
        subtotal: request.pricing.subtotal,
        shipping_cost: request.pricing.shipping,
        tax: request.pricing.tax,
        discount: request.pricing.discount,
        total_amount: request.pricing.total,
        payment_method: request.payment_method.as_str(),
        notes: request.notes.clone(),
    }
}
