//! Backend wire types.
//!
//! The REST backend speaks snake_case and is loose about field names and
//! number encoding (amounts arrive as JSON numbers or strings). These rows
//! accept both and are converted into domain types in
//! [`conversions`](super::conversions).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use voltparts_core::{AddressId, OrderId, ProductId, UserId};

// =============================================================================
// Envelope
// =============================================================================

/// `{ success, data, message, pagination }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationRow>,
}

/// Pagination block of list responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationRow {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
}

// =============================================================================
// Orders
// =============================================================================

/// `data` of `/orders/history`: a bare array or an `{ orders, total }` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrderListData {
    Rows(Vec<OrderRow>),
    Wrapped {
        orders: Vec<OrderRow>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl OrderListData {
    /// Split into rows and the embedded total, if any.
    #[must_use]
    pub fn into_parts(self) -> (Vec<OrderRow>, Option<u64>) {
        match self {
            Self::Rows(rows) => (rows, None),
            Self::Wrapped { orders, total } => (orders, total),
        }
    }
}

/// One order as stored by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRow {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRow>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default, alias = "shipping_address")]
    pub delivery_address: Option<AddressRow>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default, alias = "shipping")]
    pub shipping_cost: Option<Decimal>,
    #[serde(default, alias = "tax_amount")]
    pub tax: Option<Decimal>,
    #[serde(default, alias = "discount_amount")]
    pub discount: Option<Decimal>,
    #[serde(default, alias = "total")]
    pub total_amount: Option<Decimal>,
    #[serde(default, alias = "order_status")]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_events: Vec<TrackingEventRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRow {
    pub product_id: ProductId,
    #[serde(default, alias = "name")]
    pub product_name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    pub quantity: u32,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingEventRow {
    pub status: String,
    #[serde(alias = "created_at")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Addresses
// =============================================================================

/// Address as the backend stores it. Also used in request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRow {
    #[serde(default, alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, alias = "line1")]
    pub address_line1: String,
    #[serde(default, alias = "line2", skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, alias = "postal_code")]
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedAddressRow {
    pub id: AddressId,
    #[serde(flatten)]
    pub address: AddressRow,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `POST /orders/addresses`.
#[derive(Debug, Serialize)]
pub struct SaveAddressBody {
    #[serde(flatten)]
    pub address: AddressRow,
    pub is_default: bool,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// `data` of `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRow,
}

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterBody<'a> {
    pub name: &'a str,
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
    pub password: &'a str,
}

// =============================================================================
// Order creation
// =============================================================================

/// Body of `POST /orders/create`. Amounts go out as JSON numbers.
#[derive(Debug, Serialize)]
pub struct CreateOrderBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub order_type: &'static str,
    pub items: Vec<CreateOrderItemBody>,
    pub customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub delivery_address: AddressRow,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub payment_method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderItemBody {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

// =============================================================================
// Notifications
// =============================================================================

/// Body of `POST /whatsapp/send`.
#[derive(Debug, Serialize)]
pub struct WhatsAppBody<'a> {
    pub phone: &'a str,
    pub message: &'a str,
}

/// Body of `POST /email/send-order-confirmation`.
#[derive(Debug, Serialize)]
pub struct OrderEmailBody<'a> {
    pub to: &'a str,
    pub subject: &'a str,
    pub html: &'a str,
    pub order_id: &'a OrderId,
    pub order_number: &'a str,
}
