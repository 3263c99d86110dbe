//! Integration tests for the Voltparts storefront client.
//!
//! The tests run the real client against [`MockBackend`], an in-process
//! axum server speaking the Voltparts REST protocol. Every test starts its
//! own backend on a free port, so tests run in parallel without setup.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p voltparts-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Login, signup, logout and cross-handle session sync
//! - `orders` - Creation, history, lookup, tracking and cancellation
//! - `notifications` - WhatsApp and email confirmations
//! - `checkout` - Cart checkout and the quote flow

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use voltparts_storefront::Storefront;
use voltparts_storefront::config::{ConfigError, StorefrontConfig};
use voltparts_storefront::storage::LocalStorage;

/// Password accepted for every account the mock knows.
pub const PASSWORD: &str = "Sup3r$ecret";

// =============================================================================
// State
// =============================================================================

/// Switches that make individual endpoints fail with HTTP 500.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub create_order: bool,
    pub history: bool,
    pub get_order: bool,
    pub whatsapp: bool,
    pub email: bool,
    pub addresses: bool,
}

#[derive(Default)]
struct BackendData {
    next_order_id: u64,
    orders: Vec<Value>,
    users: Vec<Value>,
    addresses: Vec<Value>,
    whatsapp: Vec<Value>,
    emails: Vec<Value>,
    hits: BTreeMap<&'static str, usize>,
    tokens: Vec<Option<String>>,
    failures: Failures,
    /// Return every matching row from `/orders/history`, ignoring `limit`.
    ignore_limit: bool,
    /// Leave `pagination` out of `/orders/history` responses.
    omit_pagination: bool,
}

#[derive(Clone, Default)]
struct MockState {
    data: Arc<Mutex<BackendData>>,
}

impl MockState {
    fn lock(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the request and remember its bearer token.
    fn hit(&self, route: &'static str, headers: &HeaderMap) -> MutexGuard<'_, BackendData> {
        let mut data = self.lock();
        *data.hits.entry(route).or_default() += 1;
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        data.tokens.push(token);
        data
    }
}

// =============================================================================
// Backend handle
// =============================================================================

/// A running mock backend.
pub struct MockBackend {
    addr: SocketAddr,
    state: MockState,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to a free local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = MockState::default();
        state.lock().users.push(json!({
            "id": 7,
            "name": "Anita Rao",
            "email": "anita@example.in",
            "phone": "9876543210",
            "role": "customer",
        }));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Base URL of the API, e.g. `http://127.0.0.1:40123/api/`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn config(&self) -> Result<StorefrontConfig, ConfigError> {
        StorefrontConfig::for_api_url(&self.url())
    }

    /// A storefront with fresh in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the storefront cannot be built.
    pub fn storefront(&self) -> voltparts_storefront::Result<Storefront> {
        self.storefront_with(LocalStorage::in_memory())
    }

    /// A storefront sharing `storage` with other handles.
    ///
    /// # Errors
    ///
    /// Returns an error if the storefront cannot be built.
    pub fn storefront_with(
        &self,
        storage: LocalStorage,
    ) -> voltparts_storefront::Result<Storefront> {
        Storefront::with_storage(self.config()?, storage)
    }

    pub fn set_failures(&self, failures: Failures) {
        self.state.lock().failures = failures;
    }

    pub fn set_ignore_limit(&self, ignore: bool) {
        self.state.lock().ignore_limit = ignore;
    }

    pub fn set_omit_pagination(&self, omit: bool) {
        self.state.lock().omit_pagination = omit;
    }

    /// Insert a raw order row; `id` and `order_number` are filled in when
    /// missing. Returns the order ID.
    pub fn seed_order(&self, mut row: Value) -> String {
        let mut data = self.state.lock();
        data.next_order_id += 1;
        let id = data.next_order_id;
        if row.get("id").is_none() {
            row["id"] = json!(id);
        }
        if row.get("order_number").is_none() {
            row["order_number"] = json!(format!("VP-2026-{id:04}"));
        }
        let id = match &row["id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        data.orders.push(row);
        id
    }

    /// Change an order's status as the warehouse would.
    pub fn set_order_status(&self, id: &str, status: &str) {
        let mut data = self.state.lock();
        if let Some(row) = data.orders.iter_mut().find(|row| id_matches(row, id)) {
            row["status"] = json!(status);
        }
    }

    /// Number of requests served on `route` (e.g. `"orders/history"`).
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        self.state.lock().hits.get(route).copied().unwrap_or(0)
    }

    /// Total requests served.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.state.lock().hits.values().sum()
    }

    /// Bearer token of the most recent request.
    #[must_use]
    pub fn last_token(&self) -> Option<String> {
        self.state.lock().tokens.last().cloned().flatten()
    }

    /// Bodies received by `POST /whatsapp/send`.
    #[must_use]
    pub fn whatsapp_messages(&self) -> Vec<Value> {
        self.state.lock().whatsapp.clone()
    }

    /// Bodies received by `POST /email/send-order-confirmation`.
    #[must_use]
    pub fn emails(&self) -> Vec<Value> {
        self.state.lock().emails.clone()
    }

    /// Raw order rows held by the backend.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.state.lock().orders.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: MockState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/orders/create", post(create_order))
        .route("/orders/history", get(order_history))
        .route("/orders/addresses", get(list_addresses).post(save_address))
        .route("/orders/{id}", get(get_order))
        .route("/whatsapp/send", post(send_whatsapp))
        .route("/email/send-order-confirmation", post(send_email));

    Router::new().nest("/api", api).with_state(state)
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn id_matches(row: &Value, id: &str) -> bool {
    value_is(&row["id"], id)
}

/// IDs arrive as numbers or strings.
fn value_is(value: &Value, id: &str) -> bool {
    match value {
        Value::Number(n) => n.to_string() == id,
        Value::String(s) => s == id,
        _ => false,
    }
}

async fn login(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let data = state.hit("auth/login", &headers);
    let email = body["email"].as_str().unwrap_or_default();
    let user = data
        .users
        .iter()
        .find(|user| user["email"] == email)
        .cloned();

    match user {
        Some(user) if body["password"] == PASSWORD => ok(json!({
            "token": uuid::Uuid::new_v4().to_string(),
            "user": user,
        })),
        _ => fail(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn register(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = state.hit("auth/register", &headers);
    if data.users.iter().any(|user| user["email"] == body["email"]) {
        return fail(StatusCode::CONFLICT, "Email already registered");
    }
    let user = json!({
        "id": 100 + data.users.len(),
        "name": body["name"],
        "email": body["email"],
        "phone": body.get("phone").cloned().unwrap_or(Value::Null),
        "role": "customer",
        "created_at": Utc::now(),
    });
    data.users.push(user.clone());
    ok(json!({ "token": uuid::Uuid::new_v4().to_string(), "user": user }))
}

async fn create_order(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let mut data = state.hit("orders/create", &headers);
    if data.failures.create_order {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable");
    }
    data.next_order_id += 1;
    let id = data.next_order_id;
    let now = Utc::now();
    body["id"] = json!(id);
    body["order_number"] = json!(format!("VP-2026-{id:04}"));
    body["status"] = json!("pending");
    body["payment_status"] = json!("pending");
    body["created_at"] = json!(now);
    body["updated_at"] = json!(now);
    data.orders.push(body.clone());
    ok(body)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    user_id: Option<String>,
}

async fn order_history(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let data = state.hit("orders/history", &headers);
    if data.failures.history {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "history unavailable");
    }

    let mut matching: Vec<&Value> = data
        .orders
        .iter()
        .filter(|row| match &query.user_id {
            Some(user_id) => value_is(&row["user_id"], user_id),
            None => row.get("user_id").is_none_or(Value::is_null),
        })
        .collect();
    matching.reverse();

    let total = matching.len();
    let limit = query.limit.unwrap_or(10);
    let offset = query.offset.unwrap_or(0);
    let rows: Vec<Value> = if data.ignore_limit {
        matching.into_iter().cloned().collect()
    } else {
        matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    };

    let mut response = json!({ "success": true, "data": rows });
    if !data.omit_pagination {
        response["pagination"] = json!({ "total": total, "limit": limit, "offset": offset });
    }
    Json(response).into_response()
}

async fn get_order(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let data = state.hit("orders/get", &headers);
    if data.failures.get_order {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "lookup unavailable");
    }
    data.orders
        .iter()
        .find(|row| id_matches(row, &id))
        .cloned()
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"), ok)
}

async fn list_addresses(State(state): State<MockState>, headers: HeaderMap) -> Response {
    let data = state.hit("orders/addresses", &headers);
    if data.failures.addresses {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "addresses unavailable");
    }
    ok(Value::Array(data.addresses.clone()))
}

async fn save_address(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let mut data = state.hit("orders/addresses", &headers);
    if data.failures.addresses {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "addresses unavailable");
    }
    body["id"] = json!(data.addresses.len() + 1);
    if body["is_default"] == true {
        for address in &mut data.addresses {
            address["is_default"] = json!(false);
        }
    }
    data.addresses.push(body.clone());
    ok(body)
}

async fn send_whatsapp(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = state.hit("whatsapp/send", &headers);
    if data.failures.whatsapp {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "WhatsApp gateway down");
    }
    data.whatsapp.push(body);
    Json(json!({ "success": true, "message": "WhatsApp message queued" })).into_response()
}

async fn send_email(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = state.hit("email/send-order-confirmation", &headers);
    if data.failures.email {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "SMTP relay down");
    }
    data.emails.push(body);
    Json(json!({ "success": true, "message": "Email sent" })).into_response()
}

// =============================================================================
// Fixtures
// =============================================================================

/// Builders for test data.
pub mod fixtures {
    use rust_decimal::Decimal;
    use voltparts_core::{
        BasketItem, CustomerSnapshot, DeliveryAddress, OrderKind, PaymentMethod, Pricing,
        ProductId, ProductSnapshot, UserId,
    };
    use voltparts_storefront::services::{CheckoutForm, CreateOrderRequest};

    /// A basket line priced in whole rupees.
    #[must_use]
    pub fn item(product_id: &str, name: &str, price: i64, quantity: u32) -> BasketItem {
        BasketItem {
            product: ProductSnapshot {
                product_id: ProductId::new(product_id),
                name: name.to_string(),
                sku: Some(product_id.to_uppercase()),
                brand: None,
                image_url: None,
            },
            unit_price: Decimal::from(price),
            quantity,
        }
    }

    #[must_use]
    pub fn address() -> DeliveryAddress {
        DeliveryAddress {
            full_name: "Anita Rao".to_string(),
            phone: "9876543210".to_string(),
            line1: "14 Residency Road".to_string(),
            line2: None,
            landmark: Some("Opposite Garuda Mall".to_string()),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560025".to_string(),
            country: "India".to_string(),
        }
    }

    /// A valid checkout form for Anita.
    #[must_use]
    pub fn form() -> CheckoutForm {
        let address = address();
        CheckoutForm {
            full_name: address.full_name,
            email: "anita@example.in".to_string(),
            phone: address.phone,
            line1: address.line1,
            line2: None,
            landmark: address.landmark,
            city: address.city,
            state: address.state,
            pincode: address.pincode,
            payment_method: PaymentMethod::Upi,
            notes: None,
            save_address: false,
        }
    }

    /// An order request with consistent pricing.
    #[must_use]
    pub fn order_request(user_id: Option<UserId>, items: Vec<BasketItem>) -> CreateOrderRequest {
        let subtotal: Decimal = items.iter().map(BasketItem::subtotal).sum();
        CreateOrderRequest {
            user_id,
            kind: OrderKind::Purchase,
            items,
            customer: CustomerSnapshot {
                name: "Anita Rao".to_string(),
                email: Some("anita@example.in".to_string()),
                phone: Some("9876543210".to_string()),
            },
            delivery_address: address(),
            pricing: Pricing::for_subtotal(subtotal, Decimal::ZERO),
            payment_method: PaymentMethod::Cod,
            notes: None,
        }
    }
}
