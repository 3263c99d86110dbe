//! Order service.
//!
//! The single source of order data for the client. Orders are created,
//! listed and fetched through the backend. The most recent list is held in a
//! `watch` channel and single orders in a TTL cache.
//!
//! Each user also has a local mirror of their orders in storage
//! (`orders_<userId>` or `orders_guest`). Cancellation is applied to the
//! mirror, and every later fetch re-applies those cancellations to orders
//! the backend still reports as cancellable, so a cancelled order stays
//! cancelled after a reload.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use voltparts_core::{
    BasketItem, CancelError, CustomerSnapshot, DeliveryAddress, Order, OrderId, OrderItem,
    OrderKind, OrderStatus, OrderTracking, Page, Pagination, PaymentMethod, Pricing, User, UserId,
};

use crate::api::conversions::{convert_order, create_order_body};
use crate::api::wire::{OrderListData, OrderRow};
use crate::api::{ApiClient, ApiError};
use crate::storage::{CURRENT_USER_KEY, LocalStorage, StorageError, orders_key};

const DETAIL_CACHE_CAPACITY: u64 = 500;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The order has progressed past the point where it can be cancelled.
    #[error("order {id} cannot be cancelled once it is {status}")]
    NotCancellable { id: OrderId, status: OrderStatus },

    /// `total != subtotal + shipping + tax - discount`.
    #[error("order total {} does not match its breakdown", .0.total)]
    InconsistentPricing(Pricing),

    #[error("order API error: {0}")]
    Api(#[from] ApiError),

    #[error("order storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What the client sends to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub kind: OrderKind,
    pub items: Vec<BasketItem>,
    pub customer: CustomerSnapshot,
    pub delivery_address: DeliveryAddress,
    pub pricing: Pricing,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Order service.
///
/// Cheap to clone; clones share caches.
#[derive(Clone)]
pub struct OrderService {
    inner: Arc<OrderServiceInner>,
}

struct OrderServiceInner {
    api: ApiClient,
    storage: LocalStorage,
    orders: watch::Sender<Vec<Order>>,
    details: Cache<OrderId, Order>,
}

impl OrderService {
    /// Create the service. `cache_ttl` bounds how long a fetched order is
    /// served without asking the backend again.
    #[must_use]
    pub fn new(api: ApiClient, storage: LocalStorage, cache_ttl: Duration) -> Self {
        let details = Cache::builder()
            .max_capacity(DETAIL_CACHE_CAPACITY)
            .time_to_live(cache_ttl)
            .build();
        let (orders, _) = watch::channel(Vec::new());

        Self {
            inner: Arc::new(OrderServiceInner {
                api,
                storage,
                orders,
                details,
            }),
        }
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InconsistentPricing` before any network call if
    /// the pricing does not add up, and `OrderError::Api` if the backend
    /// call fails. Nothing is retried.
    #[instrument(skip(self, request), fields(kind = request.kind.as_str(), items = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
        if !request.pricing.is_consistent() {
            return Err(OrderError::InconsistentPricing(request.pricing));
        }

        let row: OrderRow = self
            .inner
            .api
            .post("orders/create", &create_order_body(&request))
            .await?
            .into_data("created order")?;
        let order = fill_from_request(convert_order(row), &request);

        self.inner
            .orders
            .send_modify(|orders| orders.insert(0, order.clone()));
        self.inner
            .details
            .insert(order.id.clone(), order.clone())
            .await;

        let key = orders_key(order.user_id.as_ref());
        let mut mirror = self.load_mirror(&key);
        mirror.retain(|o| o.id != order.id);
        mirror.push(order.clone());
        if let Err(e) = self.inner.storage.set_json(&key, &mirror) {
            warn!(order_id = %order.id, error = %e, "Failed to mirror new order locally");
        }

        info!(order_id = %order.id, order_number = %order.order_number, total = %order.pricing.total, "Order created");
        Ok(order)
    }

    /// List a user's orders (or guest orders when `user_id` is `None`).
    ///
    /// Never fails: a backend error yields an empty page. The result
    /// replaces the cached list and refreshes the local mirror.
    #[instrument(skip(self))]
    pub async fn get_user_orders(
        &self,
        user_id: Option<&UserId>,
        limit: u32,
        page: u32,
    ) -> Page<Order> {
        let pagination = Pagination::new(page, limit, 0);
        match self.fetch_history(user_id, pagination).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Failed to load order history, showing none");
                Page::empty(pagination.page, pagination.limit)
            }
        }
    }

    async fn fetch_history(
        &self,
        user_id: Option<&UserId>,
        pagination: Pagination,
    ) -> Result<Page<Order>, OrderError> {
        let mut query = vec![
            ("limit", pagination.limit.to_string()),
            ("offset", pagination.offset().to_string()),
        ];
        if let Some(user_id) = user_id {
            query.push(("user_id", user_id.to_string()));
        }

        let response = self
            .inner
            .api
            .get::<OrderListData>("orders/history", &query)
            .await?;
        let backend_total = response.pagination.as_ref().and_then(|p| p.total);
        let (mut rows, embedded_total) = response
            .data
            .map(OrderListData::into_parts)
            .unwrap_or_default();

        let total = backend_total
            .or(embedded_total)
            .unwrap_or(rows.len() as u64);
        rows.truncate(pagination.limit as usize);

        let key = orders_key(user_id);
        let mut orders: Vec<Order> = rows.into_iter().map(convert_order).collect();
        let mirror = self.load_mirror(&key);
        reapply_cancellations(&mut orders, &mirror);

        for order in &orders {
            self.inner
                .details
                .insert(order.id.clone(), order.clone())
                .await;
        }
        self.inner.orders.send_replace(orders.clone());

        // Mirror keeps orders from other pages.
        let mut refreshed = orders.clone();
        refreshed.extend(
            mirror
                .into_iter()
                .filter(|local| !orders.iter().any(|o| o.id == local.id)),
        );
        if let Err(e) = self.inner.storage.set_json(&key, &refreshed) {
            warn!(error = %e, "Failed to refresh local order mirror");
        }

        debug!(count = orders.len(), total, "Loaded order history");
        Ok(Page {
            items: orders,
            pagination: Pagination::new(pagination.page, pagination.limit, total),
        })
    }

    /// Fetch one order: list cache, then detail cache, then the backend.
    ///
    /// Returns `None` if the order cannot be loaded.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: &OrderId) -> Option<Order> {
        if let Some(order) = self.cached(id).await {
            return Some(order);
        }

        let row: OrderRow = match self
            .inner
            .api
            .get(&format!("orders/{id}"), &[])
            .await
            .and_then(|response| response.into_data("order"))
        {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, not_found = e.is_not_found(), "Failed to load order");
                return None;
            }
        };

        let order = convert_order(row);
        let mirror = self.load_mirror(&orders_key(order.user_id.as_ref()));
        let mut orders = vec![order];
        reapply_cancellations(&mut orders, &mirror);
        let order = orders.pop()?;

        self.inner
            .details
            .insert(order.id.clone(), order.clone())
            .await;
        Some(order)
    }

    async fn cached(&self, id: &OrderId) -> Option<Order> {
        let listed = self
            .inner
            .orders
            .borrow()
            .iter()
            .find(|o| &o.id == id)
            .cloned();
        match listed {
            Some(order) => Some(order),
            None => self.inner.details.get(id).await,
        }
    }

    /// Tracking timeline of an order.
    pub async fn get_order_tracking(&self, id: &OrderId) -> Option<OrderTracking> {
        self.get_order(id)
            .await
            .map(|order| OrderTracking::for_order(&order))
    }

    // =========================================================================
    // Local operations
    // =========================================================================

    /// Cancel an order in the local mirror.
    ///
    /// The signed-in user's mirror is searched first, then the guest mirror.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no mirror holds the order,
    /// `OrderError::NotCancellable` once it has shipped (the order is left
    /// untouched) and `OrderError::Storage` if the mirror cannot be saved.
    #[instrument(skip(self, reason), fields(order_id = %id))]
    pub async fn cancel_order(
        &self,
        id: &OrderId,
        reason: Option<String>,
    ) -> Result<Order, OrderError> {
        let signed_in = self
            .inner
            .storage
            .get_json::<User>(CURRENT_USER_KEY)
            .map(|user| user.id);
        let mut keys = vec![orders_key(signed_in.as_ref())];
        if signed_in.is_some() {
            keys.push(orders_key(None));
        }

        for key in keys {
            let mut mirror = self.load_mirror(&key);
            let Some(order) = mirror.iter_mut().find(|o| &o.id == id) else {
                continue;
            };

            order.cancel(reason, Utc::now()).map_err(|e| match e {
                CancelError::NotCancellable(status)
                | CancelError::IllegalTransition { from: status, .. } => {
                    OrderError::NotCancellable {
                        id: id.clone(),
                        status,
                    }
                }
            })?;
            let cancelled = order.clone();
            self.inner.storage.set_json(&key, &mirror)?;

            self.inner.orders.send_if_modified(|orders| {
                if let Some(listed) = orders.iter_mut().find(|o| o.id == cancelled.id) {
                    *listed = cancelled.clone();
                    true
                } else {
                    false
                }
            });
            self.inner
                .details
                .insert(cancelled.id.clone(), cancelled.clone())
                .await;

            info!(status = %cancelled.status, "Order cancelled");
            return Ok(cancelled);
        }

        Err(OrderError::NotFound(id.clone()))
    }

    /// Most recently loaded order list.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.inner.orders.borrow().clone()
    }

    /// Stream of order list changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Order>> {
        self.inner.orders.subscribe()
    }

    /// Orders held in a local mirror.
    #[must_use]
    pub fn local_orders(&self, user_id: Option<&UserId>) -> Vec<Order> {
        self.load_mirror(&orders_key(user_id))
    }

    fn load_mirror(&self, key: &str) -> Vec<Order> {
        self.inner.storage.get_json(key).unwrap_or_default()
    }

    // =========================================================================
    // Status metadata
    // =========================================================================

    #[must_use]
    pub const fn status_label(status: OrderStatus) -> &'static str {
        status.label()
    }

    #[must_use]
    pub const fn status_icon(status: OrderStatus) -> &'static str {
        status.icon()
    }

    #[must_use]
    pub const fn status_color(status: OrderStatus) -> &'static str {
        status.color()
    }
}

/// Apply local cancellations to fetched orders still cancellable remotely.
fn reapply_cancellations(orders: &mut [Order], mirror: &[Order]) {
    for order in orders.iter_mut() {
        let Some(local) = mirror
            .iter()
            .find(|local| local.id == order.id && local.status == OrderStatus::Cancelled)
        else {
            continue;
        };
        if !order.status.is_cancellable() {
            continue;
        }
        warn!(
            order_id = %order.id,
            remote_status = %order.status,
            "Order cancelled locally but not on the backend, keeping local cancellation"
        );
        order.status = OrderStatus::Cancelled;
        order.cancelled_at = local.cancelled_at;
        order.cancellation_reason.clone_from(&local.cancellation_reason);
        order.updated_at = local.updated_at.max(order.updated_at);
    }
}

/// Fill fields the backend left out of a create response from the request.
fn fill_from_request(mut order: Order, request: &CreateOrderRequest) -> Order {
    if order.items.is_empty() {
        order.items = request
            .items
            .iter()
            .map(|item| OrderItem::new(item.product.clone(), item.quantity, item.unit_price))
            .collect();
    }
    if order.pricing.total == Decimal::ZERO {
        order.pricing = request.pricing;
    }
    if order.customer.name.is_empty() {
        order.customer = request.customer.clone();
    }
    if order.delivery_address.line1.is_empty() {
        order.delivery_address = request.delivery_address.clone();
    }
    if order.user_id.is_none() {
        order.user_id.clone_from(&request.user_id);
    }
    if order.notes.is_none() {
        order.notes.clone_from(&request.notes);
    }
    if request.kind == OrderKind::Quote {
        order.kind = OrderKind::Quote;
    }
    order
}
