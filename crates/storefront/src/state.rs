//! Storefront state shared across callers.

use std::sync::Arc;

use voltparts_core::CurrencyCode;

use crate::api::ApiClient;
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::services::{
    AddressService, AnalyticsService, AuthService, BasketKind, BasketService, CheckoutService,
    OrderNotificationService, OrderService,
};
use crate::storage::LocalStorage;

/// All storefront services wired to one backend and one local storage.
///
/// This struct is cheaply cloneable via `Arc`. Clones share the session,
/// the order list and the caches.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    storage: LocalStorage,
    api: ApiClient,
    auth: AuthService,
    orders: OrderService,
    addresses: AddressService,
    notifications: OrderNotificationService,
    analytics: AnalyticsService,
    cart: BasketService,
    quote: BasketService,
    checkout: CheckoutService,
}

impl Storefront {
    /// Build the storefront from configuration.
    ///
    /// Opens the storage file when `config.storage_path` is set, otherwise
    /// keeps storage in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file cannot be read or the HTTP
    /// client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        let storage = match &config.storage_path {
            Some(path) => LocalStorage::open(path.clone())?,
            None => LocalStorage::in_memory(),
        };
        Self::with_storage(config, storage)
    }

    /// Build the storefront on top of an existing storage handle.
    ///
    /// Storefronts sharing one storage see each other's session and baskets.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(config: StorefrontConfig, storage: LocalStorage) -> Result<Self> {
        let api = ApiClient::new(&config, storage.clone())?;
        let auth = AuthService::new(api.clone(), storage.clone());
        let orders = OrderService::new(api.clone(), storage.clone(), config.order_cache_ttl);
        let addresses = AddressService::new(api.clone());
        let notifications =
            OrderNotificationService::new(api.clone(), config.notifications.clone());
        let analytics = AnalyticsService::new(CurrencyCode::default());
        let cart = BasketService::new(storage.clone(), BasketKind::Cart);
        let quote = BasketService::new(storage.clone(), BasketKind::Quote);
        let checkout = CheckoutService::new(
            auth.clone(),
            orders.clone(),
            addresses.clone(),
            notifications.clone(),
            analytics,
            cart.clone(),
            quote.clone(),
        );

        tracing::info!(
            api_url = %config.api_url,
            persistent = storage.path().is_some(),
            "Storefront ready"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                storage,
                api,
                auth,
                orders,
                addresses,
                notifications,
                analytics,
                cart,
                quote,
                checkout,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn storage(&self) -> &LocalStorage {
        &self.inner.storage
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn notifications(&self) -> &OrderNotificationService {
        &self.inner.notifications
    }

    #[must_use]
    pub fn analytics(&self) -> &AnalyticsService {
        &self.inner.analytics
    }

    #[must_use]
    pub fn cart(&self) -> &BasketService {
        &self.inner.cart
    }

    #[must_use]
    pub fn quote(&self) -> &BasketService {
        &self.inner.quote
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
