//! Business logic services for the storefront client.
//!
//! # Services
//!
//! - `auth` - Login, signup and the shared session state
//! - `orders` - Order creation, history, lookup, cancellation and tracking
//! - `notifications` - WhatsApp and email order confirmations
//! - `addresses` - Saved delivery addresses
//! - `basket` - Cart and quote list kept in local storage
//! - `checkout` - Cart checkout and the quote request flow
//! - `analytics` - Ecommerce analytics events

pub mod addresses;
pub mod analytics;
pub mod auth;
pub mod basket;
pub mod checkout;
pub mod notifications;
pub mod orders;

pub use addresses::AddressService;
pub use analytics::{AnalyticsEvent, AnalyticsService};
pub use auth::{AuthError, AuthService, RegisterRequest};
pub use basket::{BasketKind, BasketService};
pub use checkout::{
    CheckoutError, CheckoutForm, CheckoutOutcome, CheckoutService, FieldErrors, QuoteCheckout,
    QuoteStep,
};
pub use notifications::{
    ChannelOutcome, NotificationChannel, NotificationResult, NotificationSettings,
    OrderNotificationService,
};
pub use orders::{CreateOrderRequest, OrderError, OrderService};
