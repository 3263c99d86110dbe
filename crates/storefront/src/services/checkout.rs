//! Checkout flows.
//!
//! Cart checkout is a single step: [`CheckoutService::place_order`] validates
//! the form, creates the order and clears the cart. Quote checkout is a small
//! state machine driven through [`QuoteCheckout`]:
//!
//! ```text
//! Form --review--> Confirm --submit--> Success
//!   ^                 |
//!   +------edit-------+
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

use voltparts_core::{
    BasketItem, CustomerSnapshot, DeliveryAddress, Email, Order, OrderKind, PaymentMethod, Pricing,
    User,
};

use super::addresses::AddressService;
use super::analytics::AnalyticsService;
use super::auth::AuthService;
use super::basket::BasketService;
use super::notifications::{NotificationResult, OrderNotificationService};
use super::orders::{CreateOrderRequest, OrderError, OrderService};

/// Delay before leaving the cart checkout for the confirmation page.
pub const CART_REDIRECT_DELAY: Duration = Duration::from_millis(1500);
/// Delay before leaving the quote checkout for the confirmation page.
pub const QUOTE_REDIRECT_DELAY: Duration = Duration::from_secs(2);

// =============================================================================
// Form
// =============================================================================

/// Validation message per field, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Checkout details entered by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Also store the address in the customer's address book.
    pub save_address: bool,
}

impl CheckoutForm {
    /// Run every field rule and collect all failures.
    ///
    /// # Errors
    ///
    /// Returns the failing fields with a message each.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = self.full_name.trim();
        if name.is_empty() {
            errors.add("full_name", "Full name is required");
        } else if name.chars().count() < 2 {
            errors.add("full_name", "Full name must be at least 2 characters");
        }

        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if Email::parse(&self.email).is_err() {
            errors.add("email", "Enter a valid email address");
        }

        if self.phone.trim().is_empty() {
            errors.add("phone", "Phone number is required");
        } else if !is_mobile_number(self.phone.trim()) {
            errors.add("phone", "Enter a valid 10-digit mobile number");
        }

        for (field, value, label) in [
            ("line1", &self.line1, "Address"),
            ("city", &self.city, "City"),
            ("state", &self.state, "State"),
        ] {
            if value.trim().is_empty() {
                errors.add(field, format!("{label} is required"));
            }
        }

        let pincode = self.pincode.trim();
        if pincode.is_empty() {
            errors.add("pincode", "PIN code is required");
        } else if pincode.len() != 6 || !pincode.bytes().all(|b| b.is_ascii_digit()) {
            errors.add("pincode", "Enter a valid 6-digit PIN code");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    #[must_use]
    pub fn delivery_address(&self) -> DeliveryAddress {
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        DeliveryAddress {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            line1: self.line1.trim().to_string(),
            line2: optional(&self.line2),
            landmark: optional(&self.landmark),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
            country: "India".to_string(),
        }
    }

    #[must_use]
    pub fn customer(&self) -> CustomerSnapshot {
        CustomerSnapshot {
            name: self.full_name.trim().to_string(),
            email: Email::parse(&self.email).ok().map(Email::into_inner),
            phone: Some(self.phone.trim().to_string()),
        }
    }

    /// Prefill name, email and phone from the signed-in user.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            full_name: user.name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone().unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// Indian mobile number: 10 digits starting with 6-9.
fn is_mobile_number(phone: &str) -> bool {
    phone.len() == 10
        && phone.bytes().all(|b| b.is_ascii_digit())
        && matches!(phone.as_bytes().first(), Some(b'6'..=b'9'))
}

// =============================================================================
// Errors and outcome
// =============================================================================

/// Steps of the quote checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStep {
    Form,
    Confirm,
    Success,
}

impl fmt::Display for QuoteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form => write!(f, "form"),
            Self::Confirm => write!(f, "confirm"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("please correct the highlighted fields: {0}")]
    Validation(FieldErrors),

    #[error("basket is empty")]
    EmptyBasket,

    /// Operation not allowed at the current quote checkout step.
    #[error("cannot do that at the {actual} step (expected {expected})")]
    InvalidStep { expected: QuoteStep, actual: QuoteStep },

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// What a successful checkout produced.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub notification: NotificationResult,
    /// Confirmation page to show next.
    pub redirect_to: String,
    /// Pause before showing it.
    pub redirect_after: Duration,
}

impl CheckoutOutcome {
    fn new(order: Order, notification: NotificationResult, redirect_after: Duration) -> Self {
        Self {
            redirect_to: format!("/order-confirmation/{}", order.id),
            order,
            notification,
            redirect_after,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Turns baskets into orders.
#[derive(Clone)]
pub struct CheckoutService {
    auth: AuthService,
    orders: OrderService,
    addresses: AddressService,
    notifications: OrderNotificationService,
    analytics: AnalyticsService,
    cart: BasketService,
    quote: BasketService,
}

impl CheckoutService {
    #[must_use]
    pub const fn new(
        auth: AuthService,
        orders: OrderService,
        addresses: AddressService,
        notifications: OrderNotificationService,
        analytics: AnalyticsService,
        cart: BasketService,
        quote: BasketService,
    ) -> Self {
        Self {
            auth,
            orders,
            addresses,
            notifications,
            analytics,
            cart,
            quote,
        }
    }

    /// Place an order for everything in the cart.
    ///
    /// Saving the address and sending notifications are best effort. The
    /// cart is only cleared once the order exists.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` with every failing field,
    /// `CheckoutError::EmptyBasket` for an empty cart, and
    /// `CheckoutError::Order` if the order cannot be created (the cart is
    /// left as it was).
    #[instrument(skip(self, form), fields(payment_method = %form.payment_method))]
    pub async fn place_order(&self, form: &CheckoutForm) -> Result<CheckoutOutcome, CheckoutError> {
        form.validate().map_err(CheckoutError::Validation)?;
        let items = self.cart.items();
        if items.is_empty() {
            return Err(CheckoutError::EmptyBasket);
        }

        let user = self.auth.current_user();
        let request = build_request(
            form,
            items,
            user.as_ref(),
            OrderKind::Purchase,
            form.payment_method,
        );

        if form.save_address
            && user.is_some()
            && let Err(e) = self
                .addresses
                .save_address(&request.delivery_address, false)
                .await
        {
            warn!(error = %e, "Failed to save checkout address");
        }

        let order = self.orders.create_order(request).await?;
        self.analytics.purchase(&order);
        let notification = self
            .notifications
            .send_order_confirmation(&order, user.as_ref(), self.notifications.default_settings())
            .await;

        if let Err(e) = self.cart.clear() {
            warn!(order_id = %order.id, error = %e, "Order placed but cart could not be cleared");
        }

        info!(order_id = %order.id, notified = notification.success, "Checkout complete");
        Ok(CheckoutOutcome::new(order, notification, CART_REDIRECT_DELAY))
    }

    /// Start a quote checkout at the form step.
    #[must_use]
    pub fn quote_checkout(&self) -> QuoteCheckout {
        QuoteCheckout {
            service: self.clone(),
            step: QuoteStep::Form,
            form: None,
            outcome: None,
        }
    }
}

fn build_request(
    form: &CheckoutForm,
    items: Vec<BasketItem>,
    user: Option<&User>,
    kind: OrderKind,
    payment_method: PaymentMethod,
) -> CreateOrderRequest {
    let subtotal: Decimal = items.iter().map(BasketItem::subtotal).sum();
    CreateOrderRequest {
        user_id: user.map(|u| u.id.clone()),
        kind,
        items,
        customer: form.customer(),
        delivery_address: form.delivery_address(),
        pricing: Pricing::for_subtotal(subtotal, Decimal::ZERO),
        payment_method,
        notes: form
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    }
}

// =============================================================================
// Quote checkout
// =============================================================================

/// Quote request flow: fill the form, confirm, submit.
pub struct QuoteCheckout {
    service: CheckoutService,
    step: QuoteStep,
    form: Option<CheckoutForm>,
    outcome: Option<CheckoutOutcome>,
}

impl QuoteCheckout {
    #[must_use]
    pub const fn step(&self) -> QuoteStep {
        self.step
    }

    /// Form being confirmed, once reviewed.
    #[must_use]
    pub const fn form(&self) -> Option<&CheckoutForm> {
        self.form.as_ref()
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<&CheckoutOutcome> {
        self.outcome.as_ref()
    }

    /// Items that will be quoted.
    #[must_use]
    pub fn items(&self) -> Vec<BasketItem> {
        self.service.quote.items()
    }

    /// Move from the form to the confirmation step.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside the form step,
    /// `CheckoutError::Validation` for a bad form and
    /// `CheckoutError::EmptyBasket` for an empty quote list.
    pub fn review(&mut self, form: CheckoutForm) -> Result<(), CheckoutError> {
        self.expect_step(QuoteStep::Form)?;
        form.validate().map_err(CheckoutError::Validation)?;
        if self.service.quote.is_empty() {
            return Err(CheckoutError::EmptyBasket);
        }
        self.form = Some(form);
        self.step = QuoteStep::Confirm;
        Ok(())
    }

    /// Go back from confirmation to the form, keeping what was entered.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside the confirm step.
    pub fn edit(&mut self) -> Result<(), CheckoutError> {
        self.expect_step(QuoteStep::Confirm)?;
        self.step = QuoteStep::Form;
        Ok(())
    }

    /// Submit the quote request.
    ///
    /// On failure the checkout stays at the confirm step so it can be
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside the confirm step,
    /// `CheckoutError::EmptyBasket` if the quote list was emptied meanwhile
    /// and `CheckoutError::Order` if the backend refuses the order.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<CheckoutOutcome, CheckoutError> {
        self.expect_step(QuoteStep::Confirm)?;
        let Some(form) = self.form.as_ref() else {
            return Err(CheckoutError::InvalidStep {
                expected: QuoteStep::Form,
                actual: self.step,
            });
        };
        let items = self.service.quote.items();
        if items.is_empty() {
            return Err(CheckoutError::EmptyBasket);
        }

        let service = &self.service;
        let user = service.auth.current_user();
        let request = build_request(
            form,
            items,
            user.as_ref(),
            OrderKind::Quote,
            PaymentMethod::BankTransfer,
        );
        let order = service.orders.create_order(request).await?;
        let notification = service
            .notifications
            .send_order_confirmation(&order, user.as_ref(), service.notifications.default_settings())
            .await;

        if let Err(e) = service.quote.clear() {
            warn!(order_id = %order.id, error = %e, "Quote submitted but list could not be cleared");
        }

        info!(order_id = %order.id, "Quote request submitted");
        let outcome = CheckoutOutcome::new(order, notification, QUOTE_REDIRECT_DELAY);
        self.outcome = Some(outcome.clone());
        self.step = QuoteStep::Success;
        Ok(outcome)
    }

    fn expect_step(&self, expected: QuoteStep) -> Result<(), CheckoutError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CheckoutError::InvalidStep {
                expected,
                actual: self.step,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use voltparts_core::{ProductId, ProductSnapshot};

    use super::*;
    use crate::api::ApiClient;
    use crate::config::StorefrontConfig;
    use crate::services::basket::BasketKind;
    use crate::storage::LocalStorage;

    fn valid_form() -> CheckoutForm {
        CheckoutForm {
            full_name: "Anita Rao".to_string(),
            email: "anita@example.in".to_string(),
            phone: "9876543210".to_string(),
            line1: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
            ..CheckoutForm::default()
        }
    }

    fn service(storage: &LocalStorage) -> CheckoutService {
        let config = StorefrontConfig::for_api_url("http://127.0.0.1:9").unwrap();
        let api = ApiClient::new(&config, storage.clone()).unwrap();
        CheckoutService::new(
            AuthService::new(api.clone(), storage.clone()),
            OrderService::new(api.clone(), storage.clone(), Duration::from_secs(60)),
            AddressService::new(api.clone()),
            OrderNotificationService::new(api, config.notifications.clone()),
            AnalyticsService::default(),
            BasketService::new(storage.clone(), BasketKind::Cart),
            BasketService::new(storage.clone(), BasketKind::Quote),
        )
    }

    fn basket_item() -> BasketItem {
        BasketItem {
            product: ProductSnapshot {
                product_id: ProductId::new("relay-5v"),
                name: "5V Relay Module".to_string(),
                sku: None,
                brand: None,
                image_url: None,
            },
            unit_price: Decimal::from(85),
            quantity: 20,
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_all_failures_collected() {
        let form = CheckoutForm {
            full_name: "A".to_string(),
            email: "anita@".to_string(),
            phone: "5876543210".to_string(),
            pincode: "5600".to_string(),
            ..CheckoutForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 7);
        assert_eq!(
            errors.get("full_name"),
            Some("Full name must be at least 2 characters")
        );
        assert_eq!(errors.get("phone"), Some("Enter a valid 10-digit mobile number"));
        assert_eq!(errors.get("city"), Some("City is required"));
        assert!(errors.to_string().contains("pincode: Enter a valid 6-digit PIN code"));
    }

    #[test]
    fn test_mobile_number_rule() {
        assert!(is_mobile_number("6000000000"));
        assert!(!is_mobile_number("987654321"));
        assert!(!is_mobile_number("98765 4321"));
        assert!(!is_mobile_number("+919876543"));
    }

    #[test]
    fn test_build_request_prices_basket() {
        let request = build_request(
            &valid_form(),
            vec![basket_item()],
            None,
            OrderKind::Purchase,
            PaymentMethod::Upi,
        );
        assert_eq!(request.pricing.subtotal, Decimal::from(1700));
        assert_eq!(request.pricing.shipping, Decimal::from(100));
        assert_eq!(request.pricing.tax, Decimal::from(306));
        assert_eq!(request.pricing.total, Decimal::from(2106));
        assert_eq!(request.customer.email.as_deref(), Some("anita@example.in"));
        assert_eq!(request.delivery_address.country, "India");
    }

    #[tokio::test]
    async fn test_place_order_rejects_empty_cart() {
        let checkout = service(&LocalStorage::in_memory());
        assert!(matches!(
            checkout.place_order(&valid_form()).await,
            Err(CheckoutError::EmptyBasket)
        ));
    }

    #[tokio::test]
    async fn test_quote_steps() {
        let storage = LocalStorage::in_memory();
        let checkout = service(&storage);
        let mut quote = checkout.quote_checkout();

        assert!(matches!(
            quote.submit().await,
            Err(CheckoutError::InvalidStep {
                expected: QuoteStep::Confirm,
                actual: QuoteStep::Form
            })
        ));
        assert!(matches!(quote.edit(), Err(CheckoutError::InvalidStep { .. })));
        assert!(matches!(
            quote.review(valid_form()),
            Err(CheckoutError::EmptyBasket)
        ));

        BasketService::new(storage, BasketKind::Quote)
            .add_item(basket_item())
            .unwrap();
        quote.review(valid_form()).unwrap();
        assert_eq!(quote.step(), QuoteStep::Confirm);
        assert!(matches!(
            quote.review(valid_form()),
            Err(CheckoutError::InvalidStep { .. })
        ));

        quote.edit().unwrap();
        assert_eq!(quote.step(), QuoteStep::Form);
        assert_eq!(quote.form(), Some(&valid_form()));
    }
}
