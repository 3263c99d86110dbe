//! Unified error handling with Sentry integration.
//!
//! Every service has its own error enum; `AppError` gathers them for callers
//! that drive several services (the CLI, a UI shell). [`AppError::user_message`]
//! is the text to show a customer and never leaks backend details.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderError;
use crate::storage::StorageError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Banner text for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => "The app is not configured correctly".to_string(),
            Self::Api(err) => api_message(err),
            Self::Storage(_) => "Could not save your changes on this device".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "Please enter a valid email address".to_string(),
                AuthError::WeakPassword(rules) => format!("Your {rules}"),
                AuthError::PasswordMismatch => "Passwords do not match".to_string(),
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::NotAuthenticated => "Please log in to continue".to_string(),
                AuthError::Api(err) => api_message(err),
                AuthError::Storage(_) => "Could not save your session".to_string(),
            },
            Self::Order(err) => order_message(err),
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_) => "Please correct the highlighted fields".to_string(),
                CheckoutError::EmptyBasket => "Your basket is empty".to_string(),
                CheckoutError::InvalidStep { .. } => {
                    "Something went wrong, please review your details again".to_string()
                }
                CheckoutError::Order(err) => order_message(err),
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Whether this error points at a bug or outage rather than user input.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Api(_)
                | Self::Storage(_)
                | Self::Auth(AuthError::Api(_) | AuthError::Storage(_))
                | Self::Order(OrderError::Api(_) | OrderError::Storage(_))
                | Self::Checkout(CheckoutError::Order(
                    OrderError::Api(_) | OrderError::Storage(_)
                ))
        )
    }

    /// Log the error and send unexpected ones to Sentry.
    pub fn report(&self) {
        if self.is_unexpected() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Storefront error");
        }
    }
}

fn api_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => "Your session has expired, please log in again".to_string(),
        ApiError::Http(_) => "Could not reach the store, check your connection".to_string(),
        ApiError::Api { status, .. } if *status >= 500 => {
            "The store is having trouble, please try again shortly".to_string()
        }
        ApiError::Api { status: 404, .. } => "Not found".to_string(),
        _ => "Something went wrong, please try again".to_string(),
    }
}

fn order_message(err: &OrderError) -> String {
    match err {
        OrderError::NotFound(_) => "Order not found".to_string(),
        OrderError::NotCancellable { status, .. } => {
            format!("This order can no longer be cancelled ({})", status.label())
        }
        OrderError::InconsistentPricing(_) => {
            "Order total could not be verified, please refresh your basket".to_string()
        }
        OrderError::Api(err) => api_message(err),
        OrderError::Storage(_) => "Could not update your orders on this device".to_string(),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use voltparts_core::{OrderId, OrderStatus, validate_password};

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 1042".to_string());
        assert_eq!(err.to_string(), "Not found: order 1042");

        let err = AppError::BadRequest("quantity must be positive".to_string());
        assert_eq!(err.to_string(), "Bad request: quantity must be positive");
    }

    #[test]
    fn test_user_message_hides_backend_details() {
        let err = AppError::from(OrderError::Api(ApiError::Api {
            status: 500,
            message: "SQLSTATE[42S02]: table orders missing".to_string(),
        }));
        let message = err.user_message();
        assert!(!message.contains("SQLSTATE"));
        assert_eq!(message, "The store is having trouble, please try again shortly");
        assert!(err.is_unexpected());
    }

    #[test]
    fn test_user_message_for_cancellation() {
        let err = AppError::from(OrderError::NotCancellable {
            id: OrderId::new("1042"),
            status: OrderStatus::Shipped,
        });
        assert_eq!(
            err.user_message(),
            "This order can no longer be cancelled (Shipped)"
        );
        assert!(!err.is_unexpected());
    }

    #[test]
    fn test_user_message_for_weak_password() {
        let Err(rules) = validate_password("abc") else {
            panic!("weak password accepted");
        };
        let message = AppError::from(AuthError::WeakPassword(rules)).user_message();
        assert!(message.starts_with("Your password must contain"));
    }

    #[test]
    fn test_checkout_errors_are_user_facing() {
        let err = AppError::from(CheckoutError::EmptyBasket);
        assert_eq!(err.user_message(), "Your basket is empty");
        assert!(!err.is_unexpected());
    }
}
