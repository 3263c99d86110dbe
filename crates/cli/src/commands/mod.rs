//! Command implementations.
//!
//! Output goes to stdout through [`out`]; logs and errors go to stderr.

pub mod basket;
pub mod checkout;
pub mod orders;
pub mod session;

use std::io::{self, StdoutLock};

use thiserror::Error;
use voltparts_core::{Order, Price};
use voltparts_storefront::AppError;
use voltparts_storefront::api::ApiError;
use voltparts_storefront::config::ConfigError;
use voltparts_storefront::services::{AuthError, CheckoutError, OrderError};
use voltparts_storefront::storage::StorageError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

macro_rules! from_app_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CliError {
                fn from(e: $source) -> Self {
                    Self::App(AppError::from(e))
                }
            }
        )*
    };
}

from_app_error!(ConfigError, ApiError, StorageError, AuthError, OrderError, CheckoutError);

pub fn out() -> StdoutLock<'static> {
    io::stdout().lock()
}

/// Rupee amount for display.
pub fn money(amount: rust_decimal::Decimal) -> String {
    Price::inr(amount).display()
}

/// One-line order summary used by list and detail views.
pub fn order_line(order: &Order) -> String {
    format!(
        "{:<20} {:<17} {:>3} items  {:>12}  {}",
        order.order_number,
        order.status.label(),
        order.item_count(),
        money(order.pricing.total),
        order.created_at.format("%d %b %Y"),
    )
}
