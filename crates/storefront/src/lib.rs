//! Voltparts storefront client library.
//!
//! Headless client for the Voltparts REST backend: customer sessions, the
//! cart and quote baskets, checkout, order history, tracking, cancellation
//! and order confirmations over WhatsApp and email.
//!
//! [`Storefront`] wires every service to one backend and one
//! [`LocalStorage`](storage::LocalStorage).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::{AppError, Result};
pub use state::Storefront;
