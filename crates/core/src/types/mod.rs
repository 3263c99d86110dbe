//! Core types for Voltparts.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod basket;
pub mod email;
pub mod id;
pub mod order;
pub mod pagination;
pub mod password;
pub mod price;
pub mod status;
pub mod tracking;
pub mod user;

pub use address::{DeliveryAddress, SavedAddress};
pub use basket::BasketItem;
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{CancelError, CustomerSnapshot, Order, OrderItem, ProductSnapshot};
pub use pagination::{Page, Pagination};
pub use password::{PasswordError, PasswordRule, validate_password};
pub use price::{CurrencyCode, Price, Pricing};
pub use status::*;
pub use tracking::{OrderTracking, TrackingEvent};
pub use user::User;
