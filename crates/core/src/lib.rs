//! Voltparts Core - Shared domain types.
//!
//! This crate provides the types used across all Voltparts components:
//! - `storefront` - Headless storefront client (orders, auth, checkout)
//! - `cli` - Command-line driver for the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no local storage. Pricing rules, status tables and validators
//! live here so they can be tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Ids, emails, passwords, prices, statuses, orders, users,
//!   addresses, baskets, pagination and tracking

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
