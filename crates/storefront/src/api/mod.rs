//! Voltparts REST backend client.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies in both directions
//! - Bearer token read from local storage on every request, so a login in
//!   one handle is picked up by every other handle sharing the storage
//! - Backend rows are snake_case ([`wire`]); they are mapped into the
//!   camelCase domain model of `voltparts-core` by [`conversions`]
//!
//! # Response envelope
//!
//! Every endpoint answers with
//!
//! ```json
//! { "success": true, "data": { ... }, "message": "...", "pagination": { ... } }
//! ```
//!
//! where `data` and `pagination` are optional.

mod client;
pub mod conversions;
pub mod wire;

pub use client::{ApiClient, ApiResponse};

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Backend rejected the bearer token (HTTP 401).
    #[error("not authorized")]
    Unauthorized,

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Envelope had no `data` where data was required.
    #[error("response missing data: {0}")]
    MissingData(String),
}

impl ApiError {
    /// HTTP status, when the backend produced one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Whether the backend said the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }
}
