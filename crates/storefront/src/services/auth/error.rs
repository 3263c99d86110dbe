//! Authentication error types.

use thiserror::Error;

use voltparts_core::{EmailError, PasswordError};

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password does not meet the signup rules.
    #[error("password validation failed: {0}")]
    WeakPassword(#[from] PasswordError),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Operation needs a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Backend call failed.
    #[error("auth API error: {0}")]
    Api(#[from] ApiError),

    /// Persisting the session failed.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}
