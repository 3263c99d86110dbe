//! Authentication service.
//!
//! Holds the signed-in user as a `watch` channel: [`AuthService::current_user`]
//! reads the latest value and [`AuthService::subscribe`] streams changes.
//! The session (bearer token and user) is persisted to local storage under
//! `authToken` and `currentUser`, so every handle sharing that storage sees
//! the same session.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use voltparts_core::{Email, User, validate_password};

use crate::api::conversions::convert_user;
use crate::api::wire::{AuthResponse, LoginBody, RegisterBody};
use crate::api::{ApiClient, ApiError};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::storage::{AUTH_TOKEN_KEY, CURRENT_USER_KEY, LocalStorage};

/// Signup form.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

/// Authentication service.
///
/// Cheap to clone; clones share the same user state.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthServiceInner>,
}

struct AuthServiceInner {
    api: ApiClient,
    storage: LocalStorage,
    user: watch::Sender<Option<User>>,
}

impl AuthService {
    /// Create the service, restoring any persisted session.
    #[must_use]
    pub fn new(api: ApiClient, storage: LocalStorage) -> Self {
        let restored = load_user(&storage);
        if let Some(user) = &restored {
            debug!(user_id = %user.id, "Restored session from storage");
        }
        let (user, _) = watch::channel(restored);
        Self {
            inner: Arc::new(AuthServiceInner { api, storage, user }),
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed email and
    /// `AuthError::InvalidCredentials` when the backend rejects the login.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let response = self
            .inner
            .api
            .post::<_, AuthResponse>(
                "auth/login",
                &LoginBody {
                    email: email.as_str(),
                    password,
                },
            )
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized
                | ApiError::Api {
                    status: 400 | 404, ..
                } => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?
            .into_data("login session")?;

        let user = self.start_session(response)?;
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Register a new account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::PasswordMismatch` before any network call, and
    /// `AuthError::Api` if the backend refuses the signup.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        let email = Email::parse(&request.email)?;
        validate_password(&request.password)?;
        if request.password != request.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let response = self
            .inner
            .api
            .post::<_, AuthResponse>(
                "auth/register",
                &RegisterBody {
                    name: request.name.trim(),
                    email: email.as_str(),
                    phone: request.phone.as_deref().filter(|p| !p.is_empty()),
                    password: &request.password,
                },
            )
            .await?
            .into_data("registration session")?;

        let user = self.start_session(response)?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Clear the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the persisted session cannot be removed.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<(), AuthError> {
        self.inner.storage.remove_item(AUTH_TOKEN_KEY)?;
        self.inner.storage.remove_item(CURRENT_USER_KEY)?;
        self.inner.user.send_replace(None);
        clear_sentry_user();
        info!("User logged out");
        Ok(())
    }

    fn start_session(&self, response: AuthResponse) -> Result<User, AuthError> {
        let user = convert_user(response.user)?;
        self.inner.storage.set_item(AUTH_TOKEN_KEY, response.token)?;
        self.inner.storage.set_json(CURRENT_USER_KEY, &user)?;
        self.inner.user.send_replace(Some(user.clone()));
        set_sentry_user(&user.id, Some(user.email.as_str()));
        Ok(user)
    }

    // =========================================================================
    // State
    // =========================================================================

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.user.borrow().clone()
    }

    /// The signed-in user, or `AuthError::NotAuthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when nobody is signed in.
    pub fn require_user(&self) -> Result<User, AuthError> {
        self.current_user().ok_or(AuthError::NotAuthenticated)
    }

    /// Stream of user changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.inner.user.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.user.borrow().is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.user.borrow().as_ref().is_some_and(User::is_admin)
    }

    /// Follow session changes made through other handles of the same storage.
    ///
    /// The returned task reloads the user whenever `authToken` or
    /// `currentUser` changes and runs until aborted.
    pub fn spawn_storage_sync(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let mut events = inner.storage.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == AUTH_TOKEN_KEY || event.key == CURRENT_USER_KEY => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Storage sync lagged, reloading session");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                let user = load_user(&inner.storage);
                inner.user.send_if_modified(|current| {
                    if *current == user {
                        false
                    } else {
                        debug!(signed_in = user.is_some(), "Session changed in storage");
                        current.clone_from(&user);
                        true
                    }
                });
            }
        })
    }
}

/// Persisted user, only while a token is present.
fn load_user(storage: &LocalStorage) -> Option<User> {
    storage.get_item(AUTH_TOKEN_KEY)?;
    storage.get_json(CURRENT_USER_KEY)
}
