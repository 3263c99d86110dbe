//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VOLTPARTS_API_URL` - Base URL of the Voltparts REST backend
//!
//! ## Optional
//! - `VOLTPARTS_STORAGE_PATH` - File backing local storage (default: .voltparts/storage.json)
//! - `VOLTPARTS_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `VOLTPARTS_ORDER_CACHE_TTL_SECS` - Order detail cache TTL (default: 300)
//! - `VOLTPARTS_API_TOKEN` - Bearer token used when nobody is signed in
//! - `VOLTPARTS_STORE_NAME` - Store name used in notifications (default: Voltparts)
//! - `VOLTPARTS_SUPPORT_PHONE` - Support number printed in notifications
//! - `VOLTPARTS_NOTIFY_WHATSAPP` - Send WhatsApp confirmations (default: true)
//! - `VOLTPARTS_NOTIFY_EMAIL` - Send email confirmations (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the REST backend (always ends with `/`).
    pub api_url: Url,
    /// File backing local storage. `None` keeps storage in memory.
    pub storage_path: Option<PathBuf>,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// TTL of the order detail cache.
    pub order_cache_ttl: Duration,
    /// Fallback bearer token
    pub api_token: Option<SecretString>,
    /// Notification settings
    pub notifications: NotificationConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Order confirmation notification defaults.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Store name printed in messages.
    pub store_name: String,
    /// Support phone printed in messages.
    pub support_phone: Option<String>,
    /// Send WhatsApp confirmations by default.
    pub whatsapp: bool,
    /// Send email confirmations by default.
    pub email: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            store_name: "Voltparts".to_string(),
            support_phone: None,
            whatsapp: true,
            email: true,
        }
    }
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url.as_str())
            .field("storage_path", &self.storage_path)
            .field("http_timeout", &self.http_timeout)
            .field("order_cache_ttl", &self.order_cache_ttl)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("notifications", &self.notifications)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("VOLTPARTS_API_URL")?)?;
        let storage_path = Some(PathBuf::from(get_env_or_default(
            "VOLTPARTS_STORAGE_PATH",
            ".voltparts/storage.json",
        )));
        let http_timeout = Duration::from_secs(get_parsed_or_default(
            "VOLTPARTS_HTTP_TIMEOUT_SECS",
            30,
        )?);
        let order_cache_ttl = Duration::from_secs(get_parsed_or_default(
            "VOLTPARTS_ORDER_CACHE_TTL_SECS",
            300,
        )?);
        let api_token = get_optional_env("VOLTPARTS_API_TOKEN").map(SecretString::from);

        let notifications = NotificationConfig {
            store_name: get_env_or_default("VOLTPARTS_STORE_NAME", "Voltparts"),
            support_phone: get_optional_env("VOLTPARTS_SUPPORT_PHONE"),
            whatsapp: get_parsed_or_default("VOLTPARTS_NOTIFY_WHATSAPP", true)?,
            email: get_parsed_or_default("VOLTPARTS_NOTIFY_EMAIL", true)?,
        };

        tracing::debug!(api_url = %api_url, "Storefront configuration loaded");

        Ok(Self {
            api_url,
            storage_path,
            http_timeout,
            order_cache_ttl,
            api_token,
            notifications,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration for a backend at `api_url` with in-memory storage and
    /// default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            storage_path: None,
            http_timeout: Duration::from_secs(30),
            order_cache_ttl: Duration::from_secs(300),
            api_token: None,
            notifications: NotificationConfig::default(),
            sentry_dsn: None,
        })
    }
}

/// Parse the backend URL, ensuring a trailing slash so relative joins keep
/// any path prefix (e.g. `https://api.voltparts.in/v1/`).
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar("VOLTPARTS_API_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "VOLTPARTS_API_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_url_appends_slash() {
        let url = parse_api_url("https://api.voltparts.in/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.voltparts.in/v1/");
        assert_eq!(
            url.join("orders/history").unwrap().as_str(),
            "https://api.voltparts.in/v1/orders/history"
        );
    }

    #[test]
    fn test_parse_api_url_rejects_relative() {
        assert!(matches!(
            parse_api_url("api/v1"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_api_url("mailto:ops@voltparts.in").is_err());
    }

    #[test]
    fn test_for_api_url_defaults() {
        let config = StorefrontConfig::for_api_url("http://127.0.0.1:4000").unwrap();
        assert!(config.storage_path.is_none());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.notifications.whatsapp);
        assert!(config.notifications.email);
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = StorefrontConfig::for_api_url("http://127.0.0.1:4000").unwrap();
        config.api_token = Some(SecretString::from("tok_live_8f3kq9"));

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("127.0.0.1:4000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_live_8f3kq9"));
    }
}
