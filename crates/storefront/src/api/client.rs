//! HTTP client for the Voltparts REST backend.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;
use uuid::Uuid;

use super::ApiError;
use super::wire::{Envelope, PaginationRow};
use crate::config::StorefrontConfig;
use crate::storage::{AUTH_TOKEN_KEY, LocalStorage};

/// Longest body excerpt included in logs and error messages.
const BODY_EXCERPT_CHARS: usize = 300;

/// Decoded response envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub message: Option<String>,
    pub pagination: Option<PaginationRow>,
}

impl<T> ApiResponse<T> {
    /// Take the payload, failing if the backend sent none.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingData` naming `what` was expected.
    pub fn into_data(self, what: &str) -> Result<T, ApiError> {
        self.data
            .ok_or_else(|| ApiError::MissingData(what.to_string()))
    }
}

/// Client for the Voltparts REST API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    storage: LocalStorage,
    fallback_token: Option<SecretString>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig, storage: LocalStorage) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("voltparts-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                storage,
                fallback_token: config.api_token.clone(),
            }),
        })
    }

    /// Base URL of the backend.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// `GET path?query`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send::<(), T>(Method::GET, path, query, None).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    /// Build the absolute URL for an endpoint path.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if the path cannot be joined.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Token of the signed-in user, else the configured fallback.
    fn bearer_token(&self) -> Option<String> {
        self.inner
            .storage
            .get_item(AUTH_TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.inner
                    .fallback_token
                    .as_ref()
                    .map(|t| t.expose_secret().to_string())
            })
    }

    #[instrument(skip(self, query, body), fields(request_id))]
    async fn send<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = self.endpoint(path, query)?;
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header("X-Request-Id", &request_id)
            .header("Accept", "application/json");
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;
        debug!(status = %status, bytes = response_text.len(), "Backend responded");

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            error!(
                status = %status,
                body = %excerpt(&response_text),
                "Backend returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: backend_message(&response_text)
                    .unwrap_or_else(|| format!("HTTP {status}")),
            });
        }

        if response_text.trim().is_empty() {
            return Ok(ApiResponse {
                data: None,
                message: None,
                pagination: None,
            });
        }

        let envelope: Envelope<T> = match serde_json::from_str(&response_text) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(
                    error = %e,
                    body = %excerpt(&response_text),
                    "Failed to parse backend response"
                );
                return Err(ApiError::Parse(e));
            }
        };

        if envelope.success == Some(false) {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }

        Ok(ApiResponse {
            data: envelope.data,
            message: envelope.message,
            pagination: envelope.pagination,
        })
    }
}

/// Pull `message` (or `error`) out of an error body.
fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = StorefrontConfig::for_api_url("http://127.0.0.1:4000/api").unwrap();
        ApiClient::new(&config, LocalStorage::in_memory()).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_prefix_and_encodes_query() {
        let url = client()
            .endpoint(
                "/orders/history",
                &[("limit", "10".to_string()), ("user_id", "a b".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:4000/api/orders/history?limit=10&user_id=a+b"
        );
    }

    #[test]
    fn test_bearer_token_prefers_storage() {
        let storage = LocalStorage::in_memory();
        let mut config = StorefrontConfig::for_api_url("http://127.0.0.1:4000").unwrap();
        config.api_token = Some(SecretString::from("fallback"));
        let client = ApiClient::new(&config, storage.clone()).unwrap();

        assert_eq!(client.bearer_token().as_deref(), Some("fallback"));
        storage.set_item(AUTH_TOKEN_KEY, "user-token").unwrap();
        assert_eq!(client.bearer_token().as_deref(), Some("user-token"));
    }

    #[test]
    fn test_backend_message_extraction() {
        assert_eq!(
            backend_message(r#"{"success":false,"message":"Order not found"}"#).as_deref(),
            Some("Order not found")
        );
        assert_eq!(
            backend_message(r#"{"error":"bad token"}"#).as_deref(),
            Some("bad token")
        );
        assert_eq!(backend_message("<html>502</html>"), None);
    }
}
