use std::time::Duration;

use log::{debug, info, warn};
use orderdesk_config::normalize_server_url;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::infra::credential::CredentialContext;
use crate::infra::error::{ApiError, ApiResult};

/// Header the backend reads the API key from.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client for the order pipeline backend.
///
/// Every call except [`ApiClient::get_public`] requires the credential held
/// by the shared [`CredentialContext`] and fails fast without it.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: CredentialContext,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_key", &self.credentials.is_set())
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: CredentialContext,
    ) -> ApiResult<Self> {
        let normalized = normalize_server_url(base_url)
            .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
        if normalized != base_url {
            warn!(
                "[ApiClient] Normalized base URL from '{}' to '{}'",
                base_url, normalized
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        info!(
            "[ApiClient] Creating new API client with base URL: {}",
            normalized
        );

        Ok(Self {
            client,
            base_url: normalized,
            credentials,
        })
    }

    /// Absolute URL for a route path such as `/api/v1/orders`.
    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        let path = path.as_ref();
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialContext {
        &self.credentials
    }

    /// Attach the API key header, or refuse to build the request.
    fn build_request(&self, builder: RequestBuilder) -> ApiResult<RequestBuilder> {
        let key = self
            .credentials
            .current()
            .ok_or(ApiError::MissingCredential)?;
        Ok(builder.header(API_KEY_HEADER, key.expose()))
    }

    /// Execute a request and map the response onto [`ApiError`].
    async fn execute_request<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Err(ApiError::Decode(
                    "empty response (204 No Content)".to_string(),
                ));
            }
            return response.json::<T>().await.map_err(ApiError::from);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body).unwrap_or_else(|| {
            format!("Request failed with status {}", status)
        });

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
        {
            warn!("[ApiClient] Request rejected ({}): {}", status, detail);
        } else {
            debug!("[ApiClient] Request failed ({}): {}", status, detail);
        }

        Err(ApiError::Server {
            status: status.as_u16(),
            detail,
        })
    }

    /// GET without credentials (health probe).
    pub async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> ApiResult<T> {
        let request = self.client.get(self.build_url(path));
        self.execute_request(request).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let request = self.build_request(self.client.get(self.build_url(path)))?;
        self.execute_request(request).await
    }

    pub async fn get_with_query<T, Q>(
        &self,
        path: &str,
        query: &Q,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.client.get(self.build_url(path)).query(query);
        let request = self.build_request(request)?;
        self.execute_request(request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.build_url(path)).json(body);
        let request = self.build_request(request)?;
        self.execute_request(request).await
    }

    /// POST without a body (trigger endpoints).
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> ApiResult<T> {
        let request =
            self.build_request(self.client.post(self.build_url(path)))?;
        self.execute_request(request).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.put(self.build_url(path)).json(body);
        let request = self.build_request(request)?;
        self.execute_request(request).await
    }

    pub async fn put_empty<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> ApiResult<T> {
        let request =
            self.build_request(self.client.put(self.build_url(path)))?;
        self.execute_request(request).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> ApiResult<T> {
        let request =
            self.build_request(self.client.delete(self.build_url(path)))?;
        self.execute_request(request).await
    }
}

/// Pull the message out of a FastAPI error body. `detail` is a string for
/// raised HTTP errors and a list of field errors for validation failures.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(|loc| loc.as_array())
                        .and_then(|loc| loc.last())
                        .map(|last| match last {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        });
                    Some(match field {
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_string(),
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(
            "localhost:8000/",
            Duration::from_secs(5),
            CredentialContext::new(None),
        )
        .unwrap()
    }

    #[test]
    fn base_url_is_normalized_and_joined() {
        let client = client();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.build_url("/api/v1/orders"),
            "http://localhost:8000/api/v1/orders"
        );
        assert_eq!(client.build_url("health"), "http://localhost:8000/health");
    }

    #[tokio::test]
    async fn authenticated_calls_fail_fast_without_a_key() {
        let client = client();
        let err = client
            .get::<serde_json::Value>("/api/v1/orders")
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::MissingCredential);
    }

    #[test]
    fn string_detail_is_used_verbatim() {
        assert_eq!(
            extract_detail(r#"{"detail": "Schedule for 06:00 already exists"}"#)
                .as_deref(),
            Some("Schedule for 06:00 already exists")
        );
    }

    #[test]
    fn validation_details_are_flattened() {
        let body = r#"{"detail": [
            {"loc": ["body", "hour"], "msg": "ensure this value is less than or equal to 23"}
        ]}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("hour: ensure this value is less than or equal to 23")
        );
    }

    #[test]
    fn non_json_bodies_yield_nothing() {
        assert_eq!(extract_detail("<html>Bad Gateway</html>"), None);
    }
}
