//! HTTP client for the USAspending API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ApiError, SpendingApi};
use crate::config::ApiConfig;

/// Longest error body echoed back in an [`ApiError::Status`]
const MAX_ERROR_BODY: usize = 500;

/// Shared USAspending client with sensible defaults.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct UsaSpendingClient {
    client: Arc<Client>,
    base_url: Url,
}

impl UsaSpendingClient {
    /// Create a client for the public API with default timeouts
    pub fn new() -> Result<Self, ApiError> {
        Self::from_config(&ApiConfig::default())
    }

    /// Create a client from configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = config.user_agent.clone().unwrap_or_else(|| {
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
        });

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Self::with_client(Arc::new(client), &config.base_url)
    }

    /// Create from an existing reqwest Client
    pub fn with_client(client: Arc<Client>, base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// API root every path is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("Bad path '{}': {}", path, e)))
    }

    async fn into_json(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status.canonical_reason(), &body),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SpendingApi for UsaSpendingClient {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        debug!(%url, "GET");

        let response = self.client.get(url).send().await?;
        Self::into_json(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        debug!(%url, "POST");

        let response = self.client.post(url).json(body).send().await?;
        Self::into_json(response).await
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ApiError> {
    // Url::join drops the last segment unless the base ends with '/'
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };

    let url = Url::parse(&normalized)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid base URL '{}': {}", base_url, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidRequest(format!(
            "Unsupported URL scheme '{}' in base URL",
            other
        ))),
    }
}

/// The API reports failures as `{"detail": "..."}`; fall back to the raw body
fn error_message(reason: Option<&str>, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(String::from));

    let message = match detail {
        Some(detail) => detail,
        None if body.trim().is_empty() => reason.unwrap_or("request failed").to_string(),
        None => body.trim().to_string(),
    };

    if message.chars().count() > MAX_ERROR_BODY {
        let truncated: String = message.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", truncated)
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = UsaSpendingClient::with_client(
            Arc::new(Client::new()),
            "https://api.usaspending.gov/api/v2",
        )
        .unwrap();

        assert_eq!(
            client.url("search/spending_by_award/").unwrap().as_str(),
            "https://api.usaspending.gov/api/v2/search/spending_by_award/"
        );
        assert_eq!(
            client.url("/awards/ABC/").unwrap().as_str(),
            "https://api.usaspending.gov/api/v2/awards/ABC/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let client = Arc::new(Client::new());
        assert!(UsaSpendingClient::with_client(client.clone(), "not a url").is_err());
        assert!(UsaSpendingClient::with_client(client, "ftp://example.com/").is_err());
    }

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message(Some("Bad Request"), r#"{"detail": "Missing filters"}"#),
            "Missing filters"
        );
        assert_eq!(error_message(Some("Not Found"), ""), "Not Found");
        assert_eq!(error_message(None, "  upstream down "), "upstream down");

        let long = "x".repeat(MAX_ERROR_BODY + 10);
        assert!(error_message(None, &long).ends_with("..."));
    }
}
