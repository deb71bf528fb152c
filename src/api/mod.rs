//! Access to the USAspending.gov REST API.
//!
//! The [`SpendingApi`] trait is the seam between the tool logic and the
//! network: fetchers and tool handlers receive an `Arc<dyn SpendingApi>`
//! rather than constructing a client themselves.
//!
//! - [`UsaSpendingClient`]: production implementation over `reqwest`
//! - [`MockApi`]: scripted implementation for tests

mod client;
pub mod mock;

pub use client::UsaSpendingClient;
pub use mock::MockApi;

use async_trait::async_trait;
use serde_json::Value;

/// Default API root
pub const USASPENDING_API_BASE: &str = "https://api.usaspending.gov/api/v2/";

/// Award search endpoint, relative to the API root
pub const SPENDING_BY_AWARD_PATH: &str = "search/spending_by_award/";

/// Path of the detail endpoint for one award
pub fn award_path(award_id: &str) -> String {
    format!("awards/{}/", urlencoding::encode(award_id))
}

/// JSON-over-HTTP access to the spending API.
///
/// Paths are relative to the API root. Both calls fail on transport errors,
/// non-success HTTP status, and unparseable bodies.
#[async_trait]
pub trait SpendingApi: Send + Sync + std::fmt::Debug {
    /// `GET {path}`
    async fn get(&self, path: &str) -> Result<Value, ApiError>;

    /// `POST {path}` with a JSON body
    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
}

/// Errors that can occur when calling the API
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(format!("JSON: {}", err))
    }
}
