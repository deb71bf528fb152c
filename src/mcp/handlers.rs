//! Tool handlers for award search and award details.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::tools::{ToolError, ToolHandler};
use crate::fetch::{AwardDetailsFetcher, AwardSearchFetcher, DetailsError};
use crate::models::{AwardDetailsRequest, AwardSearchRequest};

#[derive(Debug, Deserialize)]
struct SearchArgs {
    award_search_request: AwardSearchRequest,
    #[serde(default)]
    pages_to_fetch: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DetailsArgs {
    #[serde(default)]
    award_ids: Vec<String>,
    #[serde(default)]
    max_concurrent: Option<usize>,
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// Handler for `search_spending_by_award`
#[derive(Debug)]
pub struct SearchSpendingByAwardHandler {
    pub fetcher: AwardSearchFetcher,
    pub default_pages_to_fetch: u32,
}

#[async_trait::async_trait]
impl ToolHandler for SearchSpendingByAwardHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(args)?;
        let request = args.award_search_request;
        request
            .validate()
            .map_err(|e| ToolError::InvalidParams(e.to_string()))?;

        let pages_to_fetch = args.pages_to_fetch.unwrap_or(self.default_pages_to_fetch);

        match self.fetcher.fetch(&request, pages_to_fetch).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(error = %e, "Award search failed");
                Ok(Value::String(format!(
                    "Error searching spending by award: {}",
                    e
                )))
            }
        }
    }
}

/// Handler for `get_award_details`
#[derive(Debug)]
pub struct GetAwardDetailsHandler {
    pub fetcher: AwardDetailsFetcher,
    pub default_max_concurrent: usize,
}

#[async_trait::async_trait]
impl ToolHandler for GetAwardDetailsHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: DetailsArgs = parse_args(args)?;
        let request = AwardDetailsRequest {
            award_ids: args.award_ids,
            max_concurrent: args.max_concurrent.unwrap_or(self.default_max_concurrent),
        };
        request
            .validate()
            .map_err(|e| ToolError::InvalidParams(e.to_string()))?;

        let result = self
            .fetcher
            .fetch(&request.valid_ids(), request.max_concurrent)
            .await
            .and_then(|response| {
                serde_json::to_value(response).map_err(|e| DetailsError::Collection(e.to_string()))
            });

        Ok(match result {
            Ok(response) => response,
            Err(DetailsError::NoAwardIds) => {
                Value::String(format!("Error: {}", DetailsError::NoAwardIds))
            }
            Err(DetailsError::Collection(e)) => Value::String(format!(
                "Error processing award details request: {}",
                e
            )),
        })
    }
}
