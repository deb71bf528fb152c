//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::handlers::{GetAwardDetailsHandler, SearchSpendingByAwardHandler};
use crate::api::SpendingApi;
use crate::config::ToolDefaults;
use crate::fetch::{AwardDetailsFetcher, AwardSearchFetcher};

pub const SEARCH_SPENDING_BY_AWARD: &str = "search_spending_by_award";
pub const GET_AWARD_DETAILS: &str = "get_award_details";

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_spending_by_award")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Errors surfaced to the MCP client as protocol errors.
///
/// Upstream failures are not among them: handlers report those as a
/// descriptive string result instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// Arguments failed to parse or validate
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ToolError> for pmcp::Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::InvalidParams(message) => pmcp::Error::invalid_params(message),
            other => pmcp::Error::internal(other.to_string()),
        }
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry with every spending tool bound to `api`
    pub fn new(api: Arc<dyn SpendingApi>, defaults: ToolDefaults) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: SEARCH_SPENDING_BY_AWARD.to_string(),
            description: "Search USA government spending data by award (contracts, grants, \
                loans) with filters on time period, agency, recipient, keywords, award IDs and \
                amounts. Fetches up to `pages_to_fetch` pages and returns the merged `results` \
                with `page_metadata` (total_results_fetched, pages_fetched, has_more_pages, \
                fetch_completed). Use the `generated_internal_id` field of a result with \
                get_award_details for full records."
                .to_string(),
            input_schema: search_schema(defaults.default_pages_to_fetch),
            handler: Arc::new(SearchSpendingByAwardHandler {
                fetcher: AwardSearchFetcher::new(api.clone()),
                default_pages_to_fetch: defaults.default_pages_to_fetch,
            }),
        });

        registry.register(Tool {
            name: GET_AWARD_DETAILS.to_string(),
            description: "Get detailed information about 1-10 government awards: amounts, \
                dates, recipient, awarding and funding agencies, place of performance and \
                transaction history. Lookups run concurrently; awards that fail are listed \
                under `errors` without failing the others."
                .to_string(),
            input_schema: details_schema(defaults.default_max_concurrent),
            handler: Arc::new(GetAwardDetailsHandler {
                fetcher: AwardDetailsFetcher::new(api),
                default_max_concurrent: defaults.default_max_concurrent,
            }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.handler.execute(args).await
    }
}

fn search_schema(default_pages: u32) -> Value {
    let string_list = |description: &str| {
        json!({"type": "array", "items": {"type": "string"}, "description": description})
    };

    json!({
        "type": "object",
        "properties": {
            "award_search_request": {
                "type": "object",
                "description": "Structured award search request",
                "properties": {
                    "filters": {
                        "type": "object",
                        "properties": {
                            "time_period": {
                                "type": "array",
                                "minItems": 1,
                                "description": "Date ranges (YYYY-MM-DD). FY2024 is 2023-10-01 to 2024-09-30",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "start_date": {"type": "string", "format": "date"},
                                        "end_date": {"type": "string", "format": "date"}
                                    },
                                    "required": ["start_date", "end_date"]
                                }
                            },
                            "award_type_codes": {
                                "type": ["array", "null"],
                                "items": {"type": "string", "enum": ["A", "B", "C", "D", "02", "03", "04", "05"]},
                                "description": "A-D are contracts, 02-05 are grants. Defaults to all; null disables the filter"
                            },
                            "agencies": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "name": {"type": "string", "description": "e.g. 'Department of Defense'"},
                                        "type": {"type": "string", "enum": ["awarding", "funding"], "default": "awarding"},
                                        "tier": {"type": "string", "enum": ["toptier", "subtier"], "default": "toptier"},
                                        "toptier_name": {"type": "string", "description": "Parent agency of a subtier agency"}
                                    },
                                    "required": ["name"]
                                }
                            },
                            "recipient_search_text": string_list("Recipient names, e.g. ['Amazon']"),
                            "recipient_type_names": string_list("Recipient types, e.g. ['nonprofit']"),
                            "award_ids": string_list("Specific award IDs"),
                            "keywords": string_list("Keywords matched against award descriptions"),
                            "award_amounts": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "lower_bound": {"type": "number"},
                                        "upper_bound": {"type": "number"}
                                    }
                                }
                            },
                            "program_activities": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "name": {"type": "string"},
                                        "code": {"type": "string"}
                                    }
                                }
                            }
                        },
                        "required": ["time_period"]
                    },
                    "fields": string_list("Columns to return; defaults to the basic award fields"),
                    "pagination": {
                        "type": "object",
                        "properties": {
                            "page": {"type": "integer", "minimum": 1, "default": 1},
                            "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 100},
                            "order": {"type": "string", "enum": ["asc", "desc"], "default": "desc"}
                        }
                    },
                    "sort": {"type": "string", "description": "Field to sort on, e.g. 'Award Amount'"},
                    "subawards": {"type": "boolean", "default": false}
                },
                "required": ["filters"]
            },
            "pages_to_fetch": {
                "type": "integer",
                "minimum": 0,
                "description": "Maximum number of pages to fetch",
                "default": default_pages
            }
        },
        "required": ["award_search_request"]
    })
}

fn details_schema(default_max_concurrent: usize) -> Value {
    json!({
        "type": "object",
        "properties": {
            "award_ids": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "maxItems": 10,
                "description": "Award IDs, e.g. ['CONT_AWD_W91ZRS23C0001_9700_-NONE-_-NONE-']"
            },
            "max_concurrent": {
                "type": "integer",
                "minimum": 1,
                "maximum": 10,
                "description": "Maximum number of concurrent requests",
                "default": default_max_concurrent
            }
        },
        "required": ["award_ids"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;

    #[test]
    fn test_registry_has_both_tools() {
        let registry = ToolRegistry::new(Arc::new(MockApi::new()), ToolDefaults::default());

        assert_eq!(registry.all().len(), 2);
        let search = registry.get(SEARCH_SPENDING_BY_AWARD).unwrap();
        assert_eq!(
            search.input_schema["required"],
            json!(["award_search_request"])
        );
        assert_eq!(
            search.input_schema["properties"]["pages_to_fetch"]["default"],
            json!(3)
        );
        assert!(registry.get(GET_AWARD_DETAILS).is_some());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new(Arc::new(MockApi::new()), ToolDefaults::default());

        let result = registry.execute("get_agencies", json!({})).await;
        assert_eq!(result, Err(ToolError::UnknownTool("get_agencies".to_string())));
    }
}
