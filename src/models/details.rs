//! Award detail lookup request and aggregated response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::common::ValidationError;
use crate::fetch::MAX_CONCURRENT_CEILING;

/// Request for one or more award detail records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardDetailsRequest {
    #[serde(default)]
    pub award_ids: Vec<String>,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl AwardDetailsRequest {
    /// Most IDs a single tool call may ask for
    pub const MAX_AWARD_IDS: usize = 10;

    pub fn new(award_ids: Vec<String>) -> Self {
        Self {
            award_ids,
            max_concurrent: default_max_concurrent(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.award_ids.len() > Self::MAX_AWARD_IDS {
            return Err(ValidationError::TooManyAwardIds {
                max: Self::MAX_AWARD_IDS,
                got: self.award_ids.len(),
            });
        }
        Ok(())
    }

    /// Trimmed, non-blank IDs in request order
    pub fn valid_ids(&self) -> Vec<String> {
        self.award_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    }
}

fn default_max_concurrent() -> usize {
    MAX_CONCURRENT_CEILING
}

/// Outcome of a single award lookup
#[derive(Debug, Clone, PartialEq)]
pub enum DetailFetchResult {
    Success { award_id: String, data: Value },
    Failure { award_id: String, error: String },
}

/// Combined result of a multi-award lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDetailResponse {
    pub success_count: usize,
    pub error_count: usize,
    pub results: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl AggregatedDetailResponse {
    /// Partition per-award outcomes into success and failure maps
    pub fn from_results(outcomes: impl IntoIterator<Item = DetailFetchResult>) -> Self {
        let mut results = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for outcome in outcomes {
            match outcome {
                DetailFetchResult::Success { award_id, data } => {
                    results.insert(award_id, data);
                }
                DetailFetchResult::Failure { award_id, error } => {
                    errors.insert(award_id, error);
                }
            }
        }

        Self {
            success_count: results.len(),
            error_count: errors.len(),
            results,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partition_mixed_outcomes() {
        let outcomes = (1..=5).map(|i| {
            let award_id = format!("AWD-{i}");
            if i % 2 == 0 {
                DetailFetchResult::Failure {
                    award_id,
                    error: "404 Not Found".to_string(),
                }
            } else {
                DetailFetchResult::Success {
                    award_id,
                    data: json!({"id": i}),
                }
            }
        });

        let response = AggregatedDetailResponse::from_results(outcomes);
        assert_eq!(response.success_count, 3);
        assert_eq!(response.error_count, 2);
        assert_eq!(response.results["AWD-3"], json!({"id": 3}));

        let errors = response.errors.unwrap();
        assert_eq!(errors.keys().collect::<Vec<_>>(), ["AWD-2", "AWD-4"]);
    }

    #[test]
    fn test_errors_key_absent_when_all_succeed() {
        let response = AggregatedDetailResponse::from_results(vec![DetailFetchResult::Success {
            award_id: "A".to_string(),
            data: json!({}),
        }]);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"success_count": 1, "error_count": 0, "results": {"A": {}}})
        );
    }

    #[test]
    fn test_details_request_validation() {
        let ids: Vec<String> = (0..11).map(|i| i.to_string()).collect();
        let request = AwardDetailsRequest::new(ids);
        assert_eq!(
            request.validate(),
            Err(ValidationError::TooManyAwardIds { max: 10, got: 11 })
        );

        let request = AwardDetailsRequest::new(vec![" A ".into(), "".into(), "  ".into()]);
        assert!(request.validate().is_ok());
        assert_eq!(request.valid_ids(), vec!["A".to_string()]);
        assert_eq!(request.max_concurrent, 10);

        let parsed: AwardDetailsRequest =
            serde_json::from_value(json!({"award_ids": ["A"]})).unwrap();
        assert_eq!(parsed.max_concurrent, MAX_CONCURRENT_CEILING);
    }
}
