//! Concurrent award detail lookups.

use futures_util::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::api::{award_path, SpendingApi};
use crate::models::{AggregatedDetailResponse, DetailFetchResult};

/// Hard cap on simultaneous detail calls, whatever the caller asks for
pub const MAX_CONCURRENT_CEILING: usize = 10;

/// Errors that fail a whole detail lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetailsError {
    #[error("No valid award IDs provided")]
    NoAwardIds,

    #[error("{0}")]
    Collection(String),
}

/// Number of lookups allowed in flight for `requested` concurrency over `count` IDs
pub fn effective_concurrency(requested: usize, count: usize) -> usize {
    requested.min(MAX_CONCURRENT_CEILING).min(count).max(1)
}

/// Fetches `awards/{id}/` for many IDs at once.
///
/// Every ID gets its own future; a semaphore admits at most the effective
/// concurrency into the network call. A failing ID only affects its own
/// entry in the result.
#[derive(Debug, Clone)]
pub struct AwardDetailsFetcher {
    api: Arc<dyn SpendingApi>,
}

impl AwardDetailsFetcher {
    pub fn new(api: Arc<dyn SpendingApi>) -> Self {
        Self { api }
    }

    pub async fn fetch(
        &self,
        award_ids: &[String],
        max_concurrent: usize,
    ) -> Result<AggregatedDetailResponse, DetailsError> {
        if award_ids.is_empty() {
            return Err(DetailsError::NoAwardIds);
        }

        let limit = effective_concurrency(max_concurrent, award_ids.len());
        debug!(awards = award_ids.len(), limit, "Fetching award details");

        let semaphore = Semaphore::new(limit);
        let outcomes = join_all(
            award_ids
                .iter()
                .map(|award_id| self.fetch_one(&semaphore, award_id)),
        )
        .await;

        let response = AggregatedDetailResponse::from_results(outcomes);
        info!(
            succeeded = response.success_count,
            failed = response.error_count,
            "Award details fetched"
        );
        Ok(response)
    }

    async fn fetch_one(&self, semaphore: &Semaphore, award_id: &str) -> DetailFetchResult {
        let _permit = match semaphore.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return DetailFetchResult::Failure {
                    award_id: award_id.to_string(),
                    error: e.to_string(),
                }
            }
        };

        match self.api.get(&award_path(award_id)).await {
            Ok(data) => DetailFetchResult::Success {
                award_id: award_id.to_string(),
                data,
            },
            Err(e) => {
                warn!(award_id, error = %e, "Award lookup failed");
                DetailFetchResult::Failure {
                    award_id: award_id.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}
