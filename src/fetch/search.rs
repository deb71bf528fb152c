//! Paginated award search.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, SpendingApi, SPENDING_BY_AWARD_PATH};
use crate::models::AwardSearchRequest;

/// Page budget used when the caller does not pass one
pub const DEFAULT_PAGES_TO_FETCH: u32 = 3;

/// Counters merged into `page_metadata` after a multi-page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationSummary {
    pub total_results_fetched: usize,
    pub pages_fetched: u32,
    pub requested_max_pages: u32,
    pub has_more_pages: bool,
    pub fetch_completed: bool,
}

impl PaginationSummary {
    /// A fetch is complete only once upstream has nothing left; stopping at
    /// the page budget with pages pending leaves it incomplete.
    fn new(total_results_fetched: usize, pages_fetched: u32, budget: u32, has_next: bool) -> Self {
        Self {
            total_results_fetched,
            pages_fetched,
            requested_max_pages: budget,
            has_more_pages: has_next,
            fetch_completed: !has_next,
        }
    }
}

/// Drives `search/spending_by_award/` across pages.
///
/// Pages are requested one at a time in increasing order, each page request
/// derived from the original with [`AwardSearchRequest::with_page`].
#[derive(Debug, Clone)]
pub struct AwardSearchFetcher {
    api: Arc<dyn SpendingApi>,
}

impl AwardSearchFetcher {
    pub fn new(api: Arc<dyn SpendingApi>) -> Self {
        Self { api }
    }

    /// Fetch up to `pages_to_fetch` pages starting at the request's page.
    ///
    /// A failure on the first page is returned as an error. Failures on
    /// later pages end the loop and the pages gathered so far are returned.
    /// With a budget of one page or less the first response is returned
    /// untouched.
    pub async fn fetch(
        &self,
        request: &AwardSearchRequest,
        pages_to_fetch: u32,
    ) -> Result<Value, ApiError> {
        let first = self.fetch_page(request).await?;

        if pages_to_fetch <= 1 {
            return Ok(first);
        }

        let mut all_results = page_results(&first);
        let mut pages_fetched = 1;
        let mut current_page = request.pagination.page;
        let mut has_next = has_next_page(&first);
        debug!(page = current_page, has_next, "Fetched first page");

        while has_next && pages_fetched < pages_to_fetch {
            let Some(next_page) = current_page.checked_add(1) else {
                warn!(page = current_page, "No page number after the last, stopping");
                break;
            };
            current_page = next_page;
            let page_request = request.with_page(current_page);

            let response = match self.fetch_page(&page_request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(page = current_page, error = %e, "Error fetching page, returning partial results");
                    break;
                }
            };

            pages_fetched += 1;
            let results = page_results(&response);
            if results.is_empty() {
                // upstream said hasNext but the page is empty
                debug!(page = current_page, "Empty page, stopping");
                has_next = false;
                break;
            }

            all_results.extend(results);
            has_next = has_next_page(&response);
            debug!(page = current_page, has_next, "Fetched page");
        }

        let summary =
            PaginationSummary::new(all_results.len(), pages_fetched, pages_to_fetch, has_next);
        info!(
            pages = summary.pages_fetched,
            results = summary.total_results_fetched,
            completed = summary.fetch_completed,
            "Award search finished"
        );

        Ok(merge_pages(first, all_results, summary))
    }

    async fn fetch_page(&self, request: &AwardSearchRequest) -> Result<Value, ApiError> {
        let payload = request
            .to_payload()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.api.post(SPENDING_BY_AWARD_PATH, &payload).await
    }
}

fn page_results(response: &Value) -> Vec<Value> {
    response
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn has_next_page(response: &Value) -> bool {
    response
        .get("page_metadata")
        .and_then(|m| m.get("hasNext"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// First page with its results replaced and its metadata enriched
fn merge_pages(first: Value, results: Vec<Value>, summary: PaginationSummary) -> Value {
    let mut response = match first {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    response.insert("results".to_string(), Value::Array(results));

    let metadata = response
        .entry("page_metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let (Value::Object(metadata), Ok(Value::Object(extra))) =
        (metadata, serde_json::to_value(summary))
    {
        metadata.extend(extra);
    }

    Value::Object(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{search_page, RecordedCall};
    use crate::api::MockApi;
    use crate::models::{AwardSearchFilters, TimePeriod};
    use serde_json::json;

    fn request() -> AwardSearchRequest {
        AwardSearchRequest::new(AwardSearchFilters::new(vec![
            TimePeriod::new("2023-10-01", "2024-09-30").unwrap(),
        ]))
    }

    fn awards(page: u32, count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({"Award ID": format!("P{page}-{i}")}))
            .collect()
    }

    async fn requested_pages(mock: &MockApi) -> Vec<u64> {
        mock.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Post(_, body) => body["pagination"]["page"].as_u64(),
                RecordedCall::Get(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_single_page_budget_returns_raw_response() {
        let first = search_page(1, awards(1, 2), true);

        for budget in [1, 0] {
            let mock = Arc::new(MockApi::new().with_post_response(first.clone()));
            let response = AwardSearchFetcher::new(mock.clone())
                .fetch(&request(), budget)
                .await
                .unwrap();
            assert_eq!(response, first);
            assert!(response["page_metadata"].get("total_results_fetched").is_none());
            assert_eq!(mock.call_count().await, 1);
        }
    }

    #[tokio::test]
    async fn test_stops_when_upstream_exhausted() {
        let mock = Arc::new(
            MockApi::new()
                .with_post_response(search_page(1, awards(1, 3), true))
                .with_post_response(search_page(2, awards(2, 3), true))
                .with_post_response(search_page(3, awards(3, 1), false)),
        );
        let fetcher = AwardSearchFetcher::new(mock.clone());

        let response = fetcher.fetch(&request(), 5).await.unwrap();

        assert_eq!(requested_pages(&mock).await, vec![1, 2, 3]);
        assert_eq!(response["results"].as_array().unwrap().len(), 7);
        assert_eq!(response["results"][6], json!({"Award ID": "P3-0"}));

        let metadata = &response["page_metadata"];
        assert_eq!(metadata["pages_fetched"], json!(3));
        assert_eq!(metadata["total_results_fetched"], json!(7));
        assert_eq!(metadata["requested_max_pages"], json!(5));
        assert_eq!(metadata["has_more_pages"], json!(false));
        assert_eq!(metadata["fetch_completed"], json!(true));
        // first page's own metadata is kept
        assert_eq!(metadata["page"], json!(1));
        assert_eq!(metadata["hasNext"], json!(true));
    }

    #[tokio::test]
    async fn test_stops_at_page_budget() {
        let mock = Arc::new(
            MockApi::new()
                .with_post_response(search_page(1, awards(1, 2), true))
                .with_post_response(search_page(2, awards(2, 2), true))
                .with_post_response(search_page(3, awards(3, 2), true)),
        );
        let fetcher = AwardSearchFetcher::new(mock.clone());

        let response = fetcher.fetch(&request(), 2).await.unwrap();

        assert_eq!(mock.call_count().await, 2);
        let metadata = &response["page_metadata"];
        assert_eq!(metadata["pages_fetched"], json!(2));
        assert_eq!(metadata["has_more_pages"], json!(true));
        assert_eq!(metadata["fetch_completed"], json!(false));
    }

    #[tokio::test]
    async fn test_incomplete_when_later_page_fails_with_more_pending() {
        let mock = Arc::new(
            MockApi::new()
                .with_post_response(search_page(1, awards(1, 2), true))
                .with_post_error(ApiError::Network("connection reset".to_string())),
        );
        let fetcher = AwardSearchFetcher::new(mock.clone());

        let response = fetcher.fetch(&request(), 2).await.unwrap();

        assert_eq!(mock.call_count().await, 2);
        assert_eq!(response["results"].as_array().unwrap().len(), 2);
        let metadata = &response["page_metadata"];
        assert_eq!(metadata["pages_fetched"], json!(1));
        assert_eq!(metadata["has_more_pages"], json!(true));
        assert_eq!(metadata["fetch_completed"], json!(false));
    }

    #[tokio::test]
    async fn test_empty_page_stops_despite_has_next() {
        let mock = Arc::new(
            MockApi::new()
                .with_post_response(search_page(1, awards(1, 2), true))
                .with_post_response(search_page(2, vec![], true))
                .with_post_response(search_page(3, awards(3, 2), false)),
        );
        let fetcher = AwardSearchFetcher::new(mock.clone());

        let response = fetcher.fetch(&request(), 5).await.unwrap();

        assert_eq!(mock.call_count().await, 2);
        assert_eq!(response["results"].as_array().unwrap().len(), 2);
        assert_eq!(response["page_metadata"]["has_more_pages"], json!(false));
        assert_eq!(response["page_metadata"]["fetch_completed"], json!(true));
    }

    #[tokio::test]
    async fn test_second_page_error_returns_first_page() {
        let mock = Arc::new(
            MockApi::new()
                .with_post_response(search_page(1, awards(1, 4), true))
                .with_post_error(ApiError::Status {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                }),
        );
        let fetcher = AwardSearchFetcher::new(mock.clone());

        let response = fetcher.fetch(&request(), 3).await.unwrap();

        assert_eq!(mock.call_count().await, 2);
        assert_eq!(response["results"].as_array().unwrap().len(), 4);
        assert_eq!(response["page_metadata"]["pages_fetched"], json!(1));
        assert_eq!(response["page_metadata"]["total_results_fetched"], json!(4));
    }

    #[tokio::test]
    async fn test_first_page_error_propagates() {
        let mock = Arc::new(MockApi::new().with_post_error(ApiError::Timeout("30s".to_string())));
        let fetcher = AwardSearchFetcher::new(mock.clone());

        let result = fetcher.fetch(&request(), 3).await;

        assert_eq!(result, Err(ApiError::Timeout("30s".to_string())));
        assert_eq!(mock.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_pages_continue_from_requested_start() {
        let mut start_at_four = request();
        start_at_four.pagination.page = 4;
        let mock = Arc::new(
            MockApi::new()
                .with_post_response(search_page(4, awards(4, 1), true))
                .with_post_response(search_page(5, awards(5, 1), false)),
        );
        let fetcher = AwardSearchFetcher::new(mock.clone());

        fetcher.fetch(&start_at_four, 3).await.unwrap();

        assert_eq!(requested_pages(&mock).await, vec![4, 5]);
        // the caller's request is untouched
        assert_eq!(start_at_four.pagination.page, 4);

        // every page body matches the original apart from the page number
        let calls = mock.calls().await;
        let bodies: Vec<Value> = calls
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Post(_, mut body) => {
                    body["pagination"]["page"] = json!(null);
                    Some(body)
                }
                RecordedCall::Get(_) => None,
            })
            .collect();
        assert_eq!(bodies[0], bodies[1]);
    }

    #[tokio::test]
    async fn test_missing_metadata_is_created() {
        let mock = Arc::new(MockApi::new().with_post_response(json!({"results": [{"id": 1}]})));
        let fetcher = AwardSearchFetcher::new(mock.clone());

        let response = fetcher.fetch(&request(), 3).await.unwrap();

        assert_eq!(mock.call_count().await, 1);
        assert_eq!(
            response["page_metadata"],
            json!({
                "total_results_fetched": 1,
                "pages_fetched": 1,
                "requested_max_pages": 3,
                "has_more_pages": false,
                "fetch_completed": true
            })
        );
    }

    #[tokio::test]
    async fn test_last_page_number_stops_without_overflow() {
        let mut at_max = request();
        at_max.pagination.page = u32::MAX;
        assert!(at_max.validate().is_ok());

        let mock = Arc::new(
            MockApi::new()
                .with_post_response(search_page(u32::MAX, awards(1, 2), true))
                .with_post_response(search_page(1, awards(2, 2), true)),
        );
        let response = AwardSearchFetcher::new(mock.clone())
            .fetch(&at_max, 3)
            .await
            .unwrap();

        assert_eq!(requested_pages(&mock).await, vec![u64::from(u32::MAX)]);
        let metadata = &response["page_metadata"];
        assert_eq!(metadata["pages_fetched"], json!(1));
        assert_eq!(metadata["total_results_fetched"], json!(2));
        assert_eq!(metadata["has_more_pages"], json!(true));
        assert_eq!(metadata["fetch_completed"], json!(false));
    }
}
