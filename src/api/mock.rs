//! Mock API for testing purposes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{ApiError, SpendingApi};

/// A call the mock received
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Get(String),
    Post(String, Value),
}

/// A scripted [`SpendingApi`].
///
/// POST responses are served in the order they were queued; once the queue
/// is empty every POST fails. GET responses are looked up by path, and
/// unknown paths fail with a 404.
#[derive(Debug, Default)]
pub struct MockApi {
    post_responses: Mutex<VecDeque<Result<Value, ApiError>>>,
    get_responses: Mutex<HashMap<String, Result<Value, ApiError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockApi {
    /// Create a new mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful POST response.
    pub fn with_post_response(mut self, response: Value) -> Self {
        self.post_responses.get_mut().push_back(Ok(response));
        self
    }

    /// Queue a failing POST response.
    pub fn with_post_error(mut self, error: ApiError) -> Self {
        self.post_responses.get_mut().push_back(Err(error));
        self
    }

    /// Respond to `GET path` with `response`.
    pub fn with_get_response(mut self, path: impl Into<String>, response: Value) -> Self {
        self.get_responses.get_mut().insert(path.into(), Ok(response));
        self
    }

    /// Fail `GET path` with `error`.
    pub fn with_get_error(mut self, path: impl Into<String>, error: ApiError) -> Self {
        self.get_responses.get_mut().insert(path.into(), Err(error));
        self
    }

    /// Hold every call open for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call received so far, in arrival order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Highest number of calls that were open at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: RecordedCall) {
        self.calls.lock().await.push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpendingApi for MockApi {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.enter(RecordedCall::Get(path.to_string())).await;
        let response = self
            .get_responses
            .lock()
            .await
            .get(path)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Status {
                    status: 404,
                    message: format!("no mock response for {}", path),
                })
            });
        self.leave();
        response
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.enter(RecordedCall::Post(path.to_string(), body.clone()))
            .await;
        let response = self
            .post_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("mock POST queue exhausted".to_string())));
        self.leave();
        response
    }
}

/// Build a search page response the way the API shapes it.
pub fn search_page(page: u32, results: Vec<Value>, has_next: bool) -> Value {
    serde_json::json!({
        "limit": 100,
        "results": results,
        "page_metadata": {
            "page": page,
            "hasNext": has_next,
            "last_record_unique_id": null,
            "last_record_sort_value": null
        },
        "messages": []
    })
}
