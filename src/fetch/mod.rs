//! Fetch strategies over the spending API.
//!
//! - [`AwardSearchFetcher`]: sequential multi-page award search with
//!   partial results on late-page failures
//! - [`AwardDetailsFetcher`]: bounded concurrent award detail lookups

mod details;
mod search;

pub use details::{effective_concurrency, AwardDetailsFetcher, DetailsError, MAX_CONCURRENT_CEILING};
pub use search::{AwardSearchFetcher, PaginationSummary, DEFAULT_PAGES_TO_FETCH};
