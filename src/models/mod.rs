//! Request and response models for the USAspending API.

mod award;
mod common;
mod details;

pub use award::{AwardAmount, AwardSearchFilters, AwardSearchRequest, ProgramActivity};
pub use common::{
    Agency, AgencyTier, AgencyType, AwardTypeCode, Pagination, SortOrder, TimePeriod,
    ValidationError, DATE_FORMAT,
};
pub use details::{AggregatedDetailResponse, AwardDetailsRequest, DetailFetchResult};
