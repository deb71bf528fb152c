//! Award search request model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::{Agency, AwardTypeCode, Pagination, TimePeriod, ValidationError};

/// Award amount range filter. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AwardAmount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
}

impl AwardAmount {
    pub fn at_least(lower: f64) -> Self {
        Self {
            lower_bound: Some(lower),
            upper_bound: None,
        }
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower_bound: Some(lower),
            upper_bound: Some(upper),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.lower_bound, self.upper_bound) {
            (Some(lower), Some(upper)) if lower > upper => {
                Err(ValidationError::InvertedAmountRange { lower, upper })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramActivity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Filters for `search/spending_by_award/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardSearchFilters {
    pub time_period: Vec<TimePeriod>,

    /// Absent key means contracts and grants; explicit `null` disables the filter
    #[serde(
        default = "default_award_type_codes",
        skip_serializing_if = "Option::is_none"
    )]
    pub award_type_codes: Option<Vec<AwardTypeCode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agencies: Option<Vec<Agency>>,

    /// Recipient names, e.g. `["Amazon"]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_search_text: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_type_names: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_ids: Option<Vec<String>>,

    /// Keywords matched against award descriptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_amounts: Option<Vec<AwardAmount>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_activities: Option<Vec<ProgramActivity>>,
}

impl AwardSearchFilters {
    /// Filters over the given periods with the default award types
    pub fn new(time_period: Vec<TimePeriod>) -> Self {
        Self {
            time_period,
            award_type_codes: default_award_type_codes(),
            agencies: None,
            recipient_search_text: None,
            recipient_type_names: None,
            award_ids: None,
            keywords: None,
            award_amounts: None,
            program_activities: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.time_period.is_empty() {
            return Err(ValidationError::MissingTimePeriod);
        }
        self.award_amounts
            .iter()
            .flatten()
            .try_for_each(AwardAmount::validate)
    }
}

fn default_award_type_codes() -> Option<Vec<AwardTypeCode>> {
    Some(AwardTypeCode::ALL.to_vec())
}

/// Award search request.
///
/// Unknown top-level keys land in [`extra`](Self::extra) and are forwarded
/// to the API untouched; they are not validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardSearchRequest {
    pub filters: AwardSearchFilters,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    #[serde(default)]
    pub pagination: Pagination,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    #[serde(default)]
    pub subawards: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AwardSearchRequest {
    pub fn new(filters: AwardSearchFilters) -> Self {
        Self {
            filters,
            fields: default_fields(),
            pagination: Pagination::default(),
            sort: None,
            subawards: false,
            extra: Map::new(),
        }
    }

    /// Set the sort field
    pub fn sort(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self
    }

    /// Set pagination
    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pagination.validate()?;
        self.filters.validate()
    }

    /// Independent copy of this request targeting `page`
    pub fn with_page(&self, page: u32) -> Self {
        let mut next = self.clone();
        next.pagination.page = page;
        next
    }

    /// JSON body for the search endpoint, absent fields omitted
    pub fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

fn default_fields() -> Vec<String> {
    [
        "Award ID",
        "Recipient Name",
        "Start Date",
        "End Date",
        "Award Amount",
        "Awarding Agency",
        "Awarding Sub Agency",
        "Award Type",
        "Description",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
