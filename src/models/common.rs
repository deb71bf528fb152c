//! Filter building blocks shared by USAspending search endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format accepted by the USAspending API
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Date must be in YYYY-MM-DD format: {0}")]
    InvalidDate(String),

    #[error("start_date must be before end_date ({start} > {end})")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("filters.time_period must contain at least one time period")]
    MissingTimePeriod,

    #[error("pagination.page must be at least 1, got {0}")]
    InvalidPage(u32),

    #[error("pagination.limit must be between 1 and 100, got {0}")]
    InvalidLimit(u32),

    #[error("award_amounts lower_bound {lower} exceeds upper_bound {upper}")]
    InvertedAmountRange { lower: f64, upper: f64 },

    #[error("award_ids accepts at most {max} IDs, got {got}")]
    TooManyAwardIds { max: usize, got: usize },
}

/// Award type codes for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AwardTypeCode {
    #[serde(rename = "A")]
    BpaCall,
    #[serde(rename = "B")]
    PurchaseOrder,
    #[serde(rename = "C")]
    DeliveryOrder,
    #[serde(rename = "D")]
    DefinitiveContract,
    #[serde(rename = "02")]
    BlockGrant,
    #[serde(rename = "03")]
    FormulaGrant,
    #[serde(rename = "04")]
    ProjectGrant,
    #[serde(rename = "05")]
    CooperativeAgreement,
}

impl AwardTypeCode {
    /// Every supported code, contracts first
    pub const ALL: [AwardTypeCode; 8] = [
        AwardTypeCode::BpaCall,
        AwardTypeCode::PurchaseOrder,
        AwardTypeCode::DeliveryOrder,
        AwardTypeCode::DefinitiveContract,
        AwardTypeCode::BlockGrant,
        AwardTypeCode::FormulaGrant,
        AwardTypeCode::ProjectGrant,
        AwardTypeCode::CooperativeAgreement,
    ];

    /// Wire value sent to the API
    pub fn code(&self) -> &'static str {
        match self {
            AwardTypeCode::BpaCall => "A",
            AwardTypeCode::PurchaseOrder => "B",
            AwardTypeCode::DeliveryOrder => "C",
            AwardTypeCode::DefinitiveContract => "D",
            AwardTypeCode::BlockGrant => "02",
            AwardTypeCode::FormulaGrant => "03",
            AwardTypeCode::ProjectGrant => "04",
            AwardTypeCode::CooperativeAgreement => "05",
        }
    }
}

/// Agency tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgencyTier {
    #[default]
    Toptier,
    Subtier,
}

/// Whether an agency awarded or funded the spending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgencyType {
    #[default]
    Awarding,
    Funding,
}

/// Sort order for paginated results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Inclusive date range filter.
///
/// Both ends are validated on construction and on deserialization, so a
/// `TimePeriod` with `start_date > end_date` cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimePeriod")]
pub struct TimePeriod {
    #[serde(serialize_with = "serialize_date")]
    start_date: NaiveDate,
    #[serde(serialize_with = "serialize_date")]
    end_date: NaiveDate,
}

#[derive(Deserialize)]
struct RawTimePeriod {
    start_date: String,
    end_date: String,
}

impl TryFrom<RawTimePeriod> for TimePeriod {
    type Error = ValidationError;

    fn try_from(raw: RawTimePeriod) -> Result<Self, Self::Error> {
        TimePeriod::new(&raw.start_date, &raw.end_date)
    }
}

impl TimePeriod {
    /// Parse and validate a `YYYY-MM-DD` date range
    pub fn new(start_date: &str, end_date: &str) -> Result<Self, ValidationError> {
        Self::from_dates(parse_date(start_date)?, parse_date(end_date)?)
    }

    /// Build from already-parsed dates
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, ValidationError> {
        if start_date > end_date {
            return Err(ValidationError::InvertedDateRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Federal fiscal year `fy`: October 1 of the prior year through September 30
    pub fn fiscal_year(fy: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(fy - 1, 10, 1)?;
        let end = NaiveDate::from_ymd_opt(fy, 9, 30)?;
        Self::from_dates(start, end).ok()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    // strict width: chrono alone would accept "2024-1-5"
    let well_formed = value.len() == 10
        && value
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(ValidationError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(DATE_FORMAT))
}

/// Individual agency filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    /// Agency name, e.g. "Department of Defense" or "Office of the Inspector General"
    pub name: String,

    #[serde(rename = "type", default)]
    pub agency_type: AgencyType,

    #[serde(default)]
    pub tier: AgencyTier,

    /// Top tier agency a subtier belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toptier_name: Option<String>,
}

impl Agency {
    /// Awarding, toptier agency with the given name
    pub fn awarding(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agency_type: AgencyType::Awarding,
            tier: AgencyTier::Toptier,
            toptier_name: None,
        }
    }
}

/// Page request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default)]
    pub order: SortOrder,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            order: SortOrder::default(),
        }
    }
}

impl Pagination {
    /// Upper bound the API accepts for `limit`
    pub const MAX_LIMIT: u32 = 100;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page < 1 {
            return Err(ValidationError::InvalidPage(self.page));
        }
        if !(1..=Self::MAX_LIMIT).contains(&self.limit) {
            return Err(ValidationError::InvalidLimit(self.limit));
        }
        Ok(())
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_time_period_valid() {
        let period = TimePeriod::new("2023-10-01", "2024-09-30").unwrap();
        assert!(period.start_date() <= period.end_date());

        let same_day = TimePeriod::new("2024-01-01", "2024-01-01");
        assert!(same_day.is_ok());
    }

    #[test]
    fn test_time_period_inverted() {
        let result = TimePeriod::new("2024-09-30", "2023-10-01");
        assert!(matches!(
            result,
            Err(ValidationError::InvertedDateRange { .. })
        ));
    }

    #[test]
    fn test_time_period_bad_format() {
        for bad in ["2024/01/01", "01-01-2024", "2024-1-5", "2024-02-30", "", "yesterday"] {
            assert_eq!(
                TimePeriod::new(bad, "2024-12-31"),
                Err(ValidationError::InvalidDate(bad.to_string())),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_time_period_deserialize_validates() {
        let ok: TimePeriod =
            serde_json::from_value(json!({"start_date": "2024-01-01", "end_date": "2024-12-31"}))
                .unwrap();
        assert_eq!(
            serde_json::to_value(ok).unwrap(),
            json!({"start_date": "2024-01-01", "end_date": "2024-12-31"})
        );

        let inverted = serde_json::from_value::<TimePeriod>(
            json!({"start_date": "2025-01-01", "end_date": "2024-12-31"}),
        );
        let err = inverted.unwrap_err().to_string();
        assert!(err.contains("start_date must be before end_date"));
    }

    #[test]
    fn test_fiscal_year() {
        let fy = TimePeriod::fiscal_year(2024).unwrap();
        assert_eq!(fy, TimePeriod::new("2023-10-01", "2024-09-30").unwrap());
    }

    #[test]
    fn test_pagination_limits() {
        assert!(Pagination::default().validate().is_ok());

        let zero_page = Pagination {
            page: 0,
            ..Default::default()
        };
        assert_eq!(zero_page.validate(), Err(ValidationError::InvalidPage(0)));

        let big = Pagination {
            limit: 101,
            ..Default::default()
        };
        assert_eq!(big.validate(), Err(ValidationError::InvalidLimit(101)));
    }

    #[test]
    fn test_award_type_codes_wire_format() {
        let codes = serde_json::to_value(AwardTypeCode::ALL).unwrap();
        let expected: Vec<&str> = AwardTypeCode::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, json!(expected));
    }

    #[test]
    fn test_agency_defaults() {
        let agency: Agency = serde_json::from_value(json!({"name": "NASA"})).unwrap();
        assert_eq!(agency, Agency::awarding("NASA"));
        assert_eq!(
            serde_json::to_value(&agency).unwrap(),
            json!({"name": "NASA", "type": "awarding", "tier": "toptier"})
        );
    }
}
