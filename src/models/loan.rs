//! Loan model and the pure pieces of the lending lifecycle:
//! key generation, fine arithmetic, lateness derivation.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

use super::material::MaterialType;
use crate::error::{AppError, AppResult};

/// Loan status as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
    Late,
    Lost,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Late => "late",
            LoanStatus::Lost => "lost",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            "late" => Ok(LoanStatus::Late),
            "lost" => Ok(LoanStatus::Lost),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Condition of the material when it came back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReturnCondition {
    Excellent,
    Good,
    Fair,
    Poor,
    Lost,
}

impl ReturnCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnCondition::Excellent => "excellent",
            ReturnCondition::Good => "good",
            ReturnCondition::Fair => "fair",
            ReturnCondition::Poor => "poor",
            ReturnCondition::Lost => "lost",
        }
    }
}

impl std::str::FromStr for ReturnCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excellent" => Ok(ReturnCondition::Excellent),
            "good" => Ok(ReturnCondition::Good),
            "fair" => Ok(ReturnCondition::Fair),
            "poor" => Ok(ReturnCondition::Poor),
            "lost" => Ok(ReturnCondition::Lost),
            _ => Err(format!("Invalid return condition: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for ReturnCondition {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ReturnCondition {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ReturnCondition {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Loan model from database.
///
/// The `user_name`, `material_*` fields are snapshots taken at creation time
/// and never re-synced with the referenced records.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    /// Human-readable key, `P<YYMMDD>-<RRRR>`
    pub loan_key: String,
    pub user_id: i32,
    pub user_name: String,
    pub material_id: i32,
    pub material_title: String,
    pub material_author: String,
    pub material_edition: Option<String>,
    pub material_type: MaterialType,
    pub loan_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub late_days: i32,
    pub fine: Decimal,
    pub notes: Option<String>,
    pub return_condition: Option<ReturnCondition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Derived at read time, not a column; see [`Loan::is_late_at`]
    #[sqlx(default)]
    #[serde(default)]
    pub is_late: bool,
}

impl Loan {
    /// Whether the loan is overdue as of `now`.
    ///
    /// Derived at read time; stored status is never rewritten to `late`.
    pub fn is_late_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, LoanStatus::Active | LoanStatus::Late)
            && self.expected_return_date < now
    }

    /// Generate a loan key for the given date and random draw (0..=9999).
    pub fn generate_key_at(date: NaiveDate, random: u32) -> String {
        format!(
            "P{:02}{:02}{:02}-{:04}",
            date.year() % 100,
            date.month(),
            date.day(),
            random % 10_000
        )
    }

    /// Generate a loan key for today.
    ///
    /// No uniqueness retry here; collisions surface as a write failure on the
    /// `loan_key` unique constraint.
    pub fn generate_key() -> String {
        use rand::Rng;
        let random = rand::thread_rng().gen_range(0..10_000);
        Self::generate_key_at(Utc::now().date_naive(), random)
    }

    /// Fine for a late return: ceiling of elapsed days past the expected
    /// date, times the per-day rate. Any partial day counts as a full day.
    pub fn fine_for(
        expected: DateTime<Utc>,
        actual: DateTime<Utc>,
        per_day: Decimal,
    ) -> (i32, Decimal) {
        if actual <= expected {
            return (0, Decimal::ZERO);
        }
        let elapsed = actual - expected;
        let late_days = (elapsed.num_milliseconds() + 86_399_999) / 86_400_000;
        let late_days = late_days as i32;
        (late_days, Decimal::from(late_days) * per_day)
    }
}

/// Parse an expected-return date from a request.
///
/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (taken as UTC midnight).
pub fn parse_expected_return_date(s: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(AppError::InvalidDate(format!(
        "Invalid expected return date: {}",
        s
    )))
}

/// Loan list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// Status filter; `late` matches stored late loans and overdue active ones
    pub status: Option<LoanStatus>,
    pub user_id: Option<i32>,
    pub material_id: Option<i32>,
    /// Exact loan key
    pub loan_key: Option<String>,
    /// Partial user-name search (case-insensitive, against the snapshot)
    pub user_name: Option<String>,
    /// Inclusive lower bound on expected return date
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on expected return date
    pub to: Option<DateTime<Utc>>,
}

/// Create loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub user_id: i32,
    pub material_id: i32,
    /// RFC 3339 timestamp or `YYYY-MM-DD`; must be in the future
    pub expected_return_date: String,
}

/// Return loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnLoan {
    pub notes: Option<String>,
    pub condition: Option<ReturnCondition>,
}

/// Per-user loan summary: what is out, what came back, what is owed
#[derive(Debug, Serialize, ToSchema)]
pub struct UserLoanSummary {
    /// Loans currently out (active or late)
    pub active: Vec<Loan>,
    /// Returned loans, most recent first
    pub history: Vec<Loan>,
    /// Outstanding fine balance
    pub outstanding_fine: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn dt(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn key_format_matches_pattern() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(Loan::generate_key_at(date, 42), "P250307-0042");
        assert_eq!(Loan::generate_key_at(date, 9999), "P250307-9999");
        assert_eq!(Loan::generate_key_at(date, 0), "P250307-0000");

        let re = regex::Regex::new(r"^P\d{6}-\d{4}$").unwrap();
        for _ in 0..20 {
            assert!(re.is_match(&Loan::generate_key()));
        }
    }

    #[test]
    fn fine_is_zero_when_on_time() {
        let expected = dt("2025-01-10T12:00:00Z");
        let rate = Decimal::from(50);

        let (days, fine) = Loan::fine_for(expected, expected, rate);
        assert_eq!((days, fine), (0, Decimal::ZERO));

        let early = dt("2025-01-09T12:00:00Z");
        let (days, fine) = Loan::fine_for(expected, early, rate);
        assert_eq!((days, fine), (0, Decimal::ZERO));
    }

    #[test]
    fn partial_day_counts_as_full_day() {
        let expected = dt("2025-01-10T00:00:00Z");
        let rate = Decimal::from(50);

        // 25 hours late: two calendar days
        let actual = dt("2025-01-11T01:00:00Z");
        let (days, fine) = Loan::fine_for(expected, actual, rate);
        assert_eq!(days, 2);
        assert_eq!(fine, Decimal::from(100));

        // One second late still costs a full day
        let actual = dt("2025-01-10T00:00:01Z");
        let (days, fine) = Loan::fine_for(expected, actual, rate);
        assert_eq!(days, 1);
        assert_eq!(fine, Decimal::from(50));

        // Exactly 24 hours is one day, not two
        let actual = dt("2025-01-11T00:00:00Z");
        let (days, _) = Loan::fine_for(expected, actual, rate);
        assert_eq!(days, 1);
    }

    #[test]
    fn subsecond_lateness_still_charges_a_day() {
        let expected = dt("2025-01-10T00:00:00Z");
        let rate = Decimal::from(50);

        let actual = expected + Duration::milliseconds(500);
        let (days, fine) = Loan::fine_for(expected, actual, rate);
        assert_eq!(days, 1);
        assert_eq!(fine, Decimal::from(50));

        // Whole days plus a sub-second remainder round up too
        let actual = expected + Duration::days(2) + Duration::milliseconds(1);
        let (days, _) = Loan::fine_for(expected, actual, rate);
        assert_eq!(days, 3);
    }

    #[test]
    fn fine_is_pure_and_idempotent() {
        let expected = dt("2025-01-10T00:00:00Z");
        let actual = dt("2025-01-13T06:00:00Z");
        let rate = Decimal::from(50);

        let first = Loan::fine_for(expected, actual, rate);
        let second = Loan::fine_for(expected, actual, rate);
        assert_eq!(first, second);
        assert_eq!(first.0, 4);
    }

    #[test]
    fn parse_accepts_rfc3339_and_plain_dates() {
        let parsed = parse_expected_return_date("2025-06-01T10:30:00Z").unwrap();
        assert_eq!(parsed, dt("2025-06-01T10:30:00Z"));

        let parsed = parse_expected_return_date("2025-06-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());

        assert!(matches!(
            parse_expected_return_date("not-a-date"),
            Err(AppError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_expected_return_date("2025-13-45"),
            Err(AppError::InvalidDate(_))
        ));
    }

    fn sample_loan(status: LoanStatus, expected: DateTime<Utc>) -> Loan {
        Loan {
            id: 1,
            loan_key: "P250307-0042".to_string(),
            user_id: 1,
            user_name: "Ada Lovelace".to_string(),
            material_id: 1,
            material_title: "Sketch of the Analytical Engine".to_string(),
            material_author: "L. F. Menabrea".to_string(),
            material_edition: None,
            material_type: MaterialType::Book,
            loan_date: dt("2025-03-07T09:00:00Z"),
            expected_return_date: expected,
            actual_return_date: None,
            status,
            late_days: 0,
            fine: Decimal::ZERO,
            notes: None,
            return_condition: None,
            created_at: dt("2025-03-07T09:00:00Z"),
            updated_at: dt("2025-03-07T09:00:00Z"),
            is_late: false,
        }
    }

    #[test]
    fn lateness_is_derived_from_due_date_and_status() {
        let now = dt("2025-03-20T00:00:00Z");
        let past = dt("2025-03-10T00:00:00Z");
        let future = dt("2025-04-01T00:00:00Z");

        assert!(sample_loan(LoanStatus::Active, past).is_late_at(now));
        assert!(sample_loan(LoanStatus::Late, past).is_late_at(now));
        assert!(!sample_loan(LoanStatus::Active, future).is_late_at(now));
        // Returned and lost loans are never late, whatever the due date
        assert!(!sample_loan(LoanStatus::Returned, past).is_late_at(now));
        assert!(!sample_loan(LoanStatus::Lost, past).is_late_at(now));
    }
}
