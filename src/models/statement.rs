use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of an uploaded statement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatementStatus {
    Pending,
    Parsing,
    Parsed,
    Reconciling,
    Completed,
}

/// Calendar month covered by a statement. Serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatementPeriod {
    pub year: i32,
    pub month: u32,
}

impl StatementPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && NaiveDate::from_ymd_opt(year, month, 1).is_some() {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructors guarantee a valid year/month.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|d| d - Duration::days(1))
            .unwrap_or_default()
    }

    /// Inclusive date range of the period widened by `days` on both ends.
    pub fn widened(&self, days: i64) -> (NaiveDate, NaiveDate) {
        (
            self.first_day() - Duration::days(days),
            self.last_day() + Duration::days(days),
        )
    }

    /// Short display form, e.g. "Dec 2025".
    pub fn label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid statement period '{0}', expected YYYY-MM")]
pub struct InvalidPeriod(pub String);

impl FromStr for StatementPeriod {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| InvalidPeriod(s.to_string()))?;
        let year: i32 = year.parse().map_err(|_| InvalidPeriod(s.to_string()))?;
        let month: u32 = month.parse().map_err(|_| InvalidPeriod(s.to_string()))?;
        Self::new(year, month).ok_or_else(|| InvalidPeriod(s.to_string()))
    }
}

impl TryFrom<String> for StatementPeriod {
    type Error = InvalidPeriod;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StatementPeriod> for String {
    fn from(period: StatementPeriod) -> Self {
        period.to_string()
    }
}

/// Per-category totals printed on the statement, kept for verification only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredSubtotals {
    pub deposits_cents: i64,
    pub payments_cents: i64,
    pub checks_cents: i64,
    pub fees_cents: i64,
}

/// An uploaded monthly bank statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementDocument {
    pub id: Uuid,
    pub period: StatementPeriod,
    pub status: StatementStatus,
    pub account_last_four: String,
    pub beginning_balance_cents: i64,
    pub ending_balance_cents: i64,
    pub declared: DeclaredSubtotals,
    pub file_key: String,
    pub original_filename: String,
    pub parse_job_id: Option<Uuid>,
    pub notes: String,
    pub parsed_at: Option<DateTime<Utc>>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary counts and totals over a statement's transaction records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementStats {
    pub total_transactions: i64,
    pub total_credits_cents: i64,
    pub total_debits_cents: i64,
    pub matched_count: i64,
    pub unmatched_count: i64,
    pub ignored_count: i64,
    pub created_count: i64,
    pub deposits_cents: i64,
    pub payments_cents: i64,
    pub checks_cents: i64,
    pub fees_cents: i64,
}
