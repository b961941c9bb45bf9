//! Statistics types produced by the aggregation engine

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{Borrower, BorrowerRole, Fine, Loan, Title};

/// Consistent copy of the loan history taken in one read
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    pub titles: Vec<Title>,
    pub loans: Vec<Loan>,
    pub borrowers: Vec<Borrower>,
    pub fines: Vec<Fine>,
}

/// Dashboard time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum StatsRange {
    /// Last 5 calendar days, one bucket per day
    #[serde(rename = "5days")]
    FiveDays,
    /// Last 7 calendar days, one bucket per day
    #[serde(rename = "week")]
    Week,
    /// Every day of the current calendar month
    #[serde(rename = "month")]
    Month,
    /// The 12 calendar months of the current year
    #[serde(rename = "year")]
    Year,
}

impl Default for StatsRange {
    fn default() -> Self {
        StatsRange::FiveDays
    }
}

/// Calendar bucketing for role-segmented usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UsageBucketing {
    /// Monday through Sunday
    Weekday,
    /// January through December
    Month,
}

/// Query parameters for GET /dashboard/stats
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct DashboardQuery {
    pub range: Option<StatsRange>,
}

/// Query parameters for GET /stats/usage
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct UsageQuery {
    pub by: Option<UsageBucketing>,
    /// Restrict to loans borrowed in this year
    pub year: Option<i32>,
}

/// Borrow and return counts for one half-open period `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub borrowed: i64,
    pub returned: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopularTitle {
    pub title_id: i64,
    pub name: String,
    pub borrow_count: i64,
    /// Rounded share of the ranked titles' borrows; shares may not sum to 100
    pub percentage: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusShare {
    pub count: i64,
    pub percentage: i64,
}

/// Share of titles per availability state; percentages are rounded
/// independently and may not sum to 100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusDistribution {
    pub total_titles: i64,
    pub borrowed: StatusShare,
    pub available: StatusShare,
    pub overdue: StatusShare,
    /// Titles whose total copy count is zero
    pub without_copies: StatusShare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub titles: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub active_loans: i64,
    pub pending_requests: i64,
    pub overdue_loans: i64,
    pub unpaid_fines: i64,
    pub unpaid_fine_amount: Decimal,
}

/// Response of GET /dashboard/stats
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub range: StatsRange,
    pub generated_at: DateTime<Utc>,
    pub activity: Vec<BucketCount>,
    pub total_borrowed: i64,
    pub total_returned: i64,
    pub popular: Vec<PopularTitle>,
    pub status_distribution: StatusDistribution,
    pub totals: DashboardTotals,
}

/// Response of GET /stats/usage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleUsage {
    pub by: UsageBucketing,
    pub year: Option<i32>,
    /// Bucket labels, in order
    pub buckets: Vec<String>,
    /// One count per bucket for every role
    #[schema(value_type = Object)]
    pub series: IndexMap<BorrowerRole, Vec<i64>>,
}
