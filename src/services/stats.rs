//! Statistics service
//!
//! Every call aggregates a fresh snapshot of the history; nothing is cached.

use chrono::{DateTime, Utc};

use super::aggregation;
use crate::{
    error::AppResult,
    models::stats::{DashboardStats, RoleUsage, StatsRange, UsageBucketing},
    repository::Store,
};

#[derive(Clone)]
pub struct StatsService {
    store: Store,
    popular_limit: usize,
}

impl StatsService {
    pub fn new(store: Store, popular_limit: usize) -> Self {
        Self { store, popular_limit }
    }

    /// Dashboard statistics for `range` as of `now`
    pub async fn dashboard(&self, range: StatsRange, now: DateTime<Utc>) -> AppResult<DashboardStats> {
        let snapshot = self.store.snapshot().await?;
        let buckets = aggregation::buckets(range, now)?;
        let activity = aggregation::activity_series(&snapshot.loans, &buckets);

        Ok(DashboardStats {
            range,
            generated_at: now,
            total_borrowed: activity.iter().map(|b| b.borrowed).sum(),
            total_returned: activity.iter().map(|b| b.returned).sum(),
            activity,
            popular: aggregation::popularity(&snapshot.titles, &snapshot.loans, self.popular_limit),
            status_distribution: aggregation::status_distribution(&snapshot.titles, &snapshot.loans, now),
            totals: aggregation::totals(&snapshot, now),
        })
    }

    /// Loans per borrower role, by weekday or month
    pub async fn usage(&self, by: UsageBucketing, year: Option<i32>) -> AppResult<RoleUsage> {
        let snapshot = self.store.snapshot().await?;
        Ok(aggregation::role_usage(&snapshot.loans, &snapshot.borrowers, by, year))
    }
}
