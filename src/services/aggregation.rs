//! Read-only aggregations over the loan history
//!
//! Every function takes a snapshot and an instant and returns a fresh view;
//! none of them mutate state, so results can be recomputed at any time.
//! Calendar periods are UTC days and months, half-open `[start, end)`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use super::assessor;
use crate::{
    error::{AppError, AppResult},
    models::{
        stats::{
            BucketCount, DashboardTotals, HistorySnapshot, PopularTitle, RoleUsage, StatsRange, StatusDistribution,
            StatusShare, UsageBucketing,
        },
        Borrower, BorrowerRole, FineStatus, Loan, LoanStatus, Title,
    },
};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One calendar period of a time series
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Bucket {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

fn first_of_month(year: i32, month: u32) -> AppResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Internal(format!("Invalid calendar month {}-{}", year, month)))
}

fn first_of_next_month(day: NaiveDate) -> AppResult<NaiveDate> {
    if day.month() == 12 {
        first_of_month(day.year() + 1, 1)
    } else {
        first_of_month(day.year(), day.month() + 1)
    }
}

fn daily_buckets(last_day: NaiveDate, count: i64) -> Vec<Bucket> {
    (0..count)
        .rev()
        .map(|offset| {
            let day = last_day - Duration::days(offset);
            let start = start_of_day(day);
            Bucket {
                label: day.format("%Y-%m-%d").to_string(),
                start,
                end: start + Duration::days(1),
            }
        })
        .collect()
}

/// Partition the window of `range` ending at `now` into buckets
pub fn buckets(range: StatsRange, now: DateTime<Utc>) -> AppResult<Vec<Bucket>> {
    let today = now.date_naive();
    match range {
        StatsRange::FiveDays => Ok(daily_buckets(today, 5)),
        StatsRange::Week => Ok(daily_buckets(today, 7)),
        StatsRange::Month => {
            let first = first_of_month(today.year(), today.month())?;
            let days = (first_of_next_month(first)? - first).num_days();
            Ok(daily_buckets(first + Duration::days(days - 1), days))
        }
        StatsRange::Year => (1..=12)
            .map(|month| {
                let first = first_of_month(today.year(), month)?;
                Ok(Bucket {
                    label: first.format("%Y-%m").to_string(),
                    start: start_of_day(first),
                    end: start_of_day(first_of_next_month(first)?),
                })
            })
            .collect(),
    }
}

/// Loans borrowed and returned within each bucket; empty buckets report 0
pub fn activity_series(loans: &[Loan], buckets: &[Bucket]) -> Vec<BucketCount> {
    buckets
        .iter()
        .map(|bucket| BucketCount {
            label: bucket.label.clone(),
            start: bucket.start,
            end: bucket.end,
            borrowed: loans.iter().filter(|l| bucket.contains(l.borrow_date)).count() as i64,
            returned: loans
                .iter()
                .filter(|l| l.return_date.map_or(false, |d| bucket.contains(d)))
                .count() as i64,
        })
        .collect()
}

/// `round(part / whole * 100)`, or 0 when there is nothing to divide
pub fn rounded_percentage(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as i64
}

/// Titles ranked by historical borrow count, most borrowed first.
///
/// Rejected requests never became borrows and are not counted. Ties are
/// broken by title id. Each percentage is the title's share of the ranked
/// titles' total, rounded on its own.
pub fn popularity(titles: &[Title], loans: &[Loan], limit: usize) -> Vec<PopularTitle> {
    let mut counts: HashMap<i64, i64> = HashMap::new();
    for loan in loans.iter().filter(|l| l.status != LoanStatus::Rejected) {
        *counts.entry(loan.title_id).or_insert(0) += 1;
    }

    let mut ranked: Vec<(i64, i64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);

    let names: HashMap<i64, &str> = titles.iter().map(|t| (t.id, t.name.as_str())).collect();
    let total: i64 = ranked.iter().map(|(_, count)| count).sum();

    ranked
        .into_iter()
        .map(|(title_id, borrow_count)| PopularTitle {
            title_id,
            name: names
                .get(&title_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("Title {}", title_id)),
            borrow_count,
            percentage: rounded_percentage(borrow_count, total),
        })
        .collect()
}

/// Classify every title once: overdue, else fully borrowed, else available.
/// A title with no copies at all is counted apart as `without_copies`.
pub fn status_distribution(titles: &[Title], loans: &[Loan], now: DateTime<Utc>) -> StatusDistribution {
    let overdue_titles: HashSet<i64> = loans
        .iter()
        .filter(|l| assessor::is_overdue(l, now))
        .map(|l| l.title_id)
        .collect();

    let (mut borrowed, mut available, mut overdue, mut without_copies) = (0i64, 0i64, 0i64, 0i64);
    for title in titles {
        if overdue_titles.contains(&title.id) {
            overdue += 1;
        } else if title.total_copies == 0 {
            without_copies += 1;
        } else if title.available_copies == 0 {
            borrowed += 1;
        } else {
            available += 1;
        }
    }

    let total = titles.len() as i64;
    let share = |count: i64| StatusShare {
        count,
        percentage: rounded_percentage(count, total),
    };

    StatusDistribution {
        total_titles: total,
        borrowed: share(borrowed),
        available: share(available),
        overdue: share(overdue),
        without_copies: share(without_copies),
    }
}

/// Headline counters for the dashboard
pub fn totals(snapshot: &HistorySnapshot, now: DateTime<Utc>) -> DashboardTotals {
    let count_loans = |pred: fn(&Loan, DateTime<Utc>) -> bool| {
        snapshot.loans.iter().filter(|l| pred(l, now)).count() as i64
    };
    let unpaid: Vec<_> = snapshot
        .fines
        .iter()
        .filter(|f| f.status == FineStatus::Unpaid)
        .collect();

    DashboardTotals {
        titles: snapshot.titles.len() as i64,
        total_copies: snapshot.titles.iter().map(|t| i64::from(t.total_copies)).sum(),
        available_copies: snapshot.titles.iter().map(|t| i64::from(t.available_copies)).sum(),
        active_loans: count_loans(|l, _| matches!(l.status, LoanStatus::Approved | LoanStatus::ReturnRequested)),
        pending_requests: count_loans(|l, _| l.status == LoanStatus::Pending),
        overdue_loans: count_loans(assessor::is_overdue),
        unpaid_fines: unpaid.len() as i64,
        unpaid_fine_amount: unpaid.iter().map(|f| f.amount).sum::<Decimal>(),
    }
}

/// Loans per borrower role and calendar bucket, optionally within one year
pub fn role_usage(loans: &[Loan], borrowers: &[Borrower], by: UsageBucketing, year: Option<i32>) -> RoleUsage {
    let labels: &[&str] = match by {
        UsageBucketing::Weekday => &WEEKDAYS,
        UsageBucketing::Month => &MONTHS,
    };

    let mut series: IndexMap<BorrowerRole, Vec<i64>> = BorrowerRole::ALL
        .iter()
        .map(|role| (*role, vec![0; labels.len()]))
        .collect();
    let roles: HashMap<i64, BorrowerRole> = borrowers.iter().map(|b| (b.id, b.role)).collect();

    for loan in loans {
        if year.map_or(false, |y| loan.borrow_date.year() != y) {
            continue;
        }
        let Some(role) = roles.get(&loan.borrower_id) else {
            continue;
        };
        let index = match by {
            UsageBucketing::Weekday => loan.borrow_date.weekday().num_days_from_monday() as usize,
            UsageBucketing::Month => loan.borrow_date.month0() as usize,
        };
        if let Some(slot) = series.get_mut(role).and_then(|counts| counts.get_mut(index)) {
            *slot += 1;
        }
    }

    RoleUsage {
        by,
        year,
        buckets: labels.iter().map(|l| l.to_string()).collect(),
        series,
    }
}
