//! Statistics endpoints

use axum::{extract::State, Json};
use chrono::Utc;

use super::AppQuery;
use crate::{
    error::AppResult,
    models::stats::{DashboardQuery, DashboardStats, RoleUsage, UsageBucketing, UsageQuery},
    AppState,
};

/// Dashboard statistics over a time range
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    tag = "stats",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Activity, popularity, status distribution and totals", body = DashboardStats),
        (status = 400, description = "Unknown range", body = crate::error::ErrorResponse)
    )
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<DashboardQuery>,
) -> AppResult<Json<DashboardStats>> {
    let stats = state
        .services
        .stats
        .dashboard(query.range.unwrap_or_default(), Utc::now())
        .await?;
    Ok(Json(stats))
}

/// Loan counts per borrower role
#[utoipa::path(
    get,
    path = "/stats/usage",
    tag = "stats",
    params(UsageQuery),
    responses(
        (status = 200, description = "One series per role", body = RoleUsage)
    )
)]
pub async fn usage_by_role(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UsageQuery>,
) -> AppResult<Json<RoleUsage>> {
    let usage = state
        .services
        .stats
        .usage(query.by.unwrap_or(UsageBucketing::Weekday), query.year)
        .await?;
    Ok(Json(usage))
}
