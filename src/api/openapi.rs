//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{catalog, fines, health, loans, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "0.3.0",
        description = "Loan lifecycle, copy inventory, fines and circulation statistics",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Catalog
        catalog::create_title,
        catalog::list_titles,
        catalog::get_title,
        catalog::update_copies,
        catalog::create_borrower,
        catalog::list_borrowers,
        catalog::get_borrower,
        // Loans
        loans::request_borrow,
        loans::approve_loan,
        loans::reject_loan,
        loans::request_return,
        loans::approve_return,
        loans::reject_return,
        loans::list_loans,
        loans::get_loan,
        // Fines
        fines::create_fine,
        fines::update_fine,
        fines::pay_fine,
        fines::get_fine,
        fines::list_fines,
        // Stats
        stats::dashboard_stats,
        stats::usage_by_role,
    ),
    components(
        schemas(
            // Catalog
            crate::models::Title,
            crate::models::title::CreateTitle,
            crate::models::title::UpdateCopies,
            crate::models::Borrower,
            crate::models::BorrowerRole,
            crate::models::borrower::CreateBorrower,
            // Loans
            crate::models::LoanStatus,
            crate::models::Loan,
            crate::models::loan::BorrowRequest,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanOutcome,
            crate::models::loan::ApproveLoan,
            crate::models::loan::RequestReturn,
            crate::models::loan::ApproveReturn,
            // Fines
            crate::models::FineStatus,
            crate::models::Fine,
            crate::models::fine::CreateFine,
            crate::models::fine::UpdateFine,
            crate::models::fine::PayFine,
            crate::models::fine::NewFine,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::NotificationKind,
            // Stats
            crate::models::stats::StatsRange,
            crate::models::stats::UsageBucketing,
            crate::models::stats::BucketCount,
            crate::models::stats::PopularTitle,
            crate::models::stats::StatusShare,
            crate::models::stats::StatusDistribution,
            crate::models::stats::DashboardTotals,
            crate::models::stats::DashboardStats,
            crate::models::stats::RoleUsage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Titles, copy counts and borrowers"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "fines", description = "Overdue and manual fines"),
        (name = "stats", description = "Circulation statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
