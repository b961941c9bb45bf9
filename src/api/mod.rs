//! API handlers for the circulation REST endpoints

pub mod catalog;
pub mod fines;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod stats;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// JSON body extractor whose rejections are reported as `AppError`
pub struct AppJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

/// JSON body that may be omitted.
///
/// An absent or blank body yields `T::default()`. Anything else must parse,
/// so a malformed field is a `BadRequest` rather than a fallback to defaults.
pub struct OptionalJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(T::default()));
        }

        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(OptionalJson(value))
    }
}

/// Path parameter extractor whose rejections are reported as `AppError`
pub struct AppPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(AppPath(value))
    }
}

/// Query string extractor whose rejections are reported as `AppError`
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(AppQuery(value))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Catalog
        .route("/titles", get(catalog::list_titles).post(catalog::create_title))
        .route("/titles/:id", get(catalog::get_title))
        .route("/titles/:id/copies", put(catalog::update_copies))
        .route("/borrowers", get(catalog::list_borrowers).post(catalog::create_borrower))
        .route("/borrowers/:id", get(catalog::get_borrower))
        // Loans
        .route("/borrow", post(loans::request_borrow))
        .route("/loans", get(loans::list_loans))
        .route("/loan/:id", get(loans::get_loan))
        .route("/loan/:id/approve", patch(loans::approve_loan))
        .route("/loan/:id/reject", patch(loans::reject_loan))
        .route("/loan/:id/request-return", patch(loans::request_return))
        .route("/loan/:id/return", patch(loans::approve_return))
        .route("/loan/:id/reject-return", patch(loans::reject_return))
        // Fines
        .route("/fine", post(fines::create_fine))
        .route("/fines", get(fines::list_fines))
        .route("/fine/:id", get(fines::get_fine).patch(fines::update_fine))
        .route("/fine/:id/pay", patch(fines::pay_fine))
        // Statistics
        .route("/dashboard/stats", get(stats::dashboard_stats))
        .route("/stats/usage", get(stats::usage_by_role))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
