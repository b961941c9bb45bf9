//! Circulation server
//!
//! Loan lifecycle and copy inventory engine for a library, exposed as a
//! REST JSON API: borrow requests, approvals and returns, overdue fines and
//! circulation statistics.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
