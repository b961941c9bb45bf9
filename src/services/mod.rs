//! Business logic services

pub mod aggregation;
pub mod assessor;
pub mod catalog;
pub mod fines;
pub mod lifecycle;
pub mod loans;
pub mod notifications;
pub mod stats;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Store};

use self::{lifecycle::LoanRules, notifications::NotificationSink};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub fines: fines::FinesService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services over one store and notification sink
    pub fn new(store: Store, config: &AppConfig, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone()),
            loans: loans::LoansService::new(store.clone(), LoanRules::from(config), notifier.clone()),
            fines: fines::FinesService::new(store.clone(), assessor::FinePolicy::from(&config.fines), notifier),
            stats: stats::StatsService::new(store, config.stats.popular_limit),
        }
    }
}
