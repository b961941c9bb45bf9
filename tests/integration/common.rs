//! Shared fixtures

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use circulation_server::{
    config::AppConfig,
    models::{borrower::CreateBorrower, title::CreateTitle, Borrower, BorrowerRole, Title},
    repository::{MemoryStore, Store},
    services::{notifications::BroadcastEmitter, Services},
    AppState,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 5, 9, 0, 0).unwrap()
}

pub fn memory_store() -> Store {
    Arc::new(MemoryStore::new())
}

/// Services over `store` with default configuration
pub fn services(store: Store) -> (Services, BroadcastEmitter) {
    let config = AppConfig::default();
    let emitter = BroadcastEmitter::new(config.notifications.channel_capacity);
    let services = Services::new(store, &config, Arc::new(emitter.clone()));
    (services, emitter)
}

pub fn app_state() -> AppState {
    let (services, _) = services(memory_store());
    AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(services),
    }
}

pub async fn title(services: &Services, name: &str, copies: i32) -> Title {
    services
        .catalog
        .create_title(
            CreateTitle {
                name: name.to_string(),
                author: None,
                isbn: None,
                total_copies: copies,
            },
            t0(),
        )
        .await
        .unwrap()
}

pub async fn borrower(services: &Services, name: &str, role: BorrowerRole) -> Borrower {
    services
        .catalog
        .create_borrower(
            CreateBorrower {
                display_name: name.to_string(),
                email: None,
                role,
            },
            t0(),
        )
        .await
        .unwrap()
}
