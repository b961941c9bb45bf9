//! Titles and borrowers service

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrower::CreateBorrower,
        title::{CreateTitle, UpdateCopies},
        Borrower, Title,
    },
    repository::Store,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Store,
}

impl CatalogService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn create_title(&self, title: CreateTitle, now: DateTime<Utc>) -> AppResult<Title> {
        title.validate()?;
        let title = self.store.create_title(&title, now).await?;
        tracing::info!(title_id = title.id, copies = title.total_copies, "Title created");
        Ok(title)
    }

    pub async fn get_title(&self, id: i64) -> AppResult<Title> {
        self.store.get_title(id).await
    }

    pub async fn list_titles(&self) -> AppResult<Vec<Title>> {
        self.store.list_titles().await
    }

    /// Change the number of owned copies of a title
    pub async fn update_copies(&self, id: i64, update: UpdateCopies, now: DateTime<Utc>) -> AppResult<Title> {
        update.validate()?;
        let title = self.store.resize_title(id, update.total_copies, now).await?;
        tracing::info!(
            title_id = id,
            total = title.total_copies,
            available = title.available_copies,
            "Title copies updated"
        );
        Ok(title)
    }

    pub async fn create_borrower(&self, borrower: CreateBorrower, now: DateTime<Utc>) -> AppResult<Borrower> {
        borrower.validate()?;
        let borrower = self.store.create_borrower(&borrower, now).await?;
        tracing::info!(borrower_id = borrower.id, role = %borrower.role, "Borrower created");
        Ok(borrower)
    }

    pub async fn get_borrower(&self, id: i64) -> AppResult<Borrower> {
        self.store.get_borrower(id).await
    }

    pub async fn list_borrowers(&self) -> AppResult<Vec<Borrower>> {
        self.store.list_borrowers().await
    }
}
