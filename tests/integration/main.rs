//! Integration tests
//!
//! Engine scenarios and HTTP tests run against the in-memory store. The
//! PostgreSQL tests are ignored by default and need `DATABASE_URL`:
//! `cargo test -- --ignored`.

mod api_tests;
mod common;
mod engine_tests;
mod postgres_tests;
