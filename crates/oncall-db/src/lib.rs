//! On-call Database: SurrealDB connection management and the durable
//! team store.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The [`TeamStore`](oncall_core::repository::TeamStore) implementation
//!   ([`repository::SurrealTeamStore`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
