//! Database layer for focusflow
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - Transactional plan import

pub mod repo;
pub mod schema;

pub use repo::Database;
