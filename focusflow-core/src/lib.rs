//! # focusflow-core
//!
//! Core library for focusflow - goal and task tracking with analytics and
//! AI-assisted planning.
//!
//! This library provides:
//! - Domain types for projects, tasks, history events and plans
//! - Database storage layer with SQLite
//! - Cached analytics (overview, trend, heatmap, streak, health, dashboard)
//! - The task/project write path with best-effort history logging
//! - Plan generation with a deterministic fallback
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! - **Writes:** [`Tracker`] mutates projects/tasks, appends history events
//!   and invalidates the user's analytics cache.
//! - **Reads:** [`AnalyticsEngine`] computes metrics from the store and the
//!   history log, caching each result for a short TTL.
//! - **Planning:** [`PlanGenerator`] turns a goal into a stored plan that
//!   can be imported into a project once.
//!
//! ## Example
//!
//! ```rust,no_run
//! use focusflow_core::{Config, Database, Services, SystemClock};
//! use std::sync::Arc;
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&config.database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let services = Services::from_config(Arc::new(db), Arc::new(SystemClock), &config);
//! let overview = services.analytics.get_overview_stats("user-1");
//! ```

// Re-export commonly used items at the crate root
pub use analytics::AnalyticsEngine;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use planner::PlanGenerator;
pub use services::Services;
pub use tracker::Tracker;
pub use types::*;

// Public modules
pub mod analytics;
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod planner;
pub mod services;
pub mod tracker;
pub mod types;
