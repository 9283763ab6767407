//! Analytics for focusflow
//!
//! Provides derived, read-only statistics over a user's data:
//! - Overview counts and completion rate
//! - Completion trend (dense daily series)
//! - Activity heatmap (sparse date map)
//! - Consecutive-day completion streaks
//! - Composite health score
//! - Weekday productivity
//! - Dashboard aggregate
//!
//! Pure computations live in [`streak`], [`trend`] and [`health`]; the
//! cached, store-backed queries live in [`engine`].

pub mod dashboard;
pub mod engine;
pub mod health;
pub mod streak;
pub mod trend;

pub use dashboard::{DashboardData, OverviewStats};
pub use engine::{AnalyticsEngine, CachedMetric};
pub use health::{HealthBreakdown, HealthScore};
pub use streak::Streak;
pub use trend::{TrendPoint, WeekdayActivity};
