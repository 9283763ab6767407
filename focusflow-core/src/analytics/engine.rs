//! Cached analytics queries over a user's projects, tasks and history.
//!
//! Every query follows the same read path:
//!
//! ```text
//! key = (user, metric, params)
//!   cache hit  -> cached value
//!   cache miss -> compute from Database -> store with TTL -> value
//! ```
//!
//! [`AnalyticsEngine::invalidate_user_cache`] is the hook every write path
//! calls after a successful mutation.

use super::dashboard::{DashboardData, OverviewStats};
use super::health::{self, HealthBreakdown, HealthScore, CONSISTENCY_WINDOW_DAYS};
use super::streak::{calculate_streak, Streak};
use super::trend::{self, TrendPoint, WeekdayActivity};
use crate::cache::{Cache, CacheKey, TtlCache};
use crate::clock::{local_midnight, Clock};
use crate::config::{
    AnalyticsConfig, HEATMAP_MONTHS_RANGE, MAX_CACHE_TTL_SECS, TREND_DAYS_RANGE, UPCOMING_DAYS_RANGE,
};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{ProjectStatus, TaskWithProject};
use chrono::{Duration, Months, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maximum number of upcoming deadlines returned.
pub const UPCOMING_LIMIT: usize = 10;

/// Trailing window for weekday productivity, in days.
pub const PRODUCTIVITY_WINDOW_DAYS: i64 = 30;

/// Any value the engine stores in its cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedMetric {
    Overview(OverviewStats),
    Trend(Vec<TrendPoint>),
    Heatmap(BTreeMap<String, i64>),
    Health(HealthScore),
    Tasks(Vec<TaskWithProject>),
    Count(i64),
    Productivity(Vec<WeekdayActivity>),
    Dashboard(Box<DashboardData>),
}

/// Conversion between a metric result and its cache representation.
trait Metric: Clone + Sized {
    fn into_cached(self) -> CachedMetric;
    fn from_cached(cached: CachedMetric) -> Option<Self>;
}

macro_rules! impl_metric {
    ($ty:ty, $variant:ident) => {
        impl Metric for $ty {
            fn into_cached(self) -> CachedMetric {
                CachedMetric::$variant(self)
            }

            fn from_cached(cached: CachedMetric) -> Option<Self> {
                match cached {
                    CachedMetric::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

impl_metric!(OverviewStats, Overview);
impl_metric!(Vec<TrendPoint>, Trend);
impl_metric!(BTreeMap<String, i64>, Heatmap);
impl_metric!(HealthScore, Health);
impl_metric!(Vec<TaskWithProject>, Tasks);
impl_metric!(i64, Count);
impl_metric!(Vec<WeekdayActivity>, Productivity);

impl Metric for DashboardData {
    fn into_cached(self) -> CachedMetric {
        CachedMetric::Dashboard(Box::new(self))
    }

    fn from_cached(cached: CachedMetric) -> Option<Self> {
        match cached {
            CachedMetric::Dashboard(value) => Some(*value),
            _ => None,
        }
    }
}

/// Read-only analytics over the data store, cached per user.
pub struct AnalyticsEngine {
    db: Arc<Database>,
    cache: Arc<dyn Cache<CachedMetric>>,
    clock: Arc<dyn Clock>,
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(
        db: Arc<Database>,
        cache: Arc<dyn Cache<CachedMetric>>,
        clock: Arc<dyn Clock>,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            db,
            cache,
            clock,
            config,
        }
    }

    /// Engine with a fresh in-memory cache and default settings.
    pub fn with_defaults(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(TtlCache::<CachedMetric>::new(clock.clone()));
        Self::new(db, cache, clock, AnalyticsConfig::default())
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.cache_ttl_secs.min(MAX_CACHE_TTL_SECS) as i64)
    }

    fn cached<T: Metric>(&self, key: CacheKey, compute: impl FnOnce() -> Result<T>) -> Result<T> {
        if let Some(hit) = self.cache.get(&key).and_then(T::from_cached) {
            tracing::trace!(key = %key, "Analytics cache hit");
            return Ok(hit);
        }

        tracing::debug!(key = %key, "Computing analytics metric");
        let value = compute()?;
        self.cache.set(key, value.clone().into_cached(), self.ttl());
        Ok(value)
    }

    /// Drop every cached metric for `user_id`.
    pub fn invalidate_user_cache(&self, user_id: &str) {
        self.cache.invalidate_user(user_id);
    }

    // ============================================
    // Queries
    // ============================================

    /// Project and task counts, completion rate and streaks.
    pub fn get_overview_stats(&self, user_id: &str) -> Result<OverviewStats> {
        self.cached(CacheKey::new(user_id, "overview"), || {
            let total = self.db.count_projects(user_id, None)?;
            let active = self.db.count_projects(user_id, Some(ProjectStatus::Active))?;
            let completed = self
                .db
                .count_projects(user_id, Some(ProjectStatus::Completed))?;
            let by_status = self.db.count_tasks_by_status(user_id)?;
            let streak = self.compute_streak(user_id)?;

            Ok(OverviewStats::from_counts(
                total, active, completed, &by_status, streak,
            ))
        })
    }

    /// Current and best completion streak.
    pub fn get_streak(&self, user_id: &str) -> Result<Streak> {
        Ok(self.get_overview_stats(user_id)?.streak())
    }

    fn compute_streak(&self, user_id: &str) -> Result<Streak> {
        let completions = self.db.all_completion_times(user_id)?;
        let dates = trend::distinct_dates(&completions);
        Ok(calculate_streak(&dates, self.clock.today()))
    }

    /// Completions per day over the last `days` days, one entry per day.
    pub fn get_completion_trend(&self, user_id: &str, days: u32) -> Result<Vec<TrendPoint>> {
        if !TREND_DAYS_RANGE.contains(&days) {
            return Err(Error::Validation(format!(
                "trend window must be 1..=365 days (got {})",
                days
            )));
        }

        self.cached(CacheKey::with_params(user_id, "trend", days), || {
            let today = self.clock.today();
            let start = today - Duration::days(i64::from(days) - 1);
            let completions = self
                .db
                .completion_times_since(user_id, local_midnight(start))?;
            Ok(trend::completion_trend(&completions, today, days))
        })
    }

    /// History events per date over the trailing `months` months. Dates
    /// without activity are absent.
    pub fn get_activity_heatmap(
        &self,
        user_id: &str,
        months: u32,
    ) -> Result<BTreeMap<String, i64>> {
        if !HEATMAP_MONTHS_RANGE.contains(&months) {
            return Err(Error::Validation(format!(
                "heatmap window must be 1..=24 months (got {})",
                months
            )));
        }

        self.cached(CacheKey::with_params(user_id, "heatmap", months), || {
            let start = self
                .clock
                .today()
                .checked_sub_months(Months::new(months))
                .unwrap_or(NaiveDate::MIN);
            let events = self
                .db
                .history_events_since(user_id, local_midnight(start))?;
            let stamps: Vec<_> = events.iter().map(|e| e.created_at).collect();
            Ok(trend::activity_heatmap(&stamps))
        })
    }

    /// Weighted 0..=100 health score with its breakdown.
    pub fn get_health_score(&self, user_id: &str) -> Result<HealthScore> {
        self.cached(CacheKey::new(user_id, "health"), || {
            let overview = self.get_overview_stats(user_id)?;
            let trend = self.get_completion_trend(user_id, CONSISTENCY_WINDOW_DAYS)?;
            let with_due_date = self.db.count_tasks_with_due_date(user_id)?;
            let overdue = self.db.count_overdue_tasks(user_id, self.clock.now())?;

            Ok(HealthScore::from_breakdown(HealthBreakdown {
                consistency: health::consistency_score(&trend),
                completion: overview.completion_rate,
                on_time: health::on_time_score(with_due_date, overdue),
                active_projects: health::active_project_score(&overview),
            }))
        })
    }

    /// Most recently completed tasks, newest first.
    pub fn get_recent_completed(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TaskWithProject>> {
        self.cached(CacheKey::with_params(user_id, "recent", limit), || {
            self.db.recent_completed_tasks(user_id, limit)
        })
    }

    /// Non-completed tasks past their due date.
    pub fn get_overdue_count(&self, user_id: &str) -> Result<i64> {
        self.cached(CacheKey::new(user_id, "overdue"), || {
            self.db.count_overdue_tasks(user_id, self.clock.now())
        })
    }

    /// Non-completed tasks due within the next `days` days, soonest first.
    pub fn get_upcoming_deadlines(
        &self,
        user_id: &str,
        days: u32,
    ) -> Result<Vec<TaskWithProject>> {
        if !UPCOMING_DAYS_RANGE.contains(&days) {
            return Err(Error::Validation(format!(
                "upcoming deadline horizon must be 1..=365 days (got {})",
                days
            )));
        }

        self.cached(CacheKey::with_params(user_id, "upcoming", days), || {
            let now = self.clock.now();
            self.db.upcoming_deadlines(
                user_id,
                now,
                now + Duration::days(i64::from(days)),
                UPCOMING_LIMIT,
            )
        })
    }

    /// Completions and task creations per weekday over the last 30 days.
    pub fn get_productivity_by_day(&self, user_id: &str) -> Result<Vec<WeekdayActivity>> {
        self.cached(CacheKey::new(user_id, "productivity"), || {
            let since = self.clock.now() - Duration::days(PRODUCTIVITY_WINDOW_DAYS);
            let completions = self.db.completion_times_since(user_id, since)?;
            let creations = self.db.task_creation_times(user_id, since)?;
            Ok(trend::productivity_by_day(&completions, &creations))
        })
    }

    /// Overview, trend, health, recent completions, overdue count and
    /// upcoming deadlines in one object.
    pub fn get_dashboard(&self, user_id: &str) -> Result<DashboardData> {
        self.cached(CacheKey::new(user_id, "dashboard"), || {
            Ok(DashboardData {
                overview: self.get_overview_stats(user_id)?,
                trend: self.get_completion_trend(user_id, self.config.trend_days)?,
                health: self.get_health_score(user_id)?,
                recent_completed: self.get_recent_completed(user_id, self.config.recent_limit)?,
                overdue_count: self.get_overdue_count(user_id)?,
                upcoming_deadlines: self
                    .get_upcoming_deadlines(user_id, self.config.upcoming_days)?,
            })
        })
    }
}
