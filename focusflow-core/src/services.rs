//! Wiring of the store, cache, analytics, tracker and planner.

use crate::analytics::{AnalyticsEngine, CachedMetric};
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::Database;
use crate::planner::{create_llm_client, LlmClient, PlanGenerator};
use crate::tracker::{HistoryLog, Tracker};
use std::sync::Arc;

/// All components sharing one database, clock and analytics cache.
pub struct Services {
    pub db: Arc<Database>,
    pub analytics: Arc<AnalyticsEngine>,
    pub tracker: Tracker,
    pub planner: PlanGenerator,
}

impl Services {
    /// Wire components around `db`. The database must already be migrated.
    pub fn new(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        config: &Config,
        client: Option<Box<dyn LlmClient>>,
    ) -> Self {
        let cache = Arc::new(TtlCache::<CachedMetric>::new(clock.clone()));
        let analytics = Arc::new(AnalyticsEngine::new(
            db.clone(),
            cache,
            clock.clone(),
            config.analytics.clone(),
        ));
        let history: Arc<dyn HistoryLog> = db.clone();
        let tracker = Tracker::new(db.clone(), history, analytics.clone(), clock.clone());
        let planner = PlanGenerator::new(
            db.clone(),
            analytics.clone(),
            clock,
            client,
            config.planner.clone(),
        );

        Self {
            db,
            analytics,
            tracker,
            planner,
        }
    }

    /// Wire components using the model client described by `config.llm`.
    ///
    /// A model that cannot be set up is logged and skipped; generation then
    /// always uses the fallback plan.
    pub fn from_config(db: Arc<Database>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let client = match &config.llm {
            Some(llm) => match create_llm_client(llm) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "Model client unavailable; plans will use the fallback");
                    None
                }
            },
            None => None,
        };
        Self::new(db, clock, config, client)
    }
}
