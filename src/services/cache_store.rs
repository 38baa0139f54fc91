//! Per-user bounded cache store.
//!
//! One map per concern (user patterns, cultural contexts, wisdom entries,
//! prediction models), all sharing one [`CacheConfig`]. Eviction runs on a
//! recurring tokio task that only holds a weak reference to the store, so the
//! timer never keeps the store (or the process) alive on its own.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, ConfigLoader};
use crate::error::Result;
use crate::models::diagnostics::{CacheStats, UNAVAILABLE};
use crate::models::metrics::WisdomInsight;
use crate::models::pattern::{CulturalContext, UserPatternSummary};
use crate::models::prediction::PredictionModel;
use crate::services::cache::{BoundedCache, CacheCounters, CountBoundedLists, EvictionOutcome};

/// Per-user cap on accumulated wisdom insights
pub const MAX_WISDOM_PER_USER: usize = 100;

/// How long a stats call waits for a map before reporting it as unavailable
const STATS_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// The concern a cached value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheField {
    UserPatterns,
    CulturalContext,
    WisdomEntries,
    PredictionModel,
}

/// Outcome of one eviction pass over every map
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvictionReport {
    pub user_patterns: EvictionOutcome,
    pub cultural_contexts: EvictionOutcome,
    pub prediction_models: EvictionOutcome,
    /// Keys dropped from the count-bounded wisdom map.
    pub wisdom_entries: usize,
}

impl EvictionReport {
    pub fn total(&self) -> usize {
        self.user_patterns.total()
            + self.cultural_contexts.total()
            + self.prediction_models.total()
            + self.wisdom_entries
    }
}

/// Bounded per-user cache store
pub struct BoundedCacheStore {
    config: CacheConfig,
    user_patterns: Mutex<BoundedCache<String, UserPatternSummary>>,
    cultural_contexts: Mutex<BoundedCache<String, CulturalContext>>,
    wisdom_entries: Mutex<CountBoundedLists<String, WisdomInsight>>,
    prediction_models: Mutex<BoundedCache<String, PredictionModel>>,
    eviction_task: Mutex<Option<JoinHandle<()>>>,
}

impl BoundedCacheStore {
    /// Create a store, rejecting invalid configuration
    pub fn new(config: CacheConfig) -> Result<Self> {
        ConfigLoader::validate_cache(&config)?;

        let ttl = config.ttl();
        Ok(Self {
            user_patterns: Mutex::new(BoundedCache::new(config.max_entries, ttl)),
            cultural_contexts: Mutex::new(BoundedCache::new(config.max_entries, ttl)),
            wisdom_entries: Mutex::new(CountBoundedLists::new(
                config.max_entries,
                MAX_WISDOM_PER_USER,
            )),
            prediction_models: Mutex::new(BoundedCache::new(config.max_entries, ttl)),
            eviction_task: Mutex::new(None),
            config,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ===== User patterns =====

    pub fn get_user_patterns(&self, user_id: &str) -> Option<UserPatternSummary> {
        self.user_patterns.lock().get(&user_id.to_string())
    }

    pub fn set_user_patterns(&self, user_id: &str, patterns: UserPatternSummary) {
        self.user_patterns.lock().set(user_id.to_string(), patterns);
    }

    // ===== Cultural context =====

    pub fn get_cultural_context(&self, user_id: &str) -> Option<CulturalContext> {
        self.cultural_contexts.lock().get(&user_id.to_string())
    }

    pub fn set_cultural_context(&self, user_id: &str, context: CulturalContext) {
        self.cultural_contexts.lock().set(user_id.to_string(), context);
    }

    // ===== Wisdom entries =====

    /// Accumulated wisdom for a user, oldest first
    pub fn wisdom_entries(&self, user_id: &str) -> Vec<WisdomInsight> {
        self.wisdom_entries
            .lock()
            .get(&user_id.to_string())
            .map(|items| items.to_vec())
            .unwrap_or_default()
    }

    /// Append newly extracted insights, skipping ones already recorded for the user
    pub fn append_wisdom(&self, user_id: &str, insights: &[WisdomInsight]) {
        let key = user_id.to_string();
        let mut lists = self.wisdom_entries.lock();
        let known: Vec<String> = lists
            .get(&key)
            .map(|items| items.iter().map(|w| w.insight.clone()).collect())
            .unwrap_or_default();
        let fresh: Vec<WisdomInsight> = insights
            .iter()
            .filter(|w| !known.contains(&w.insight))
            .cloned()
            .collect();
        if !fresh.is_empty() || lists.get(&key).is_none() {
            lists.extend(key, fresh);
        }
    }

    // ===== Prediction models =====

    pub fn get_prediction_model(&self, user_id: &str) -> Option<PredictionModel> {
        self.prediction_models.lock().get(&user_id.to_string())
    }

    pub fn set_prediction_model(&self, user_id: &str, model: PredictionModel) {
        self.prediction_models.lock().set(user_id.to_string(), model);
    }

    /// Fetch the user's model, creating and caching a fresh one on a miss
    pub fn get_or_create_prediction_model(&self, user_id: &str) -> PredictionModel {
        let mut models = self.prediction_models.lock();
        let key = user_id.to_string();
        if let Some(model) = models.get(&key) {
            return model;
        }
        debug!("Creating prediction model for user: {}", user_id);
        let model = PredictionModel::new(user_id);
        models.set(key, model.clone());
        model
    }

    // ===== Maintenance =====

    /// Whether a value is cached for the user, without refreshing it
    pub fn contains(&self, user_id: &str, field: CacheField) -> bool {
        let key = user_id.to_string();
        match field {
            CacheField::UserPatterns => self.user_patterns.lock().contains_key(&key),
            CacheField::CulturalContext => self.cultural_contexts.lock().contains_key(&key),
            CacheField::WisdomEntries => self.wisdom_entries.lock().get(&key).is_some(),
            CacheField::PredictionModel => self.prediction_models.lock().contains_key(&key),
        }
    }

    /// Remove one field for a user
    pub fn remove(&self, user_id: &str, field: CacheField) -> bool {
        let key = user_id.to_string();
        match field {
            CacheField::UserPatterns => self.user_patterns.lock().remove(&key).is_some(),
            CacheField::CulturalContext => self.cultural_contexts.lock().remove(&key).is_some(),
            CacheField::WisdomEntries => self.wisdom_entries.lock().remove(&key).is_some(),
            CacheField::PredictionModel => self.prediction_models.lock().remove(&key).is_some(),
        }
    }

    /// Remove everything cached for a user
    pub fn remove_user(&self, user_id: &str) {
        for field in [
            CacheField::UserPatterns,
            CacheField::CulturalContext,
            CacheField::WisdomEntries,
            CacheField::PredictionModel,
        ] {
            self.remove(user_id, field);
        }
    }

    pub fn clear(&self) {
        self.user_patterns.lock().clear();
        self.cultural_contexts.lock().clear();
        self.wisdom_entries.lock().clear();
        self.prediction_models.lock().clear();
    }

    /// Run one eviction pass over every map
    pub fn evict(&self) -> EvictionReport {
        self.evict_at(Instant::now())
    }

    pub fn evict_at(&self, now: Instant) -> EvictionReport {
        let report = EvictionReport {
            user_patterns: self.user_patterns.lock().evict_at(now),
            cultural_contexts: self.cultural_contexts.lock().evict_at(now),
            prediction_models: self.prediction_models.lock().evict_at(now),
            wisdom_entries: self.wisdom_entries.lock().evict(),
        };
        if report.total() > 0 {
            debug!(
                "Cache eviction removed {} entries (patterns {:?}, cultural {:?}, models {:?}, wisdom {})",
                report.total(),
                report.user_patterns,
                report.cultural_contexts,
                report.prediction_models,
                report.wisdom_entries
            );
        }
        report
    }

    /// Cache statistics
    ///
    /// A map that cannot be read within a short timeout is reported as `-1`
    /// instead of failing the whole call.
    pub fn stats(&self) -> CacheStats {
        let mut counters = CacheCounters::default();
        let mut wisdom_evictions = 0;

        let user_patterns = self
            .user_patterns
            .try_lock_for(STATS_LOCK_TIMEOUT)
            .map(|cache| {
                counters += cache.counters();
                cache.len() as i64
            })
            .unwrap_or(UNAVAILABLE);
        let cultural_contexts = self
            .cultural_contexts
            .try_lock_for(STATS_LOCK_TIMEOUT)
            .map(|cache| {
                counters += cache.counters();
                cache.len() as i64
            })
            .unwrap_or(UNAVAILABLE);
        let prediction_models = self
            .prediction_models
            .try_lock_for(STATS_LOCK_TIMEOUT)
            .map(|cache| {
                counters += cache.counters();
                cache.len() as i64
            })
            .unwrap_or(UNAVAILABLE);
        let wisdom_entries = self
            .wisdom_entries
            .try_lock_for(STATS_LOCK_TIMEOUT)
            .map(|lists| {
                wisdom_evictions = lists.evictions();
                lists.len() as i64
            })
            .unwrap_or(UNAVAILABLE);

        if [user_patterns, cultural_contexts, prediction_models, wisdom_entries].contains(&UNAVAILABLE) {
            warn!("Cache stats incomplete: at least one map was busy");
        }

        CacheStats {
            user_patterns,
            cultural_contexts,
            wisdom_entries,
            prediction_models,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions + wisdom_evictions,
        }
    }

    /// Total number of cached values, used by the memory monitor
    pub fn total_entries(&self) -> usize {
        self.user_patterns.lock().len()
            + self.cultural_contexts.lock().len()
            + self.prediction_models.lock().len()
            + self.wisdom_entries.lock().item_count()
    }

    // ===== Eviction timer =====

    /// Start the recurring eviction task
    ///
    /// Returns `false` when no tokio runtime is available; the store keeps
    /// working and can still be evicted manually. Starting twice is a no-op.
    pub fn start_eviction(self: &Arc<Self>) -> bool {
        let mut slot = self.eviction_task.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return true;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!("No tokio runtime available, cache eviction timer not started");
                return false;
            }
        };

        let store = Arc::downgrade(self);
        let period = self.config.eviction_interval();
        *slot = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即完成
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.evict();
            }
        }));

        info!(
            "Cache eviction timer started (every {} ms)",
            self.config.eviction_interval_ms
        );
        true
    }

    /// Stop the eviction task. Calling it when already stopped is a no-op.
    pub fn stop_eviction(&self) {
        if let Some(task) = self.eviction_task.lock().take() {
            task.abort();
            info!("Cache eviction timer stopped");
        }
    }

    pub fn eviction_running(&self) -> bool {
        self.eviction_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for BoundedCacheStore {
    fn drop(&mut self) {
        if let Some(task) = self.eviction_task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metrics::WisdomCategory;
    use chrono::Utc;

    fn store(max_entries: usize, ttl_ms: u64, eviction_interval_ms: u64) -> BoundedCacheStore {
        BoundedCacheStore::new(CacheConfig {
            max_entries,
            ttl_ms,
            eviction_interval_ms,
        })
        .unwrap()
    }

    fn wisdom(text: &str) -> WisdomInsight {
        WisdomInsight {
            id: text.to_string(),
            category: WisdomCategory::Practical,
            insight: text.to_string(),
            applicability: 50.0,
            transformative_level: 50.0,
            reinforcement: 0.0,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = BoundedCacheStore::new(CacheConfig {
            max_entries: 0,
            ttl_ms: 1000,
            eviction_interval_ms: 1000,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_set_is_visible_to_next_get() {
        let store = store(10, 60_000, 60_000);
        store.set_user_patterns("u1", UserPatternSummary::from_entries("u1", &[], &[]));
        let cached = store.get_user_patterns("u1").unwrap();
        assert_eq!(cached.user_id, "u1");
    }

    #[test]
    fn test_eviction_bounds_every_map() {
        let store = store(2, 60_000, 60_000);
        for i in 0..5 {
            let user = format!("user_{}", i);
            store.set_user_patterns(&user, UserPatternSummary::from_entries(&user, &[], &[]));
            store.set_prediction_model(&user, PredictionModel::new(&user));
            store.append_wisdom(&user, &[wisdom(&format!("insight {}", i))]);
        }

        let report = store.evict();

        assert_eq!(report.user_patterns.overflow, 3);
        assert_eq!(report.wisdom_entries, 3);
        let stats = store.stats();
        assert_eq!(stats.user_patterns, 2);
        assert_eq!(stats.prediction_models, 2);
        assert_eq!(stats.wisdom_entries, 2);
        assert!(store.contains("user_4", CacheField::UserPatterns));
        assert!(store.contains("user_3", CacheField::PredictionModel));
        assert!(!store.contains("user_0", CacheField::WisdomEntries));
    }

    #[test]
    fn test_expiry_uses_last_access() {
        let store = store(10, 100, 60_000);
        store.set_user_patterns("u1", UserPatternSummary::from_entries("u1", &[], &[]));

        let report = store.evict_at(Instant::now() + Duration::from_millis(500));

        assert_eq!(report.user_patterns.expired, 1);
        assert!(store.get_user_patterns("u1").is_none());
    }

    #[test]
    fn test_get_or_create_prediction_model_is_stable() {
        let store = store(10, 60_000, 60_000);
        let first = store.get_or_create_prediction_model("u1");
        let second = store.get_or_create_prediction_model("u1");
        assert_eq!(first.model_id, second.model_id);
    }

    #[test]
    fn test_append_wisdom_skips_duplicates() {
        let store = store(10, 60_000, 60_000);
        store.append_wisdom("u1", &[wisdom("rest helps"), wisdom("walks help")]);
        store.append_wisdom("u1", &[wisdom("rest helps")]);
        assert_eq!(store.wisdom_entries("u1").len(), 2);
    }

    #[test]
    fn test_remove_user() {
        let store = store(10, 60_000, 60_000);
        store.get_or_create_prediction_model("u1");
        store.append_wisdom("u1", &[wisdom("x")]);
        store.remove_user("u1");
        assert!(!store.contains("u1", CacheField::PredictionModel));
        assert!(!store.contains("u1", CacheField::WisdomEntries));
    }

    #[test]
    fn test_stats_reports_busy_map_as_unavailable() {
        let store = store(10, 60_000, 60_000);
        store.get_or_create_prediction_model("u1");

        let _guard = store.prediction_models.lock();
        let stats = std::thread::scope(|scope| scope.spawn(|| store.stats()).join().unwrap());

        assert_eq!(stats.prediction_models, UNAVAILABLE);
        assert_eq!(stats.user_patterns, 0);
    }

    #[test]
    fn test_start_without_runtime_is_noop() {
        let store = Arc::new(store(10, 60_000, 60_000));
        assert!(!store.start_eviction());
        store.stop_eviction();
        store.stop_eviction();
    }

    #[tokio::test]
    async fn test_eviction_timer_runs_and_stops() {
        let store = Arc::new(store(1, 60_000, 20));
        store.set_user_patterns("a", UserPatternSummary::from_entries("a", &[], &[]));
        store.set_user_patterns("b", UserPatternSummary::from_entries("b", &[], &[]));

        assert!(store.start_eviction());
        assert!(store.start_eviction());
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(store.stats().user_patterns, 1);
        assert!(store.eviction_running());

        store.stop_eviction();
        store.stop_eviction();
        assert!(!store.eviction_running());
    }

    #[tokio::test]
    async fn test_timer_does_not_keep_store_alive() {
        let store = Arc::new(store(1, 60_000, 10));
        let weak = Arc::downgrade(&store);
        store.start_eviction();

        drop(store);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(weak.upgrade().is_none());
    }
}
