//! Empathy metrics engine
//!
//! Orchestrates the scorer, predictive and wisdom modules over one user's
//! journal and returns an immutable [`QuantifiedEmpathyMetrics`] snapshot.
//! Per-user derived state lives in a [`BoundedCacheStore`]; per-session
//! memoisation lives in the session handle's own arena.

pub mod insights;
pub mod recommendations;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AppConfig, EmpathyIntelligenceConfig};
use crate::error::{AppError, Result};
use crate::models::diagnostics::{CacheStats, MemoryReport};
use crate::models::entry::{MoodEntry, PainEntry, sorted_by_time};
use crate::models::insight::{EmpathyInsight, EmpathyRecommendation};
use crate::models::metrics::{QuantifiedEmpathyMetrics, WisdomInsight};
use crate::models::pattern::{CulturalContext, UserPatternSummary};
use crate::models::prediction::ModelPredictions;
use crate::models::session::{SessionContext, WeakSessionContext};
use crate::observability::EngineMetrics;
use crate::services::cache_store::{BoundedCacheStore, EvictionReport};
use crate::services::memory_monitor::MemoryTrendMonitor;
use crate::services::predictive::{blend_confidence, build_predictive_model};
use crate::services::scoring::{
    KeywordTextScorer, ScoringContext, TextScorer, clamp_score, compassionate_progress, emotional_intelligence,
    empathy_intelligence_profile, empathy_kpis, humanized_metrics, micro_moments, temporal_patterns,
};
use crate::services::session_cache::{SessionCacheStats, SessionScopedCache};
use crate::services::wisdom::{extract_wisdom, rank_wisdom};

pub use insights::{MAX_INSIGHTS, generate_insights};
pub use recommendations::{MAX_RECOMMENDATIONS, generate_recommendations};

/// Empathy metrics service trait
///
/// Every method is total: degenerate input yields baseline scores or empty
/// lists, never an error.
#[async_trait]
pub trait EmpathyMetricsService: Send + Sync {
    /// Compute the full metrics snapshot for one user
    async fn calculate_advanced_empathy_metrics(
        &self,
        user_id: &str,
        pain: &[PainEntry],
        mood: &[MoodEntry],
    ) -> Arc<QuantifiedEmpathyMetrics>;

    /// Ranked insights, at most [`MAX_INSIGHTS`]
    async fn generate_advanced_insights(
        &self,
        user_id: &str,
        metrics: &QuantifiedEmpathyMetrics,
        history: &[MoodEntry],
    ) -> Vec<EmpathyInsight>;

    /// Ranked recommendations, at most [`MAX_RECOMMENDATIONS`]
    async fn generate_personalized_recommendations(
        &self,
        user_id: &str,
        metrics: &QuantifiedEmpathyMetrics,
        insights: &[EmpathyInsight],
    ) -> Vec<EmpathyRecommendation>;
}

/// Build a snapshot from scratch without touching any cache
///
/// `culture` falls back to a context derived from the mood entries.
pub fn assemble_metrics(
    user_id: &str,
    pain: &[PainEntry],
    mood: &[MoodEntry],
    scorer: &dyn TextScorer,
    config: &EmpathyIntelligenceConfig,
    culture: Option<&CulturalContext>,
    wisdom_gained: Vec<WisdomInsight>,
) -> QuantifiedEmpathyMetrics {
    let ctx = ScoringContext::new(pain, mood, scorer);

    let emotional = emotional_intelligence(&ctx);
    let compassion = compassionate_progress(&ctx);
    let kpis = empathy_kpis(&ctx);

    let derived;
    let culture = match culture {
        Some(culture) => culture,
        None => {
            derived = CulturalContext::derive(config.cultural_sensitivity, mood);
            &derived
        }
    };
    let empathy_intelligence = empathy_intelligence_profile(&ctx, &emotional, &compassion, &kpis, culture);
    let humanized = humanized_metrics(&ctx, &emotional, &compassion, wisdom_gained);

    QuantifiedEmpathyMetrics {
        user_id: user_id.to_string(),
        computed_at: Utc::now(),
        entries_analyzed: ctx.entry_count(),
        temporal_patterns: temporal_patterns(&ctx),
        micro_moments: micro_moments(&ctx),
        predictive_metrics: build_predictive_model(pain, mood, config.prediction_horizon),
        emotional_intelligence: emotional,
        compassionate_progress: compassion,
        empathy_kpis: kpis,
        humanized_metrics: humanized,
        empathy_intelligence,
    }
}

/// Empathy engine
pub struct EmpathyEngine {
    config: EmpathyIntelligenceConfig,
    store: Arc<BoundedCacheStore>,
    sessions: Arc<SessionScopedCache>,
    monitor: Arc<MemoryTrendMonitor>,
    scorer: Arc<dyn TextScorer>,
    metrics: EngineMetrics,
    current_session: Mutex<WeakSessionContext>,
}

impl EmpathyEngine {
    /// 使用默认关键词评分器创建引擎
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_scorer(config, Arc::new(KeywordTextScorer::new()))
    }

    /// 使用自定义文本评分器创建引擎
    pub fn with_scorer(config: &AppConfig, scorer: Arc<dyn TextScorer>) -> Result<Self> {
        let store = Arc::new(BoundedCacheStore::new(config.cache.clone())?);
        let monitor = Arc::new(MemoryTrendMonitor::with_host_probe(config.monitor.clone())?);
        Self::with_components(config.intelligence.clone(), store, monitor, scorer)
    }

    /// 用已构造好的组件组装引擎
    pub fn with_components(
        config: EmpathyIntelligenceConfig,
        store: Arc<BoundedCacheStore>,
        monitor: Arc<MemoryTrendMonitor>,
        scorer: Arc<dyn TextScorer>,
    ) -> Result<Self> {
        let sessions = Arc::new(SessionScopedCache::new());

        // 监控只持有弱引用，不延长缓存的生命周期
        let weak_store = Arc::downgrade(&store);
        monitor.track_collection("cache_entries", move || {
            weak_store
                .upgrade()
                .map(|store| store.total_entries())
                .ok_or_else(|| AppError::CollectionUnavailable("cache store dropped".to_string()))
        });
        let weak_sessions = Arc::downgrade(&sessions);
        monitor.track_collection("live_sessions", move || {
            weak_sessions
                .upgrade()
                .map(|sessions| sessions.live_sessions())
                .ok_or_else(|| AppError::CollectionUnavailable("session cache dropped".to_string()))
        });
        monitor.track_object("cache_store", &store);

        info!(
            "Empathy engine created (privacy: {}, horizon: {}, style: {})",
            config.privacy_level, config.prediction_horizon, config.intervention_style
        );

        Ok(Self {
            config,
            store,
            sessions,
            monitor,
            scorer,
            metrics: EngineMetrics::new()?,
            current_session: Mutex::new(WeakSessionContext::default()),
        })
    }

    pub fn config(&self) -> &EmpathyIntelligenceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<BoundedCacheStore> {
        &self.store
    }

    pub fn monitor(&self) -> &Arc<MemoryTrendMonitor> {
        &self.monitor
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    fn compute(&self, user_id: &str, pain: &[PainEntry], mood: &[MoodEntry]) -> QuantifiedEmpathyMetrics {
        let caching = self.config.allows_user_caching();

        // 文化语境与模式摘要每次都按当前条目重新推导，缓存只保存最新结果
        let culture = if caching {
            self.store.set_user_patterns(user_id, UserPatternSummary::from_entries(user_id, pain, mood));
            let culture = CulturalContext::derive(self.config.cultural_sensitivity, mood);
            self.store.set_cultural_context(user_id, culture.clone());
            Some(culture)
        } else {
            None
        };

        let fresh = extract_wisdom(pain, mood);
        let wisdom = if caching {
            self.store.append_wisdom(user_id, &fresh);
            rank_wisdom(self.store.wisdom_entries(user_id))
        } else {
            fresh
        };

        let mut snapshot = assemble_metrics(
            user_id,
            pain,
            mood,
            self.scorer.as_ref(),
            &self.config,
            culture.as_ref(),
            wisdom,
        );

        if caching {
            let mood_series: Vec<f64> = sorted_by_time(mood, |e| e.timestamp)
                .iter()
                .map(|e| clamp_score(e.mood * 10.0))
                .collect();
            let pain_series: Vec<f64> = sorted_by_time(pain, |e| e.timestamp)
                .iter()
                .map(|e| clamp_score(e.pain_level * 10.0))
                .collect();

            let mut model = self.store.get_or_create_prediction_model(user_id);
            let predictive = &snapshot.predictive_metrics;
            model.observe(
                &mood_series,
                &pain_series,
                ModelPredictions {
                    expected_mood: Some(predictive.empathy_forecast.next_week),
                    burnout_risk: Some(predictive.burnout_risk.current_risk_level),
                },
                self.config.learning_rate.factor(),
            );
            blend_confidence(&mut snapshot.predictive_metrics, model.accuracy);
            self.store.set_prediction_model(user_id, model);
        }

        snapshot
    }

    // ===== Session-aware variants =====

    /// Metrics memoised in the session's own arena
    ///
    /// Each user has one slot holding the latest snapshot and the content
    /// fingerprint of the journal it was computed from. Any edit to the
    /// entries changes the fingerprint and replaces the slot.
    pub async fn session_metrics(
        &self,
        session: &SessionContext,
        pain: &[PainEntry],
        mood: &[MoodEntry],
    ) -> Arc<QuantifiedEmpathyMetrics> {
        let slot = format!("metrics:{}", session.user_id());
        let fingerprint = journal_fingerprint(pain, mood);
        if let Some((cached_for, cached)) = self.sessions.get::<MemoSlot<QuantifiedEmpathyMetrics>>(session, &slot)
            && cached_for == fingerprint
        {
            debug!("Session {} served metrics from cache", session.session_id());
            self.metrics.record_session_hit();
            return cached;
        }

        let snapshot = self
            .calculate_advanced_empathy_metrics(session.user_id(), pain, mood)
            .await;
        self.sessions.set(session, &slot, (fingerprint, Arc::clone(&snapshot)));
        snapshot
    }

    /// Insights memoised per snapshot in the session's arena, one slot per user
    pub async fn session_insights(
        &self,
        session: &SessionContext,
        metrics: &QuantifiedEmpathyMetrics,
        history: &[MoodEntry],
    ) -> Arc<Vec<EmpathyInsight>> {
        let slot = format!("insights:{}", metrics.user_id);
        let mut hasher = DefaultHasher::new();
        metrics.computed_at.hash(&mut hasher);
        metrics.entries_analyzed.hash(&mut hasher);
        hash_mood_entries(history, &mut hasher);
        let fingerprint = hasher.finish();

        if let Some((cached_for, cached)) = self.sessions.get::<MemoSlot<Vec<EmpathyInsight>>>(session, &slot)
            && cached_for == fingerprint
        {
            self.metrics.record_session_hit();
            return cached;
        }

        let insights = Arc::new(
            self.generate_advanced_insights(session.user_id(), metrics, history)
                .await,
        );
        self.sessions.set(session, &slot, (fingerprint, Arc::clone(&insights)));
        insights
    }

    /// Remember the caller's current session without keeping it alive
    pub fn attach_session(&self, session: &SessionContext) {
        *self.current_session.lock() = session.downgrade();
        debug!("Attached session {}", session.session_id());
    }

    /// The attached session, if it is still alive
    pub fn current_session(&self) -> Option<SessionContext> {
        self.current_session.lock().upgrade()
    }

    pub fn session_cache(&self) -> &SessionScopedCache {
        &self.sessions
    }

    pub fn session_stats(&self) -> SessionCacheStats {
        self.sessions.stats()
    }

    // ===== Diagnostics and lifecycle =====

    pub fn cache_stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Take a snapshot and report the memory trend
    pub fn memory_report(&self) -> MemoryReport {
        let snapshot = self.monitor.take_snapshot();
        self.metrics.record_memory(snapshot.estimated_memory_mb);
        self.monitor.generate_report()
    }

    /// Run one eviction pass now
    pub fn evict_caches(&self) -> EvictionReport {
        let report = self.store.evict();
        self.metrics
            .record_eviction(report.total(), self.store.total_entries());
        report
    }

    pub fn start_cache_eviction(&self) -> bool {
        self.store.start_eviction()
    }

    pub fn stop_cache_eviction(&self) {
        self.store.stop_eviction();
    }

    pub fn start_memory_monitoring(&self) -> bool {
        self.monitor.start_auto_snapshot()
    }

    pub fn stop_memory_monitoring(&self) {
        self.monitor.stop_auto_snapshot();
    }

    /// Stop all timers, clear all caches and forget the attached session
    ///
    /// The engine stays usable afterwards; calling it again is a no-op.
    pub fn destroy(&self) {
        self.stop_cache_eviction();
        self.stop_memory_monitoring();
        self.store.clear();
        self.monitor.clear();
        *self.current_session.lock() = WeakSessionContext::default();
        self.metrics.cached_entries.set(0);
        info!("Empathy engine destroyed");
    }
}

/// 会话缓存槽：输入指纹与对应结果
type MemoSlot<T> = (u64, Arc<T>);

/// Content hash over every field the computation reads
///
/// Entry ids are left out; two journals with identical content score alike.
fn journal_fingerprint(pain: &[PainEntry], mood: &[MoodEntry]) -> u64 {
    let mut hasher = DefaultHasher::new();
    pain.len().hash(&mut hasher);
    for entry in pain {
        entry.timestamp.hash(&mut hasher);
        entry.pain_level.to_bits().hash(&mut hasher);
        entry.functional_impact.to_bits().hash(&mut hasher);
        entry.locations.hash(&mut hasher);
        entry.symptoms.hash(&mut hasher);
        entry.notes.hash(&mut hasher);
    }
    hash_mood_entries(mood, &mut hasher);
    hasher.finish()
}

fn hash_mood_entries(mood: &[MoodEntry], hasher: &mut DefaultHasher) {
    mood.len().hash(hasher);
    for entry in mood {
        entry.timestamp.hash(hasher);
        for value in [
            entry.mood,
            entry.energy,
            entry.anxiety,
            entry.stress,
            entry.hopefulness,
            entry.emotional_clarity,
            entry.emotional_regulation,
        ] {
            value.to_bits().hash(hasher);
        }
        entry.social_support.hash(hasher);
        entry.coping_strategies.hash(hasher);
        entry.context.hash(hasher);
        entry.notes.hash(hasher);
    }
}

#[async_trait]
impl EmpathyMetricsService for EmpathyEngine {
    async fn calculate_advanced_empathy_metrics(
        &self,
        user_id: &str,
        pain: &[PainEntry],
        mood: &[MoodEntry],
    ) -> Arc<QuantifiedEmpathyMetrics> {
        let snapshot = self.compute(user_id, pain, mood);
        self.metrics.record_computation(self.store.total_entries());
        debug!(
            "Computed metrics for {} over {} entries (empathy IQ {:.0})",
            user_id, snapshot.entries_analyzed, snapshot.empathy_intelligence.empathy_iq
        );
        Arc::new(snapshot)
    }

    async fn generate_advanced_insights(
        &self,
        user_id: &str,
        metrics: &QuantifiedEmpathyMetrics,
        history: &[MoodEntry],
    ) -> Vec<EmpathyInsight> {
        let insights = generate_insights(metrics, history);
        self.metrics.record_insights(insights.len());
        debug!("Generated {} insights for {}", insights.len(), user_id);
        insights
    }

    async fn generate_personalized_recommendations(
        &self,
        user_id: &str,
        metrics: &QuantifiedEmpathyMetrics,
        insights: &[EmpathyInsight],
    ) -> Vec<EmpathyRecommendation> {
        let recommendations = generate_recommendations(metrics, insights, &self.config);
        self.metrics.record_recommendations(recommendations.len());
        debug!("Generated {} recommendations for {}", recommendations.len(), user_id);
        recommendations
    }
}

impl Drop for EmpathyEngine {
    fn drop(&mut self) {
        self.store.stop_eviction();
        self.monitor.stop_auto_snapshot();
    }
}

impl std::fmt::Debug for EmpathyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmpathyEngine")
            .field("config", &self.config)
            .field("cached_entries", &self.store.total_entries())
            .field("monitor", &self.monitor)
            .finish()
    }
}

/// 创建共情指标引擎
pub fn create_empathy_engine(config: &AppConfig) -> Result<Arc<EmpathyEngine>> {
    Ok(Arc::new(EmpathyEngine::new(config)?))
}
