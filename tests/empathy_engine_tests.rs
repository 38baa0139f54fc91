// End-to-end tests for the empathy engine
//
// Tests cover:
// - Baseline metrics for empty journals
// - Score bounds for arbitrary journals
// - Insight and recommendation ranking
// - Session isolation and per-user cache eviction
// - Memory trend leak detection
// - Engine lifecycle

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use solace::config::{AppConfig, CacheConfig, EmpathyIntelligenceConfig, MonitorConfig};
use solace::models::{
    LeakSeverity, MemorySnapshot, MoodEntry, PainEntry, SessionContext, SocialSupport,
    UserPatternSummary,
};
use solace::services::{
    BoundedCacheStore, EmpathyEngine, EmpathyMetricsService, KeywordTextScorer, MAX_INSIGHTS,
    MAX_RECOMMENDATIONS, MAX_WISDOM_INSIGHTS, MemoryTrendMonitor, NoopProbe, SessionScopedCache,
    assemble_metrics, calculate_trend, create_empathy_engine, extract_wisdom,
};
use std::sync::Arc;

const NOTES: &[&str] = &[
    "",
    "Rough morning, I hate that I can't keep up.",
    "I learned that pacing helps when the pain flares.",
    "Called my sister, she listened and understood.",
    "Grateful for a quiet evening. Managed to cook.",
    "Feeling anxious and frustrated, but also hopeful.",
    "Was kind to myself today, took a rest.",
    "It turns out a short walk always lifts my mood.",
];

fn three_week_journal() -> (Vec<PainEntry>, Vec<MoodEntry>) {
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
    let mut pain = Vec::new();
    let mut mood = Vec::new();
    for day in 0..21 {
        let ts = start + Duration::days(day);
        let level = if day % 7 == 0 { 3.0 } else { 7.0 };
        let support = if day % 2 == 0 { SocialSupport::Strong } else { SocialSupport::None };
        let mut entry = MoodEntry::new(ts, level)
            .with_notes(NOTES[day as usize % NOTES.len()])
            .with_support(support);
        if day % 3 == 0 {
            entry = entry.with_coping(&["walking"]);
        }
        mood.push(entry);
        pain.push(PainEntry::new(ts, 10.0 - level).with_notes(NOTES[(day as usize + 3) % NOTES.len()]));
    }
    (pain, mood)
}

// ============ Metrics ============

#[tokio::test]
async fn test_empty_journal_gives_baseline() {
    let engine = create_empathy_engine(&AppConfig::default()).unwrap();

    let metrics = engine.calculate_advanced_empathy_metrics("user_1", &[], &[]).await;

    assert_eq!(metrics.emotional_intelligence.self_awareness, 50.0);
    assert_eq!(metrics.entries_analyzed, 0);
    assert!(metrics.humanized_metrics.wisdom_gained.is_empty());
    for (name, value, max) in metrics.bounded_scores() {
        assert!((0.0..=max).contains(&value), "{} = {} out of bounds", name, value);
    }
}

#[tokio::test]
async fn test_realistic_journal_stays_in_bounds() {
    let engine = create_empathy_engine(&AppConfig::default()).unwrap();
    let (pain, mood) = three_week_journal();

    let metrics = engine.calculate_advanced_empathy_metrics("user_1", &pain, &mood).await;

    assert_eq!(metrics.entries_analyzed, 42);
    assert_eq!(metrics.temporal_patterns.weekly_pattern.len(), 7);
    for (name, value, max) in metrics.bounded_scores() {
        assert!((0.0..=max).contains(&value), "{} = {} out of bounds", name, value);
    }
}

fn arb_mood() -> impl Strategy<Value = MoodEntry> {
    (0i64..60 * 24, 0.0f64..=10.0, 0.0f64..=10.0, 0usize..NOTES.len(), 0u8..4).prop_map(
        |(minutes, mood, stress, note, support)| {
            let support = match support {
                0 => SocialSupport::None,
                1 => SocialSupport::Limited,
                2 => SocialSupport::Moderate,
                _ => SocialSupport::Strong,
            };
            MoodEntry::new(Utc::now() - Duration::minutes(minutes * 30), mood)
                .with_stress(stress, 10.0 - stress)
                .with_notes(NOTES[note])
                .with_support(support)
        },
    )
}

fn arb_pain() -> impl Strategy<Value = PainEntry> {
    (0i64..60 * 24, 0.0f64..=10.0, 0usize..NOTES.len()).prop_map(|(minutes, level, note)| {
        PainEntry::new(Utc::now() - Duration::minutes(minutes * 30), level).with_notes(NOTES[note])
    })
}

proptest! {
    #[test]
    fn prop_all_scores_bounded(
        pain in prop::collection::vec(arb_pain(), 0..30),
        mood in prop::collection::vec(arb_mood(), 0..30),
    ) {
        let metrics = assemble_metrics(
            "user_1",
            &pain,
            &mood,
            &KeywordTextScorer::new(),
            &EmpathyIntelligenceConfig::default(),
            None,
            extract_wisdom(&pain, &mood),
        );
        for (name, value, max) in metrics.bounded_scores() {
            prop_assert!((0.0..=max).contains(&value), "{} = {} out of bounds", name, value);
        }
    }

    #[test]
    fn prop_wisdom_capped(count in 0usize..80) {
        let now = Utc::now();
        let mood: Vec<MoodEntry> = (0..count)
            .map(|i| MoodEntry::new(now - Duration::hours(i as i64), 5.0)
                .with_notes(&format!("I learned lesson number {}.", i)))
            .collect();
        prop_assert!(extract_wisdom(&[], &mood).len() <= MAX_WISDOM_INSIGHTS);
    }
}

#[test]
fn test_trend_direction() {
    assert!(calculate_trend(&[1.0, 2.0, 3.0, 4.0]) > 0.0);
    assert!(calculate_trend(&[4.0, 3.0, 2.0, 1.0]) < 0.0);
    assert_eq!(calculate_trend(&[2.0, 2.0, 2.0]), 0.0);
}

// ============ Insights and recommendations ============

#[tokio::test]
async fn test_insights_are_ranked_and_capped() {
    let engine = create_empathy_engine(&AppConfig::default()).unwrap();
    let (pain, mood) = three_week_journal();
    let metrics = engine.calculate_advanced_empathy_metrics("user_1", &pain, &mood).await;

    let insights = engine.generate_advanced_insights("user_1", &metrics, &mood).await;

    assert!(!insights.is_empty());
    assert!(insights.len() <= MAX_INSIGHTS);
    assert!(insights.windows(2).all(|p| p[0].confidence >= p[1].confidence));
}

#[tokio::test]
async fn test_recommendations_are_ranked_and_capped() {
    let engine = create_empathy_engine(&AppConfig::default()).unwrap();
    let (pain, mood) = three_week_journal();
    let metrics = engine.calculate_advanced_empathy_metrics("user_1", &pain, &mood).await;
    let insights = engine.generate_advanced_insights("user_1", &metrics, &mood).await;

    let recommendations = engine
        .generate_personalized_recommendations("user_1", &metrics, &insights)
        .await;

    assert!(recommendations.len() <= MAX_RECOMMENDATIONS);
    assert!(recommendations.windows(2).all(|p| p[0].priority >= p[1].priority));
    assert!(recommendations.iter().all(|r| !r.action_steps.is_empty()));
}

// ============ Caches ============

#[test]
fn test_sessions_never_share_values() {
    let cache = SessionScopedCache::new();
    let s1 = SessionContext::new("same-id", "user_1");
    let s2 = SessionContext::new("same-id", "user_1");

    cache.set(&s1, "k", 1u32);
    cache.set(&s2, "k", 2u32);

    assert_eq!(cache.get::<u32>(&s1, "k"), Some(1));
    assert_eq!(cache.get::<u32>(&s2, "k"), Some(2));

    cache.delete(&s2, "k");
    assert_eq!(cache.get::<u32>(&s1, "k"), Some(1));
    assert!(!cache.has(&s2, "k"));
}

#[test]
fn test_eviction_keeps_most_recent_two() {
    let store = BoundedCacheStore::new(CacheConfig {
        max_entries: 2,
        ..Default::default()
    })
    .unwrap();

    for i in 0..5 {
        let user = format!("user_{}", i);
        store.set_user_patterns(&user, UserPatternSummary::from_entries(&user, &[], &[]));
    }
    store.evict();

    assert_eq!(store.stats().user_patterns, 2);
    assert!(store.get_user_patterns("user_3").is_some());
    assert!(store.get_user_patterns("user_4").is_some());
    assert!(store.get_user_patterns("user_0").is_none());
}

#[test]
fn test_invalid_cache_config_is_rejected() {
    let config = CacheConfig {
        max_entries: 0,
        ..Default::default()
    };
    assert!(BoundedCacheStore::new(config).is_err());
}

// ============ Memory monitor ============

#[test]
fn test_steep_growth_is_high_severity() {
    let monitor = MemoryTrendMonitor::new(MonitorConfig::default(), Arc::new(NoopProbe)).unwrap();
    let start = Utc::now();
    for (i, mb) in [100.0, 105.0, 110.0].into_iter().enumerate() {
        monitor.record_snapshot(MemorySnapshot::new(start + Duration::minutes(i as i64), mb));
    }

    let trend = monitor.analyze_trend();

    assert!(trend.potential_leak);
    assert_eq!(trend.leak_severity, LeakSeverity::High);
}

#[test]
fn test_single_snapshot_reports_no_leak() {
    let monitor = MemoryTrendMonitor::new(MonitorConfig::default(), Arc::new(NoopProbe)).unwrap();
    monitor.take_snapshot();

    let trend = monitor.analyze_trend();

    assert!(!trend.potential_leak);
    assert_eq!(trend.leak_severity, LeakSeverity::None);
}

// ============ Lifecycle ============

#[tokio::test]
async fn test_destroy_stops_timers_and_clears_state() {
    let engine = EmpathyEngine::new(&AppConfig::default()).unwrap();
    let session = SessionContext::start("user_1");
    let (pain, mood) = three_week_journal();

    engine.attach_session(&session);
    engine.session_metrics(&session, &pain, &mood).await;
    engine.memory_report();
    assert!(engine.start_cache_eviction());
    assert!(engine.start_memory_monitoring());

    engine.destroy();

    assert!(!engine.store().eviction_running());
    assert!(!engine.monitor().auto_snapshot_running());
    assert_eq!(engine.store().total_entries(), 0);
    assert_eq!(engine.monitor().snapshot_count(), 0);
    assert!(engine.current_session().is_none());

    // 重复停止和销毁都是无操作
    engine.stop_cache_eviction();
    engine.stop_memory_monitoring();
    engine.destroy();
}

#[test]
fn test_timers_need_a_runtime() {
    let engine = EmpathyEngine::new(&AppConfig::default()).unwrap();
    assert!(!engine.start_cache_eviction());
    assert!(!engine.start_memory_monitoring());
    engine.stop_cache_eviction();
}

#[tokio::test]
async fn test_metrics_endpoint_text() {
    let engine = create_empathy_engine(&AppConfig::default()).unwrap();
    engine.calculate_advanced_empathy_metrics("user_1", &[], &[]).await;
    engine.evict_caches();

    let text = engine.metrics().gather().unwrap();
    assert!(text.contains("solace_metrics_computations_total 1"));
}
