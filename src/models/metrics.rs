//! Quantified empathy metrics snapshot.
//!
//! Every leaf score is bounded to `[0, 100]`, except
//! [`EmpathyIntelligenceProfile::empathy_iq`] which is bounded to `[0, 200]`.
//! A snapshot is immutable once produced; the engine hands it out behind an `Arc`.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::models::prediction::PredictiveMetrics;

/// Upper bound for ordinary scores.
pub const SCORE_MAX: f64 = 100.0;

/// Upper bound for the IQ-style composite.
pub const IQ_MAX: f64 = 200.0;

/// Neutral value used when there is nothing to score.
pub const BASELINE_SCORE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalIntelligenceMetrics {
    pub self_awareness: f64,
    pub self_regulation: f64,
    pub motivation: f64,
    pub empathy: f64,
    pub social_skills: f64,
    pub emotional_vocabulary: f64,
    pub emotional_granularity: f64,
    pub meta_emotional_awareness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompassionateProgress {
    pub self_compassion: f64,
    pub self_criticism: f64,
    pub progress_acceptance: f64,
    pub setback_resilience: f64,
    pub growth_mindset: f64,
    pub patience_with_process: f64,
    pub celebration_of_small_wins: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpathyKpis {
    pub validation_received: f64,
    pub validation_given: f64,
    pub understanding_depth: f64,
    pub connection_quality: f64,
    pub empathy_consistency: f64,
    pub empathy_growth_rate: f64,
}

/// How a user tends to come back from hard stretches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ResilienceKind {
    /// Quick recovery after dips.
    #[display("bouncing")]
    Bouncing,
    /// Few dips, little movement.
    #[display("steady")]
    Steady,
    /// Slow but sustained upward movement.
    #[display("building")]
    Building,
    /// Not enough history yet.
    #[display("emerging")]
    Emerging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResiliencePattern {
    pub kind: ResilienceKind,
    pub strength: f64,
    pub recoveries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMoment {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum WisdomCategory {
    #[display("practical")]
    Practical,
    #[display("emotional")]
    Emotional,
    #[display("spiritual")]
    Spiritual,
    #[display("relational")]
    Relational,
    #[display("self_knowledge")]
    SelfKnowledge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WisdomInsight {
    pub id: String,
    pub category: WisdomCategory,
    pub insight: String,
    pub applicability: f64,
    pub transformative_level: f64,
    pub reinforcement: f64,
    pub recorded_at: DateTime<Utc>,
}

impl WisdomInsight {
    /// Combined value used for ranking.
    pub fn value(&self) -> f64 {
        self.applicability * 0.4 + self.transformative_level * 0.4 + self.reinforcement * 0.2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanizedMetrics {
    pub courage_score: f64,
    pub resilience_pattern: ResiliencePattern,
    pub growth_moments: Vec<GrowthMoment>,
    pub wisdom_gained: Vec<WisdomInsight>,
    pub strengths_discovered: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpathyIntelligenceProfile {
    /// IQ-style composite, 100 is average, bounded to `[0, 200]`.
    pub empathy_iq: f64,
    pub cognitive_empathy: f64,
    pub affective_empathy: f64,
    pub compassionate_empathy: f64,
    pub empathic_accuracy: f64,
    pub empathic_boundaries: f64,
    pub cultural_empathy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPatterns {
    /// Average mood score per weekday, Monday first.
    pub weekly_pattern: Vec<f64>,
    /// Hours of day (UTC) with the highest average mood.
    pub peak_hours: Vec<u32>,
    pub consistency: f64,
    pub recent_momentum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum MicroMomentKind {
    #[display("self_kindness")]
    SelfKindness,
    #[display("reaching_out")]
    ReachingOut,
    #[display("gratitude")]
    Gratitude,
    #[display("small_win")]
    SmallWin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroMoment {
    pub timestamp: DateTime<Utc>,
    pub kind: MicroMomentKind,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroMoments {
    pub moments: Vec<MicroMoment>,
    pub expressions_of_care: f64,
    pub kindness_frequency: f64,
}

/// The aggregate output of one metrics computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantifiedEmpathyMetrics {
    pub user_id: String,
    pub computed_at: DateTime<Utc>,
    pub entries_analyzed: usize,
    pub emotional_intelligence: EmotionalIntelligenceMetrics,
    pub compassionate_progress: CompassionateProgress,
    pub empathy_kpis: EmpathyKpis,
    pub humanized_metrics: HumanizedMetrics,
    pub empathy_intelligence: EmpathyIntelligenceProfile,
    pub temporal_patterns: TemporalPatterns,
    pub micro_moments: MicroMoments,
    pub predictive_metrics: PredictiveMetrics,
}

impl QuantifiedEmpathyMetrics {
    /// Every bounded leaf score with its name and upper bound.
    ///
    /// Used by diagnostics and tests to check the score invariants in one place.
    pub fn bounded_scores(&self) -> Vec<(&'static str, f64, f64)> {
        let ei = &self.emotional_intelligence;
        let cp = &self.compassionate_progress;
        let kpi = &self.empathy_kpis;
        let hm = &self.humanized_metrics;
        let eip = &self.empathy_intelligence;
        let tp = &self.temporal_patterns;
        let mm = &self.micro_moments;
        let pm = &self.predictive_metrics;

        let mut scores = vec![
            ("self_awareness", ei.self_awareness, SCORE_MAX),
            ("self_regulation", ei.self_regulation, SCORE_MAX),
            ("motivation", ei.motivation, SCORE_MAX),
            ("empathy", ei.empathy, SCORE_MAX),
            ("social_skills", ei.social_skills, SCORE_MAX),
            ("emotional_vocabulary", ei.emotional_vocabulary, SCORE_MAX),
            ("emotional_granularity", ei.emotional_granularity, SCORE_MAX),
            ("meta_emotional_awareness", ei.meta_emotional_awareness, SCORE_MAX),
            ("self_compassion", cp.self_compassion, SCORE_MAX),
            ("self_criticism", cp.self_criticism, SCORE_MAX),
            ("progress_acceptance", cp.progress_acceptance, SCORE_MAX),
            ("setback_resilience", cp.setback_resilience, SCORE_MAX),
            ("growth_mindset", cp.growth_mindset, SCORE_MAX),
            ("patience_with_process", cp.patience_with_process, SCORE_MAX),
            ("celebration_of_small_wins", cp.celebration_of_small_wins, SCORE_MAX),
            ("validation_received", kpi.validation_received, SCORE_MAX),
            ("validation_given", kpi.validation_given, SCORE_MAX),
            ("understanding_depth", kpi.understanding_depth, SCORE_MAX),
            ("connection_quality", kpi.connection_quality, SCORE_MAX),
            ("empathy_consistency", kpi.empathy_consistency, SCORE_MAX),
            ("empathy_growth_rate", kpi.empathy_growth_rate, SCORE_MAX),
            ("courage_score", hm.courage_score, SCORE_MAX),
            ("resilience_strength", hm.resilience_pattern.strength, SCORE_MAX),
            ("empathy_iq", eip.empathy_iq, IQ_MAX),
            ("cognitive_empathy", eip.cognitive_empathy, SCORE_MAX),
            ("affective_empathy", eip.affective_empathy, SCORE_MAX),
            ("compassionate_empathy", eip.compassionate_empathy, SCORE_MAX),
            ("empathic_accuracy", eip.empathic_accuracy, SCORE_MAX),
            ("empathic_boundaries", eip.empathic_boundaries, SCORE_MAX),
            ("cultural_empathy", eip.cultural_empathy, SCORE_MAX),
            ("temporal_consistency", tp.consistency, SCORE_MAX),
            ("recent_momentum", tp.recent_momentum, SCORE_MAX),
            ("expressions_of_care", mm.expressions_of_care, SCORE_MAX),
            ("kindness_frequency", mm.kindness_frequency, SCORE_MAX),
            ("forecast_next_week", pm.empathy_forecast.next_week, SCORE_MAX),
            ("forecast_next_month", pm.empathy_forecast.next_month, SCORE_MAX),
            ("forecast_horizon", pm.empathy_forecast.horizon_projection, SCORE_MAX),
            ("forecast_confidence", pm.empathy_forecast.confidence, SCORE_MAX),
            ("burnout_risk", pm.burnout_risk.current_risk_level, SCORE_MAX),
            ("growth_velocity", pm.growth_trajectory.velocity, SCORE_MAX),
            ("growth_projected", pm.growth_trajectory.projected_score, SCORE_MAX),
        ];

        scores.extend(tp.weekly_pattern.iter().map(|v| ("weekly_pattern", *v, SCORE_MAX)));
        scores.extend(hm.growth_moments.iter().map(|g| ("growth_moment", g.magnitude, SCORE_MAX)));
        scores.extend(mm.moments.iter().map(|m| ("micro_moment", m.intensity, SCORE_MAX)));
        for w in &hm.wisdom_gained {
            scores.push(("wisdom_applicability", w.applicability, SCORE_MAX));
            scores.push(("wisdom_transformative", w.transformative_level, SCORE_MAX));
            scores.push(("wisdom_reinforcement", w.reinforcement, SCORE_MAX));
        }
        scores
    }
}
