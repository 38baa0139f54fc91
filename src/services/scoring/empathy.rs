use crate::config::CulturalSensitivity;
use crate::models::metrics::{
    BASELINE_SCORE, CompassionateProgress, EmotionalIntelligenceMetrics, EmpathyIntelligenceProfile,
    EmpathyKpis,
};
use crate::models::pattern::{CulturalContext, SupportOrientation};
use crate::services::predictive::calculate_trend;
use crate::services::scoring::{ScoringContext, clamp_iq, clamp_score, mean, ratio_score, safe_div};

/// Words per note at which understanding depth saturates
const DEEP_NOTE_WORDS: f64 = 60.0;

pub fn empathy_kpis(ctx: &ScoringContext<'_>) -> EmpathyKpis {
    let noted = ctx.noted_entries();
    if ctx.is_empty() {
        return EmpathyKpis {
            validation_received: BASELINE_SCORE,
            validation_given: BASELINE_SCORE,
            understanding_depth: BASELINE_SCORE,
            connection_quality: BASELINE_SCORE,
            empathy_consistency: BASELINE_SCORE,
            empathy_growth_rate: BASELINE_SCORE,
        };
    }

    let support = mean(
        &ctx.mood
            .iter()
            .map(|e| e.social_support.score())
            .collect::<Vec<_>>(),
    )
    .unwrap_or(BASELINE_SCORE);

    let received = ctx.count_signals(|s| s.validation_received > 0);
    let given = ctx.count_signals(|s| s.validation_given > 0);
    let reaching = ctx.count_signals(|s| s.reaching_out > 0);

    let validation_received = if noted == 0 {
        clamp_score(support * 0.6 + 20.0)
    } else {
        clamp_score(20.0 + ratio_score(received, noted) * 0.4 + support * 0.4)
    };

    let validation_given = if noted == 0 {
        BASELINE_SCORE
    } else {
        clamp_score(30.0 + ratio_score(given, noted) * 0.7)
    };

    let understanding_depth = if noted == 0 {
        BASELINE_SCORE
    } else {
        let words_per_note = safe_div(ctx.combined.word_count as f64, noted as f64, 0.0);
        let depth = (words_per_note / DEEP_NOTE_WORDS * 100.0).min(100.0);
        clamp_score(depth * 0.7 + ratio_score(ctx.count_signals(|s| s.meta_awareness > 0), noted) * 0.3)
    };

    let connection_quality = clamp_score(support * 0.6 + ratio_score(reaching, ctx.entry_count()) * 0.4);

    // 按时间顺序逐条的关怀表达强度
    let care_series: Vec<f64> = ctx
        .mood_signals
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| {
            clamp_score((s.validation_given + s.reaching_out + s.gratitude + s.self_kindness) as f64 * 25.0)
        })
        .collect();

    let empathy_consistency = if care_series.len() < 2 {
        BASELINE_SCORE
    } else {
        let (first, second) = care_series.split_at(care_series.len() / 2);
        let first = mean(first).unwrap_or(0.0);
        let second = mean(second).unwrap_or(0.0);
        clamp_score(100.0 - (first - second).abs())
    };

    let empathy_growth_rate = if care_series.len() < 2 {
        BASELINE_SCORE
    } else {
        clamp_score((calculate_trend(&care_series) + 100.0) / 2.0)
    };

    EmpathyKpis {
        validation_received,
        validation_given,
        understanding_depth,
        connection_quality,
        empathy_consistency,
        empathy_growth_rate,
    }
}

fn sensitivity_base(sensitivity: CulturalSensitivity) -> f64 {
    match sensitivity {
        CulturalSensitivity::Standard => 50.0,
        CulturalSensitivity::Enhanced => 60.0,
        CulturalSensitivity::Adaptive => 65.0,
    }
}

/// Empathy intelligence profile with an IQ-style composite
///
/// `empathy_iq = 100 + (mean(components) - 50) * 2`, clamped to `[0, 200]`.
pub fn empathy_intelligence_profile(
    ctx: &ScoringContext<'_>,
    emotional: &EmotionalIntelligenceMetrics,
    compassion: &CompassionateProgress,
    kpis: &EmpathyKpis,
    culture: &CulturalContext,
) -> EmpathyIntelligenceProfile {
    let cognitive_empathy = clamp_score((emotional.self_awareness + kpis.understanding_depth) / 2.0);
    let affective_empathy = clamp_score((emotional.empathy + emotional.emotional_granularity) / 2.0);
    let compassionate_empathy = clamp_score((compassion.self_compassion + kpis.validation_given) / 2.0);
    let empathic_accuracy =
        clamp_score((emotional.meta_emotional_awareness + emotional.emotional_vocabulary) / 2.0);

    let stress = mean(&ctx.mood.iter().map(|e| e.stress * 10.0).collect::<Vec<_>>()).unwrap_or(BASELINE_SCORE);
    let empathic_boundaries = if ctx.is_empty() {
        BASELINE_SCORE
    } else {
        clamp_score(emotional.self_regulation * 0.6 + (100.0 - stress) * 0.4)
    };

    let orientation_bonus = match culture.support_orientation {
        SupportOrientation::Collective => 5.0,
        SupportOrientation::Balanced => 2.5,
        SupportOrientation::Individual => 0.0,
    };
    let cultural_empathy = clamp_score(
        sensitivity_base(culture.sensitivity) + culture.context_diversity * 0.3 + orientation_bonus,
    );

    let components = [
        cognitive_empathy,
        affective_empathy,
        compassionate_empathy,
        empathic_accuracy,
        empathic_boundaries,
        cultural_empathy,
    ];
    let average = mean(&components).unwrap_or(BASELINE_SCORE);
    let empathy_iq = clamp_iq(100.0 + (average - 50.0) * 2.0);

    EmpathyIntelligenceProfile {
        empathy_iq,
        cognitive_empathy,
        affective_empathy,
        compassionate_empathy,
        empathic_accuracy,
        empathic_boundaries,
        cultural_empathy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{MoodEntry, SocialSupport};
    use crate::services::scoring::{KeywordTextScorer, compassionate_progress, emotional_intelligence};
    use chrono::{Duration, Utc};

    fn profile_for(mood: &[MoodEntry], sensitivity: CulturalSensitivity) -> EmpathyIntelligenceProfile {
        let ctx = ScoringContext::new(&[], mood, &KeywordTextScorer::new());
        let emotional = emotional_intelligence(&ctx);
        let compassion = compassionate_progress(&ctx);
        let kpis = empathy_kpis(&ctx);
        let culture = CulturalContext::derive(sensitivity, mood);
        empathy_intelligence_profile(&ctx, &emotional, &compassion, &kpis, &culture)
    }

    #[test]
    fn test_empty_kpis_are_baseline() {
        let ctx = ScoringContext::new(&[], &[], &KeywordTextScorer::new());
        let kpis = empathy_kpis(&ctx);
        assert_eq!(kpis.validation_given, 50.0);
        assert_eq!(kpis.empathy_growth_rate, 50.0);
    }

    #[test]
    fn test_iq_is_bounded_and_centered() {
        let profile = profile_for(&[], CulturalSensitivity::Standard);
        assert!((0.0..=200.0).contains(&profile.empathy_iq));
        assert!(profile.empathy_iq >= 95.0 && profile.empathy_iq <= 110.0);
    }

    #[test]
    fn test_growing_care_raises_growth_rate() {
        let now = Utc::now();
        let notes = [
            "Quiet day.",
            "Quiet day again.",
            "Called my brother.",
            "Called my sister and helped her move, grateful for her.",
        ];
        let mood: Vec<MoodEntry> = notes
            .iter()
            .enumerate()
            .map(|(i, n)| MoodEntry::new(now - Duration::days(4 - i as i64), 6.0).with_notes(n))
            .collect();

        let ctx = ScoringContext::new(&[], &mood, &KeywordTextScorer::new());
        let kpis = empathy_kpis(&ctx);
        assert!(kpis.empathy_growth_rate > 50.0);
    }

    #[test]
    fn test_adaptive_sensitivity_raises_cultural_empathy() {
        let now = Utc::now();
        let mood = vec![MoodEntry::new(now, 6.0).with_support(SocialSupport::Strong)];

        let adaptive = profile_for(&mood, CulturalSensitivity::Adaptive);
        let standard = profile_for(&mood, CulturalSensitivity::Standard);
        assert!(adaptive.cultural_empathy > standard.cultural_empathy);
    }
}
