use crate::models::metrics::{
    BASELINE_SCORE, CompassionateProgress, EmotionalIntelligenceMetrics, GrowthMoment, HumanizedMetrics,
    MicroMoment, MicroMomentKind, MicroMoments, ResilienceKind, ResiliencePattern, WisdomInsight,
};
use crate::services::predictive::calculate_trend;
use crate::services::scoring::compassion::setbacks_and_recoveries;
use crate::services::scoring::{ScoringContext, clamp_score, ratio_score};

/// Rise (0-100 scale) between consecutive mood entries that counts as a growth moment
const GROWTH_STEP: f64 = 20.0;

const MAX_GROWTH_MOMENTS: usize = 10;
const MAX_MICRO_MOMENTS: usize = 20;

/// Pain level (0-10) from which logging counts as an act of courage
const HIGH_PAIN: f64 = 7.0;

pub fn humanized_metrics(
    ctx: &ScoringContext<'_>,
    emotional: &EmotionalIntelligenceMetrics,
    compassion: &CompassionateProgress,
    wisdom_gained: Vec<WisdomInsight>,
) -> HumanizedMetrics {
    HumanizedMetrics {
        courage_score: courage_score(ctx),
        resilience_pattern: resilience_pattern(&ctx.mood_series()),
        growth_moments: growth_moments(ctx),
        wisdom_gained,
        strengths_discovered: strengths(emotional, compassion),
    }
}

fn courage_score(ctx: &ScoringContext<'_>) -> f64 {
    if ctx.is_empty() {
        return BASELINE_SCORE;
    }

    // 高疼痛日仍坚持记录
    let hard_days = ctx.pain.iter().filter(|e| e.pain_level >= HIGH_PAIN).count();
    let hard_days_noted = ctx
        .pain
        .iter()
        .zip(ctx.pain_signals.iter())
        .filter(|(e, s)| e.pain_level >= HIGH_PAIN && !s.is_empty())
        .count();

    let courageous = ctx.count_signals(|s| s.courage > 0);
    let persistence = if hard_days == 0 {
        BASELINE_SCORE
    } else {
        ratio_score(hard_days_noted, hard_days)
    };

    clamp_score(30.0 + ratio_score(courageous, ctx.entry_count()) * 0.4 + persistence * 0.3)
}

/// Classify how a chronological 0-100 mood series recovers from setbacks
pub fn resilience_pattern(series: &[f64]) -> ResiliencePattern {
    if series.len() < 3 {
        return ResiliencePattern {
            kind: ResilienceKind::Emerging,
            strength: BASELINE_SCORE,
            recoveries: 0,
        };
    }

    let (setbacks, recoveries) = setbacks_and_recoveries(series);
    let trend = calculate_trend(series);

    let kind = if recoveries >= 2 {
        ResilienceKind::Bouncing
    } else if trend > 20.0 {
        ResilienceKind::Building
    } else {
        ResilienceKind::Steady
    };

    let strength = if setbacks == 0 {
        clamp_score(60.0 + trend.max(0.0) * 0.4)
    } else {
        clamp_score(30.0 + ratio_score(recoveries as usize, setbacks as usize) * 0.6 + trend.max(0.0) * 0.1)
    };

    ResiliencePattern {
        kind,
        strength,
        recoveries,
    }
}

fn growth_moments(ctx: &ScoringContext<'_>) -> Vec<GrowthMoment> {
    let mut moments: Vec<GrowthMoment> = ctx
        .mood
        .windows(2)
        .filter_map(|pair| {
            let delta = (pair[1].mood - pair[0].mood) * 10.0;
            if delta < GROWTH_STEP {
                return None;
            }
            let description = if pair[1].notes.trim().is_empty() {
                format!("Mood rose from {:.0} to {:.0}", pair[0].mood, pair[1].mood)
            } else {
                pair[1].notes.trim().chars().take(160).collect()
            };
            Some(GrowthMoment {
                timestamp: pair[1].timestamp,
                description,
                magnitude: clamp_score(delta),
            })
        })
        .collect();

    // 保留最近的若干个
    if moments.len() > MAX_GROWTH_MOMENTS {
        moments = moments.split_off(moments.len() - MAX_GROWTH_MOMENTS);
    }
    moments
}

fn strengths(emotional: &EmotionalIntelligenceMetrics, compassion: &CompassionateProgress) -> Vec<String> {
    let candidates = [
        (emotional.self_awareness, "Self-awareness"),
        (emotional.self_regulation, "Emotional regulation"),
        (emotional.motivation, "Motivation"),
        (emotional.empathy, "Empathy toward others"),
        (emotional.social_skills, "Building connection"),
        (emotional.emotional_vocabulary, "Naming feelings"),
        (compassion.self_compassion, "Self-compassion"),
        (compassion.setback_resilience, "Bouncing back from setbacks"),
        (compassion.growth_mindset, "Growth mindset"),
        (compassion.celebration_of_small_wins, "Celebrating small wins"),
    ];

    let mut found: Vec<(f64, &str)> = candidates.into_iter().filter(|(score, _)| *score >= 70.0).collect();
    found.sort_by(|a, b| b.0.total_cmp(&a.0));
    found.into_iter().take(5).map(|(_, name)| name.to_string()).collect()
}

/// Small moments of care found in mood notes
pub fn micro_moments(ctx: &ScoringContext<'_>) -> MicroMoments {
    let mut moments = Vec::new();
    let mut caring_entries = 0;

    for (entry, signals) in ctx.mood.iter().zip(ctx.mood_signals.iter()) {
        if signals.shows_care() {
            caring_entries += 1;
        }
        let kinds = [
            (MicroMomentKind::SelfKindness, signals.self_kindness),
            (MicroMomentKind::ReachingOut, signals.reaching_out),
            (MicroMomentKind::Gratitude, signals.gratitude),
            (MicroMomentKind::SmallWin, signals.small_wins),
        ];
        for (kind, count) in kinds {
            if count > 0 {
                moments.push(MicroMoment {
                    timestamp: entry.timestamp,
                    kind,
                    intensity: clamp_score(25.0 + count as f64 * 25.0),
                });
            }
        }
    }

    let kindness = moments
        .iter()
        .filter(|m| m.kind == MicroMomentKind::SelfKindness)
        .count();

    let noted = ctx.mood_signals.iter().filter(|s| !s.is_empty()).count();
    let (expressions_of_care, kindness_frequency) = if noted == 0 {
        (BASELINE_SCORE, BASELINE_SCORE)
    } else {
        (ratio_score(caring_entries, noted), ratio_score(kindness, noted))
    };

    if moments.len() > MAX_MICRO_MOMENTS {
        moments = moments.split_off(moments.len() - MAX_MICRO_MOMENTS);
    }

    MicroMoments {
        moments,
        expressions_of_care,
        kindness_frequency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{MoodEntry, PainEntry};
    use crate::services::scoring::{KeywordTextScorer, compassionate_progress, emotional_intelligence};
    use chrono::{Duration, Utc};

    #[test]
    fn test_short_series_is_emerging() {
        let pattern = resilience_pattern(&[40.0, 60.0]);
        assert_eq!(pattern.kind, ResilienceKind::Emerging);
        assert_eq!(pattern.strength, 50.0);
    }

    #[test]
    fn test_repeated_recoveries_bounce() {
        let pattern = resilience_pattern(&[70.0, 40.0, 70.0, 40.0, 75.0]);
        assert_eq!(pattern.kind, ResilienceKind::Bouncing);
        assert_eq!(pattern.recoveries, 2);
    }

    #[test]
    fn test_steady_rise_is_building() {
        let pattern = resilience_pattern(&[30.0, 40.0, 50.0, 60.0]);
        assert_eq!(pattern.kind, ResilienceKind::Building);
        assert!(pattern.strength > 60.0);
    }

    #[test]
    fn test_growth_moments_and_micro_moments() {
        let now = Utc::now();
        let mood = vec![
            MoodEntry::new(now - Duration::days(2), 3.0),
            MoodEntry::new(now - Duration::days(1), 6.0).with_notes("Managed to walk. Grateful for the sun."),
            MoodEntry::new(now, 6.5).with_notes("Was kind to myself today."),
        ];
        let pain = vec![PainEntry::new(now, 8.0).with_notes("Hurts, but I pushed through despite it.")];

        let ctx = ScoringContext::new(&pain, &mood, &KeywordTextScorer::new());
        let emotional = emotional_intelligence(&ctx);
        let compassion = compassionate_progress(&ctx);
        let humanized = humanized_metrics(&ctx, &emotional, &compassion, Vec::new());

        assert_eq!(humanized.growth_moments.len(), 1);
        assert_eq!(humanized.growth_moments[0].magnitude, 30.0);
        assert!(humanized.courage_score > 50.0);

        let micro = micro_moments(&ctx);
        let kinds: Vec<MicroMomentKind> = micro.moments.iter().map(|m| m.kind).collect();
        assert!(kinds.contains(&MicroMomentKind::SmallWin));
        assert!(kinds.contains(&MicroMomentKind::Gratitude));
        assert!(kinds.contains(&MicroMomentKind::SelfKindness));
        assert_eq!(micro.expressions_of_care, 100.0);
    }
}
