use crate::models::metrics::{BASELINE_SCORE, EmotionalIntelligenceMetrics};
use crate::services::scoring::{ScoringContext, clamp_score, mean, ratio_score, safe_div, scale_mean, std_dev};

/// Emotional intelligence scores
///
/// Every field is [`BASELINE_SCORE`] when there are no entries at all.
pub fn emotional_intelligence(ctx: &ScoringContext<'_>) -> EmotionalIntelligenceMetrics {
    if ctx.is_empty() {
        return EmotionalIntelligenceMetrics {
            self_awareness: BASELINE_SCORE,
            self_regulation: BASELINE_SCORE,
            motivation: BASELINE_SCORE,
            empathy: BASELINE_SCORE,
            social_skills: BASELINE_SCORE,
            emotional_vocabulary: BASELINE_SCORE,
            emotional_granularity: BASELINE_SCORE,
            meta_emotional_awareness: BASELINE_SCORE,
        };
    }

    let total = ctx.entry_count();
    let noted = ctx.noted_entries();
    let signals = &ctx.combined;

    let clarity = scale_mean(ctx.mood.iter().map(|e| e.emotional_clarity));
    let self_awareness = clamp_score(clarity * 0.6 + ratio_score(noted, total) * 0.4);

    let regulation = scale_mean(ctx.mood.iter().map(|e| e.emotional_regulation));
    let steadiness = clamp_score(100.0 - std_dev(&ctx.mood_series()) * 2.0);
    let self_regulation = clamp_score(regulation * 0.7 + steadiness * 0.3);

    let energy = scale_mean(ctx.mood.iter().map(|e| e.energy));
    let hope = scale_mean(ctx.mood.iter().map(|e| e.hopefulness));
    let motivation = clamp_score(energy * 0.5 + hope * 0.5);

    let caring = ctx.count_signals(|s| s.validation_given + s.reaching_out > 0);
    let empathy = clamp_score(40.0 + ratio_score(caring, total) * 0.6);

    let support = mean(
        &ctx.mood
            .iter()
            .map(|e| e.social_support.score())
            .collect::<Vec<_>>(),
    )
    .unwrap_or(BASELINE_SCORE);
    let reaching = ctx.count_signals(|s| s.reaching_out > 0);
    let social_skills = clamp_score(support * 0.7 + ratio_score(reaching, total) * 0.3);

    let emotional_vocabulary = if noted == 0 {
        BASELINE_SCORE
    } else {
        clamp_score(signals.distinct_emotions.len() as f64 * 8.0)
    };

    // 用词越丰富，重复越少，粒度越细
    let emotional_granularity = if signals.emotion_words == 0 {
        BASELINE_SCORE
    } else {
        clamp_score(
            safe_div(
                signals.distinct_emotions.len() as f64,
                signals.emotion_words as f64,
                0.5,
            ) * 100.0,
        )
    };

    let meta = ctx.count_signals(|s| s.meta_awareness > 0);
    let meta_emotional_awareness = if noted == 0 {
        BASELINE_SCORE
    } else {
        clamp_score(20.0 + ratio_score(meta, noted) * 0.8)
    };

    EmotionalIntelligenceMetrics {
        self_awareness,
        self_regulation,
        motivation,
        empathy,
        social_skills,
        emotional_vocabulary,
        emotional_granularity,
        meta_emotional_awareness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{MoodEntry, PainEntry, SocialSupport};
    use crate::services::scoring::KeywordTextScorer;
    use chrono::{Duration, Utc};

    #[test]
    fn test_empty_input_is_baseline() {
        let ctx = ScoringContext::new(&[], &[], &KeywordTextScorer::new());
        let metrics = emotional_intelligence(&ctx);
        assert_eq!(metrics.self_awareness, 50.0);
        assert_eq!(metrics.meta_emotional_awareness, 50.0);
    }

    #[test]
    fn test_pain_only_is_bounded() {
        let now = Utc::now();
        let pain = vec![PainEntry::new(now, 9.0), PainEntry::new(now - Duration::days(1), 10.0)];
        let ctx = ScoringContext::new(&pain, &[], &KeywordTextScorer::new());
        let metrics = emotional_intelligence(&ctx);

        assert_eq!(metrics.self_awareness, 50.0 * 0.6);
        assert_eq!(metrics.emotional_vocabulary, 50.0);
    }

    #[test]
    fn test_rich_notes_raise_vocabulary_and_social_skills() {
        let now = Utc::now();
        let mood: Vec<MoodEntry> = (0..5)
            .map(|i| {
                MoodEntry::new(now - Duration::days(i), 6.0)
                    .with_support(SocialSupport::Strong)
                    .with_notes("Felt anxious, then calm and hopeful. I noticed the shift. Called a friend.")
            })
            .collect();
        let plain: Vec<MoodEntry> = (0..5)
            .map(|i| MoodEntry::new(now - Duration::days(i), 6.0).with_support(SocialSupport::None))
            .collect();

        let scorer = KeywordTextScorer::new();
        let rich = emotional_intelligence(&ScoringContext::new(&[], &mood, &scorer));
        let flat = emotional_intelligence(&ScoringContext::new(&[], &plain, &scorer));

        assert!(rich.social_skills > flat.social_skills);
        assert!(rich.meta_emotional_awareness > 90.0);
        assert!(rich.self_awareness > flat.self_awareness);
    }
}
