//! Wisdom extraction.
//!
//! Picks out sentences where the user states something they learned,
//! classifies each into a [`WisdomCategory`] by keyword dominance and scores
//! it. Ranking and the [`MAX_WISDOM_INSIGHTS`] cap happen after scoring, so
//! the best insights survive regardless of how many candidates matched.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::entry::{MoodEntry, PainEntry};
use crate::models::metrics::{WisdomCategory, WisdomInsight};
use crate::services::scoring::clamp_score;

/// Hard cap on returned insights
pub const MAX_WISDOM_INSIGHTS: usize = 10;

const MAX_INSIGHT_CHARS: usize = 240;

static INSIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(i (?:learned|learnt|realized|realised|discovered|understand|understood|know now)|i'm learning|i am learning|it turns out|now i know|the lesson|taught me|i see now|what helps is|it helps to|note to self|reminder to myself)\b",
    )
    .expect("Valid insight regex")
});

static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?\n]+[.!?]?").expect("Valid sentence regex"));

const CATEGORY_KEYWORDS: &[(WisdomCategory, &[&str])] = &[
    (
        WisdomCategory::Practical,
        &[
            "routine", "plan", "schedule", "pace", "pacing", "sleep", "exercise", "stretch",
            "medication", "rest", "habit", "walk", "diet", "water", "break",
        ],
    ),
    (
        WisdomCategory::Emotional,
        &[
            "feel", "feeling", "feelings", "emotion", "anger", "angry", "sad", "fear", "anxiety",
            "joy", "grief", "cry", "crying", "calm",
        ],
    ),
    (
        WisdomCategory::Spiritual,
        &[
            "meaning", "purpose", "faith", "pray", "prayer", "grateful", "gratitude", "peace",
            "acceptance", "accept", "soul", "spirit", "present",
        ],
    ),
    (
        WisdomCategory::Relational,
        &[
            "friend", "friends", "family", "partner", "people", "others", "talk", "listen",
            "support", "relationship", "together", "help", "ask",
        ],
    ),
    (
        WisdomCategory::SelfKnowledge,
        &[
            "myself", "my body", "my limits", "i need", "who i am", "my own", "boundaries",
            "triggers", "my patterns", "worth", "enough",
        ],
    ),
];

const APPLICABILITY_KEYWORDS: &[&str] = &[
    "when", "whenever", "every time", "always", "next time", "can", "will", "try", "helps",
    "works", "if i",
];

const TRANSFORMATIVE_KEYWORDS: &[&str] = &[
    "changed", "change", "transform", "shift", "never again", "finally", "different",
    "breakthrough", "for the first time", "everything", "life",
];

fn count_keywords(text: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|k| {
            if k.contains(' ') {
                text.contains(*k)
            } else {
                text.split(|c: char| !c.is_alphanumeric() && c != '\'')
                    .any(|word| word == **k)
            }
        })
        .count()
}

/// Category with the most keyword hits; self-knowledge when nothing matches
pub fn classify(text: &str) -> WisdomCategory {
    let lower = text.to_lowercase();
    let mut best = (WisdomCategory::SelfKnowledge, 0);
    for (category, keywords) in CATEGORY_KEYWORDS {
        let hits = count_keywords(&lower, keywords);
        if hits > best.1 {
            best = (*category, hits);
        }
    }
    best.0
}

struct Candidate {
    text: String,
    lower: String,
    words: HashSet<String>,
    category: WisdomCategory,
    recorded_at: DateTime<Utc>,
}

fn significant_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 4)
        .map(str::to_string)
        .collect()
}

/// Extract ranked wisdom insights from journal notes
pub fn extract_wisdom(pain: &[PainEntry], mood: &[MoodEntry]) -> Vec<WisdomInsight> {
    let notes = mood
        .iter()
        .map(|e| (e.timestamp, e.notes.as_str()))
        .chain(pain.iter().map(|e| (e.timestamp, e.notes.as_str())));

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for (timestamp, note) in notes {
        if !INSIGHT_RE.is_match(note) {
            continue;
        }
        for sentence in SENTENCE_RE.find_iter(note).map(|m| m.as_str().trim()) {
            if !INSIGHT_RE.is_match(sentence) {
                continue;
            }
            let text: String = sentence.chars().take(MAX_INSIGHT_CHARS).collect();
            let lower = text.to_lowercase();
            if !seen.insert(lower.clone()) {
                continue;
            }
            candidates.push(Candidate {
                category: classify(&text),
                words: significant_words(&lower),
                text,
                lower,
                recorded_at: timestamp,
            });
        }
    }

    let insights = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| score(i, candidate, &candidates))
        .collect();

    rank_wisdom(insights)
}

fn score(index: usize, candidate: &Candidate, all: &[Candidate]) -> WisdomInsight {
    let applicability = clamp_score(40.0 + count_keywords(&candidate.lower, APPLICABILITY_KEYWORDS) as f64 * 15.0);
    let transformative_level =
        clamp_score(30.0 + count_keywords(&candidate.lower, TRANSFORMATIVE_KEYWORDS) as f64 * 20.0);

    // 同类别或用词重叠的其他条目越多，说明这条领悟被反复印证
    let echoes = all
        .iter()
        .enumerate()
        .filter(|(j, other)| {
            *j != index
                && (other.category == candidate.category
                    || other.words.intersection(&candidate.words).count() >= 2)
        })
        .count();
    let reinforcement = clamp_score(20.0 + echoes as f64 * 20.0);

    WisdomInsight {
        id: Uuid::new_v4().to_string(),
        category: candidate.category,
        insight: candidate.text.clone(),
        applicability,
        transformative_level,
        reinforcement,
        recorded_at: candidate.recorded_at,
    }
}

/// Sort by value (newest first on ties) and keep the top [`MAX_WISDOM_INSIGHTS`]
pub fn rank_wisdom(mut insights: Vec<WisdomInsight>) -> Vec<WisdomInsight> {
    insights.sort_by(|a, b| {
        b.value()
            .total_cmp(&a.value())
            .then_with(|| b.recorded_at.cmp(&a.recorded_at))
    });
    insights.truncate(MAX_WISDOM_INSIGHTS);
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fake::Fake;
    use fake::faker::lorem::en::Sentence;
    use rstest::rstest;

    #[rstest]
    #[case("I learned that pacing my walk and resting helps", WisdomCategory::Practical)]
    #[case("I realized my anger is really fear and sad feelings", WisdomCategory::Emotional)]
    #[case("It turns out my friends and family want to help", WisdomCategory::Relational)]
    #[case("Now I know gratitude brings me peace and meaning", WisdomCategory::Spiritual)]
    #[case("I see now that I need boundaries for myself", WisdomCategory::SelfKnowledge)]
    #[case("I learned something", WisdomCategory::SelfKnowledge)]
    fn test_classify(#[case] text: &str, #[case] expected: WisdomCategory) {
        assert_eq!(classify(text), expected);
    }

    #[test]
    fn test_ignores_entries_without_insight_language() {
        let now = Utc::now();
        let mood = vec![
            MoodEntry::new(now, 5.0).with_notes("Rainy day, stayed in."),
            MoodEntry::new(now, 5.0),
        ];
        assert!(extract_wisdom(&[], &mood).is_empty());
    }

    #[test]
    fn test_extracts_only_the_insight_sentence() {
        let now = Utc::now();
        let mood = vec![MoodEntry::new(now, 6.0).with_notes(
            "Long day at work. I learned that a short walk always helps when pain spikes! Then dinner.",
        )];

        let wisdom = extract_wisdom(&[], &mood);

        assert_eq!(wisdom.len(), 1);
        assert_eq!(
            wisdom[0].insight,
            "I learned that a short walk always helps when pain spikes!"
        );
        assert_eq!(wisdom[0].category, WisdomCategory::Practical);
        assert!(wisdom[0].applicability > 40.0);
    }

    #[test]
    fn test_repetition_reinforces() {
        let now = Utc::now();
        let mood = vec![
            MoodEntry::new(now - Duration::days(2), 5.0).with_notes("I learned my friends listen when I talk."),
            MoodEntry::new(now - Duration::days(1), 5.0).with_notes("It turns out people want to help."),
            MoodEntry::new(now, 5.0).with_notes("I realized I need boundaries for myself."),
        ];

        let wisdom = extract_wisdom(&[], &mood);
        let relational: Vec<&WisdomInsight> = wisdom
            .iter()
            .filter(|w| w.category == WisdomCategory::Relational)
            .collect();
        let solo = wisdom
            .iter()
            .find(|w| w.category == WisdomCategory::SelfKnowledge)
            .unwrap();

        assert_eq!(relational.len(), 2);
        assert!(relational.iter().all(|w| w.reinforcement > solo.reinforcement));
    }

    #[test]
    fn test_shared_wording_reinforces_across_categories() {
        let now = Utc::now();
        let mood = vec![
            MoodEntry::new(now - Duration::days(2), 5.0)
                .with_notes("I realized grandmother kitchen memories feel heavy."),
            MoodEntry::new(now - Duration::days(1), 5.0)
                .with_notes("I learned grandmother kitchen memories need a routine."),
            MoodEntry::new(now, 5.0).with_notes("Now I know gratitude brings me peace and meaning."),
        ];

        let wisdom = extract_wisdom(&[], &mood);
        let reinforcement = |category| {
            wisdom
                .iter()
                .find(|w| w.category == category)
                .map(|w| w.reinforcement)
                .unwrap()
        };

        assert_eq!(wisdom.len(), 3);
        assert_eq!(reinforcement(WisdomCategory::Emotional), 40.0);
        assert_eq!(reinforcement(WisdomCategory::Practical), 40.0);
        assert_eq!(reinforcement(WisdomCategory::Spiritual), 20.0);
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let now = Utc::now();
        let mood = vec![
            MoodEntry::new(now, 5.0).with_notes("I learned to rest."),
            MoodEntry::new(now, 5.0).with_notes("i learned to rest."),
        ];
        assert_eq!(extract_wisdom(&[], &mood).len(), 1);
    }

    #[test]
    fn test_never_returns_more_than_ten() {
        let now = Utc::now();
        let mood: Vec<MoodEntry> = (0..60)
            .map(|i| {
                let filler: String = Sentence(3..8).fake();
                MoodEntry::new(now - Duration::hours(i), 5.0)
                    .with_notes(&format!("I learned {} {}.", filler.trim_end_matches('.'), i))
            })
            .collect();
        let pain: Vec<PainEntry> = (0..20)
            .map(|i| PainEntry::new(now - Duration::hours(i), 6.0).with_notes(&format!("It turns out rest helps {}.", i)))
            .collect();

        let wisdom = extract_wisdom(&pain, &mood);

        assert_eq!(wisdom.len(), MAX_WISDOM_INSIGHTS);
        for pair in wisdom.windows(2) {
            assert!(pair[0].value() >= pair[1].value());
        }
    }
}
