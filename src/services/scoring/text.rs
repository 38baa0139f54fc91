//! Free-text signal extraction.
//!
//! Keyword matching stands in for semantic analysis. Callers only depend on
//! [`TextScorer`], so a different strategy can be plugged into the engine
//! without touching aggregation or caching.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::AddAssign;

/// Counts of the signal families found in one piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSignals {
    pub word_count: usize,
    /// Emotion words, counting repeats.
    pub emotion_words: usize,
    /// Distinct emotion words.
    pub distinct_emotions: HashSet<String>,
    pub self_kindness: usize,
    pub self_criticism: usize,
    pub gratitude: usize,
    pub reaching_out: usize,
    pub validation_received: usize,
    pub validation_given: usize,
    pub growth_language: usize,
    pub meta_awareness: usize,
    pub small_wins: usize,
    pub courage: usize,
}

impl TextSignals {
    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// Whether any caring or kind expression was found
    pub fn shows_care(&self) -> bool {
        self.self_kindness + self.gratitude + self.reaching_out + self.validation_given > 0
    }
}

impl AddAssign<&TextSignals> for TextSignals {
    fn add_assign(&mut self, rhs: &TextSignals) {
        self.word_count += rhs.word_count;
        self.emotion_words += rhs.emotion_words;
        self.distinct_emotions
            .extend(rhs.distinct_emotions.iter().cloned());
        self.self_kindness += rhs.self_kindness;
        self.self_criticism += rhs.self_criticism;
        self.gratitude += rhs.gratitude;
        self.reaching_out += rhs.reaching_out;
        self.validation_received += rhs.validation_received;
        self.validation_given += rhs.validation_given;
        self.growth_language += rhs.growth_language;
        self.meta_awareness += rhs.meta_awareness;
        self.small_wins += rhs.small_wins;
        self.courage += rhs.courage;
    }
}

/// Pluggable text scoring strategy
pub trait TextScorer: Send + Sync {
    fn score_text(&self, text: &str) -> TextSignals;
}

const EMOTION_WORDS: &[&str] = &[
    "happy", "sad", "angry", "anxious", "afraid", "scared", "calm", "content", "frustrated",
    "grateful", "hopeful", "hopeless", "lonely", "overwhelmed", "irritable", "joyful", "guilty",
    "ashamed", "proud", "relieved", "disappointed", "excited", "nervous", "peaceful", "tired",
    "numb", "hurt", "worried", "tense", "resentful", "jealous", "embarrassed", "confused",
    "energized", "discouraged", "vulnerable", "safe", "loved", "rejected", "annoyed",
];

const SELF_KINDNESS: &[&str] = &[
    "be gentle with myself",
    "kind to myself",
    "forgive myself",
    "forgave myself",
    "allowed myself",
    "let myself rest",
    "it's okay",
    "it is okay",
    "doing my best",
    "self-care",
    "self care",
    "rested",
    "treated myself",
];

const SELF_CRITICISM: &[&str] = &[
    "i'm useless",
    "i am useless",
    "i'm lazy",
    "i am lazy",
    "i'm a failure",
    "i am a failure",
    "my fault",
    "should have",
    "hate myself",
    "i'm weak",
    "i am weak",
    "not good enough",
    "pathetic",
    "stupid",
    "i always mess",
    "i can't do anything",
];

const GRATITUDE: &[&str] = &["grateful", "thankful", "thanks to", "appreciate", "blessed", "gratitude"];

const REACHING_OUT: &[&str] = &[
    "called",
    "texted",
    "reached out",
    "talked to",
    "asked for help",
    "met with",
    "visited",
    "support group",
    "therapist",
    "opened up",
];

const VALIDATION_RECEIVED: &[&str] = &[
    "they understood",
    "felt heard",
    "felt understood",
    "listened to me",
    "believed me",
    "validated",
    "supported me",
    "was there for me",
];

const VALIDATION_GIVEN: &[&str] = &[
    "i listened",
    "helped",
    "comforted",
    "encouraged",
    "checked on",
    "supported",
    "was there for",
    "i understand how",
];

const GROWTH_LANGUAGE: &[&str] = &[
    "learning",
    "learned",
    "growing",
    "progress",
    "improving",
    "getting better",
    "practice",
    "not yet",
    "next time",
    "one step",
    "trying",
];

const META_AWARENESS: &[&str] = &[
    "i noticed",
    "i realized",
    "i realised",
    "i recognize",
    "i recognise",
    "i'm aware",
    "i am aware",
    "i caught myself",
    "my pattern",
    "i observed",
    "i feel that",
];

const SMALL_WINS: &[&str] = &[
    "managed to",
    "small win",
    "finally",
    "accomplished",
    "finished",
    "got out of bed",
    "proud of",
    "did it",
    "completed",
];

const COURAGE: &[&str] = &[
    "despite",
    "even though",
    "scared but",
    "pushed through",
    "faced",
    "brave",
    "took the risk",
    "tried anyway",
    "for the first time",
];

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}'-]+").expect("Valid word regex"));

/// Default keyword based scorer
#[derive(Debug, Clone, Default)]
pub struct KeywordTextScorer;

impl KeywordTextScorer {
    pub fn new() -> Self {
        Self
    }

    fn count_phrases(text: &str, phrases: &[&str]) -> usize {
        phrases.iter().map(|p| text.matches(p).count()).sum()
    }
}

impl TextScorer for KeywordTextScorer {
    fn score_text(&self, text: &str) -> TextSignals {
        let lower = text.to_lowercase();
        let words: Vec<&str> = WORD_RE.find_iter(&lower).map(|m| m.as_str()).collect();
        if words.is_empty() {
            return TextSignals::default();
        }

        let mut signals = TextSignals {
            word_count: words.len(),
            ..Default::default()
        };

        for word in &words {
            if EMOTION_WORDS.contains(word) {
                signals.emotion_words += 1;
                signals.distinct_emotions.insert((*word).to_string());
            }
        }

        signals.self_kindness = Self::count_phrases(&lower, SELF_KINDNESS);
        signals.self_criticism = Self::count_phrases(&lower, SELF_CRITICISM);
        signals.gratitude = Self::count_phrases(&lower, GRATITUDE);
        signals.reaching_out = Self::count_phrases(&lower, REACHING_OUT);
        signals.validation_received = Self::count_phrases(&lower, VALIDATION_RECEIVED);
        signals.validation_given = Self::count_phrases(&lower, VALIDATION_GIVEN);
        signals.growth_language = Self::count_phrases(&lower, GROWTH_LANGUAGE);
        signals.meta_awareness = Self::count_phrases(&lower, META_AWARENESS);
        signals.small_wins = Self::count_phrases(&lower, SMALL_WINS);
        signals.courage = Self::count_phrases(&lower, COURAGE);

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let signals = KeywordTextScorer::new().score_text("   ");
        assert!(signals.is_empty());
        assert!(!signals.shows_care());
    }

    #[test]
    fn test_counts_families() {
        let scorer = KeywordTextScorer::new();
        let signals = scorer.score_text(
            "Felt anxious and tired, but I noticed it early. Called my sister and I'm grateful she listened to me.",
        );

        assert_eq!(signals.emotion_words, 3);
        assert!(signals.distinct_emotions.contains("anxious"));
        assert_eq!(signals.meta_awareness, 1);
        assert_eq!(signals.reaching_out, 1);
        assert_eq!(signals.validation_received, 1);
        assert!(signals.gratitude >= 1);
        assert!(signals.shows_care());
    }

    #[test]
    fn test_self_criticism_is_case_insensitive() {
        let signals = KeywordTextScorer::new().score_text("I SHOULD HAVE known. My fault again.");
        assert_eq!(signals.self_criticism, 2);
    }

    #[test]
    fn test_add_assign_merges_distinct_emotions() {
        let scorer = KeywordTextScorer::new();
        let mut total = scorer.score_text("sad and tired");
        total += &scorer.score_text("sad but hopeful");

        assert_eq!(total.emotion_words, 4);
        assert_eq!(total.distinct_emotions.len(), 3);
    }
}
