//! Heuristic scorer.
//!
//! Pure functions from a borrowed view of journal entries to bounded
//! sub-scores. Degenerate input (no entries, zero denominators, NaN) never
//! fails; it falls back to [`BASELINE_SCORE`].

pub mod compassion;
pub mod emotional;
pub mod empathy;
pub mod humanized;
pub mod temporal;
pub mod text;

pub use compassion::compassionate_progress;
pub use emotional::emotional_intelligence;
pub use empathy::{empathy_intelligence_profile, empathy_kpis};
pub use humanized::{humanized_metrics, micro_moments};
pub use temporal::temporal_patterns;
pub use text::{KeywordTextScorer, TextScorer, TextSignals};

use crate::models::entry::{MoodEntry, PainEntry, sorted_by_time};
use crate::models::metrics::{BASELINE_SCORE, IQ_MAX, SCORE_MAX};

/// Divide, returning `fallback` when the result would not be finite
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        return fallback;
    }
    let value = numerator / denominator;
    if value.is_finite() { value } else { fallback }
}

/// Clamp to `[0, 100]`; NaN becomes the baseline
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        BASELINE_SCORE
    } else {
        value.clamp(0.0, SCORE_MAX)
    }
}

/// Clamp to `[0, 200]`; NaN becomes the IQ midpoint
pub fn clamp_iq(value: f64) -> f64 {
    if value.is_nan() {
        IQ_MAX / 2.0
    } else {
        value.clamp(0.0, IQ_MAX)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean of a 0-10 scale mapped onto 0-100, or the baseline when empty
pub fn scale_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    mean(&values).map(|m| clamp_score(m * 10.0)).unwrap_or(BASELINE_SCORE)
}

/// Share of items matching a predicate, as a 0-100 score
pub fn ratio_score(matching: usize, total: usize) -> f64 {
    clamp_score(safe_div(matching as f64, total as f64, BASELINE_SCORE / 100.0) * 100.0)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    crate::services::predictive::calculate_variance(values).sqrt()
}

/// Chronological view of one user's entries plus the text signals of every note
pub struct ScoringContext<'a> {
    pub pain: Vec<&'a PainEntry>,
    pub mood: Vec<&'a MoodEntry>,
    pub mood_signals: Vec<TextSignals>,
    pub pain_signals: Vec<TextSignals>,
    pub combined: TextSignals,
}

impl<'a> ScoringContext<'a> {
    pub fn new(pain: &'a [PainEntry], mood: &'a [MoodEntry], scorer: &dyn TextScorer) -> Self {
        let pain = sorted_by_time(pain, |e| e.timestamp);
        let mood = sorted_by_time(mood, |e| e.timestamp);

        let mood_signals: Vec<TextSignals> = mood.iter().map(|e| scorer.score_text(&e.notes)).collect();
        let pain_signals: Vec<TextSignals> = pain.iter().map(|e| scorer.score_text(&e.notes)).collect();

        let mut combined = TextSignals::default();
        for signals in mood_signals.iter().chain(pain_signals.iter()) {
            combined += signals;
        }

        Self {
            pain,
            mood,
            mood_signals,
            pain_signals,
            combined,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pain.is_empty() && self.mood.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.pain.len() + self.mood.len()
    }

    /// Entries that carry any free text
    pub fn noted_entries(&self) -> usize {
        self.mood_signals
            .iter()
            .chain(self.pain_signals.iter())
            .filter(|s| !s.is_empty())
            .count()
    }

    /// Mood on the 0-100 scale, oldest first
    pub fn mood_series(&self) -> Vec<f64> {
        self.mood.iter().map(|e| clamp_score(e.mood * 10.0)).collect()
    }

    /// Pain on the 0-100 scale, oldest first
    pub fn pain_series(&self) -> Vec<f64> {
        self.pain.iter().map(|e| clamp_score(e.pain_level * 10.0)).collect()
    }

    /// Number of entries whose signals satisfy `f`
    pub fn count_signals<F>(&self, f: F) -> usize
    where
        F: Fn(&TextSignals) -> bool,
    {
        self.mood_signals
            .iter()
            .chain(self.pain_signals.iter())
            .filter(|s| f(s))
            .count()
    }
}
