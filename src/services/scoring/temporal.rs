use chrono::{Datelike, Timelike};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::metrics::{BASELINE_SCORE, TemporalPatterns};
use crate::services::predictive::{RECENT_WINDOW, calculate_trend};
use crate::services::scoring::{ScoringContext, clamp_score, mean};

const PEAK_HOURS: usize = 3;

pub fn temporal_patterns(ctx: &ScoringContext<'_>) -> TemporalPatterns {
    let mut by_weekday: [Vec<f64>; 7] = Default::default();
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();

    for entry in &ctx.mood {
        let score = clamp_score(entry.mood * 10.0);
        by_weekday[entry.timestamp.weekday().num_days_from_monday() as usize].push(score);
        by_hour.entry(entry.timestamp.hour()).or_default().push(score);
    }

    let weekly_pattern: Vec<f64> = by_weekday
        .iter()
        .map(|scores| mean(scores).unwrap_or(BASELINE_SCORE))
        .collect();

    let mut hours: Vec<(u32, f64)> = by_hour
        .into_iter()
        .filter_map(|(hour, scores)| mean(&scores).map(|m| (hour, m)))
        .collect();
    hours.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let peak_hours: Vec<u32> = hours.into_iter().take(PEAK_HOURS).map(|(hour, _)| hour).collect();

    TemporalPatterns {
        weekly_pattern,
        peak_hours,
        consistency: logging_consistency(ctx),
        recent_momentum: recent_momentum(&ctx.mood_series()),
    }
}

/// Share of days between the first and last entry on which anything was logged
fn logging_consistency(ctx: &ScoringContext<'_>) -> f64 {
    let days: BTreeSet<chrono::NaiveDate> = ctx
        .mood
        .iter()
        .map(|e| e.timestamp.date_naive())
        .chain(ctx.pain.iter().map(|e| e.timestamp.date_naive()))
        .collect();

    let (Some(first), Some(last)) = (days.first(), days.last()) else {
        return BASELINE_SCORE;
    };
    let span = (*last - *first).num_days() + 1;
    if span <= 1 {
        return BASELINE_SCORE;
    }
    clamp_score(days.len() as f64 / span as f64 * 100.0)
}

fn recent_momentum(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return BASELINE_SCORE;
    }
    let recent = &series[series.len().saturating_sub(RECENT_WINDOW)..];
    clamp_score((calculate_trend(recent) + 100.0) / 2.0)
}
