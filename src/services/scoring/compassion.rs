use crate::models::metrics::{BASELINE_SCORE, CompassionateProgress};
use crate::services::predictive::calculate_trend;
use crate::services::scoring::{ScoringContext, clamp_score, ratio_score, std_dev};

/// Drop (0-100 scale) between consecutive entries that counts as a setback
pub const DIP_THRESHOLD: f64 = 15.0;

/// Entries after a setback within which a recovery must happen
pub const RECOVERY_WINDOW: usize = 3;

/// Setbacks and recoveries in a chronological 0-100 series
///
/// A recovery is a return to within 5 points of the pre-setback level inside
/// [`RECOVERY_WINDOW`] entries.
pub fn setbacks_and_recoveries(series: &[f64]) -> (u32, u32) {
    let mut setbacks = 0;
    let mut recoveries = 0;

    for i in 1..series.len() {
        let before = series[i - 1];
        if before - series[i] < DIP_THRESHOLD {
            continue;
        }
        setbacks += 1;
        let window_end = (i + 1 + RECOVERY_WINDOW).min(series.len());
        if series[i + 1..window_end].iter().any(|v| *v >= before - 5.0) {
            recoveries += 1;
        }
    }

    (setbacks, recoveries)
}

pub fn compassionate_progress(ctx: &ScoringContext<'_>) -> CompassionateProgress {
    let noted = ctx.noted_entries();
    let signals = &ctx.combined;
    let series = ctx.mood_series();

    let (self_compassion, self_criticism, growth_mindset, celebration_of_small_wins) = if noted == 0 {
        (BASELINE_SCORE, BASELINE_SCORE, BASELINE_SCORE, BASELINE_SCORE)
    } else {
        let kind = signals.self_kindness as f64;
        let critical = signals.self_criticism as f64;
        let per_entry = noted as f64;

        let compassion = clamp_score(50.0 + (kind - critical) / per_entry * 50.0);
        let criticism = clamp_score(critical / per_entry * 60.0);
        let growth = clamp_score(30.0 + ratio_score(ctx.count_signals(|s| s.growth_language > 0), noted) * 0.7);
        let wins = clamp_score(20.0 + ratio_score(ctx.count_signals(|s| s.small_wins > 0), noted) * 0.8);
        (compassion, criticism, growth, wins)
    };

    let progress_acceptance = if series.len() < 2 {
        BASELINE_SCORE
    } else {
        // 情绪走低时仍在记录本身就是接纳
        let trend = calculate_trend(&series);
        clamp_score(60.0 + trend * 0.2 + (self_compassion - 50.0) * 0.4)
    };

    let setback_resilience = {
        let (setbacks, recoveries) = setbacks_and_recoveries(&series);
        if setbacks == 0 {
            if series.len() < 2 { BASELINE_SCORE } else { 70.0 }
        } else {
            clamp_score(20.0 + ratio_score(recoveries as usize, setbacks as usize) * 0.8)
        }
    };

    let patience_with_process = if series.len() < 2 {
        BASELINE_SCORE
    } else {
        clamp_score(100.0 - std_dev(&series) * 1.5 - self_criticism * 0.3)
    };

    CompassionateProgress {
        self_compassion,
        self_criticism,
        progress_acceptance,
        setback_resilience,
        growth_mindset,
        patience_with_process,
        celebration_of_small_wins,
    }
}
