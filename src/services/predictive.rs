//! Predictive module.
//!
//! Short-horizon forecasting from the most recent journal entries. Nothing
//! here is learned; the numbers come from a directional trend heuristic,
//! averages and volatility over a window of at most [`RECENT_WINDOW`] entries.

use crate::config::PredictionHorizon;
use crate::models::entry::{MoodEntry, PainEntry, SocialSupport, sorted_by_time};
use crate::models::metrics::BASELINE_SCORE;
use crate::models::prediction::{
    BurnoutRisk, EmpathyForecast, GrowthTrajectory, PredictiveMetrics, TrajectoryDirection,
};
use crate::services::scoring::{clamp_score, mean, safe_div};

/// Number of most recent entries the model looks at
pub const RECENT_WINDOW: usize = 7;

/// Risk level considered burnout territory
pub const BURNOUT_THRESHOLD: f64 = 70.0;

/// Trend (in `[-100, 100]`) beyond which a series counts as clearly moving
const TREND_SIGNIFICANT: f64 = 20.0;

/// Standard deviation (0-100 scale) beyond which a series counts as fluctuating
const FLUCTUATION_STD: f64 = 25.0;

/// Directional trend of a series
///
/// `(increases - decreases) / (n - 1) * 100`, so the result is in
/// `[-100, 100]` and ignores the size of each step. Fewer than two values
/// give `0`.
pub fn calculate_trend(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }

    let (increases, decreases) = series.windows(2).fold((0i64, 0i64), |(up, down), pair| {
        if pair[1] > pair[0] {
            (up + 1, down)
        } else if pair[1] < pair[0] {
            (up, down + 1)
        } else {
            (up, down)
        }
    });

    (increases - decreases) as f64 / (series.len() - 1) as f64 * 100.0
}

/// Population variance, `0` for an empty series
pub fn calculate_variance(series: &[f64]) -> f64 {
    let Some(avg) = mean(series) else {
        return 0.0;
    };
    series.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / series.len() as f64
}

/// Summary of the recent window used by every part of the model
struct RecentWindow {
    mood: Vec<f64>,
    pain: Vec<f64>,
    stress: Option<f64>,
    hopefulness: Option<f64>,
    support: Option<f64>,
    coping_share: f64,
}

impl RecentWindow {
    fn new(pain: &[PainEntry], mood: &[MoodEntry]) -> Self {
        let pain = sorted_by_time(pain, |e| e.timestamp);
        let mood = sorted_by_time(mood, |e| e.timestamp);
        let pain = &pain[pain.len().saturating_sub(RECENT_WINDOW)..];
        let mood = &mood[mood.len().saturating_sub(RECENT_WINDOW)..];

        let scaled = |values: Vec<f64>| mean(&values);

        Self {
            mood: mood.iter().map(|e| clamp_score(e.mood * 10.0)).collect(),
            pain: pain.iter().map(|e| clamp_score(e.pain_level * 10.0)).collect(),
            stress: scaled(mood.iter().map(|e| clamp_score(e.stress * 10.0)).collect()),
            hopefulness: scaled(mood.iter().map(|e| clamp_score(e.hopefulness * 10.0)).collect()),
            support: scaled(mood.iter().map(|e| e.social_support.score()).collect()),
            coping_share: safe_div(
                mood.iter().filter(|e| !e.coping_strategies.is_empty()).count() as f64,
                mood.len() as f64,
                0.0,
            ),
        }
    }

    fn is_empty(&self) -> bool {
        self.mood.is_empty() && self.pain.is_empty()
    }
}

/// Build the forward-looking model for one user
///
/// Every numeric leaf is clamped to `[0, 100]`. Without entries the result is
/// the neutral baseline.
pub fn build_predictive_model(
    pain: &[PainEntry],
    mood: &[MoodEntry],
    horizon: PredictionHorizon,
) -> PredictiveMetrics {
    let window = RecentWindow::new(pain, mood);
    if window.is_empty() {
        return baseline(horizon);
    }

    let avg_mood = mean(&window.mood).unwrap_or(BASELINE_SCORE);
    let avg_pain = mean(&window.pain).unwrap_or(BASELINE_SCORE);
    let stress = window.stress.unwrap_or(BASELINE_SCORE);
    let volatility = calculate_variance(&window.mood).sqrt().min(100.0);
    let mood_trend = calculate_trend(&window.mood);
    let pain_trend = calculate_trend(&window.pain);

    let burnout_risk = burnout_risk(&window, avg_mood, avg_pain, stress, volatility, mood_trend, pain_trend);
    let growth_trajectory = growth_trajectory(avg_mood, mood_trend, volatility);
    let empathy_forecast = forecast(&window, avg_mood, mood_trend, volatility, horizon);
    let optimal_interventions = interventions(&burnout_risk, &growth_trajectory, &window);

    PredictiveMetrics {
        empathy_forecast,
        burnout_risk,
        growth_trajectory,
        optimal_interventions,
    }
}

/// Blend the data-driven forecast confidence with a cached model's accuracy
pub fn blend_confidence(metrics: &mut PredictiveMetrics, model_accuracy: f64) {
    let forecast = &mut metrics.empathy_forecast;
    forecast.confidence = clamp_score(forecast.confidence * 0.7 + clamp_score(model_accuracy) * 0.3);
}

fn baseline(horizon: PredictionHorizon) -> PredictiveMetrics {
    PredictiveMetrics {
        empathy_forecast: EmpathyForecast {
            next_week: BASELINE_SCORE,
            next_month: BASELINE_SCORE,
            horizon,
            horizon_projection: BASELINE_SCORE,
            confidence: 0.0,
        },
        burnout_risk: BurnoutRisk {
            current_risk_level: BASELINE_SCORE,
            risk_factors: Vec::new(),
            protective_factors: Vec::new(),
            days_until_risk: None,
        },
        growth_trajectory: GrowthTrajectory {
            direction: TrajectoryDirection::Stable,
            velocity: 0.0,
            projected_score: BASELINE_SCORE,
        },
        optimal_interventions: vec!["Keep journaling so patterns can emerge".to_string()],
    }
}

fn burnout_risk(
    window: &RecentWindow,
    avg_mood: f64,
    avg_pain: f64,
    stress: f64,
    volatility: f64,
    mood_trend: f64,
    pain_trend: f64,
) -> BurnoutRisk {
    let mut level = avg_pain * 0.35 + (100.0 - avg_mood) * 0.35 + stress * 0.2 + volatility * 0.1;
    if mood_trend < -30.0 {
        level += 10.0;
    }
    if pain_trend > 30.0 {
        level += 10.0;
    }
    let current_risk_level = clamp_score(level);

    let mut risk_factors = Vec::new();
    if !window.pain.is_empty() && avg_pain >= 60.0 {
        risk_factors.push("Persistent high pain".to_string());
    }
    if !window.mood.is_empty() && avg_mood <= 40.0 {
        risk_factors.push("Low average mood".to_string());
    }
    if window.stress.is_some() && stress >= 60.0 {
        risk_factors.push("Elevated stress".to_string());
    }
    if volatility >= FLUCTUATION_STD {
        risk_factors.push("Large mood swings".to_string());
    }
    if mood_trend < -30.0 {
        risk_factors.push("Declining mood".to_string());
    }
    if pain_trend > 30.0 {
        risk_factors.push("Rising pain".to_string());
    }

    let mut protective_factors = Vec::new();
    if window.support.is_some_and(|s| s >= SocialSupport::Moderate.score()) {
        protective_factors.push("Social support".to_string());
    }
    if window.coping_share >= 0.5 {
        protective_factors.push("Active coping strategies".to_string());
    }
    if mood_trend > 30.0 {
        protective_factors.push("Improving mood".to_string());
    }
    if window.hopefulness.is_some_and(|h| h >= 60.0) {
        protective_factors.push("Hopefulness".to_string());
    }

    // 当前趋势下每天的风险增量；没有恶化趋势时不给出估计
    let days_until_risk = if current_risk_level >= BURNOUT_THRESHOLD {
        Some(0)
    } else {
        let daily_increase = ((-mood_trend).max(0.0) + pain_trend.max(0.0)) / 20.0;
        if daily_increase > 0.0 {
            Some(((BURNOUT_THRESHOLD - current_risk_level) / daily_increase).ceil() as u32)
        } else {
            None
        }
    };

    BurnoutRisk {
        current_risk_level,
        risk_factors,
        protective_factors,
        days_until_risk,
    }
}

fn growth_trajectory(avg_mood: f64, mood_trend: f64, volatility: f64) -> GrowthTrajectory {
    let direction = if volatility > FLUCTUATION_STD {
        TrajectoryDirection::Fluctuating
    } else if mood_trend > TREND_SIGNIFICANT {
        TrajectoryDirection::Ascending
    } else if mood_trend < -TREND_SIGNIFICANT {
        TrajectoryDirection::Descending
    } else {
        TrajectoryDirection::Stable
    };

    GrowthTrajectory {
        direction,
        velocity: clamp_score(mood_trend.abs()),
        projected_score: clamp_score(avg_mood + mood_trend * 0.2),
    }
}

/// Projection damped for longer horizons
fn project(current: f64, daily_delta: f64, days: f64) -> f64 {
    clamp_score(current + daily_delta * days / (1.0 + days / 30.0))
}

fn forecast(
    window: &RecentWindow,
    avg_mood: f64,
    mood_trend: f64,
    volatility: f64,
    horizon: PredictionHorizon,
) -> EmpathyForecast {
    let current = window.mood.last().copied().unwrap_or(avg_mood) * 0.5 + avg_mood * 0.5;
    let daily_delta = mood_trend / 100.0 * 2.0;

    let coverage = window.mood.len() as f64 / RECENT_WINDOW as f64;
    let confidence = clamp_score(coverage * 70.0 + (100.0 - volatility) * 0.3);

    EmpathyForecast {
        next_week: project(current, daily_delta, 7.0),
        next_month: project(current, daily_delta, 30.0),
        horizon,
        horizon_projection: project(current, daily_delta, horizon.days() as f64),
        confidence,
    }
}

fn interventions(risk: &BurnoutRisk, trajectory: &GrowthTrajectory, window: &RecentWindow) -> Vec<String> {
    let mut out = Vec::new();

    if risk.current_risk_level > BURNOUT_THRESHOLD {
        out.push("Reduce load and schedule recovery time this week".to_string());
    }
    if risk.risk_factors.iter().any(|f| f == "Persistent high pain") {
        out.push("Review pain management with a clinician".to_string());
    }
    if window.support.is_none_or(|s| s < SocialSupport::Moderate.score()) {
        out.push("Plan one low-effort social contact".to_string());
    }
    match trajectory.direction {
        TrajectoryDirection::Ascending => out.push("Keep the routines that are working".to_string()),
        TrajectoryDirection::Descending => out.push("Check in daily with a short mood note".to_string()),
        TrajectoryDirection::Fluctuating => out.push("Track triggers around mood swings".to_string()),
        TrajectoryDirection::Stable => {}
    }
    if out.is_empty() {
        out.push("Maintain current self-care practices".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use rstest::rstest;

    fn mood_series(values: &[f64]) -> Vec<MoodEntry> {
        let now = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MoodEntry::new(now - Duration::days((values.len() - i) as i64), *v))
            .collect()
    }

    #[rstest]
    #[case(&[1.0, 2.0, 3.0, 4.0], 100.0)]
    #[case(&[4.0, 3.0, 2.0, 1.0], -100.0)]
    #[case(&[5.0, 5.0, 5.0], 0.0)]
    #[case(&[1.0, 3.0, 2.0], 0.0)]
    #[case(&[1.0, 100.0, 101.0], 100.0)]
    #[case(&[7.0], 0.0)]
    #[case(&[], 0.0)]
    fn test_calculate_trend(#[case] series: &[f64], #[case] expected: f64) {
        assert_eq!(calculate_trend(series), expected);
    }

    #[test]
    fn test_calculate_variance() {
        assert_eq!(calculate_variance(&[]), 0.0);
        assert_eq!(calculate_variance(&[3.0, 3.0]), 0.0);
        assert_eq!(calculate_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 4.0);
    }

    #[test]
    fn test_empty_input_is_baseline() {
        let model = build_predictive_model(&[], &[], PredictionHorizon::Weekly);
        assert_eq!(model.burnout_risk.current_risk_level, 50.0);
        assert_eq!(model.empathy_forecast.next_week, 50.0);
        assert_eq!(model.growth_trajectory.direction, TrajectoryDirection::Stable);
        assert!(model.burnout_risk.days_until_risk.is_none());
    }

    #[test]
    fn test_only_recent_window_is_used() {
        let mut values = vec![1.0; 20];
        values.extend([8.0; RECENT_WINDOW]);
        let model = build_predictive_model(&[], &mood_series(&values), PredictionHorizon::Weekly);

        assert_eq!(model.growth_trajectory.direction, TrajectoryDirection::Stable);
        assert!(model.empathy_forecast.next_week > 75.0);
    }

    #[test]
    fn test_high_pain_and_low_mood_is_burnout() {
        let now = Utc::now();
        let pain: Vec<PainEntry> = (0..7).map(|i| PainEntry::new(now - Duration::days(i), 9.0)).collect();
        let mood: Vec<MoodEntry> = (0..7)
            .map(|i| MoodEntry::new(now - Duration::days(i), 1.0).with_stress(9.0, 8.0))
            .collect();

        let model = build_predictive_model(&pain, &mood, PredictionHorizon::Weekly);
        let risk = &model.burnout_risk;

        assert!(risk.current_risk_level > BURNOUT_THRESHOLD);
        assert_eq!(risk.days_until_risk, Some(0));
        assert!(risk.risk_factors.contains(&"Persistent high pain".to_string()));
        assert!(risk.risk_factors.contains(&"Elevated stress".to_string()));
    }

    #[test]
    fn test_rising_mood_is_ascending() {
        let model = build_predictive_model(
            &[],
            &mood_series(&[3.0, 4.0, 4.5, 5.0, 5.5, 6.0, 6.5]),
            PredictionHorizon::Monthly,
        );
        let trajectory = &model.growth_trajectory;

        assert_eq!(trajectory.direction, TrajectoryDirection::Ascending);
        assert_eq!(trajectory.velocity, 100.0);
        assert!(model.empathy_forecast.next_month > model.empathy_forecast.next_week);
        assert_eq!(model.empathy_forecast.horizon, PredictionHorizon::Monthly);
        assert_eq!(model.empathy_forecast.horizon_projection, model.empathy_forecast.next_month);
    }

    #[test]
    fn test_swings_are_fluctuating() {
        let model = build_predictive_model(
            &[],
            &mood_series(&[1.0, 9.0, 1.0, 9.0, 1.0, 9.0]),
            PredictionHorizon::Daily,
        );
        assert_eq!(model.growth_trajectory.direction, TrajectoryDirection::Fluctuating);
        assert!(
            model
                .burnout_risk
                .risk_factors
                .contains(&"Large mood swings".to_string())
        );
    }

    #[test]
    fn test_declining_mood_estimates_days_until_risk() {
        let model = build_predictive_model(
            &[],
            &mood_series(&[8.0, 7.5, 7.0, 6.5, 6.0, 5.5, 5.0]),
            PredictionHorizon::Weekly,
        );
        let days = model.burnout_risk.days_until_risk;
        assert!(days.is_some_and(|d| d > 0));
        assert_eq!(model.growth_trajectory.direction, TrajectoryDirection::Descending);
    }

    #[test]
    fn test_blend_confidence() {
        let mut model = build_predictive_model(&[], &mood_series(&[5.0; 7]), PredictionHorizon::Weekly);
        model.empathy_forecast.confidence = 100.0;
        blend_confidence(&mut model, 0.0);
        assert!((model.empathy_forecast.confidence - 70.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_trend_is_bounded(series in proptest::collection::vec(-1e6f64..1e6, 0..50)) {
            let trend = calculate_trend(&series);
            prop_assert!((-100.0..=100.0).contains(&trend));
        }

        #[test]
        fn prop_strictly_increasing_is_positive(start in -1e3f64..1e3, steps in proptest::collection::vec(0.01f64..10.0, 1..30)) {
            let mut series = vec![start];
            for step in steps {
                let last = *series.last().unwrap();
                series.push(last + step);
            }
            prop_assert!(calculate_trend(&series) > 0.0);
            let reversed: Vec<f64> = series.iter().rev().copied().collect();
            prop_assert!(calculate_trend(&reversed) < 0.0);
        }

        #[test]
        fn prop_model_is_bounded(
            moods in proptest::collection::vec(0.0f64..=10.0, 0..20),
            pains in proptest::collection::vec(0.0f64..=10.0, 0..20),
        ) {
            let now = Utc::now();
            let mood: Vec<MoodEntry> = moods.iter().enumerate()
                .map(|(i, m)| MoodEntry::new(now - Duration::hours(i as i64), *m))
                .collect();
            let pain: Vec<PainEntry> = pains.iter().enumerate()
                .map(|(i, p)| PainEntry::new(now - Duration::hours(i as i64), *p))
                .collect();

            let model = build_predictive_model(&pain, &mood, PredictionHorizon::Weekly);
            for value in [
                model.empathy_forecast.next_week,
                model.empathy_forecast.next_month,
                model.empathy_forecast.horizon_projection,
                model.empathy_forecast.confidence,
                model.burnout_risk.current_risk_level,
                model.growth_trajectory.velocity,
                model.growth_trajectory.projected_score,
            ] {
                prop_assert!((0.0..=100.0).contains(&value));
            }
        }
    }
}
