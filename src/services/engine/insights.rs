//! Insight generation.
//!
//! Candidates come from thresholds on the metrics snapshot and from simple
//! correlations in the mood history. The result is sorted by confidence and
//! capped at [`MAX_INSIGHTS`].

use chrono::Datelike;
use std::collections::HashMap;

use crate::models::entry::{MoodEntry, SocialSupport};
use crate::models::insight::{EmpathyInsight, InsightType};
use crate::models::metrics::{QuantifiedEmpathyMetrics, ResilienceKind};
use crate::models::prediction::TrajectoryDirection;
use crate::services::predictive::BURNOUT_THRESHOLD;
use crate::services::scoring::mean;

pub const MAX_INSIGHTS: usize = 12;

/// Mood difference (0-10 scale) worth reporting as a correlation
const CORRELATION_GAP: f64 = 1.0;

const WEEKDAYS: [&str; 7] = [
    "Mondays",
    "Tuesdays",
    "Wednesdays",
    "Thursdays",
    "Fridays",
    "Saturdays",
    "Sundays",
];

/// Confidence grows with the amount of evidence, saturating at `full_at` entries
fn evidence_confidence(base: f64, evidence: usize, full_at: usize) -> f64 {
    let coverage = (evidence as f64 / full_at.max(1) as f64).min(1.0);
    base * (0.5 + 0.5 * coverage)
}

pub fn generate_insights(metrics: &QuantifiedEmpathyMetrics, history: &[MoodEntry]) -> Vec<EmpathyInsight> {
    let mut insights = Vec::new();
    let n = metrics.entries_analyzed;

    strength_insights(metrics, n, &mut insights);
    risk_insights(metrics, n, &mut insights);
    growth_insights(metrics, n, &mut insights);
    milestone_insights(metrics, &mut insights);
    weekday_insight(history, &mut insights);
    support_correlation(history, &mut insights);
    coping_correlations(history, &mut insights);

    rank_insights(insights)
}

/// Sort by descending confidence and keep the top [`MAX_INSIGHTS`]
pub fn rank_insights(mut insights: Vec<EmpathyInsight>) -> Vec<EmpathyInsight> {
    insights.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    insights.truncate(MAX_INSIGHTS);
    insights
}

fn strength_insights(metrics: &QuantifiedEmpathyMetrics, n: usize, out: &mut Vec<EmpathyInsight>) {
    let cp = &metrics.compassionate_progress;
    let ei = &metrics.emotional_intelligence;
    let resilience = &metrics.humanized_metrics.resilience_pattern;

    if cp.self_compassion >= 70.0 {
        out.push(
            EmpathyInsight::new(
                InsightType::Strength,
                "You treat yourself with kindness",
                "Your notes show a steady habit of self-compassion, which supports recovery on hard days."
                    .to_string(),
                evidence_confidence(0.85, n, 10),
            )
            .with_evidence(format!("Self-compassion score {:.0}", cp.self_compassion)),
        );
    }

    if ei.emotional_vocabulary >= 70.0 {
        out.push(
            EmpathyInsight::new(
                InsightType::Strength,
                "Rich emotional vocabulary",
                "You name your feelings precisely, which makes them easier to work with.".to_string(),
                evidence_confidence(0.8, n, 10),
            )
            .with_evidence(format!("Emotional vocabulary score {:.0}", ei.emotional_vocabulary)),
        );
    }

    if matches!(resilience.kind, ResilienceKind::Bouncing | ResilienceKind::Building) && resilience.strength >= 60.0 {
        out.push(
            EmpathyInsight::new(
                InsightType::Strength,
                "Resilience is showing",
                format!(
                    "Your mood pattern looks {}: you have recovered from {} setbacks.",
                    resilience.kind, resilience.recoveries
                ),
                evidence_confidence(0.75, n, 14),
            )
            .with_evidence(format!("Resilience strength {:.0}", resilience.strength)),
        );
    }
}

fn risk_insights(metrics: &QuantifiedEmpathyMetrics, n: usize, out: &mut Vec<EmpathyInsight>) {
    let risk = &metrics.predictive_metrics.burnout_risk;
    if risk.current_risk_level > BURNOUT_THRESHOLD {
        let mut insight = EmpathyInsight::new(
            InsightType::RiskAlert,
            "Burnout risk is elevated",
            "Recent pain, mood and stress together point toward exhaustion. Lightening the load now can prevent a harder crash."
                .to_string(),
            0.6 + risk.current_risk_level / 250.0,
        );
        for factor in &risk.risk_factors {
            insight = insight.with_evidence(factor.clone());
        }
        out.push(insight);
    }

    let cp = &metrics.compassionate_progress;
    if cp.self_criticism >= 60.0 {
        out.push(
            EmpathyInsight::new(
                InsightType::RiskAlert,
                "Harsh self-talk",
                "Your notes often blame yourself. Self-criticism tends to deepen low moods.".to_string(),
                evidence_confidence(0.8, n, 10),
            )
            .with_evidence(format!("Self-criticism score {:.0}", cp.self_criticism)),
        );
    }

    let trajectory = &metrics.predictive_metrics.growth_trajectory;
    if trajectory.direction == TrajectoryDirection::Descending {
        out.push(
            EmpathyInsight::new(
                InsightType::EmotionalPattern,
                "Mood has been sliding",
                "Your most recent entries trend downward. Noticing it early gives you room to respond.".to_string(),
                evidence_confidence(0.7, n, 7),
            )
            .with_evidence(format!("Trend velocity {:.0}", trajectory.velocity)),
        );
    }
}

fn growth_insights(metrics: &QuantifiedEmpathyMetrics, n: usize, out: &mut Vec<EmpathyInsight>) {
    let ei = &metrics.emotional_intelligence;
    let kpis = &metrics.empathy_kpis;

    if kpis.connection_quality < 40.0 {
        out.push(
            EmpathyInsight::new(
                InsightType::GrowthOpportunity,
                "Connection could lift your days",
                "You have been carrying a lot on your own. Even brief contact with someone supportive tends to help."
                    .to_string(),
                evidence_confidence(0.7, n, 10),
            )
            .with_evidence(format!("Connection quality {:.0}", kpis.connection_quality)),
        );
    }

    if ei.emotional_granularity < 40.0 {
        out.push(
            EmpathyInsight::new(
                InsightType::GrowthOpportunity,
                "Name feelings more precisely",
                "Your notes reuse a few feeling words. Finer distinctions make emotions easier to regulate."
                    .to_string(),
                evidence_confidence(0.6, n, 10),
            )
            .with_evidence(format!("Emotional granularity {:.0}", ei.emotional_granularity)),
        );
    }

    let trajectory = &metrics.predictive_metrics.growth_trajectory;
    if trajectory.direction == TrajectoryDirection::Ascending {
        out.push(
            EmpathyInsight::new(
                InsightType::EmotionalPattern,
                "Your mood is on the rise",
                "Recent entries trend upward. Whatever you are doing lately seems to work.".to_string(),
                evidence_confidence(0.75, n, 7),
            )
            .with_evidence(format!("Trend velocity {:.0}", trajectory.velocity)),
        );
    }
}

fn milestone_insights(metrics: &QuantifiedEmpathyMetrics, out: &mut Vec<EmpathyInsight>) {
    let n = metrics.entries_analyzed;
    if let Some(milestone) = [100, 50, 30, 7].into_iter().find(|m| n >= *m) {
        out.push(EmpathyInsight::new(
            InsightType::Milestone,
            "Journaling milestone",
            format!("You have logged {} entries. Showing up for yourself counts.", milestone),
            0.95,
        ));
    }

    let moments = &metrics.humanized_metrics.growth_moments;
    if let Some(best) = moments.iter().max_by(|a, b| a.magnitude.total_cmp(&b.magnitude)) {
        out.push(
            EmpathyInsight::new(
                InsightType::Milestone,
                "A moment of growth",
                format!("On {} your mood rose noticeably: {}", best.timestamp.format("%b %e"), best.description),
                0.7,
            )
            .with_evidence(format!("{} growth moments", moments.len())),
        );
    }
}

fn weekday_insight(history: &[MoodEntry], out: &mut Vec<EmpathyInsight>) {
    let mut by_day: HashMap<usize, Vec<f64>> = HashMap::new();
    for entry in history {
        by_day
            .entry(entry.timestamp.weekday().num_days_from_monday() as usize)
            .or_default()
            .push(entry.mood);
    }
    if by_day.len() < 3 {
        return;
    }

    let overall = mean(&history.iter().map(|e| e.mood).collect::<Vec<_>>()).unwrap_or(5.0);
    let lowest = by_day
        .iter()
        .filter(|(_, moods)| moods.len() >= 2)
        .filter_map(|(day, moods)| mean(moods).map(|m| (*day, m, moods.len())))
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    if let Some((day, avg, count)) = lowest {
        if overall - avg >= 1.5 {
            out.push(
                EmpathyInsight::new(
                    InsightType::EmotionalPattern,
                    "A harder day of the week",
                    format!(
                        "{} tend to be harder: mood averages {:.1} versus {:.1} overall.",
                        WEEKDAYS[day], avg, overall
                    ),
                    evidence_confidence(0.75, count, 4),
                )
                .with_evidence(format!("{} entries on {}", count, WEEKDAYS[day])),
            );
        }
    }
}

fn support_correlation(history: &[MoodEntry], out: &mut Vec<EmpathyInsight>) {
    let (supported, alone): (Vec<&MoodEntry>, Vec<&MoodEntry>) = history
        .iter()
        .partition(|e| e.social_support >= SocialSupport::Moderate);
    if supported.len() < 2 || alone.len() < 2 {
        return;
    }

    let with = mean(&supported.iter().map(|e| e.mood).collect::<Vec<_>>()).unwrap_or(0.0);
    let without = mean(&alone.iter().map(|e| e.mood).collect::<Vec<_>>()).unwrap_or(0.0);
    if with - without >= CORRELATION_GAP * 1.5 {
        out.push(
            EmpathyInsight::new(
                InsightType::Correlation,
                "Support lifts your mood",
                format!(
                    "On days with good support your mood averages {:.1}, compared with {:.1} on days you felt alone.",
                    with, without
                ),
                evidence_confidence(0.85, supported.len().min(alone.len()), 5),
            )
            .with_evidence(format!("{} supported days, {} days alone", supported.len(), alone.len())),
        );
    }
}

fn coping_correlations(history: &[MoodEntry], out: &mut Vec<EmpathyInsight>) {
    let mut usage: HashMap<String, Vec<f64>> = HashMap::new();
    for entry in history {
        for strategy in &entry.coping_strategies {
            usage
                .entry(strategy.trim().to_lowercase())
                .or_default()
                .push(entry.mood);
        }
    }

    let mut strategies: Vec<(String, Vec<f64>)> = usage.into_iter().filter(|(_, m)| m.len() >= 2).collect();
    strategies.sort_by(|a, b| a.0.cmp(&b.0));

    for (strategy, moods_with) in strategies {
        let moods_without: Vec<f64> = history
            .iter()
            .filter(|e| !e.coping_strategies.iter().any(|s| s.trim().to_lowercase() == strategy))
            .map(|e| e.mood)
            .collect();
        let (Some(with), Some(without)) = (mean(&moods_with), mean(&moods_without)) else {
            continue;
        };
        if with - without >= CORRELATION_GAP {
            out.push(
                EmpathyInsight::new(
                    InsightType::Correlation,
                    "A coping strategy that works",
                    format!(
                        "When you use {} your mood averages {:.1}, versus {:.1} otherwise.",
                        strategy, with, without
                    ),
                    evidence_confidence(0.8, moods_with.len(), 6),
                )
                .with_evidence(format!("Used {} times", moods_with.len())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn insight(confidence: f64) -> EmpathyInsight {
        EmpathyInsight::new(InsightType::Strength, "t", String::new(), confidence)
    }

    #[test]
    fn test_rank_sorts_and_caps() {
        let candidates: Vec<EmpathyInsight> = (0..20).map(|i| insight(i as f64 / 20.0)).collect();
        let ranked = rank_insights(candidates);

        assert_eq!(ranked.len(), MAX_INSIGHTS);
        assert_eq!(ranked[0].confidence, 0.95);
        assert!(ranked.windows(2).all(|p| p[0].confidence >= p[1].confidence));
    }

    #[test]
    fn test_coping_correlation() {
        let now = Utc::now();
        let history = vec![
            MoodEntry::new(now - Duration::days(4), 8.0).with_coping(&["Walking"]),
            MoodEntry::new(now - Duration::days(3), 7.5).with_coping(&["walking"]),
            MoodEntry::new(now - Duration::days(2), 4.0),
            MoodEntry::new(now - Duration::days(1), 4.5),
        ];
        let mut out = Vec::new();
        coping_correlations(&history, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].insight_type, InsightType::Correlation);
        assert!(out[0].description.contains("walking"));
        assert!(out[0].actionable);
    }

    #[test]
    fn test_coping_correlation_matches_non_ascii_names() {
        let now = Utc::now();
        let history = vec![
            MoodEntry::new(now - Duration::days(4), 6.0).with_coping(&["ÉTIREMENTS"]),
            MoodEntry::new(now - Duration::days(3), 6.0).with_coping(&["Étirements"]),
            MoodEntry::new(now - Duration::days(2), 4.5),
            MoodEntry::new(now - Duration::days(1), 4.5),
        ];
        let mut out = Vec::new();
        coping_correlations(&history, &mut out);

        assert_eq!(out.len(), 1);
        assert!(out[0].description.contains("étirements"));
        assert!(out[0].description.contains("versus 4.5"));
    }

    #[test]
    fn test_support_correlation_needs_both_groups() {
        let now = Utc::now();
        let history: Vec<MoodEntry> = (0..4)
            .map(|i| MoodEntry::new(now - Duration::days(i), 8.0).with_support(SocialSupport::Strong))
            .collect();
        let mut out = Vec::new();
        support_correlation(&history, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_weekday_insight() {
        // 2024-03-04 是星期一
        let monday = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let mut history = Vec::new();
        for week in 0..3 {
            let start = monday + Duration::weeks(week);
            history.push(MoodEntry::new(start, 2.0));
            history.push(MoodEntry::new(start + Duration::days(2), 7.0));
            history.push(MoodEntry::new(start + Duration::days(4), 7.0));
        }
        let mut out = Vec::new();
        weekday_insight(&history, &mut out);

        assert_eq!(out.len(), 1);
        assert!(out[0].description.starts_with("Mondays"));
    }
}
