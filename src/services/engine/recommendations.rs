//! Personalized recommendations.
//!
//! Each family is gated on thresholds in the metrics snapshot. Wording follows
//! the configured [`InterventionStyle`] and the number of action steps follows
//! [`PersonalizationDepth`].

use chrono::Utc;
use uuid::Uuid;

use crate::config::{EmpathyIntelligenceConfig, InterventionStyle};
use crate::models::insight::{EmpathyInsight, EmpathyRecommendation, InsightType, Priority, RecommendationCategory};
use crate::models::metrics::QuantifiedEmpathyMetrics;
use crate::models::prediction::TrajectoryDirection;
use crate::services::predictive::BURNOUT_THRESHOLD;

pub const MAX_RECOMMENDATIONS: usize = 8;

/// Risk level from which burnout prevention becomes urgent
const URGENT_RISK: f64 = 85.0;

/// Trajectory velocity that counts as real momentum
const MOMENTUM_VELOCITY: f64 = 30.0;

const MAX_CORRELATION_RECOMMENDATIONS: usize = 2;

struct Draft {
    category: RecommendationCategory,
    priority: Priority,
    title: &'static str,
    description: String,
    steps: &'static [&'static str],
    expected_benefit: &'static str,
}

pub fn generate_recommendations(
    metrics: &QuantifiedEmpathyMetrics,
    insights: &[EmpathyInsight],
    config: &EmpathyIntelligenceConfig,
) -> Vec<EmpathyRecommendation> {
    let mut drafts = Vec::new();

    burnout_family(metrics, &mut drafts);
    momentum_family(metrics, &mut drafts);
    compassion_family(metrics, &mut drafts);
    connection_family(metrics, &mut drafts);
    skills_family(metrics, &mut drafts);
    correlation_family(insights, &mut drafts);
    celebration_family(metrics, insights, &mut drafts);

    let recommendations = drafts
        .into_iter()
        .map(|draft| render(draft, config))
        .collect();
    rank_recommendations(recommendations)
}

/// Stable sort by descending priority, then keep the top [`MAX_RECOMMENDATIONS`]
pub fn rank_recommendations(mut recommendations: Vec<EmpathyRecommendation>) -> Vec<EmpathyRecommendation> {
    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

fn burnout_family(metrics: &QuantifiedEmpathyMetrics, out: &mut Vec<Draft>) {
    let risk = metrics.predictive_metrics.burnout_risk.current_risk_level;
    if risk <= BURNOUT_THRESHOLD {
        return;
    }

    let priority = if risk > URGENT_RISK { Priority::Urgent } else { Priority::High };
    let factors = &metrics.predictive_metrics.burnout_risk.risk_factors;
    let description = if factors.is_empty() {
        format!("Burnout risk is at {:.0}. Recovery time needs to come first for a while.", risk)
    } else {
        format!(
            "Burnout risk is at {:.0} ({}). Recovery time needs to come first for a while.",
            risk,
            factors.join(", ").to_lowercase()
        )
    };

    out.push(Draft {
        category: RecommendationCategory::BurnoutPrevention,
        priority,
        title: "Lighten the load",
        description,
        steps: &[
            "cancel or postpone one non-essential commitment",
            "schedule two short rest breaks into each day",
            "tell one trusted person how depleted you feel",
            "keep tomorrow's plan to the essentials",
            "check in with your care team about the current load",
        ],
        expected_benefit: "Lower stress and a buffer against a pain or mood crash",
    });

    out.push(Draft {
        category: RecommendationCategory::Boundaries,
        priority: Priority::High,
        title: "Protect your energy",
        description: "Clear limits on time and effort keep recovery from being crowded out.".to_string(),
        steps: &[
            "decline one new request this week",
            "set a fixed stop time for work",
            "protect one evening for recovery",
            "notice which activities drain you most and shorten them",
        ],
        expected_benefit: "More predictable energy across the week",
    });
}

fn momentum_family(metrics: &QuantifiedEmpathyMetrics, out: &mut Vec<Draft>) {
    let trajectory = &metrics.predictive_metrics.growth_trajectory;
    if trajectory.direction != TrajectoryDirection::Ascending || trajectory.velocity <= MOMENTUM_VELOCITY {
        return;
    }

    out.push(Draft {
        category: RecommendationCategory::GrowthMomentum,
        priority: Priority::Medium,
        title: "Build on your momentum",
        description: format!(
            "Your mood is climbing steadily (velocity {:.0}). This is a good moment to anchor what is working.",
            trajectory.velocity
        ),
        steps: &[
            "write down three things that helped this week",
            "repeat your most helpful routine at the same time each day",
            "set one small, concrete goal for next week",
            "share the progress with someone who cares",
        ],
        expected_benefit: "Turning a good stretch into lasting habits",
    });
}

fn compassion_family(metrics: &QuantifiedEmpathyMetrics, out: &mut Vec<Draft>) {
    let cp = &metrics.compassionate_progress;
    if cp.self_criticism < 60.0 && cp.self_compassion >= 40.0 {
        return;
    }

    let priority = if cp.self_criticism >= 60.0 { Priority::High } else { Priority::Medium };
    out.push(Draft {
        category: RecommendationCategory::SelfCompassion,
        priority,
        title: "Speak to yourself like a friend",
        description: "Hard days go easier when the inner voice is on your side.".to_string(),
        steps: &[
            "when you notice self-blame, ask what you would tell a friend",
            "end each day by naming one thing you handled",
            "place a hand on your chest and take three slow breaths when it gets hard",
            "write yourself a short note of encouragement",
        ],
        expected_benefit: "Less rumination and quicker recovery after setbacks",
    });
}

fn connection_family(metrics: &QuantifiedEmpathyMetrics, out: &mut Vec<Draft>) {
    if metrics.empathy_kpis.connection_quality >= 40.0 {
        return;
    }

    out.push(Draft {
        category: RecommendationCategory::SocialConnection,
        priority: Priority::Medium,
        title: "Reach out a little",
        description: "Small moments of contact ease the weight of carrying things alone.".to_string(),
        steps: &[
            "send a short message to someone you trust",
            "plan one low-effort social moment this week",
            "look into a peer support group for people with chronic pain",
        ],
        expected_benefit: "Feeling understood and less isolated",
    });
}

fn skills_family(metrics: &QuantifiedEmpathyMetrics, out: &mut Vec<Draft>) {
    let ei = &metrics.emotional_intelligence;

    if ei.emotional_granularity < 40.0 || ei.emotional_vocabulary < 40.0 {
        out.push(Draft {
            category: RecommendationCategory::EmotionalSkills,
            priority: Priority::Low,
            title: "Expand your feelings vocabulary",
            description: "Naming emotions precisely makes them easier to understand and regulate.".to_string(),
            steps: &[
                "add one specific feeling word to each journal entry",
                "use a feelings wheel when the first word feels too broad",
                "note where in your body you feel the emotion",
            ],
            expected_benefit: "Clearer emotional awareness",
        });
    }

    if ei.self_regulation < 40.0 {
        out.push(Draft {
            category: RecommendationCategory::Mindfulness,
            priority: Priority::Medium,
            title: "Practice a steadying pause",
            description: "Brief mindful pauses widen the gap between a trigger and a reaction.".to_string(),
            steps: &[
                "try a two-minute breathing exercise each morning",
                "pause for three breaths before responding when upset",
                "do a short body scan before sleep",
            ],
            expected_benefit: "Calmer responses on high-pain days",
        });
    }
}

fn correlation_family(insights: &[EmpathyInsight], out: &mut Vec<Draft>) {
    for insight in insights
        .iter()
        .filter(|i| i.insight_type == InsightType::Correlation)
        .take(MAX_CORRELATION_RECOMMENDATIONS)
    {
        out.push(Draft {
            category: RecommendationCategory::Mindfulness,
            priority: Priority::Medium,
            title: "Keep doing what works",
            description: insight.description.clone(),
            steps: &[
                "plan the helpful activity into the coming week",
                "notice how you feel before and after it",
                "reach for it early on difficult days",
            ],
            expected_benefit: "More good days built on proven strategies",
        });
    }
}

fn celebration_family(metrics: &QuantifiedEmpathyMetrics, insights: &[EmpathyInsight], out: &mut Vec<Draft>) {
    let strengths = &metrics.humanized_metrics.strengths_discovered;
    let milestone = insights.iter().any(|i| i.insight_type == InsightType::Milestone);
    if strengths.is_empty() && !milestone {
        return;
    }

    let description = if strengths.is_empty() {
        "You reached a milestone. Taking a moment to notice it matters.".to_string()
    } else {
        format!("Your strengths are showing: {}.", strengths.join(", ").to_lowercase())
    };
    out.push(Draft {
        category: RecommendationCategory::Celebration,
        priority: Priority::Low,
        title: "Celebrate your progress",
        description,
        steps: &[
            "mark the milestone with something you enjoy",
            "reread an entry from a harder time and notice the change",
            "tell someone about a strength you have found",
        ],
        expected_benefit: "Motivation that comes from seeing your own growth",
    });
}

fn render(draft: Draft, config: &EmpathyIntelligenceConfig) -> EmpathyRecommendation {
    let style = config.intervention_style;
    let action_steps = draft
        .steps
        .iter()
        .take(config.personalization_depth.max_action_steps())
        .map(|step| phrase_step(style, step))
        .collect();

    EmpathyRecommendation {
        id: Uuid::new_v4().to_string(),
        category: draft.category,
        priority: draft.priority,
        title: draft.title.to_string(),
        description: frame_description(style, &draft.description),
        action_steps,
        expected_benefit: draft.expected_benefit.to_string(),
        timeframe: timeframe(draft.priority).to_string(),
        actionable: true,
        timestamp: Utc::now(),
    }
}

fn phrase_step(style: InterventionStyle, step: &str) -> String {
    match style {
        InterventionStyle::Gentle => format!("If it feels manageable, you might {}", step),
        InterventionStyle::Direct => capitalize(step),
        InterventionStyle::Collaborative => format!("Let's {}", step),
    }
}

fn frame_description(style: InterventionStyle, description: &str) -> String {
    match style {
        InterventionStyle::Gentle => format!("{} Go at your own pace.", description),
        InterventionStyle::Direct => description.to_string(),
        InterventionStyle::Collaborative => format!("{} We can work on this together.", description),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn timeframe(priority: Priority) -> &'static str {
    match priority {
        Priority::Urgent => "Today",
        Priority::High => "This week",
        Priority::Medium => "Next two weeks",
        Priority::Low => "This month",
    }
}
