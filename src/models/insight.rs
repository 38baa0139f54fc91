//! Insight and recommendation models.
//!
//! Both are produced fresh per call from a metrics snapshot and never cached
//! in the per-user store.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    #[display("emotional_pattern")]
    EmotionalPattern,
    #[display("growth_opportunity")]
    GrowthOpportunity,
    #[display("strength")]
    Strength,
    #[display("risk_alert")]
    RiskAlert,
    #[display("milestone")]
    Milestone,
    #[display("correlation")]
    Correlation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpathyInsight {
    pub id: String,
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub actionable: bool,
    pub evidence: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl EmpathyInsight {
    pub fn new(insight_type: InsightType, title: &str, description: String, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            insight_type,
            title: title.to_string(),
            description,
            confidence: confidence.clamp(0.0, 1.0),
            actionable: matches!(
                insight_type,
                InsightType::GrowthOpportunity | InsightType::RiskAlert | InsightType::Correlation
            ),
            evidence: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_evidence(mut self, evidence: String) -> Self {
        self.evidence.push(evidence);
        self
    }
}

/// Recommendation priority. Declaration order gives `Urgent` the highest rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
    #[display("urgent")]
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    #[display("burnout_prevention")]
    BurnoutPrevention,
    #[display("self_compassion")]
    SelfCompassion,
    #[display("social_connection")]
    SocialConnection,
    #[display("emotional_skills")]
    EmotionalSkills,
    #[display("growth_momentum")]
    GrowthMomentum,
    #[display("boundaries")]
    Boundaries,
    #[display("mindfulness")]
    Mindfulness,
    #[display("celebration")]
    Celebration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpathyRecommendation {
    pub id: String,
    pub category: RecommendationCategory,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action_steps: Vec<String>,
    pub expected_benefit: String,
    pub timeframe: String,
    pub actionable: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut priorities = vec![Priority::Medium, Priority::Urgent, Priority::Low, Priority::High];
        priorities.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            priorities,
            vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn test_insight_confidence_is_clamped() {
        let insight = EmpathyInsight::new(InsightType::Strength, "t", "d".into(), 1.7);
        assert_eq!(insight.confidence, 1.0);
        assert!(!insight.actionable);
    }

    #[test]
    fn test_risk_alerts_are_actionable() {
        let insight = EmpathyInsight::new(InsightType::RiskAlert, "t", "d".into(), 0.9);
        assert!(insight.actionable);
    }
}
