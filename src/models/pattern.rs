//! 用户模式数据模型
//!
//! 按用户缓存的派生数据：日志统计摘要与文化情境。两者都只保存拷贝出来的数值，
//! 不引用原始日志条目。

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::CulturalSensitivity;
use crate::models::entry::{MoodEntry, PainEntry, SocialSupport};

/// 用户日志模式摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPatternSummary {
    /// 所属用户
    pub user_id: String,

    /// 参与计算的条目数
    pub entries_seen: usize,

    /// 平均情绪（0-100）
    pub average_mood: Option<f64>,

    /// 平均疼痛（0-100）
    pub average_pain: Option<f64>,

    /// 平均压力（0-100）
    pub average_stress: Option<f64>,

    /// 最常用的应对策略（最多 3 个）
    pub dominant_coping: Vec<String>,

    /// 最常见的社会支持水平
    pub dominant_support: Option<SocialSupport>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl UserPatternSummary {
    /// 从日志条目派生摘要
    pub fn from_entries(user_id: &str, pain: &[PainEntry], mood: &[MoodEntry]) -> Self {
        let average = |values: Vec<f64>| {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64 * 10.0)
            }
        };

        let mut coping_counts: HashMap<String, usize> = HashMap::new();
        for strategy in mood.iter().flat_map(|e| e.coping_strategies.iter()) {
            *coping_counts.entry(strategy.trim().to_lowercase()).or_insert(0) += 1;
        }
        let mut coping: Vec<(String, usize)> = coping_counts.into_iter().collect();
        // 频次降序，同频按名称排序保证结果稳定
        coping.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut support_counts: HashMap<SocialSupport, usize> = HashMap::new();
        for entry in mood {
            *support_counts.entry(entry.social_support).or_insert(0) += 1;
        }
        let dominant_support = support_counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(support, _)| support);

        Self {
            user_id: user_id.to_string(),
            entries_seen: pain.len() + mood.len(),
            average_mood: average(mood.iter().map(|e| e.mood).collect()),
            average_pain: average(pain.iter().map(|e| e.pain_level).collect()),
            average_stress: average(mood.iter().map(|e| e.stress).collect()),
            dominant_coping: coping.into_iter().take(3).map(|(s, _)| s).collect(),
            dominant_support,
            updated_at: Utc::now(),
        }
    }
}

/// 支持取向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SupportOrientation {
    /// 更多依靠自我调节
    #[display("individual")]
    Individual,
    /// 兼顾
    #[display("balanced")]
    Balanced,
    /// 更多依靠家人、朋友与社群
    #[display("collective")]
    Collective,
}

/// 文化情境
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalContext {
    pub sensitivity: CulturalSensitivity,
    pub support_orientation: SupportOrientation,
    /// 情境标签的多样性 0-100
    pub context_diversity: f64,
    pub updated_at: DateTime<Utc>,
}

impl CulturalContext {
    pub fn derive(sensitivity: CulturalSensitivity, mood: &[MoodEntry]) -> Self {
        let support_orientation = if mood.is_empty() {
            SupportOrientation::Balanced
        } else {
            let avg = mood.iter().map(|e| e.social_support.score()).sum::<f64>() / mood.len() as f64;
            if avg >= 65.0 {
                SupportOrientation::Collective
            } else if avg <= 30.0 {
                SupportOrientation::Individual
            } else {
                SupportOrientation::Balanced
            }
        };

        let mut contexts: Vec<String> = mood
            .iter()
            .filter_map(|e| e.context.as_ref())
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        contexts.sort();
        contexts.dedup();
        let context_diversity = (contexts.len() as f64 * 20.0).min(100.0);

        Self {
            sensitivity,
            support_orientation,
            context_diversity,
            updated_at: Utc::now(),
        }
    }
}
