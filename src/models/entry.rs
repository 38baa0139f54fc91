//! 日志条目数据模型
//!
//! 疼痛与情绪日志条目由调用方持有，引擎只借用读取，从不修改。

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 社会支持水平
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SocialSupport {
    #[display("none")]
    None,
    #[display("limited")]
    Limited,
    #[default]
    #[display("moderate")]
    Moderate,
    #[display("strong")]
    Strong,
}

impl SocialSupport {
    /// 映射到 0-100 分
    pub fn score(self) -> f64 {
        match self {
            SocialSupport::None => 0.0,
            SocialSupport::Limited => 30.0,
            SocialSupport::Moderate => 65.0,
            SocialSupport::Strong => 100.0,
        }
    }
}

/// 情绪日志条目
///
/// 所有量表均为 0-10。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodEntry {
    /// 条目唯一标识
    #[serde(default = "new_entry_id")]
    pub id: String,

    /// 记录时间
    pub timestamp: DateTime<Utc>,

    /// 情绪
    pub mood: f64,

    /// 精力
    #[serde(default)]
    pub energy: f64,

    /// 焦虑
    #[serde(default)]
    pub anxiety: f64,

    /// 压力
    #[serde(default)]
    pub stress: f64,

    /// 希望感
    #[serde(default)]
    pub hopefulness: f64,

    /// 情绪清晰度
    #[serde(default)]
    pub emotional_clarity: f64,

    /// 情绪调节
    #[serde(default)]
    pub emotional_regulation: f64,

    /// 社会支持
    #[serde(default)]
    pub social_support: SocialSupport,

    /// 应对策略
    #[serde(default)]
    pub coping_strategies: Vec<String>,

    /// 情境标签（work, home, clinic ...）
    #[serde(default)]
    pub context: Option<String>,

    /// 自由文本
    #[serde(default)]
    pub notes: String,
}

impl MoodEntry {
    /// 创建一个只有情绪分的条目，其余量表取中值
    pub fn new(timestamp: DateTime<Utc>, mood: f64) -> Self {
        Self {
            id: new_entry_id(),
            timestamp,
            mood,
            energy: 5.0,
            anxiety: 5.0,
            stress: 5.0,
            hopefulness: 5.0,
            emotional_clarity: 5.0,
            emotional_regulation: 5.0,
            social_support: SocialSupport::Moderate,
            coping_strategies: Vec::new(),
            context: None,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn with_support(mut self, support: SocialSupport) -> Self {
        self.social_support = support;
        self
    }

    pub fn with_stress(mut self, stress: f64, anxiety: f64) -> Self {
        self.stress = stress;
        self.anxiety = anxiety;
        self
    }

    pub fn with_coping(mut self, strategies: &[&str]) -> Self {
        self.coping_strategies = strategies.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// 疼痛日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PainEntry {
    /// 条目唯一标识
    #[serde(default = "new_entry_id")]
    pub id: String,

    /// 记录时间
    pub timestamp: DateTime<Utc>,

    /// 疼痛程度 0-10
    pub pain_level: f64,

    /// 疼痛部位
    #[serde(default)]
    pub locations: Vec<String>,

    /// 伴随症状
    #[serde(default)]
    pub symptoms: Vec<String>,

    /// 对日常功能的影响 0-10
    #[serde(default)]
    pub functional_impact: f64,

    /// 自由文本
    #[serde(default)]
    pub notes: String,
}

impl PainEntry {
    pub fn new(timestamp: DateTime<Utc>, pain_level: f64) -> Self {
        Self {
            id: new_entry_id(),
            timestamp,
            pain_level,
            locations: Vec::new(),
            symptoms: Vec::new(),
            functional_impact: 0.0,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }
}

/// 调用方可能以任意顺序传入条目，内部计算一律基于按时间排序的借用视图
pub fn sorted_by_time<T, F>(entries: &[T], timestamp: F) -> Vec<&T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut sorted: Vec<&T> = entries.iter().collect();
    sorted.sort_by_key(|e| timestamp(e));
    sorted
}

fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_mood_entry_builder() {
        let entry = MoodEntry::new(Utc::now(), 7.0)
            .with_notes("Walked with a friend")
            .with_support(SocialSupport::Strong)
            .with_coping(&["walking", "breathing"]);

        assert_eq!(entry.mood, 7.0);
        assert_eq!(entry.social_support, SocialSupport::Strong);
        assert_eq!(entry.coping_strategies.len(), 2);
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_deserialize_minimal_mood_entry() {
        let json = r#"{"timestamp":"2024-03-01T08:00:00Z","mood":6}"#;
        let entry: MoodEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.mood, 6.0);
        assert_eq!(entry.social_support, SocialSupport::Moderate);
        assert!(entry.notes.is_empty());
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_sorted_by_time_does_not_reorder_input() {
        let now = Utc::now();
        let entries = vec![
            PainEntry::new(now, 3.0),
            PainEntry::new(now - Duration::days(2), 5.0),
            PainEntry::new(now - Duration::days(1), 4.0),
        ];

        let sorted = sorted_by_time(&entries, |e| e.timestamp);
        let levels: Vec<f64> = sorted.iter().map(|e| e.pain_level).collect();
        assert_eq!(levels, vec![5.0, 4.0, 3.0]);
        assert_eq!(entries[0].pain_level, 3.0);
    }

    #[test]
    fn test_social_support_ordering() {
        assert!(SocialSupport::Strong > SocialSupport::Limited);
        assert_eq!(SocialSupport::None.score(), 0.0);
        assert_eq!(SocialSupport::Strong.score(), 100.0);
    }
}
