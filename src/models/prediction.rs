//! 预测模型数据结构

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PredictionHorizon;

/// 共情水平预测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpathyForecast {
    pub next_week: f64,
    pub next_month: f64,
    /// 配置的预测时间范围上的投影值
    pub horizon: PredictionHorizon,
    pub horizon_projection: f64,
    pub confidence: f64,
}

/// 倦怠风险
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnoutRisk {
    pub current_risk_level: f64,
    pub risk_factors: Vec<String>,
    pub protective_factors: Vec<String>,
    /// 按当前趋势估计到达高风险区的天数；已处于高风险时为 0，无下行趋势时为 None
    pub days_until_risk: Option<u32>,
}

/// 成长轨迹方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryDirection {
    #[display("ascending")]
    Ascending,
    #[display("stable")]
    Stable,
    #[display("descending")]
    Descending,
    #[display("fluctuating")]
    Fluctuating,
}

/// 成长轨迹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthTrajectory {
    pub direction: TrajectoryDirection,
    pub velocity: f64,
    pub projected_score: f64,
}

/// 预测性指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveMetrics {
    pub empathy_forecast: EmpathyForecast,
    pub burnout_risk: BurnoutRisk,
    pub growth_trajectory: GrowthTrajectory,
    pub optimal_interventions: Vec<String>,
}

/// 训练数据（派生值的拷贝，不引用日志条目）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    pub mood_series: Vec<f64>,
    pub pain_series: Vec<f64>,
}

/// 模型上一次给出的预测
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPredictions {
    pub expected_mood: Option<f64>,
    pub burnout_risk: Option<f64>,
}

/// 按用户缓存的预测模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionModel {
    pub model_id: String,
    pub user_id: String,
    /// 历史预测与实际结果的吻合度 0-100
    pub accuracy: f64,
    pub training_data: TrainingData,
    pub predictions: ModelPredictions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PredictionModel {
    /// 训练窗口上限
    pub const MAX_TRAINING_POINTS: usize = 30;

    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            model_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            accuracy: 50.0,
            training_data: TrainingData::default(),
            predictions: ModelPredictions::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 用新观测更新模型
    ///
    /// 若上次给出过情绪预测，则按 `learning_rate` 把准确度向本次吻合度移动。
    pub fn observe(
        &mut self,
        mood_series: &[f64],
        pain_series: &[f64],
        predictions: ModelPredictions,
        learning_rate: f64,
    ) {
        if let (Some(expected), Some(actual)) =
            (self.predictions.expected_mood, mood_series.last().copied())
        {
            let agreement = (100.0 - (expected - actual).abs()).clamp(0.0, 100.0);
            self.accuracy += (agreement - self.accuracy) * learning_rate;
            self.accuracy = self.accuracy.clamp(0.0, 100.0);
        }

        self.training_data.mood_series = tail(mood_series, Self::MAX_TRAINING_POINTS);
        self.training_data.pain_series = tail(pain_series, Self::MAX_TRAINING_POINTS);
        self.predictions = predictions;
        self.updated_at = Utc::now();
    }
}

fn tail(series: &[f64], limit: usize) -> Vec<f64> {
    series[series.len().saturating_sub(limit)..].to_vec()
}
