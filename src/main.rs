use anyhow::Context;
use serde::{Deserialize, Serialize};
use solace::config::loader::{ConfigLoader, default_config_path};
use solace::models::{
    CacheStats, EmpathyInsight, EmpathyRecommendation, MemoryReport, MoodEntry, PainEntry,
    QuantifiedEmpathyMetrics,
};
use solace::observability::init_tracing;
use solace::services::{EmpathyMetricsService, create_empathy_engine};
use std::path::PathBuf;
use tracing::info;

/// 输入日志文件
#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(default = "default_user")]
    user_id: String,
    #[serde(default)]
    pain: Vec<PainEntry>,
    #[serde(default)]
    mood: Vec<MoodEntry>,
}

fn default_user() -> String {
    "anonymous".to_string()
}

#[derive(Serialize)]
struct Output<'a> {
    metrics: &'a QuantifiedEmpathyMetrics,
    insights: Vec<EmpathyInsight>,
    recommendations: Vec<EmpathyRecommendation>,
    cache: CacheStats,
    memory: MemoryReport,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let journal_path = PathBuf::from(
        args.next()
            .context("usage: solace <journal.json> [solace.toml]")?,
    );
    let config_path = args.next().map(PathBuf::from).unwrap_or_else(default_config_path);

    let config = ConfigLoader::load_from(config_path).context("failed to load configuration")?;
    ConfigLoader::validate(&config)?;
    let _guard = init_tracing(&config.logging);
    info!("Starting {} ({})", config.app_name, config.environment);

    let raw = tokio::fs::read_to_string(&journal_path)
        .await
        .with_context(|| format!("failed to read {}", journal_path.display()))?;
    let journal: Journal = serde_json::from_str(&raw).context("invalid journal JSON")?;
    info!(
        "Loaded {} pain and {} mood entries for {}",
        journal.pain.len(),
        journal.mood.len(),
        journal.user_id
    );

    let engine = create_empathy_engine(&config)?;

    let metrics = engine
        .calculate_advanced_empathy_metrics(&journal.user_id, &journal.pain, &journal.mood)
        .await;
    let insights = engine
        .generate_advanced_insights(&journal.user_id, &metrics, &journal.mood)
        .await;
    let recommendations = engine
        .generate_personalized_recommendations(&journal.user_id, &metrics, &insights)
        .await;

    let output = Output {
        metrics: &metrics,
        insights,
        recommendations,
        cache: engine.cache_stats(),
        memory: engine.memory_report(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    engine.destroy();
    Ok(())
}
