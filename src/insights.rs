use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BuildStabilityInsights {
    pub provider: String,
    pub project: String,
    pub collected_at: DateTime<Utc>,
    pub days: u32,
    pub since: DateTime<Utc>,
    pub metrics: StabilityMetrics,
}

/// Named build-stability metrics over the analysed window.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StabilityMetrics {
    pub builds: usize,
    pub successful_builds: usize,
    pub failed_builds: usize,
    pub success_rate: f64,
    pub avg_duration_seconds: f64,
    pub shortest_duration_seconds: f64,
    pub longest_duration_seconds: f64,
    pub avg_time_to_fix_ms: f64,
    pub longest_time_to_fix_ms: f64,
    pub avg_builds_to_fix: f64,
    /// Build id to duration in seconds. Keyed by id, so a later build with
    /// the same id replaces the earlier entry.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub durations: IndexMap<String, f64>,
    /// Build id to `g` (green) or `r` (red). Later builds win on repeated ids.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub results: IndexMap<String, String>,
}
