use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What one sampling-and-annotation cycle did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Eligible tiles found by discovery.
    pub discovered: usize,
    /// Frames sent to the backend.
    pub sampled: usize,
    /// Tiles without a decoded frame this cycle.
    pub skipped: usize,
    /// Judgments staged onto overlays.
    pub judged: usize,
    /// Requests that succeeded without a judgment.
    pub unjudged: usize,
    /// Sampling or request failures.
    pub failed: usize,
    /// Judgments that arrived after the run stopped, or for a vanished tile.
    pub discarded: usize,
    /// Overlays in the cycle's paint batch.
    pub painted: usize,
    /// Overlays removed because their tile left the page.
    pub departed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleMetrics {
    pub timestamp: DateTime<Utc>,
    pub report: CycleReport,
    pub total_ms: u64,
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub recent_cycles: Vec<CycleMetrics>,
    pub cycle_count: u64,
    pub request_count: u64,
    pub failure_count: u64,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            system: SystemMetrics {
                cpu_percent: 0.0,
                memory_mb: 0.0,
            },
            recent_cycles: Vec::new(),
            cycle_count: 0,
            request_count: 0,
            failure_count: 0,
        }
    }
}
