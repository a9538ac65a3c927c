use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CycleStatus {
    #[default]
    Stopped,
    Running,
}

/// Run state of one monitor instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleState {
    pub status: CycleStatus,
    /// Identifies the current run; work tagged with an older run is discarded.
    pub run_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Eligible tiles seen by the most recent discovery.
    pub participants: usize,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == CycleStatus::Running
    }

    /// True while `run_id` is the run that is currently active.
    pub fn is_current(&self, run_id: &str) -> bool {
        self.is_running() && self.run_id.as_deref() == Some(run_id)
    }

    pub fn begin(&mut self, run_id: String, started_at: DateTime<Utc>, participants: usize) {
        *self = Self {
            status: CycleStatus::Running,
            run_id: Some(run_id),
            started_at: Some(started_at),
            cycles_completed: 0,
            last_cycle_at: None,
            participants,
        };
    }

    pub fn record_cycle(&mut self, participants: usize, at: DateTime<Utc>) {
        self.cycles_completed += 1;
        self.last_cycle_at = Some(at);
        self.participants = participants;
    }

    pub fn stop(&mut self) {
        self.status = CycleStatus::Stopped;
        self.run_id = None;
    }
}
