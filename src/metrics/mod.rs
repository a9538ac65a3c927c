mod types;

pub use types::{CycleMetrics, CycleReport, MetricsSnapshot, SystemMetrics};

use chrono::Utc;
use std::{sync::Arc, time::Duration};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_CYCLES: usize = 20;

pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_cycles: Vec<CycleMetrics>,
    cycle_count: u64,
    request_count: u64,
    failure_count: u64,
    system: System,
    pid: Pid,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // Initial refresh to establish baseline for CPU calculation
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_cycles: Vec::with_capacity(MAX_RECENT_CYCLES),
                cycle_count: 0,
                request_count: 0,
                failure_count: 0,
                system,
                pid,
            })),
        }
    }

    /// Record a finished cycle along with current process CPU and memory.
    pub async fn record_cycle(&self, report: CycleReport, elapsed: Duration) {
        let mut state = self.inner.lock().await;
        let (cpu_percent, memory_mb) = sample_process(&mut state);

        state.cycle_count += 1;
        state.request_count += report.sampled as u64;
        state.failure_count += report.failed as u64;

        state.recent_cycles.push(CycleMetrics {
            timestamp: Utc::now(),
            report,
            total_ms: elapsed.as_millis() as u64,
            cpu_percent,
            memory_mb,
        });

        if state.recent_cycles.len() > MAX_RECENT_CYCLES {
            state.recent_cycles.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let (cpu_percent, memory_mb) = sample_process(&mut state);

        MetricsSnapshot {
            system: SystemMetrics {
                cpu_percent,
                memory_mb,
            },
            recent_cycles: state.recent_cycles.clone(),
            cycle_count: state.cycle_count,
            request_count: state.request_count,
            failure_count: state.failure_count,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.recent_cycles.clear();
        state.cycle_count = 0;
        state.request_count = 0;
        state.failure_count = 0;
        // Re-establish baseline for CPU after reset
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    }
}

fn sample_process(state: &mut MetricsState) -> (f32, f64) {
    let pid = state.pid;
    state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

    match state.system.process(pid) {
        Some(process) => (
            process.cpu_usage(),
            process.memory() as f64 / 1024.0 / 1024.0,
        ),
        None => (0.0, 0.0),
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
