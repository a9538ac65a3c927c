use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::gateway::AnalysisBackend;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::models::{ParticipantId, SurfaceKey};
use crate::overlay::{OverlayRenderer, OverlaySink, OverlayState};
use crate::surfaces::{SurfaceHost, SurfaceRegistry};

use super::loop_worker::cycle_loop;
use super::{CycleContext, CycleSettings, CycleState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

pub const NO_PARTICIPANTS: &str = "No participant videos found.";
pub const ALREADY_RUNNING: &str = "Analysis is already running.";
pub const HOST_UNAVAILABLE: &str = "Host page is not responding. Refresh the page and try again.";

struct CycleWorker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Start/stop state machine for the sampling-and-annotation cycle.
///
/// Cheap to clone; clones share the same run.
pub struct CycleController<H, B, S: OverlaySink> {
    ctx: CycleContext<H, B, S>,
    worker: Arc<Mutex<Option<CycleWorker>>>,
}

impl<H, B, S: OverlaySink> Clone for CycleController<H, B, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            worker: Arc::clone(&self.worker),
        }
    }
}

impl<H, B, S> CycleController<H, B, S>
where
    H: SurfaceHost,
    B: AnalysisBackend,
    S: OverlaySink,
{
    pub fn new(host: Arc<H>, backend: Arc<B>, sink: S, settings: CycleSettings) -> Self {
        Self {
            ctx: CycleContext {
                host,
                backend,
                state: Arc::new(Mutex::new(CycleState::new())),
                overlays: Arc::new(Mutex::new(OverlayRenderer::new(sink))),
                registry: Arc::new(Mutex::new(SurfaceRegistry::new())),
                metrics: MetricsCollector::new(),
                settings,
            },
            worker: Arc::new(Mutex::new(None)),
        }
    }

    /// Stopped → Running. Fails, leaving the monitor stopped, when no tile is
    /// eligible or a run is already active. The first cycle starts right away.
    pub async fn start(&self) -> Result<CycleState> {
        let mut worker = self.worker.lock().await;

        if self.ctx.state.lock().await.is_running() {
            bail!(ALREADY_RUNNING);
        }

        // A stopped run may still be waiting on its last requests; let them
        // settle so two runs never have requests in flight together.
        if let Some(previous) = worker.take() {
            previous.cancel_token.cancel();
            if let Err(err) = previous.handle.await {
                log_error!("previous cycle loop failed to join: {err}");
            }
        }

        let mut state = self.ctx.state.lock().await;

        let surfaces = self.ctx.host.surfaces().context(HOST_UNAVAILABLE)?;
        let discovery = self
            .ctx
            .registry
            .lock()
            .await
            .discover(surfaces, self.ctx.settings.min_visible_px);
        if discovery.eligible.is_empty() {
            bail!(NO_PARTICIPANTS);
        }

        let run_id = Uuid::new_v4().to_string();
        state.begin(run_id.clone(), Utc::now(), discovery.eligible.len());
        let snapshot = state.clone();
        drop(state);

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(cycle_loop(
            self.ctx.clone(),
            run_id.clone(),
            cancel_token.clone(),
        ));
        *worker = Some(CycleWorker {
            handle,
            cancel_token,
        });

        log_info!(
            "Analysis started (run {}) with {} participants",
            run_id,
            discovery.eligible.len()
        );
        Ok(snapshot)
    }

    /// Running → Stopped. Cancels the pending cycle, removes every overlay.
    /// Requests already in flight finish, but their results are dropped.
    /// Calling it while stopped does nothing.
    pub async fn stop(&self) -> CycleState {
        let worker = self.worker.lock().await;
        if let Some(worker) = worker.as_ref() {
            worker.cancel_token.cancel();
        }

        let mut state = self.ctx.state.lock().await;
        if state.is_running() {
            state.stop();
            self.ctx.overlays.lock().await.clear();
            log_info!("Analysis stopped");
        }
        state.clone()
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(&self) {
        self.stop().await;
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(err) = worker.handle.await {
                log_error!("cycle loop failed to join: {err}");
            }
        }
    }

    pub async fn state(&self) -> CycleState {
        self.ctx.state.lock().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.ctx.state.lock().await.is_running()
    }

    pub async fn overlays(&self) -> Vec<OverlayState> {
        self.ctx.overlays.lock().await.snapshot()
    }

    pub async fn overlay_count(&self) -> usize {
        self.ctx.overlays.lock().await.len()
    }

    pub async fn overlay_for(&self, participant_id: &ParticipantId) -> Option<OverlayState> {
        self.ctx.overlays.lock().await.get(participant_id).cloned()
    }

    pub async fn participant_for(&self, key: &SurfaceKey) -> Option<ParticipantId> {
        self.ctx.registry.lock().await.id_for(key).cloned()
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.get_snapshot().await
    }

    /// Forget cycle history and totals, e.g. once a session has ended.
    pub async fn reset_metrics(&self) {
        self.ctx.metrics.reset().await;
    }
}
