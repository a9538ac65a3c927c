use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

use crate::metrics::MetricsCollector;
use crate::models::{Judgment, ParticipantId};
use crate::overlay::{OverlayRenderer, OverlaySink};
use crate::sampling::FrameSampler;
use crate::settings::{AnalysisProtocol, MonitorSettings};
use crate::surfaces::{SurfaceRegistry, MIN_VISIBLE_PX};

use super::CycleState;

/// Tunables for the cycle loop.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub cycle_delay: Duration,
    pub min_visible_px: f64,
    pub protocol: AnalysisProtocol,
    pub sampler: FrameSampler,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            cycle_delay: Duration::from_secs(1),
            min_visible_px: MIN_VISIBLE_PX,
            protocol: AnalysisProtocol::PerFrame,
            sampler: FrameSampler::default(),
        }
    }
}

impl From<&MonitorSettings> for CycleSettings {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            cycle_delay: settings.cycle_delay(),
            min_visible_px: settings.min_visible_px,
            protocol: settings.protocol,
            sampler: FrameSampler::new(settings.max_frame_width, settings.jpeg_quality),
        }
    }
}

/// Everything a cycle touches, shared between the controller and its loop.
///
/// Lock order is `state` then `overlays`; `registry` is only ever held alone
/// or after `state`.
pub struct CycleContext<H, B, S: OverlaySink> {
    pub host: Arc<H>,
    pub backend: Arc<B>,
    pub state: Arc<Mutex<CycleState>>,
    pub overlays: Arc<Mutex<OverlayRenderer<S>>>,
    pub registry: Arc<Mutex<SurfaceRegistry>>,
    pub metrics: MetricsCollector,
    pub settings: CycleSettings,
}

impl<H, B, S: OverlaySink> Clone for CycleContext<H, B, S> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            overlays: Arc::clone(&self.overlays),
            registry: Arc::clone(&self.registry),
            metrics: self.metrics.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<H, B, S> CycleContext<H, B, S>
where
    H: crate::surfaces::SurfaceHost,
    S: OverlaySink,
{
    pub async fn is_current(&self, run_id: &str) -> bool {
        self.state.lock().await.is_current(run_id)
    }

    /// Run `f` against the overlays only if `run_id` is still the live run.
    /// The state lock is held throughout so a concurrent stop cannot slip in
    /// between the check and the write.
    pub async fn with_live_overlays<R>(
        &self,
        run_id: &str,
        f: impl FnOnce(&mut OverlayRenderer<S>) -> R,
    ) -> Option<R> {
        let state = self.state.lock().await;
        if !state.is_current(run_id) {
            return None;
        }
        let mut overlays = self.overlays.lock().await;
        let result = f(&mut overlays);
        drop(overlays);
        drop(state);
        Some(result)
    }

    /// Hand a judgment to the renderer, positioned from the tile's bounds as
    /// they are right now. Returns false when the judgment was discarded.
    pub async fn stage(&self, run_id: &str, participant_id: &ParticipantId, judgment: Judgment) -> bool {
        let key = self.registry.lock().await.key_for(participant_id).cloned();
        let Some(key) = key else {
            return false;
        };
        let Some(bounds) = self.host.page_bounds(&key) else {
            return false;
        };

        self.with_live_overlays(run_id, |overlays| {
            overlays.stage(participant_id, judgment, bounds)
        })
        .await
        .is_some()
    }
}
