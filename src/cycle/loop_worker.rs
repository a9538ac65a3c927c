use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::gateway::AnalysisBackend;
use crate::metrics::CycleReport;
use crate::models::{ParticipantId, SampledFrame, VideoSurface};
use crate::overlay::OverlaySink;
use crate::sampling::FrameSampler;
use crate::settings::AnalysisProtocol;
use crate::surfaces::SurfaceHost;

use super::CycleContext;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_debug, log_error, log_info, log_warn};

/// How one participant's sample → request → stage sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParticipantOutcome {
    Skipped,
    Judged,
    Unjudged,
    Failed,
    Discarded,
}

impl CycleReport {
    fn tally(&mut self, outcome: ParticipantOutcome) {
        match outcome {
            ParticipantOutcome::Skipped => self.skipped += 1,
            ParticipantOutcome::Judged => self.judged += 1,
            ParticipantOutcome::Unjudged => self.unjudged += 1,
            ParticipantOutcome::Failed => self.failed += 1,
            ParticipantOutcome::Discarded => self.discarded += 1,
        }
    }
}

/// Drive cycles for one run until `cancel_token` fires.
///
/// A cycle always runs to completion once started, so requests already in
/// flight settle; cancellation only takes effect at the inter-cycle wait and
/// at cycle entry.
pub async fn cycle_loop<H, B, S>(
    ctx: CycleContext<H, B, S>,
    run_id: String,
    cancel_token: CancellationToken,
) where
    H: SurfaceHost,
    B: AnalysisBackend,
    S: OverlaySink,
{
    let mut cycles: u64 = 0;

    loop {
        if cancel_token.is_cancelled() || !ctx.is_current(&run_id).await {
            break;
        }

        cycles += 1;
        let cycle_start = Instant::now();
        match run_cycle(&ctx, &run_id).await {
            Ok(report) => {
                let elapsed = cycle_start.elapsed();
                log_debug!(
                    "cycle {} done in {}ms: {} eligible, {} judged, {} failed, {} skipped",
                    cycles,
                    elapsed.as_millis(),
                    report.discovered,
                    report.judged,
                    report.failed,
                    report.skipped
                );
                {
                    let mut state = ctx.state.lock().await;
                    if state.is_current(&run_id) {
                        state.record_cycle(report.discovered, Utc::now());
                    }
                }
                ctx.metrics.record_cycle(report, elapsed).await;
            }
            Err(err) => log_error!("cycle {} for run {} failed: {err:#}", cycles, run_id),
        }

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = time::sleep(ctx.settings.cycle_delay) => {}
        }
    }

    log_info!("cycle loop for run {} exiting after {} cycles", run_id, cycles);
}

/// One discovery → sample → analyze → paint pass. Returns once every request
/// issued by this pass has settled.
pub(crate) async fn run_cycle<H, B, S>(ctx: &CycleContext<H, B, S>, run_id: &str) -> Result<CycleReport>
where
    H: SurfaceHost,
    B: AnalysisBackend,
    S: OverlaySink,
{
    let surfaces = ctx.host.surfaces().context("host page unavailable")?;
    let discovery = ctx
        .registry
        .lock()
        .await
        .discover(surfaces, ctx.settings.min_visible_px);

    let mut report = CycleReport {
        discovered: discovery.eligible.len(),
        ..Default::default()
    };

    if !discovery.departed.is_empty() {
        let departed = discovery.departed;
        report.departed = departed.len();
        ctx.with_live_overlays(run_id, |overlays| overlays.remove(&departed))
            .await;
    }

    match ctx.settings.protocol {
        AnalysisProtocol::PerFrame => {
            dispatch_per_frame(ctx, run_id, discovery.eligible, &mut report).await
        }
        AnalysisProtocol::Batch => {
            dispatch_batch(ctx, run_id, discovery.eligible, &mut report).await
        }
    }

    report.painted = ctx
        .with_live_overlays(run_id, |overlays| overlays.present())
        .await
        .unwrap_or(0);

    Ok(report)
}

async fn dispatch_per_frame<H, B, S>(
    ctx: &CycleContext<H, B, S>,
    run_id: &str,
    eligible: Vec<(ParticipantId, VideoSurface)>,
    report: &mut CycleReport,
) where
    H: SurfaceHost,
    B: AnalysisBackend,
    S: OverlaySink,
{
    let mut tasks = JoinSet::new();
    for (participant_id, surface) in eligible {
        let ctx = ctx.clone();
        let run_id = run_id.to_string();
        tasks.spawn(async move { analyze_participant(&ctx, &run_id, participant_id, surface).await });
    }

    // The barrier: the cycle is not over until every request has settled.
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                if outcome != ParticipantOutcome::Skipped {
                    report.sampled += 1;
                }
                report.tally(outcome);
            }
            Err(err) => {
                log_error!("participant task aborted: {err}");
                report.tally(ParticipantOutcome::Failed);
            }
        }
    }
}

async fn analyze_participant<H, B, S>(
    ctx: &CycleContext<H, B, S>,
    run_id: &str,
    participant_id: ParticipantId,
    surface: VideoSurface,
) -> ParticipantOutcome
where
    H: SurfaceHost,
    B: AnalysisBackend,
    S: OverlaySink,
{
    let frame = match sample_frame(
        Arc::clone(&ctx.host),
        ctx.settings.sampler,
        participant_id.clone(),
        surface,
    )
    .await
    {
        Ok(Some(frame)) => frame,
        Ok(None) => return ParticipantOutcome::Skipped,
        Err(err) => {
            log_warn!("sampling failed for {}: {err:#}", participant_id);
            return ParticipantOutcome::Skipped;
        }
    };

    let verdict = match ctx.backend.process_frame(&frame).await {
        Ok(verdict) => verdict,
        Err(err) => {
            log_error!("Backend fetch failed for {}: {err:#}", participant_id);
            return ParticipantOutcome::Failed;
        }
    };

    let Some(judgment) = verdict.judgment else {
        return ParticipantOutcome::Unjudged;
    };

    if ctx.stage(run_id, &verdict.participant_id, judgment).await {
        ParticipantOutcome::Judged
    } else {
        ParticipantOutcome::Discarded
    }
}

async fn dispatch_batch<H, B, S>(
    ctx: &CycleContext<H, B, S>,
    run_id: &str,
    eligible: Vec<(ParticipantId, VideoSurface)>,
    report: &mut CycleReport,
) where
    H: SurfaceHost,
    B: AnalysisBackend,
    S: OverlaySink,
{
    let sampler = ctx.settings.sampler;
    let samples: Vec<_> = eligible
        .into_iter()
        .map(|(participant_id, surface)| {
            let host = Arc::clone(&ctx.host);
            let id = participant_id.clone();
            let sample =
                tokio::task::spawn_blocking(move || sampler.sample(host.as_ref(), &id, &surface));
            (participant_id, sample)
        })
        .collect();

    let mut frames: Vec<SampledFrame> = Vec::with_capacity(samples.len());
    for (participant_id, sample) in samples {
        let sampled = sample
            .await
            .context("frame sampling worker join failed")
            .and_then(|result| result);
        match sampled {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => report.tally(ParticipantOutcome::Skipped),
            Err(err) => {
                log_warn!("sampling failed for {}: {err:#}", participant_id);
                report.tally(ParticipantOutcome::Skipped);
            }
        }
    }

    if frames.is_empty() {
        return;
    }
    report.sampled = frames.len();

    let judgments = match ctx.backend.analyze_images(&frames).await {
        Ok(judgments) => judgments,
        Err(err) => {
            log_error!("Failed to process frames: {err:#}");
            report.failed += frames.len();
            return;
        }
    };

    for (participant_id, judgment) in judgments {
        let outcome = if ctx.stage(run_id, &participant_id, judgment).await {
            ParticipantOutcome::Judged
        } else {
            ParticipantOutcome::Discarded
        };
        report.tally(outcome);
    }
}

/// Grab, scale and encode one frame on the blocking pool.
async fn sample_frame<H: SurfaceHost>(
    host: Arc<H>,
    sampler: FrameSampler,
    participant_id: ParticipantId,
    surface: VideoSurface,
) -> Result<Option<SampledFrame>> {
    tokio::task::spawn_blocking(move || sampler.sample(host.as_ref(), &participant_id, &surface))
        .await
        .context("frame sampling worker join failed")?
}
