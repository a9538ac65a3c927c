use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::models::ParticipantId;

use super::OverlayState;

/// Where painted overlays end up.
pub trait OverlaySink: Send + 'static {
    /// Create or update every overlay in `batch` in one paint.
    fn paint(&mut self, batch: &[OverlayState]) -> Result<()>;

    fn remove(&mut self, ids: &[ParticipantId]) -> Result<()>;

    /// Drop every overlay this sink has drawn.
    fn clear(&mut self) -> Result<()>;
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum SinkEvent<'a> {
    Paint { overlays: Vec<PaintedOverlay<'a>> },
    Remove { participants: &'a [ParticipantId] },
    Clear,
}

#[derive(Serialize)]
struct PaintedOverlay<'a> {
    #[serde(flatten)]
    state: &'a OverlayState,
    style: String,
}

fn encode(event: &SinkEvent<'_>) -> Result<String> {
    serde_json::to_string(event).context("failed to encode overlay event")
}

/// Emits one JSON object per paint on stdout, for a page-side shim to apply.
///
/// Control responses share the stream. Overlay events are keyed by `op`
/// (`paint`, `remove`, `clear`) and never carry `status`; control responses
/// are keyed by `status` and never carry `op`.
#[derive(Default)]
pub struct StdoutSink;

impl StdoutSink {
    fn emit(&self, event: &SinkEvent<'_>) -> Result<()> {
        let line = encode(event)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}").context("failed to write overlay event")?;
        out.flush().context("failed to flush overlay event")
    }
}

impl OverlaySink for StdoutSink {
    fn paint(&mut self, batch: &[OverlayState]) -> Result<()> {
        let overlays = batch
            .iter()
            .map(|state| PaintedOverlay {
                style: state.style(),
                state,
            })
            .collect();
        self.emit(&SinkEvent::Paint { overlays })
    }

    fn remove(&mut self, ids: &[ParticipantId]) -> Result<()> {
        self.emit(&SinkEvent::Remove { participants: ids })
    }

    fn clear(&mut self) -> Result<()> {
        self.emit(&SinkEvent::Clear)
    }
}

/// Writes overlays to the log only.
#[derive(Default)]
pub struct LogSink;

impl OverlaySink for LogSink {
    fn paint(&mut self, batch: &[OverlayState]) -> Result<()> {
        for state in batch {
            log::info!(
                "overlay {} [{}] {} at ({}, {}) {}x{}",
                state.participant_id,
                state.border_color,
                state.label,
                state.bounds.left,
                state.bounds.top,
                state.bounds.width,
                state.bounds.height
            );
        }
        Ok(())
    }

    fn remove(&mut self, ids: &[ParticipantId]) -> Result<()> {
        for id in ids {
            log::info!("overlay {id} removed");
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        log::info!("all overlays removed");
        Ok(())
    }
}
