//! In-memory host, backend and sink used by the unit tests.

use anyhow::{anyhow, bail, Result};
use image::{DynamicImage, Rgb, RgbImage};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    thread::{self, ThreadId},
    time::Duration,
};
use tokio::time::Instant;

use crate::gateway::{AnalysisBackend, EndSessionResponse, FrameVerdict, ReportService};
use crate::models::{
    AttentionStatus, Judgment, ParticipantId, Rect, SampledFrame, SurfaceKey, VideoSurface,
};
use crate::overlay::{OverlaySink, OverlayState};
use crate::surfaces::SurfaceHost;

pub fn judgment(name: &str, status: AttentionStatus, score: f64) -> Judgment {
    Judgment {
        name: name.into(),
        status,
        score,
    }
}

pub fn tile(key: &str, left: f64) -> VideoSurface {
    VideoSurface {
        key: SurfaceKey::new(key),
        native_width: 64,
        native_height: 36,
        bounds: Rect::new(left, 40.0, 320.0, 180.0),
        ready: true,
    }
}

#[derive(Default)]
struct HostState {
    surfaces: Vec<VideoSurface>,
    scroll: (f64, f64),
    offline: bool,
    grab_threads: Vec<ThreadId>,
}

/// A page whose tiles the test can add, move and remove between cycles.
#[derive(Clone, Default)]
pub struct FakeHost {
    inner: Arc<Mutex<HostState>>,
}

impl FakeHost {
    pub fn with_tiles(tiles: Vec<VideoSurface>) -> Self {
        let host = Self::default();
        host.set_tiles(tiles);
        host
    }

    pub fn set_tiles(&self, tiles: Vec<VideoSurface>) {
        self.inner.lock().unwrap().surfaces = tiles;
    }

    pub fn move_tile(&self, key: &str, bounds: Rect) {
        let mut state = self.inner.lock().unwrap();
        if let Some(surface) = state.surfaces.iter_mut().find(|s| s.key.as_str() == key) {
            surface.bounds = bounds;
        }
    }

    pub fn set_scroll(&self, x: f64, y: f64) {
        self.inner.lock().unwrap().scroll = (x, y);
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// Threads that frames were grabbed on, in call order.
    pub fn grab_threads(&self) -> Vec<ThreadId> {
        self.inner.lock().unwrap().grab_threads.clone()
    }
}

impl SurfaceHost for FakeHost {
    fn surfaces(&self) -> Result<Vec<VideoSurface>> {
        let state = self.inner.lock().unwrap();
        if state.offline {
            bail!("receiving end does not exist");
        }
        Ok(state.surfaces.clone())
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.inner.lock().unwrap().scroll
    }

    fn bounds(&self, key: &SurfaceKey) -> Option<Rect> {
        let state = self.inner.lock().unwrap();
        state
            .surfaces
            .iter()
            .find(|s| &s.key == key)
            .map(|s| s.bounds)
    }

    fn grab_frame(&self, key: &SurfaceKey) -> Result<DynamicImage> {
        let mut state = self.inner.lock().unwrap();
        state.grab_threads.push(thread::current().id());
        let surface = state
            .surfaces
            .iter()
            .find(|s| &s.key == key)
            .ok_or_else(|| anyhow!("no tile {key}"))?;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            surface.native_width.max(1),
            surface.native_height.max(1),
            Rgb([90, 120, 150]),
        )))
    }
}

/// What the fake backend answers for a participant.
#[derive(Debug, Clone)]
pub enum Reply {
    Judge(Judgment),
    NoResult,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Issued,
    Settled,
}

#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub seq: u64,
    pub participant_id: ParticipantId,
    pub phase: RequestPhase,
    pub at: Instant,
}

struct BackendState {
    default_reply: Reply,
    replies: HashMap<ParticipantId, Reply>,
    latency: Duration,
    latencies: HashMap<ParticipantId, Duration>,
    events: Vec<RequestEvent>,
    next_seq: u64,
    batch_calls: usize,
    end_session: Option<EndSessionResponse>,
}

/// Scriptable backend that records when each request starts and settles.
#[derive(Clone)]
pub struct FakeBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn replying(reply: Reply) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BackendState {
                default_reply: reply,
                replies: HashMap::new(),
                latency: Duration::from_millis(50),
                latencies: HashMap::new(),
                events: Vec::new(),
                next_seq: 0,
                batch_calls: 0,
                end_session: None,
            })),
        }
    }

    pub fn set_default_reply(&self, reply: Reply) {
        self.inner.lock().unwrap().default_reply = reply;
    }

    pub fn set_reply(&self, participant_id: &ParticipantId, reply: Reply) {
        self.inner
            .lock()
            .unwrap()
            .replies
            .insert(participant_id.clone(), reply);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().unwrap().latency = latency;
    }

    pub fn set_latency_for(&self, participant_id: &ParticipantId, latency: Duration) {
        self.inner
            .lock()
            .unwrap()
            .latencies
            .insert(participant_id.clone(), latency);
    }

    pub fn set_end_session(&self, response: Option<EndSessionResponse>) {
        self.inner.lock().unwrap().end_session = response;
    }

    pub fn events(&self) -> Vec<RequestEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn issued(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| e.phase == RequestPhase::Issued)
            .count()
    }

    pub fn batch_calls(&self) -> usize {
        self.inner.lock().unwrap().batch_calls
    }

    fn issue(&self, participant_id: &ParticipantId) -> (u64, Reply, Duration) {
        let mut state = self.inner.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.events.push(RequestEvent {
            seq,
            participant_id: participant_id.clone(),
            phase: RequestPhase::Issued,
            at: Instant::now(),
        });
        let reply = state
            .replies
            .get(participant_id)
            .cloned()
            .unwrap_or_else(|| state.default_reply.clone());
        let latency = state
            .latencies
            .get(participant_id)
            .copied()
            .unwrap_or(state.latency);
        (seq, reply, latency)
    }

    fn settle(&self, seq: u64, participant_id: &ParticipantId) {
        self.inner.lock().unwrap().events.push(RequestEvent {
            seq,
            participant_id: participant_id.clone(),
            phase: RequestPhase::Settled,
            at: Instant::now(),
        });
    }
}

impl AnalysisBackend for FakeBackend {
    async fn process_frame(&self, frame: &SampledFrame) -> Result<FrameVerdict> {
        let (seq, reply, latency) = self.issue(&frame.participant_id);
        tokio::time::sleep(latency).await;
        self.settle(seq, &frame.participant_id);

        match reply {
            Reply::Judge(judgment) => Ok(FrameVerdict {
                participant_id: frame.participant_id.clone(),
                judgment: Some(judgment),
            }),
            Reply::NoResult => Ok(FrameVerdict {
                participant_id: frame.participant_id.clone(),
                judgment: None,
            }),
            Reply::Fail => Err(anyhow!("Server error: 503 Service Unavailable")),
        }
    }

    async fn analyze_images(
        &self,
        frames: &[SampledFrame],
    ) -> Result<Vec<(ParticipantId, Judgment)>> {
        self.inner.lock().unwrap().batch_calls += 1;
        let issued: Vec<(u64, Reply, Duration)> = frames
            .iter()
            .map(|frame| self.issue(&frame.participant_id))
            .collect();
        let latency = issued
            .iter()
            .map(|(_, _, latency)| *latency)
            .max()
            .unwrap_or_default();
        tokio::time::sleep(latency).await;

        let mut results = Vec::new();
        for (frame, (seq, reply, _)) in frames.iter().zip(issued) {
            self.settle(seq, &frame.participant_id);
            match reply {
                Reply::Judge(judgment) => results.push((frame.participant_id.clone(), judgment)),
                Reply::NoResult => results.push((
                    frame.participant_id.clone(),
                    Judgment::fallback(Some(frame.participant_id.as_str())),
                )),
                Reply::Fail => bail!("backend error: model not loaded"),
            }
        }
        Ok(results)
    }
}

impl ReportService for FakeBackend {
    async fn end_session(&self) -> Result<EndSessionResponse> {
        let response = self.inner.lock().unwrap().end_session.clone();
        response.ok_or_else(|| anyhow!("connection refused"))
    }

    async fn download_report(&self, filename: &str) -> Result<Vec<u8>> {
        Ok(format!("%PDF-1.4 {filename}").into_bytes())
    }

    fn report_url(&self, filename: &str) -> String {
        format!("http://backend.test/download_report/{filename}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkOp {
    Paint(Vec<OverlayState>),
    Remove(Vec<ParticipantId>),
    Clear,
}

/// Sink that remembers every operation it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    ops: Arc<Mutex<Vec<SinkOp>>>,
}

impl RecordingSink {
    pub fn ops(&self) -> Vec<SinkOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn paint_sizes(&self) -> Vec<usize> {
        self.ops()
            .iter()
            .filter_map(|op| match op {
                SinkOp::Paint(batch) => Some(batch.len()),
                _ => None,
            })
            .collect()
    }
}

impl OverlaySink for RecordingSink {
    fn paint(&mut self, batch: &[OverlayState]) -> Result<()> {
        self.ops.lock().unwrap().push(SinkOp::Paint(batch.to_vec()));
        Ok(())
    }

    fn remove(&mut self, ids: &[ParticipantId]) -> Result<()> {
        self.ops.lock().unwrap().push(SinkOp::Remove(ids.to_vec()));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ops.lock().unwrap().push(SinkOp::Clear);
        Ok(())
    }
}
