use anyhow::Result;
use std::future::Future;

use crate::models::{Judgment, ParticipantId, SampledFrame};

use super::protocol::{EndSessionResponse, FrameVerdict};

/// The inference service that judges sampled frames.
///
/// Each call is a single attempt; callers treat any `Err` as a failure for the
/// participants involved and nothing more.
pub trait AnalysisBackend: Send + Sync + 'static {
    /// `POST /process_frame` for one participant.
    fn process_frame(
        &self,
        frame: &SampledFrame,
    ) -> impl Future<Output = Result<FrameVerdict>> + Send;

    /// `POST /analyze_images` for every frame of a cycle at once.
    fn analyze_images(
        &self,
        frames: &[SampledFrame],
    ) -> impl Future<Output = Result<Vec<(ParticipantId, Judgment)>>> + Send;
}

/// Session reports produced by the backend once monitoring ends.
pub trait ReportService: Send + Sync + 'static {
    fn end_session(&self) -> impl Future<Output = Result<EndSessionResponse>> + Send;

    fn download_report(&self, filename: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    fn report_url(&self, filename: &str) -> String;
}
