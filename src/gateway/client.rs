use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, Response, Url};
use std::time::Duration;

use crate::models::{Judgment, ParticipantId, SampledFrame};

use super::backend::{AnalysisBackend, ReportService};
use super::protocol::{
    AnalyzeImagesRequest, AnalyzeImagesResponse, EndSessionResponse, FramePayload, FrameVerdict,
    ProcessFrameResponse,
};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// reqwest-backed client for the inference backend.
///
/// `timeout` bounds the per-cycle judgment calls only. Report generation at
/// the end of a session can take much longer and is left unbounded.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base =
            Url::parse(base_url).with_context(|| format!("invalid backend url '{base_url}'"))?;
        // Url::join drops the last path segment unless the base ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }

    /// `download_report/{filename}` with the name percent-encoded as a single
    /// path segment.
    pub fn report_endpoint(&self, filename: &str) -> Result<Url> {
        let mut url = self.endpoint("download_report")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("backend url {} cannot carry a path", self.base))?
            .push(filename);
        Ok(url)
    }
}

fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        bail!("{what} returned server error: {status}");
    }
    Ok(response)
}

impl AnalysisBackend for HttpBackend {
    async fn process_frame(&self, frame: &SampledFrame) -> Result<FrameVerdict> {
        let response = self
            .client
            .post(self.endpoint("process_frame")?)
            .timeout(self.timeout)
            .json(&FramePayload::from(frame))
            .send()
            .await
            .context("process_frame request failed")?;

        let body: ProcessFrameResponse = ensure_success(response, "process_frame")?
            .json()
            .await
            .context("process_frame returned invalid json")?;

        body.into_verdict(&frame.participant_id)
    }

    async fn analyze_images(
        &self,
        frames: &[SampledFrame],
    ) -> Result<Vec<(ParticipantId, Judgment)>> {
        let request = AnalyzeImagesRequest {
            frames: frames.iter().map(FramePayload::from).collect(),
        };

        // Error bodies still carry `{error}`, so the status is not checked
        // before parsing.
        let body: AnalyzeImagesResponse = self
            .client
            .post(self.endpoint("analyze_images")?)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .context("analyze_images request failed")?
            .json()
            .await
            .context("analyze_images returned invalid json")?;

        body.into_judgments()
    }
}

impl ReportService for HttpBackend {
    async fn end_session(&self) -> Result<EndSessionResponse> {
        self.client
            .post(self.endpoint("end_session")?)
            .send()
            .await
            .context("end_session request failed")?
            .json()
            .await
            .context("end_session returned invalid json")
    }

    async fn download_report(&self, filename: &str) -> Result<Vec<u8>> {
        let url = self.report_endpoint(filename)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("download of {filename} failed"))?;

        let bytes = ensure_success(response, "download_report")?
            .bytes()
            .await
            .with_context(|| format!("download of {filename} was interrupted"))?;
        Ok(bytes.to_vec())
    }

    fn report_url(&self, filename: &str) -> String {
        self.report_endpoint(filename)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{}download_report/{filename}", self.base))
    }
}
