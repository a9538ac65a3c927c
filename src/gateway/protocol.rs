//! JSON bodies exchanged with the inference backend.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Judgment, ParticipantId, SampledFrame};

#[derive(Debug, Serialize)]
pub struct FramePayload<'a> {
    pub participant_id: &'a str,
    /// Same value as `participant_id`, for backends that read the older name.
    pub student_id: &'a str,
    pub image: &'a str,
}

impl<'a> From<&'a SampledFrame> for FramePayload<'a> {
    fn from(frame: &'a SampledFrame) -> Self {
        Self {
            participant_id: frame.participant_id.as_str(),
            student_id: frame.participant_id.as_str(),
            image: &frame.image,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeImagesRequest<'a> {
    pub frames: Vec<FramePayload<'a>>,
}

/// `POST /process_frame` response.
#[derive(Debug, Deserialize)]
pub struct ProcessFrameResponse {
    #[serde(default, alias = "student_id")]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

/// Outcome of one per-frame request that reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameVerdict {
    pub participant_id: ParticipantId,
    /// `None` when the backend could not judge the frame.
    pub judgment: Option<Judgment>,
}

impl ProcessFrameResponse {
    /// Resolve the response for the frame that was sent. A response that
    /// omits the id is attributed to the request's participant.
    pub fn into_verdict(self, requested: &ParticipantId) -> Result<FrameVerdict> {
        let participant_id = self
            .participant_id
            .map(ParticipantId::new)
            .unwrap_or_else(|| requested.clone());

        let judgment = match self.result {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                serde_json::from_value(raw)
                    .map_err(|err| anyhow!("malformed result for {participant_id}: {err}"))?,
            ),
        };

        Ok(FrameVerdict {
            participant_id,
            judgment,
        })
    }
}

/// `POST /analyze_images` response.
#[derive(Debug, Deserialize)]
pub struct AnalyzeImagesResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<BatchEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchEntry {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl AnalyzeImagesResponse {
    /// Pair every returned entry with a judgment, synthesizing an `Error`
    /// judgment where the backend left `result` out or sent garbage.
    pub fn into_judgments(self) -> Result<Vec<(ParticipantId, Judgment)>> {
        if let Some(error) = self.error {
            return Err(anyhow!("backend error: {error}"));
        }
        let entries = self
            .results
            .ok_or_else(|| anyhow!("batch response carried no results"))?;

        let mut judgments = Vec::with_capacity(entries.len());
        for entry in entries {
            let judgment = entry
                .result
                .and_then(|raw| serde_json::from_value::<Judgment>(raw).ok())
                .unwrap_or_else(|| Judgment::fallback(entry.student_id.as_deref()));

            match entry.student_id {
                Some(id) => judgments.push((ParticipantId::new(id), judgment)),
                None => log::warn!("dropping batch result without a student_id: {}", judgment.label()),
            }
        }
        Ok(judgments)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDescriptor {
    pub filename: String,
    pub student_name: String,
}

/// `POST /end_session` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EndSessionResponse {
    Success {
        #[serde(default)]
        reports: Vec<ReportDescriptor>,
    },
    Error {
        message: String,
    },
}
