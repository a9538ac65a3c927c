use serde::{Deserialize, Serialize};
use std::fmt;

const COLOR_ATTENTIVE: &str = "#28a745";
const COLOR_DISTRACTED: &str = "#ffc107";
const COLOR_INATTENTIVE: &str = "#dc3545";
const COLOR_FALLBACK: &str = "#6c757d";

/// Attentiveness category reported by the backend.
///
/// The backend may emit transient states such as `"Searching..."`; those are
/// kept verbatim in `Other` and rendered with the fallback color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttentionStatus {
    Attentive,
    Distracted,
    Inattentive,
    Error,
    Other(String),
}

impl AttentionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AttentionStatus::Attentive => "Attentive",
            AttentionStatus::Distracted => "Distracted",
            AttentionStatus::Inattentive => "Inattentive",
            AttentionStatus::Error => "Error",
            AttentionStatus::Other(raw) => raw,
        }
    }

    /// Border color for this status.
    pub fn color(&self) -> &'static str {
        match self {
            AttentionStatus::Attentive => COLOR_ATTENTIVE,
            AttentionStatus::Distracted => COLOR_DISTRACTED,
            AttentionStatus::Inattentive => COLOR_INATTENTIVE,
            AttentionStatus::Error | AttentionStatus::Other(_) => COLOR_FALLBACK,
        }
    }
}

impl From<String> for AttentionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Attentive" => AttentionStatus::Attentive,
            "Distracted" => AttentionStatus::Distracted,
            "Inattentive" => AttentionStatus::Inattentive,
            "Error" => AttentionStatus::Error,
            _ => AttentionStatus::Other(value),
        }
    }
}

impl From<AttentionStatus> for String {
    fn from(status: AttentionStatus) -> Self {
        match status {
            AttentionStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AttentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant's verdict for one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub name: String,
    pub status: AttentionStatus,
    pub score: f64,
}

impl Judgment {
    /// Stand-in used when a batch response carries no result for a participant,
    /// so the tile is annotated instead of left blank.
    pub fn fallback(student_id: Option<&str>) -> Self {
        let suffix = student_id
            .and_then(|id| id.rsplit('-').next())
            .filter(|segment| !segment.is_empty())
            .unwrap_or("Unknown");

        Self {
            name: format!("Student {suffix}"),
            status: AttentionStatus::Error,
            score: 0.0,
        }
    }

    pub fn label(&self) -> String {
        format!("{} | {} | {}", self.name, self.score, self.status)
    }
}
