use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::cycle::CycleState;
use crate::metrics::MetricsSnapshot;

/// One line typed at the control panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Status,
    End,
    Download(String),
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let command = match verb.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "status" => Command::Status,
            "end" | "end_session" => Command::End,
            "download" => {
                let filename = parts
                    .next()
                    .ok_or_else(|| anyhow!("usage: download <filename>"))?;
                Command::Download(filename.to_string())
            }
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command: {other}"),
        };

        if parts.next().is_some() {
            bail!("unexpected arguments after {verb}");
        }
        Ok(command)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub run: CycleState,
    pub overlays: usize,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLink {
    pub student_name: String,
    pub filename: String,
    pub url: String,
}

/// Reply to a [`Command`], printed as one JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ControlResponse {
    Success,
    Error {
        message: String,
    },
    Stopped,
    Running(StatusReport),
    Idle(StatusReport),
    Reports {
        reports: Vec<ReportLink>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Saved {
        path: String,
    },
}

impl ControlResponse {
    pub fn error(message: impl Into<String>) -> Self {
        ControlResponse::Error {
            message: message.into(),
        }
    }
}
