use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::gateway::DEFAULT_BACKEND_URL;
use crate::sampling::{JPEG_QUALITY, MAX_FRAME_WIDTH};
use crate::surfaces::MIN_VISIBLE_PX;

pub const SETTINGS_ENV: &str = "CLASSWATCH_SETTINGS";
pub const BACKEND_URL_ENV: &str = "CLASSWATCH_BACKEND_URL";
pub const SCENE_ENV: &str = "CLASSWATCH_SCENE";
pub const DEBUG_ENV: &str = "CLASSWATCH_DEBUG";

/// Which backend endpoint judges frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisProtocol {
    /// One `POST /process_frame` per participant per cycle.
    #[default]
    PerFrame,
    /// One `POST /analyze_images` carrying every participant of the cycle.
    Batch,
}

/// Where overlay paints go when running headless.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlayOutput {
    /// JSON lines on stdout, for a page-side shim.
    #[default]
    Stdout,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorSettings {
    pub backend_url: String,
    pub protocol: AnalysisProtocol,
    pub max_frame_width: u32,
    pub jpeg_quality: u8,
    pub cycle_delay_ms: u64,
    pub min_visible_px: f64,
    pub request_timeout_secs: u64,
    pub scene_path: PathBuf,
    pub download_dir: PathBuf,
    pub overlay_output: OverlayOutput,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            protocol: AnalysisProtocol::PerFrame,
            max_frame_width: MAX_FRAME_WIDTH,
            jpeg_quality: JPEG_QUALITY,
            cycle_delay_ms: 1000,
            min_visible_px: MIN_VISIBLE_PX,
            request_timeout_secs: 10,
            scene_path: PathBuf::from("scene.json"),
            download_dir: PathBuf::from("attentiveness_reports"),
            overlay_output: OverlayOutput::Stdout,
        }
    }
}

impl MonitorSettings {
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Apply `CLASSWATCH_BACKEND_URL` / `CLASSWATCH_SCENE` on top of the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend_url = url.trim().to_string();
            }
        }
        if let Ok(scene) = std::env::var(SCENE_ENV) {
            if !scene.trim().is_empty() {
                self.scene_path = PathBuf::from(scene.trim());
            }
        }
        self
    }
}

pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn settings_path() -> PathBuf {
    std::env::var(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("classwatch.json"))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings in {}: {err}",
                    path.display()
                );
                MonitorSettings::default()
            })
        } else {
            MonitorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> MonitorSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
