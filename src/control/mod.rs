pub mod commands;

pub use commands::{Command, ControlResponse, ReportLink, StatusReport};

use anyhow::{bail, Context, Result};
use std::{path::PathBuf, sync::Arc};

use crate::cycle::CycleController;
use crate::gateway::{AnalysisBackend, EndSessionResponse, ReportService};
use crate::overlay::OverlaySink;
use crate::surfaces::SurfaceHost;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const BACKEND_UNREACHABLE: &str = "Backend is unreachable.";
pub const NO_REPORTS: &str =
    "No reports generated. Ensure participants were visible for at least 30 seconds.";

/// Command layer between a control panel and one monitor instance.
pub struct ControlPanel<H, B, S: OverlaySink> {
    controller: CycleController<H, B, S>,
    reports: Arc<B>,
    download_dir: PathBuf,
}

impl<H, B, S> ControlPanel<H, B, S>
where
    H: SurfaceHost,
    B: AnalysisBackend + ReportService,
    S: OverlaySink,
{
    pub fn new(controller: CycleController<H, B, S>, reports: Arc<B>, download_dir: PathBuf) -> Self {
        Self {
            controller,
            reports,
            download_dir,
        }
    }

    pub fn controller(&self) -> &CycleController<H, B, S> {
        &self.controller
    }

    pub async fn handle(&self, command: Command) -> ControlResponse {
        match command {
            Command::Start => match self.controller.start().await {
                Ok(_) => ControlResponse::Success,
                Err(err) => ControlResponse::error(err.to_string()),
            },
            Command::Stop => {
                self.controller.stop().await;
                ControlResponse::Stopped
            }
            Command::Status => self.status().await,
            Command::End => self.end_session().await,
            Command::Download(filename) => match self.download(&filename).await {
                Ok(path) => ControlResponse::Saved {
                    path: path.display().to_string(),
                },
                Err(err) => ControlResponse::error(format!("{err:#}")),
            },
            Command::Quit => {
                self.controller.shutdown().await;
                ControlResponse::Stopped
            }
        }
    }

    async fn status(&self) -> ControlResponse {
        let report = StatusReport {
            run: self.controller.state().await,
            overlays: self.controller.overlay_count().await,
            metrics: self.controller.metrics().await,
        };
        if report.run.is_running() {
            ControlResponse::Running(report)
        } else {
            ControlResponse::Idle(report)
        }
    }

    /// Stop monitoring, then ask the backend to produce its reports. Cycle
    /// metrics start over for the next session.
    async fn end_session(&self) -> ControlResponse {
        self.controller.stop().await;
        self.controller.reset_metrics().await;

        let response = match self.reports.end_session().await {
            Ok(response) => response,
            Err(err) => {
                log_error!("end_session failed: {err:#}");
                return ControlResponse::error(BACKEND_UNREACHABLE);
            }
        };

        match response {
            EndSessionResponse::Error { message } => ControlResponse::Error { message },
            EndSessionResponse::Success { reports } if reports.is_empty() => {
                log_warn!("session ended without reports");
                ControlResponse::Reports {
                    reports: Vec::new(),
                    message: Some(NO_REPORTS.to_string()),
                }
            }
            EndSessionResponse::Success { reports } => {
                log_info!("session ended with {} reports", reports.len());
                let reports = reports
                    .into_iter()
                    .map(|report| ReportLink {
                        url: self.reports.report_url(&report.filename),
                        student_name: report.student_name,
                        filename: report.filename,
                    })
                    .collect();
                ControlResponse::Reports {
                    reports,
                    message: None,
                }
            }
        }
    }

    async fn download(&self, filename: &str) -> Result<PathBuf> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename == "."
            || filename == ".."
        {
            bail!("invalid report filename: {filename}");
        }

        let bytes = self
            .reports
            .download_report(filename)
            .await
            .with_context(|| format!("failed to download {filename}"))?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .with_context(|| format!("failed to create {}", self.download_dir.display()))?;
        let path = self.download_dir.join(filename);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        log_info!("saved report {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{CycleSettings, NO_PARTICIPANTS};
    use crate::gateway::ReportDescriptor;
    use crate::models::AttentionStatus;
    use crate::testing::{judgment, tile, FakeBackend, FakeHost, RecordingSink, Reply};
    use std::time::Duration;
    use tokio::time::sleep;

    fn panel(
        host: &FakeHost,
        backend: &FakeBackend,
        download_dir: PathBuf,
    ) -> ControlPanel<FakeHost, FakeBackend, RecordingSink> {
        let backend = Arc::new(backend.clone());
        let controller = CycleController::new(
            Arc::new(host.clone()),
            Arc::clone(&backend),
            RecordingSink::default(),
            CycleSettings::default(),
        );
        ControlPanel::new(controller, backend, download_dir)
    }

    fn alice() -> Reply {
        Reply::Judge(judgment("Alice", AttentionStatus::Attentive, 92.0))
    }

    #[tokio::test(start_paused = true)]
    async fn start_stop_and_status() {
        let host = FakeHost::with_tiles(vec![tile("a", 0.0)]);
        let backend = FakeBackend::replying(alice());
        let panel = panel(&host, &backend, PathBuf::from("unused"));

        assert!(matches!(panel.handle(Command::Start).await, ControlResponse::Success));
        sleep(Duration::from_millis(300)).await;

        match panel.handle(Command::Status).await {
            ControlResponse::Running(report) => {
                assert_eq!(report.overlays, 1);
                assert_eq!(report.run.cycles_completed, 1);
                assert_eq!(report.metrics.cycle_count, 1);
            }
            other => panic!("expected running status, got {other:?}"),
        }

        assert!(matches!(panel.handle(Command::Stop).await, ControlResponse::Stopped));
        assert!(matches!(panel.handle(Command::Status).await, ControlResponse::Idle(_)));
        assert!(matches!(panel.handle(Command::Quit).await, ControlResponse::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_is_reported_as_message() {
        let host = FakeHost::with_tiles(vec![]);
        let backend = FakeBackend::replying(alice());
        let panel = panel(&host, &backend, PathBuf::from("unused"));

        match panel.handle(Command::Start).await {
            ControlResponse::Error { message } => assert_eq!(message, NO_PARTICIPANTS),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn end_stops_monitoring_and_lists_reports() {
        let host = FakeHost::with_tiles(vec![tile("a", 0.0)]);
        let backend = FakeBackend::replying(alice());
        backend.set_end_session(Some(EndSessionResponse::Success {
            reports: vec![ReportDescriptor {
                filename: "report_Alice.pdf".into(),
                student_name: "Alice".into(),
            }],
        }));
        let panel = panel(&host, &backend, PathBuf::from("unused"));

        panel.handle(Command::Start).await;
        sleep(Duration::from_millis(300)).await;

        match panel.handle(Command::End).await {
            ControlResponse::Reports { reports, message } => {
                assert_eq!(message, None);
                assert_eq!(
                    reports,
                    vec![ReportLink {
                        student_name: "Alice".into(),
                        filename: "report_Alice.pdf".into(),
                        url: "http://backend.test/download_report/report_Alice.pdf".into(),
                    }]
                );
            }
            other => panic!("expected reports, got {other:?}"),
        }
        assert!(!panel.controller().is_running().await);
        assert!(panel.controller().overlays().await.is_empty());

        let metrics = panel.controller().metrics().await;
        assert_eq!(metrics.cycle_count, 0);
        assert!(metrics.recent_cycles.is_empty());
    }

    #[tokio::test]
    async fn end_reports_empty_and_failed_sessions() {
        let host = FakeHost::with_tiles(vec![]);
        let backend = FakeBackend::replying(alice());
        let panel = panel(&host, &backend, PathBuf::from("unused"));

        match panel.handle(Command::End).await {
            ControlResponse::Error { message } => assert_eq!(message, BACKEND_UNREACHABLE),
            other => panic!("expected unreachable error, got {other:?}"),
        }

        backend.set_end_session(Some(EndSessionResponse::Success { reports: vec![] }));
        match panel.handle(Command::End).await {
            ControlResponse::Reports { reports, message } => {
                assert!(reports.is_empty());
                assert_eq!(message.as_deref(), Some(NO_REPORTS));
            }
            other => panic!("expected empty reports, got {other:?}"),
        }

        backend.set_end_session(Some(EndSessionResponse::Error {
            message: "No data collected".into(),
        }));
        match panel.handle(Command::End).await {
            ControlResponse::Error { message } => assert_eq!(message, "No data collected"),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn download_saves_into_report_dir() {
        let dir = tempfile::tempdir().unwrap();
        let reports_dir = dir.path().join("attentiveness_reports");
        let host = FakeHost::with_tiles(vec![]);
        let backend = FakeBackend::replying(alice());
        let panel = panel(&host, &backend, reports_dir.clone());

        match panel.handle(Command::Download("report_Alice.pdf".into())).await {
            ControlResponse::Saved { path } => {
                assert_eq!(PathBuf::from(&path), reports_dir.join("report_Alice.pdf"));
                let saved = std::fs::read_to_string(path).unwrap();
                assert_eq!(saved, "%PDF-1.4 report_Alice.pdf");
            }
            other => panic!("expected saved, got {other:?}"),
        }

        for bad in ["../secret.pdf", "..", "nested/report.pdf"] {
            assert!(matches!(
                panel.handle(Command::Download(bad.into())).await,
                ControlResponse::Error { .. }
            ));
        }
    }
}
