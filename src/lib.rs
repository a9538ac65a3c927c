mod control;
mod cycle;
mod gateway;
mod metrics;
mod models;
mod overlay;
mod sampling;
mod settings;
mod surfaces;
mod utils;

#[cfg(test)]
mod testing;

pub use control::{Command, ControlPanel, ControlResponse};
pub use cycle::{CycleController, CycleSettings, CycleState, CycleStatus};
pub use gateway::{AnalysisBackend, HttpBackend, ReportService};
pub use overlay::{LogSink, OverlaySink, StdoutSink};
pub use settings::{AnalysisProtocol, MonitorSettings, OverlayOutput, SettingsStore};
pub use surfaces::{SceneHost, SurfaceHost};

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use settings::{debug_enabled, settings_path};

/// Headless entry point: load settings, wire the scene host to the HTTP
/// backend, then serve control commands from stdin until `quit` or EOF.
pub async fn run() -> Result<()> {
    utils::init_logging(debug_enabled());

    log::info!("classwatch starting up...");

    let store = SettingsStore::new(settings_path())?;
    let settings = store.settings().with_env_overrides();
    log::info!(
        "settings {}: backend {} ({:?}), scene {}, overlays to {:?}",
        store.path().display(),
        settings.backend_url,
        settings.protocol,
        settings.scene_path.display(),
        settings.overlay_output
    );

    match settings.overlay_output {
        OverlayOutput::Stdout => serve(settings, StdoutSink).await,
        OverlayOutput::Log => serve(settings, LogSink).await,
    }
}

async fn serve<S: OverlaySink>(settings: MonitorSettings, sink: S) -> Result<()> {
    let host = Arc::new(SceneHost::new(settings.scene_path.clone()));
    let backend = Arc::new(HttpBackend::new(
        &settings.backend_url,
        settings.request_timeout(),
    )?);
    let controller = CycleController::new(
        host,
        Arc::clone(&backend),
        sink,
        CycleSettings::from(&settings),
    );
    let panel = ControlPanel::new(controller, backend, settings.download_dir.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let (response, quit) = match line.parse::<Command>() {
            Ok(command) => {
                let quit = command == Command::Quit;
                (panel.handle(command).await, quit)
            }
            Err(err) => (ControlResponse::error(err.to_string()), false),
        };

        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;

        if quit {
            return Ok(());
        }
    }

    panel.handle(Command::Quit).await;
    log::info!("stdin closed, shutting down");
    Ok(())
}
