// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Continuous capture and upload (terminal UI or headless)
//! - Uploading a single snapshot

use crate::RunArgs;
use camera_uploader::app::{AppCommand, AppController, parse_command};
use camera_uploader::backends::camera::{CameraBackendType, get_backend_for_type};
use camera_uploader::config::Config;
use camera_uploader::constants::timing::{FIRST_FRAME_POLL, FIRST_FRAME_TIMEOUT};
use camera_uploader::session::{CameraSession, LogNotifier, UserNotifier};
use camera_uploader::surface::VideoSurface;
use camera_uploader::terminal::{self, AlertQueue, TerminalNotifier, TerminalUi};
use camera_uploader::uploader::{CaptureUploader, TickOutcome};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config file and apply command line overrides
fn resolve_config(args: &RunArgs) -> Config {
    let mut config = load_config(args.config.as_deref());
    if let Some(server) = &args.server {
        config.server_url = server.clone();
    }
    if let Some(facing) = args.facing {
        config.default_facing_mode = facing;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if args.no_switch {
        config.switch_control_enabled = false;
    }
    debug!(?config, "Resolved configuration");
    config
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_or_default(path),
        None => Config::load(),
    }
}

fn build_session(
    config: &Config,
    surface: VideoSurface,
    notifier: Arc<dyn UserNotifier>,
) -> CameraSession {
    CameraSession::new(
        get_backend_for_type(config.backend),
        surface,
        notifier,
        config.default_facing_mode,
    )
    .with_preferred_resolution(config.preferred_width, config.preferred_height)
}

/// List all available cameras
pub fn list_cameras(backend: Option<CameraBackendType>, config: Option<&Path>) -> CliResult {
    let backend_type = backend.unwrap_or_else(|| load_config(config).backend);
    let cameras = get_backend_for_type(backend_type).enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found ({} backend).", backend_type);
        return Ok(());
    }

    println!("Available cameras ({} backend):", backend_type);
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path:   {}", camera.path);
        let facing = camera
            .facing
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("      Facing: {}", facing);
        if let Some(driver) = &camera.driver {
            println!("      Driver: {}", driver);
        }
        println!();
    }

    Ok(())
}

/// Capture and upload until the user quits
pub fn run_uploader(args: &RunArgs) -> CliResult {
    let config = resolve_config(args);
    let runtime = tokio::runtime::Runtime::new()?;

    let surface = VideoSurface::new();
    let uploader = CaptureUploader::with_http(surface.clone(), &config.server_url)?;
    let stats = uploader.stats();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    if args.headless {
        let session = build_session(&config, surface, Arc::new(LogNotifier));
        let controller = AppController::new(session, config.switch_control_enabled);
        spawn_stdin_reader(cmd_tx);

        eprintln!(
            "Uploading to {} ('s' + Enter switches camera, 'q' + Enter or Ctrl+C quits)",
            config.server_url
        );
        let uploader = runtime.block_on(async {
            let uploader = controller.run(uploader, cmd_rx).await?;
            uploader.tasks().wait_idle().await;
            Ok::<_, camera_uploader::errors::AppError>(uploader)
        })?;
        let summary = uploader.stats().snapshot();
        eprintln!("{} snapshots sent, {} failed", summary.delivered, summary.failed);
        return Ok(());
    }

    let alerts = AlertQueue::new();
    let session = build_session(
        &config,
        surface.clone(),
        Arc::new(TerminalNotifier::new(alerts.clone())),
    );
    let controller = AppController::new(session, config.switch_control_enabled);
    let status = controller.subscribe();
    let task = runtime.spawn(controller.run(uploader, cmd_rx));

    let ui_result = terminal::run(TerminalUi {
        surface,
        stats,
        status,
        alerts,
        commands: cmd_tx,
        switch_enabled: config.switch_control_enabled,
        server_url: config.server_url.clone(),
    });

    runtime.block_on(task)??;
    ui_result?;
    Ok(())
}

/// Forward headless commands typed on stdin
///
/// EOF ends the reader without quitting; a service without stdin keeps
/// running until it gets SIGINT.
fn spawn_stdin_reader(commands: mpsc::UnboundedSender<AppCommand>) {
    let spawned = std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(cmd) => {
                        if commands.send(cmd).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!("Unknown command '{}' (use 's' or 'q')", line.trim()),
                }
            }
            debug!("stdin closed");
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Cannot read commands from stdin");
    }
}

/// Upload exactly one snapshot
pub fn snap(args: &RunArgs) -> CliResult {
    let config = resolve_config(args);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(snap_once(&config))
}

async fn snap_once(config: &Config) -> CliResult {
    let surface = VideoSurface::new();
    let mut uploader = CaptureUploader::with_http(surface.clone(), &config.server_url)?;
    let mut session = build_session(config, surface, Arc::new(LogNotifier));

    session.start(config.default_facing_mode).await?;

    // Frames arrive asynchronously after acquisition
    let deadline = tokio::time::Instant::now() + FIRST_FRAME_TIMEOUT;
    let outcome = loop {
        let outcome = uploader.tick();
        if outcome != TickOutcome::Skipped || tokio::time::Instant::now() >= deadline {
            break outcome;
        }
        tokio::time::sleep(FIRST_FRAME_POLL).await;
    };

    let TickOutcome::Dispatched { width, height } = outcome else {
        session.release().await;
        return Err("camera delivered no frame".into());
    };
    info!(width, height, "Snapshot dispatched");

    uploader.tasks().wait_idle().await;
    session.release().await;

    if uploader.stats().snapshot().delivered == 1 {
        println!("Uploaded {}x{} snapshot to {}", width, height, config.upload_url()?);
        Ok(())
    } else {
        Err(format!("snapshot upload to {} failed", config.server_url).into())
    }
}
