// SPDX-License-Identifier: GPL-3.0-only

//! Application controller
//!
//! Owns the camera session, starts the capture loop and the first camera
//! acquisition, then applies user commands one at a time until asked to quit.
//! Commands are handled sequentially, so two acquisitions never interleave.

use crate::errors::AppResult;
use crate::session::{CameraSession, SessionState};
use crate::uploader::CaptureUploader;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Commands sent by the front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Toggle between the user and environment camera
    SwitchCamera,
    /// Stop everything and exit
    Quit,
}

/// Parse one line of headless input
pub fn parse_command(line: &str) -> Option<AppCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "switch" => Some(AppCommand::SwitchCamera),
        "q" | "quit" | "exit" => Some(AppCommand::Quit),
        _ => None,
    }
}

/// What the front ends display about the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Name of the device serving the stream
    pub device: Option<String>,
}

impl SessionStatus {
    fn of(session: &CameraSession) -> Self {
        Self {
            state: session.state(),
            device: session.active_device().map(|d| d.name.clone()),
        }
    }
}

/// Drives the session from user commands
pub struct AppController {
    session: CameraSession,
    switch_enabled: bool,
    status_tx: watch::Sender<SessionStatus>,
}

impl AppController {
    pub fn new(session: CameraSession, switch_enabled: bool) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::of(&session));
        Self {
            session,
            switch_enabled,
            status_tx,
        }
    }

    /// Session status feed for the front ends
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Run until [`AppCommand::Quit`] or Ctrl+C
    ///
    /// The capture loop starts ticking before the camera is acquired and keeps
    /// running when acquisition fails; ticks just skip until a frame shows up.
    /// A closed command channel is not a quit request, headless mode with a
    /// closed stdin keeps uploading until interrupted.
    pub async fn run(
        mut self,
        uploader: CaptureUploader,
        mut commands: mpsc::UnboundedReceiver<AppCommand>,
    ) -> AppResult<CaptureUploader> {
        let capture = uploader.spawn();

        let facing = self.session.facing_mode();
        if self.session.start(facing).await.is_err() {
            warn!(facing = %facing, "Initial camera start failed, waiting for commands");
        }
        self.publish();

        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(interrupted);

        let mut commands_open = true;
        loop {
            tokio::select! {
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(AppCommand::SwitchCamera) => self.switch().await,
                    Some(AppCommand::Quit) => break,
                    None => {
                        debug!("Command channel closed");
                        commands_open = false;
                    }
                },
                _ = &mut interrupted => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        info!("Shutting down");
        self.session.release().await;
        self.publish();
        Ok(capture.stop().await?)
    }

    async fn switch(&mut self) {
        if !self.switch_enabled {
            debug!("Camera switching is disabled");
            return;
        }
        // Failures were already shown to the user by the session
        let _ = self.session.switch().await;
        self.publish();
    }

    fn publish(&self) {
        self.status_tx.send_replace(SessionStatus::of(&self.session));
    }
}
