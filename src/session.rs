// SPDX-License-Identifier: GPL-3.0-only

//! Camera session lifecycle
//!
//! A [`CameraSession`] owns at most one live [`MediaStream`]. Starting a
//! stream always tears the previous one down first, so switching between the
//! front and back camera never holds two devices at once.

use crate::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraDevice, FacingMode, MediaStream,
    StreamConstraints,
};
use crate::constants::v4l2::{PREFERRED_HEIGHT, PREFERRED_WIDTH};
use crate::surface::VideoSurface;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Blocking user-visible notification channel
///
/// Front ends implement this to show acquisition errors. The terminal UI pops
/// a modal that waits for a key press; headless mode prints to stderr.
pub trait UserNotifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Notifier that only writes to the log and stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn alert(&self, message: &str) {
        error!(message, "Camera alert");
        eprintln!("{}", message);
    }
}

/// Observable state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No stream is bound
    Idle,
    /// A stream requested with this facing mode is live
    Active(FacingMode),
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Active(mode) => write!(f, "active ({})", mode),
        }
    }
}

/// Owner of the active camera stream
pub struct CameraSession {
    backend: Arc<dyn CameraBackend>,
    surface: VideoSurface,
    notifier: Arc<dyn UserNotifier>,
    facing_mode: FacingMode,
    stream: Option<MediaStream>,
    preferred_resolution: (u32, u32),
}

impl CameraSession {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        surface: VideoSurface,
        notifier: Arc<dyn UserNotifier>,
        default_facing: FacingMode,
    ) -> Self {
        Self {
            backend,
            surface,
            notifier,
            facing_mode: default_facing,
            stream: None,
            preferred_resolution: (PREFERRED_WIDTH, PREFERRED_HEIGHT),
        }
    }

    /// Resolution asked from the backend on every acquisition
    pub fn with_preferred_resolution(mut self, width: u32, height: u32) -> Self {
        self.preferred_resolution = (width, height);
        self
    }

    /// Acquire a camera facing `facing_mode` and bind it to the surface
    ///
    /// Any current stream is stopped before the new one is requested. On
    /// failure the user is alerted, nothing is bound and the session is idle.
    /// There is no retry.
    pub async fn start(&mut self, facing_mode: FacingMode) -> BackendResult<()> {
        self.release().await;

        let (width, height) = self.preferred_resolution;
        let constraints = StreamConstraints::ideal(facing_mode).with_resolution(width, height);

        info!(facing = %facing_mode, "Requesting camera stream");
        match self.backend.acquire(&constraints).await {
            Ok(stream) => {
                info!(
                    stream = %stream.id(),
                    device = %stream.device().name,
                    format = %stream.format(),
                    "Camera stream started"
                );
                self.surface.set_source(Some(stream.frames()));
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                error!(facing = %facing_mode, error = %e, "Camera acquisition failed");
                self.notifier.alert(&alert_message(&e));
                Err(e)
            }
        }
    }

    /// Stop every track of the current stream and unbind the surface
    ///
    /// Calling this without a stream does nothing. Stopping a capture track
    /// joins its thread, so async callers should prefer [`release`](Self::release).
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.unbind() {
            stream.stop_all_tracks();
            info!(stream = %stream.id(), device = %stream.device().name, "Camera stream stopped");
        }
    }

    /// [`stop`](Self::stop) with the track shutdown moved to the blocking pool
    ///
    /// Returns once the device is released.
    pub async fn release(&mut self) {
        let Some(mut stream) = self.unbind() else {
            return;
        };
        let released = tokio::task::spawn_blocking(move || {
            stream.stop_all_tracks();
            stream
        })
        .await;
        match released {
            Ok(stream) => {
                info!(stream = %stream.id(), device = %stream.device().name, "Camera stream stopped");
            }
            // The stream was dropped while unwinding, which stops its tracks
            Err(e) => warn!(error = %e, "Camera release task failed"),
        }
    }

    fn unbind(&mut self) -> Option<MediaStream> {
        let stream = self.stream.take()?;
        self.surface.set_source(None);
        Some(stream)
    }

    /// Flip between the user and environment camera and restart
    pub async fn switch(&mut self) -> BackendResult<()> {
        self.facing_mode = self.facing_mode.toggled();
        info!(facing = %self.facing_mode, "Switching camera");
        self.start(self.facing_mode).await
    }

    pub fn state(&self) -> SessionState {
        match self.stream {
            Some(_) => SessionState::Active(self.facing_mode),
            None => SessionState::Idle,
        }
    }

    /// Current facing-mode selection, whether or not a stream is live
    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    /// Device serving the current stream
    pub fn active_device(&self) -> Option<&CameraDevice> {
        self.stream.as_ref().map(MediaStream::device)
    }

    pub fn surface(&self) -> &VideoSurface {
        &self.surface
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Human readable text for an acquisition failure
fn alert_message(err: &BackendError) -> String {
    match err {
        BackendError::PermissionDenied(_) => {
            format!("Camera access was denied. {}", err)
        }
        BackendError::DeviceBusy(_) => {
            format!("The camera is in use by another application. {}", err)
        }
        BackendError::DeviceNotFound(_) | BackendError::NotAvailable(_) => {
            format!("No camera was found. {}", err)
        }
        _ => format!("Could not start the camera. {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_message_mentions_cause() {
        let msg = alert_message(&BackendError::DeviceBusy("/dev/video0".into()));
        assert!(msg.contains("in use"));
        assert!(msg.contains("/dev/video0"));
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(
            SessionState::Active(FacingMode::Environment).to_string(),
            "active (environment)"
        );
    }
}
