// SPDX-License-Identifier: GPL-3.0-only

//! Live media streams handed out by camera backends
//!
//! A [`MediaStream`] owns the hardware for as long as any of its tracks is
//! live. Stopping every track releases the device; the stream itself is never
//! restarted, a new one is acquired instead.

use super::frame_loop::CaptureLoopController;
use super::types::{CameraDevice, CameraFormat, FacingMode, FrameReceiver, FrameSender};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// One source of media inside a stream (a single video track for cameras)
pub trait MediaTrack: Send {
    /// Human readable label, usually the device name
    fn label(&self) -> &str;

    /// Stop the track and release whatever it holds
    ///
    /// Must be idempotent: stopping an already stopped track is a no-op.
    fn stop(&mut self);

    /// Whether the track is still delivering media
    fn is_live(&self) -> bool;
}

/// Video track backed by a capture thread
///
/// Stopping the track joins the capture thread (closing the device) and clears
/// the frame feed so nothing keeps showing the last image of a dead camera.
pub struct CaptureTrack {
    label: String,
    controller: Option<CaptureLoopController>,
    frames: Arc<FrameSender>,
}

impl CaptureTrack {
    pub fn new(
        label: impl Into<String>,
        controller: CaptureLoopController,
        frames: Arc<FrameSender>,
    ) -> Self {
        Self {
            label: label.into(),
            controller: Some(controller),
            frames,
        }
    }
}

impl MediaTrack for CaptureTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
            self.frames.send_replace(None);
        }
    }

    fn is_live(&self) -> bool {
        self.controller
            .as_ref()
            .is_some_and(CaptureLoopController::is_running)
    }
}

/// A live camera feed
pub struct MediaStream {
    id: Uuid,
    device: CameraDevice,
    format: CameraFormat,
    tracks: Vec<Box<dyn MediaTrack>>,
    frames: FrameReceiver,
}

impl MediaStream {
    pub fn new(
        device: CameraDevice,
        format: CameraFormat,
        tracks: Vec<Box<dyn MediaTrack>>,
        frames: FrameReceiver,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            format,
            tracks,
            frames,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    pub fn format(&self) -> &CameraFormat {
        &self.format
    }

    /// Facing reported by the device that actually served the request
    pub fn facing(&self) -> Option<FacingMode> {
        self.device.facing
    }

    /// A receiver for the stream's latest decoded frame
    pub fn frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    /// True while at least one track is live
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    /// Stop every track of the stream
    pub fn stop_all_tracks(&mut self) {
        for track in &mut self.tracks {
            if track.is_live() {
                debug!(stream = %self.id, track = track.label(), "Stopping track");
            }
            track.stop();
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("device", &self.device.name)
            .field("format", &self.format)
            .field("tracks", &self.tracks.len())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        // Dropping a stream must never leave the camera held
        self.stop_all_tracks();
    }
}
