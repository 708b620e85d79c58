// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic cameras for machines without camera hardware
//!
//! Exposes one front and one back camera with different resolutions, so a
//! camera switch also exercises the resolution change on the upload side.

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::stream::{CaptureTrack, MediaStream};
use super::types::*;
use super::{CameraBackend, select_device};
use crate::constants::timing::TEST_PATTERN_FRAME;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Backend serving animated test patterns
#[derive(Debug, Clone)]
pub struct TestPatternBackend {
    cameras: Vec<(CameraDevice, u32, u32)>,
}

impl TestPatternBackend {
    pub fn new() -> Self {
        Self {
            cameras: vec![
                (
                    CameraDevice {
                        name: "Test Pattern (front)".to_string(),
                        path: "test-pattern:front".to_string(),
                        facing: Some(FacingMode::User),
                        driver: None,
                    },
                    640,
                    480,
                ),
                (
                    CameraDevice {
                        name: "Test Pattern (back)".to_string(),
                        path: "test-pattern:back".to_string(),
                        facing: Some(FacingMode::Environment),
                        driver: None,
                    },
                    1280,
                    720,
                ),
            ],
        }
    }

    fn resolution_of(&self, device: &CameraDevice) -> (u32, u32) {
        self.cameras
            .iter()
            .find(|(d, _, _)| d.path == device.path)
            .map(|(_, w, h)| (*w, *h))
            .unwrap_or((640, 480))
    }
}

impl Default for TestPatternBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraBackend for TestPatternBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.cameras.iter().map(|(d, _, _)| d.clone()).collect()
    }

    async fn acquire(&self, constraints: &StreamConstraints) -> BackendResult<MediaStream> {
        let devices = self.enumerate_cameras();
        let device = select_device(&devices, constraints.facing_mode)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound("No test pattern cameras".to_string()))?;
        let (width, height) = self.resolution_of(&device);
        let tint = match device.facing {
            Some(FacingMode::Environment) => [40, 160, 60],
            _ => [60, 90, 200],
        };

        info!(device = %device.name, width, height, "Starting test pattern");

        let (frame_tx, frame_rx) = frame_channel();
        let frames = Arc::new(frame_tx);
        let loop_frames = Arc::clone(&frames);

        let controller = tokio::task::spawn_blocking(move || {
            CaptureLoopController::start_with_init(
                "test-pattern",
                || Ok(0u32),
                move |frame_index| {
                    let frame = render_pattern(width, height, *frame_index, tint);
                    loop_frames.send_replace(Some(Arc::new(frame)));
                    *frame_index = frame_index.wrapping_add(1);
                    std::thread::sleep(TEST_PATTERN_FRAME);
                    LoopAction::Continue
                },
            )
        })
        .await
        .map_err(|e| BackendError::Other(format!("Acquisition task failed: {}", e)))??;

        let format = CameraFormat {
            width,
            height,
            pixel_format: "RGBA".to_string(),
        };
        let track = CaptureTrack::new(device.name.clone(), controller, frames);
        Ok(MediaStream::new(device, format, vec![Box::new(track)], frame_rx))
    }
}

/// Horizontal gradient in the camera's tint with a sweeping white bar
pub fn render_pattern(width: u32, height: u32, frame_index: u32, tint: [u8; 3]) -> CameraFrame {
    let mut data = vec![0u8; (width * height * 4) as usize];
    let bar_width = (width / 16).max(1);
    let bar_x = frame_index.wrapping_mul(8) % width.max(1);

    for (i, px) in data.chunks_exact_mut(4).enumerate() {
        let x = i as u32 % width;
        let shade = (x * 255 / width.max(1)) as u16;
        if x >= bar_x && x < bar_x + bar_width {
            px.copy_from_slice(&[255, 255, 255, 255]);
        } else {
            px[0] = ((tint[0] as u16 * shade) / 255) as u8;
            px[1] = ((tint[1] as u16 * shade) / 255) as u8;
            px[2] = ((tint[2] as u16 * shade) / 255) as u8;
            px[3] = 255;
        }
    }

    CameraFrame::from_rgba(width, height, data)
}
