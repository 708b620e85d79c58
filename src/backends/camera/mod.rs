// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │    CameraSession    │  ← start / stop / switch, owns the MediaStream
//! └──────────┬──────────┘
//!            │ acquire(StreamConstraints)
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface, injectable for tests
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴───────┐
//!      ▼             ▼
//!  ┌──────┐   ┌────────────┐
//!  │ V4L2 │   │Test pattern│
//!  └──────┘   └────────────┘
//! ```

pub mod format_converters;
pub mod frame_loop;
pub mod stream;
pub mod test_pattern;
pub mod types;
pub mod v4l2;
pub mod v4l2_utils;

pub use stream::{CaptureTrack, MediaStream, MediaTrack};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Camera acquisition capability
///
/// A backend knows how to list cameras and how to open one of them as a live
/// [`MediaStream`]. It keeps no per-stream state: ownership of the hardware
/// lives entirely in the returned stream.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open a camera matching the constraints as closely as possible
    ///
    /// The facing mode is a preference: when no device faces the requested
    /// way the backend substitutes the nearest available camera.
    ///
    /// # Returns
    /// * `Ok(MediaStream)` - Live stream, frames start arriving asynchronously
    /// * `Err(BackendError)` - No camera, permission denied, device busy, ...
    async fn acquire(&self, constraints: &StreamConstraints) -> BackendResult<MediaStream>;
}

/// Pick the device that best satisfies a facing-mode preference
///
/// Exact matches first, then devices whose facing is unknown, then whatever
/// is left.
pub fn select_device(devices: &[CameraDevice], facing: FacingMode) -> Option<&CameraDevice> {
    devices
        .iter()
        .find(|d| d.facing == Some(facing))
        .or_else(|| devices.iter().find(|d| d.facing.is_none()))
        .or_else(|| devices.first())
}

/// Get a concrete backend instance for a backend type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Arc<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Arc::new(v4l2::V4l2Backend::new()),
        CameraBackendType::TestPattern => Arc::new(test_pattern::TestPatternBackend::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, facing: Option<FacingMode>) -> CameraDevice {
        CameraDevice {
            name: name.to_string(),
            path: format!("/dev/{}", name),
            facing,
            driver: None,
        }
    }

    #[test]
    fn test_select_exact_facing() {
        let devices = vec![
            device("front", Some(FacingMode::User)),
            device("back", Some(FacingMode::Environment)),
        ];
        assert_eq!(
            select_device(&devices, FacingMode::Environment).map(|d| d.name.as_str()),
            Some("back")
        );
        assert_eq!(
            select_device(&devices, FacingMode::User).map(|d| d.name.as_str()),
            Some("front")
        );
    }

    #[test]
    fn test_select_prefers_unknown_over_opposite() {
        let devices = vec![
            device("webcam", Some(FacingMode::User)),
            device("capture-card", None),
        ];
        assert_eq!(
            select_device(&devices, FacingMode::Environment).map(|d| d.name.as_str()),
            Some("capture-card")
        );
    }

    #[test]
    fn test_select_falls_back_to_any_camera() {
        let devices = vec![device("webcam", Some(FacingMode::User))];
        assert_eq!(
            select_device(&devices, FacingMode::Environment).map(|d| d.name.as_str()),
            Some("webcam")
        );
        assert!(select_device(&[], FacingMode::User).is_none());
    }
}
