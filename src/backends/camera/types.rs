// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::v4l2::{PREFERRED_HEIGHT, PREFERRED_WIDTH};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Camera backend type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices (/dev/video*)
    #[default]
    V4l2,
    /// Synthetic front/back cameras rendering a moving test pattern
    TestPattern,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::TestPattern => write!(f, "test pattern"),
        }
    }
}

/// Which physical camera a stream should come from
///
/// The names follow the usual media-capture vocabulary: `user` is the camera
/// facing the person holding the device (front/selfie), `environment` faces away.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

impl FacingMode {
    /// The other facing mode
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,                // Device node or synthetic identifier
    pub facing: Option<FacingMode>,  // None when the device gives no hint
    pub driver: Option<String>,      // V4L2 driver name (e.g. "uvcvideo")
}

/// Camera format specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: String, // FourCC code (e.g., "MJPG", "YUYV")
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
    }
}

/// Constraints passed to [`super::CameraBackend::acquire`]
///
/// Every field is a preference. Backends pick the closest device and format
/// they can actually deliver rather than failing on a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Ideal facing mode
    pub facing_mode: FacingMode,
    /// Ideal capture width
    pub width: u32,
    /// Ideal capture height
    pub height: u32,
}

impl StreamConstraints {
    /// Constraints with an ideal facing mode and the default resolution
    pub fn ideal(facing_mode: FacingMode) -> Self {
        Self {
            facing_mode,
            width: PREFERRED_WIDTH,
            height: PREFERRED_HEIGHT,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Bytes per pixel of decoded frames (RGBA)
const BYTES_PER_PIXEL: usize = 4;

/// A single decoded frame from the camera
///
/// Every backend decodes to tightly packed RGBA before publishing.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
        }
    }

    /// Whether the frame carries displayable pixels
    pub fn has_pixels(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.data.is_empty()
    }

    /// Read one pixel as RGB, clamping coordinates to the frame
    ///
    /// Out-of-range data (short buffers) yields black instead of panicking.
    pub fn sample_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let idx = (y * self.width as usize + x) * BYTES_PER_PIXEL;
        match self.data.get(idx..idx + 3) {
            Some(px) => (px[0], px[1], px[2]),
            None => (0, 0, 0),
        }
    }

    /// Nearest-neighbour sample for pixel (x, y) of a raster the frame is
    /// stretched over
    pub fn sample_scaled(
        &self,
        x: u32,
        y: u32,
        target_width: u32,
        target_height: u32,
    ) -> (u8, u8, u8) {
        if target_width == 0 || target_height == 0 {
            return (0, 0, 0);
        }
        let sx = u64::from(x) * u64::from(self.width) / u64::from(target_width);
        let sy = u64::from(y) * u64::from(self.height) / u64::from(target_height);
        self.sample_rgb(sx as u32, sy as u32)
    }
}

/// Latest-frame feed published by a live stream
pub type FrameSender = watch::Sender<Option<Arc<CameraFrame>>>;

/// Receiving end of a stream's latest-frame feed
pub type FrameReceiver = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Create an empty latest-frame feed
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    watch::channel(None)
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// The OS refused access to the camera
    PermissionDenied(String),
    /// Another process holds the camera
    DeviceBusy(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Failed to start streaming
    InitializationFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceBusy(msg) => write!(f, "Camera is busy: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let msg = err.to_string();
        match err.kind() {
            ErrorKind::PermissionDenied => BackendError::PermissionDenied(msg),
            ErrorKind::NotFound => BackendError::DeviceNotFound(msg),
            ErrorKind::ResourceBusy => BackendError::DeviceBusy(msg),
            _ => BackendError::IoError(msg),
        }
    }
}
