// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture and upload cadence
pub mod timing {
    use super::Duration;

    /// Period between two capture ticks
    pub const CAPTURE_INTERVAL: Duration = Duration::from_millis(100);

    /// How long `snap` waits for the first decoded frame after acquisition
    pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

    /// How often `snap` re-checks the surface while waiting for a frame
    pub const FIRST_FRAME_POLL: Duration = Duration::from_millis(16);

    /// Terminal redraw / input poll interval
    pub const TERMINAL_POLL: Duration = Duration::from_millis(33);

    /// Frame period of the synthetic test-pattern cameras (~30 fps)
    pub const TEST_PATTERN_FRAME: Duration = Duration::from_millis(33);
}

/// Snapshot encoding
pub mod encoding {
    /// Encoder quality factor in the 0.0..=1.0 range
    pub const QUALITY_FACTOR: f32 = 0.6;
}

/// Upload endpoint
pub mod upload {
    /// Path on the server that receives snapshots
    pub const PATH: &str = "/upload";

    /// MIME type of the request body
    pub const CONTENT_TYPE: &str = "image/jpeg";

    /// Server used when neither the config file nor the CLI names one
    pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
}

/// V4L2 capture settings
pub mod v4l2 {
    /// Number of mmap buffers queued with the driver
    pub const BUFFER_COUNT: u32 = 4;

    /// Dequeue timeout so the capture thread notices stop requests on stalled devices
    pub const DEQUEUE_TIMEOUT_MS: u64 = 500;

    /// Default preferred capture resolution
    pub const PREFERRED_WIDTH: u32 = 640;
    pub const PREFERRED_HEIGHT: u32 = 480;
}
