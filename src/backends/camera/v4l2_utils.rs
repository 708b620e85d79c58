// SPDX-License-Identifier: GPL-3.0-only

//! Shared V4L2 utility functions
//!
//! Device discovery and the heuristics used to guess which way a V4L2 camera
//! faces. V4L2 has no location property of its own, so the guess comes from
//! the card name and the driver.

use super::types::{CameraDevice, FacingMode};
use tracing::debug;
use v4l::capability::Flags;

/// Card-name fragments that identify a front (user-facing) sensor
const USER_HINTS: [&str; 3] = ["front", "user", "selfie"];

/// Card-name fragments that identify a back (environment-facing) sensor
const ENVIRONMENT_HINTS: [&str; 4] = ["back", "rear", "world", "environment"];

/// Guess the facing mode of a capture device
///
/// Explicit hints in the card name win. USB webcams (uvcvideo) sit on top of a
/// monitor or laptop lid pointing at the user, so they count as user-facing.
/// Anything else is unknown.
pub fn infer_facing(card: &str, driver: &str) -> Option<FacingMode> {
    let card = card.to_lowercase();

    if ENVIRONMENT_HINTS.iter().any(|hint| card.contains(hint)) {
        return Some(FacingMode::Environment);
    }
    if USER_HINTS.iter().any(|hint| card.contains(hint)) {
        return Some(FacingMode::User);
    }
    if driver == "uvcvideo" {
        return Some(FacingMode::User);
    }
    None
}

/// Enumerate V4L2 nodes that can capture video
///
/// Metadata nodes and output-only devices (e.g. loopback sinks with no
/// producer) are skipped. Nodes that cannot be opened are skipped as well;
/// the error resurfaces when someone actually tries to acquire them.
pub fn enumerate_capture_devices() -> Vec<CameraDevice> {
    let mut nodes = v4l::context::enum_devices();
    nodes.sort_by_key(|node| node.index());

    let mut devices = Vec::new();
    for node in nodes {
        let path = node.path().to_string_lossy().to_string();

        let dev = match v4l::Device::with_path(node.path()) {
            Ok(dev) => dev,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping V4L2 node that cannot be opened");
                continue;
            }
        };
        let caps = match dev.query_caps() {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "VIDIOC_QUERYCAP failed");
                continue;
            }
        };

        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            debug!(path = %path, card = %caps.card, "Not a capture node");
            continue;
        }

        let facing = infer_facing(&caps.card, &caps.driver);
        debug!(path = %path, card = %caps.card, driver = %caps.driver, ?facing, "Found capture device");

        devices.push(CameraDevice {
            name: caps.card,
            path,
            facing,
            driver: Some(caps.driver),
        });
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_hints() {
        assert_eq!(
            infer_facing("ov5640 Front Camera", "sun6i-csi"),
            Some(FacingMode::User)
        );
        assert_eq!(
            infer_facing("imx258 rear", "qcom-camss"),
            Some(FacingMode::Environment)
        );
    }

    #[test]
    fn test_back_hint_beats_usb_default() {
        assert_eq!(
            infer_facing("Back camera", "uvcvideo"),
            Some(FacingMode::Environment)
        );
    }

    #[test]
    fn test_usb_webcam_faces_user() {
        assert_eq!(
            infer_facing("HD Pro Webcam C920", "uvcvideo"),
            Some(FacingMode::User)
        );
    }

    #[test]
    fn test_unknown_device() {
        assert_eq!(infer_facing("Dummy video device", "v4l2 loopback"), None);
    }
}
