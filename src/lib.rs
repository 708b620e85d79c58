// SPDX-License-Identifier: MPL-2.0

//! Camera snapshot uploader
//!
//! Captures frames from a camera and uploads them as JPEG snapshots to an
//! HTTP endpoint every 100 ms, with runtime switching between the front
//! (user) and back (environment) camera.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera acquisition (V4L2 and a synthetic test pattern)
//! - [`session`]: Camera lifecycle, at most one live stream at a time
//! - [`surface`]: Shared handle to the latest decoded frame
//! - [`uploader`]: Periodic capture, JPEG encoding and fire-and-forget upload
//! - [`app`]: Command routing between the front ends and the session
//! - [`terminal`]: Terminal preview UI
//! - [`config`]: User configuration handling

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod session;
pub mod surface;
pub mod terminal;
pub mod uploader;

// Re-export commonly used types
pub use app::{AppCommand, AppController};
pub use config::Config;
pub use session::{CameraSession, SessionState, UserNotifier};
pub use surface::VideoSurface;
pub use uploader::{CaptureUploader, TickOutcome};
