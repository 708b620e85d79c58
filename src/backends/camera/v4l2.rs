// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 camera capture
//!
//! Opens a `/dev/video*` node with the v4l crate, negotiates MJPEG (falling
//! back to packed YUV), and decodes every dequeued buffer to RGBA on a
//! dedicated capture thread.

use super::format_converters::{CaptureEncoding, decode_frame};
use super::frame_loop::{CaptureLoopController, LoopAction};
use super::stream::{CaptureTrack, MediaStream};
use super::types::*;
use super::v4l2_utils::enumerate_capture_devices;
use super::{CameraBackend, select_device};
use crate::constants::v4l2::{BUFFER_COUNT, DEQUEUE_TIMEOUT_MS};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Encodings tried during negotiation, in order of preference
const NEGOTIATION_ORDER: [CaptureEncoding; 3] = [
    CaptureEncoding::Mjpeg,
    CaptureEncoding::Yuyv,
    CaptureEncoding::Uyvy,
];

/// V4L2 camera backend
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        enumerate_capture_devices()
    }

    async fn acquire(&self, constraints: &StreamConstraints) -> BackendResult<MediaStream> {
        let constraints = *constraints;
        // Device enumeration and opening are blocking ioctls
        tokio::task::spawn_blocking(move || open_stream(constraints))
            .await
            .map_err(|e| BackendError::Other(format!("Acquisition task failed: {}", e)))?
    }
}

/// Per-thread capture state; dropping it closes the device
struct CaptureState {
    stream: MmapStream<'static>,
    _device: Device,
    encoding: CaptureEncoding,
    width: u32,
    height: u32,
    frames: Arc<FrameSender>,
}

fn open_stream(constraints: StreamConstraints) -> BackendResult<MediaStream> {
    let devices = enumerate_capture_devices();
    let device = select_device(&devices, constraints.facing_mode)
        .cloned()
        .ok_or_else(|| BackendError::DeviceNotFound("No V4L2 capture devices found".to_string()))?;

    info!(
        device = %device.name,
        path = %device.path,
        requested = %constraints.facing_mode,
        actual = ?device.facing,
        "Opening V4L2 camera"
    );

    let (frame_tx, frame_rx) = frame_channel();
    let frames = Arc::new(frame_tx);
    let (format_tx, format_rx) = mpsc::channel::<CameraFormat>();

    let path = device.path.clone();
    let loop_frames = Arc::clone(&frames);
    let controller = CaptureLoopController::start_with_init(
        &format!("v4l2-capture-{}", device_basename(&path)),
        move || {
            let device = Device::with_path(&path)?;
            let (encoding, format) = negotiate(&device, constraints.width, constraints.height)?;

            let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;
            stream.set_timeout(Duration::from_millis(DEQUEUE_TIMEOUT_MS));

            let _ = format_tx.send(CameraFormat {
                width: format.width,
                height: format.height,
                pixel_format: String::from_utf8_lossy(encoding.fourcc()).to_string(),
            });

            Ok(CaptureState {
                stream,
                _device: device,
                encoding,
                width: format.width,
                height: format.height,
                frames: loop_frames,
            })
        },
        capture_iteration,
    )?;

    let format = format_rx.try_recv().map_err(|_| {
        BackendError::InitializationFailed("Capture thread did not report a format".to_string())
    })?;
    info!(device = %device.name, format = %format, "V4L2 stream started");

    let track = CaptureTrack::new(device.name.clone(), controller, frames);
    Ok(MediaStream::new(device, format, vec![Box::new(track)], frame_rx))
}

/// Dequeue, decode and publish one buffer
fn capture_iteration(state: &mut CaptureState) -> LoopAction {
    match state.stream.next() {
        Ok((buf, meta)) => {
            let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
            let filled = payload(buf, meta.bytesused);
            match decode_frame(state.encoding, filled, state.width, state.height) {
                Ok(frame) => {
                    state.frames.send_replace(Some(Arc::new(frame)));
                }
                Err(e) => {
                    // Corrupt MJPEG frames happen on USB hiccups; only log occasionally
                    if frame_num % 30 == 0 {
                        warn!(frame = frame_num, error = %e, "Dropping undecodable frame");
                    }
                }
            }
            LoopAction::Continue
        }
        Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
            LoopAction::Continue
        }
        Err(e) => {
            warn!(error = %e, "V4L2 dequeue failed, stopping capture");
            state.frames.send_replace(None);
            LoopAction::Stop
        }
    }
}

/// The filled part of a dequeued mmap buffer
fn payload(buf: &[u8], bytesused: u32) -> &[u8] {
    &buf[..(bytesused as usize).min(buf.len())]
}

/// Negotiate a decodable pixel format close to the requested resolution
fn negotiate(device: &Device, width: u32, height: u32) -> BackendResult<(CaptureEncoding, Format)> {
    for encoding in NEGOTIATION_ORDER {
        let mut format = device.format()?;
        format.width = width;
        format.height = height;
        format.fourcc = FourCC::new(encoding.fourcc());

        match device.set_format(&format) {
            Ok(actual) if actual.fourcc == format.fourcc => {
                debug!(
                    width = actual.width,
                    height = actual.height,
                    fourcc = %actual.fourcc,
                    "Negotiated V4L2 format"
                );
                return Ok((encoding, actual));
            }
            Ok(actual) => {
                debug!(wanted = %format.fourcc, got = %actual.fourcc, "Driver substituted format");
            }
            // A busy device will not get any less busy with another fourcc
            Err(e) if e.kind() == ErrorKind::ResourceBusy => return Err(e.into()),
            Err(e) => {
                debug!(fourcc = %format.fourcc, error = %e, "VIDIOC_S_FMT rejected");
            }
        }
    }

    let current = device.format()?;
    CaptureEncoding::from_fourcc(&current.fourcc.repr)
        .map(|encoding| (encoding, current))
        .ok_or_else(|| {
            BackendError::FormatNotSupported(format!(
                "device only offers {} which cannot be decoded",
                current.fourcc
            ))
        })
}

fn device_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
