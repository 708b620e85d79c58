// SPDX-License-Identifier: MPL-2.0

//! In-memory doubles for the camera backend, encoder, transport and notifier

#![allow(dead_code)]

use async_trait::async_trait;
use camera_uploader::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraDevice, CameraFormat,
    CameraFrame, FacingMode, FrameSender, MediaStream, MediaTrack, StreamConstraints,
    frame_channel, select_device,
};
use camera_uploader::errors::{EncodeError, UploadError};
use camera_uploader::session::UserNotifier;
use camera_uploader::uploader::{EncodeParams, EncodedImage, FrameEncoder, JpegEncoder, UploadTransport};
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Something the mock backend observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    Acquired(FacingMode),
    AcquireFailed(FacingMode),
    Stopped(String),
}

#[derive(Default)]
struct Hardware {
    live: AtomicUsize,
    max_live: AtomicUsize,
    events: Mutex<Vec<CameraEvent>>,
    stop_threads: Mutex<Vec<ThreadId>>,
}

impl Hardware {
    fn record(&self, event: CameraEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct MockTrack {
    label: String,
    live: bool,
    hardware: Arc<Hardware>,
    frames: Arc<FrameSender>,
}

impl MediaTrack for MockTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.hardware.live.fetch_sub(1, Ordering::SeqCst);
            self.hardware.record(CameraEvent::Stopped(self.label.clone()));
            self.hardware
                .stop_threads
                .lock()
                .unwrap()
                .push(std::thread::current().id());
            self.frames.send_replace(None);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

/// Camera backend with a front (640x480) and a back (1280x720) camera
///
/// Every acquired stream immediately publishes one solid frame at the
/// camera's resolution.
pub struct MockBackend {
    cameras: Vec<(CameraDevice, u32, u32)>,
    hardware: Arc<Hardware>,
    fail_with: Mutex<Option<BackendError>>,
    current: Mutex<Option<Arc<FrameSender>>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Self::with_cameras(vec![
            (camera("Front", Some(FacingMode::User)), 640, 480),
            (camera("Back", Some(FacingMode::Environment)), 1280, 720),
        ])
    }

    pub fn with_cameras(cameras: Vec<(CameraDevice, u32, u32)>) -> Arc<Self> {
        Arc::new(Self {
            cameras,
            hardware: Arc::new(Hardware::default()),
            fail_with: Mutex::new(None),
            current: Mutex::new(None),
        })
    }

    /// Make every following acquisition fail with `error`
    pub fn fail_with(&self, error: BackendError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn live_streams(&self) -> usize {
        self.hardware.live.load(Ordering::SeqCst)
    }

    pub fn max_live_streams(&self) -> usize {
        self.hardware.max_live.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<CameraEvent> {
        self.hardware.events.lock().unwrap().clone()
    }

    /// Threads that ran each track stop, in order
    pub fn stop_threads(&self) -> Vec<ThreadId> {
        self.hardware.stop_threads.lock().unwrap().clone()
    }

    /// Publish a frame on the most recently acquired stream
    pub fn publish(&self, frame: CameraFrame) {
        if let Some(sender) = self.current.lock().unwrap().as_ref() {
            sender.send_replace(Some(Arc::new(frame)));
        }
    }
}

#[async_trait]
impl CameraBackend for MockBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.cameras.iter().map(|(d, _, _)| d.clone()).collect()
    }

    async fn acquire(&self, constraints: &StreamConstraints) -> BackendResult<MediaStream> {
        // Real backends open devices off the async thread
        tokio::task::yield_now().await;

        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            self.hardware
                .record(CameraEvent::AcquireFailed(constraints.facing_mode));
            return Err(error);
        }

        let devices = self.enumerate_cameras();
        let device = select_device(&devices, constraints.facing_mode)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound("no mock cameras".into()))?;
        let (width, height) = self
            .cameras
            .iter()
            .find(|(d, _, _)| d.path == device.path)
            .map(|(_, w, h)| (*w, *h))
            .unwrap_or((640, 480));

        let live = self.hardware.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.hardware.max_live.fetch_max(live, Ordering::SeqCst);
        self.hardware
            .record(CameraEvent::Acquired(constraints.facing_mode));

        let (tx, rx) = frame_channel();
        let frames = Arc::new(tx);
        frames.send_replace(Some(Arc::new(solid_frame(width, height, [90, 120, 150]))));
        *self.current.lock().unwrap() = Some(Arc::clone(&frames));

        let track = MockTrack {
            label: device.name.clone(),
            live: true,
            hardware: Arc::clone(&self.hardware),
            frames,
        };
        Ok(MediaStream::new(
            device,
            CameraFormat {
                width,
                height,
                pixel_format: "RGBA".to_string(),
            },
            vec![Box::new(track)],
            rx,
        ))
    }
}

pub fn camera(name: &str, facing: Option<FacingMode>) -> CameraDevice {
    CameraDevice {
        name: name.to_string(),
        path: format!("mock:{}", name.to_lowercase()),
        facing,
        driver: None,
    }
}

pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> CameraFrame {
    let data = (0..width * height)
        .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
        .collect();
    CameraFrame::from_rgba(width, height, data)
}

/// Encoder call as seen by [`RecordingEncoder`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeCall {
    pub width: u32,
    pub height: u32,
    pub params: EncodeParams,
}

/// Records every call, then encodes for real
#[derive(Default)]
pub struct RecordingEncoder {
    calls: Mutex<Vec<EncodeCall>>,
}

impl RecordingEncoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl FrameEncoder for RecordingEncoder {
    fn encode(&self, image: &RgbImage, params: EncodeParams) -> Result<EncodedImage, EncodeError> {
        self.calls.lock().unwrap().push(EncodeCall {
            width: image.width(),
            height: image.height(),
            params,
        });
        JpegEncoder.encode(image, params)
    }
}

/// A request as seen by [`RecordingTransport`]
#[derive(Debug, Clone)]
pub struct SentImage {
    pub body: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Records uploads; optionally holds each one until released
#[derive(Default)]
pub struct RecordingTransport {
    started: AtomicUsize,
    sent: Mutex<Vec<SentImage>>,
    gate: Option<Semaphore>,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every upload blocks until [`release`](Self::release) grants it a permit
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn release(&self, uploads: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(uploads);
        }
    }

    /// Uploads that have started, finished or not
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentImage> {
        self.sent.lock().unwrap().clone()
    }

    /// Poll until `count` uploads have started
    pub async fn wait_started(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.started() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("uploads did not start in time");
    }
}

#[async_trait]
impl UploadTransport for RecordingTransport {
    async fn send(&self, image: EncodedImage) -> Result<(), UploadError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?
                .forget();
        }
        if self.fail {
            return Err(UploadError::Transport("connection refused".into()));
        }
        self.sent.lock().unwrap().push(SentImage {
            body: image.data,
            width: image.width,
            height: image.height,
        });
        Ok(())
    }
}

/// Collects alert messages
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}
