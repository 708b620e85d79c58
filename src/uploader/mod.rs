// SPDX-License-Identifier: GPL-3.0-only

//! Periodic snapshot uploader
//!
//! ```text
//! interval (100 ms) → tick → FrameBuffer (resize + render)
//!                              ↓ snapshot
//!                     detached task: encode (blocking pool) → POST /upload
//! ```
//!
//! Ticks never wait for uploads. Each dispatched snapshot lives in its own
//! task, so a slow server simply means several uploads in flight at once.
//! Nothing is retried and failures are only counted.

pub mod detached;
pub mod encoding;
pub mod transport;

pub use detached::DetachedTasks;
pub use encoding::{EncodeParams, EncodedImage, EncodingFormat, FrameEncoder, JpegEncoder};
pub use transport::{HttpTransport, UploadTransport};

use crate::backends::camera::CameraFrame;
use crate::constants::timing::CAPTURE_INTERVAL;
use crate::errors::UploadError;
use crate::surface::VideoSurface;
use chrono::{DateTime, Local};
use image::RgbImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

/// Off-screen RGB raster the current frame is rendered into
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    image: RgbImage,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            image: RgbImage::new(0, 0),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Set the raster size, discarding the contents when it changes
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            debug!(width, height, "Resizing frame buffer");
            self.image = RgbImage::new(width, height);
        }
    }

    /// Draw `frame` stretched over the whole raster
    pub fn render(&mut self, frame: &CameraFrame) {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        if frame.width == width && frame.height == height {
            let expected = (width * height * 4) as usize;
            if frame.data.len() >= expected {
                for (dst, src) in self
                    .image
                    .chunks_exact_mut(3)
                    .zip(frame.data[..expected].chunks_exact(4))
                {
                    dst.copy_from_slice(&src[..3]);
                }
                return;
            }
        }

        // Nearest-neighbour scaling for anything else
        for (x, y, px) in self.image.enumerate_pixels_mut() {
            let (r, g, b) = frame.sample_scaled(x, y, width, height);
            *px = image::Rgb([r, g, b]);
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one capture tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No decoded frame was available
    Skipped,
    /// A snapshot of this size was handed to an upload task
    Dispatched { width: u32, height: u32 },
}

/// Counters shared between the capture loop, its upload tasks and the UI
#[derive(Debug, Default)]
pub struct UploadStats {
    ticks: AtomicU64,
    skipped: AtomicU64,
    dispatched: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    last_delivery: Mutex<Option<DateTime<Local>>>,
}

/// Point-in-time copy of [`UploadStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadStatsSnapshot {
    pub ticks: u64,
    pub skipped: u64,
    pub dispatched: u64,
    pub delivered: u64,
    pub failed: u64,
    pub last_delivery: Option<DateTime<Local>>,
}

impl UploadStats {
    pub fn snapshot(&self) -> UploadStatsSnapshot {
        UploadStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_delivery: *self
                .last_delivery
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        *self
            .last_delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Local::now());
    }
}

/// Renders the surface into a buffer and uploads it on every tick
pub struct CaptureUploader {
    surface: VideoSurface,
    buffer: FrameBuffer,
    encoder: Arc<dyn FrameEncoder>,
    transport: Arc<dyn UploadTransport>,
    tasks: DetachedTasks,
    stats: Arc<UploadStats>,
}

impl CaptureUploader {
    pub fn new(
        surface: VideoSurface,
        encoder: Arc<dyn FrameEncoder>,
        transport: Arc<dyn UploadTransport>,
    ) -> Self {
        Self {
            surface,
            buffer: FrameBuffer::new(),
            encoder,
            transport,
            tasks: DetachedTasks::new(),
            stats: Arc::new(UploadStats::default()),
        }
    }

    /// JPEG encoding and HTTP upload to `server_url`
    pub fn with_http(surface: VideoSurface, server_url: &str) -> Result<Self, UploadError> {
        let transport = HttpTransport::new(server_url)?;
        info!(url = %transport.url(), "Uploading snapshots");
        Ok(Self::new(surface, Arc::new(JpegEncoder), Arc::new(transport)))
    }

    /// Capture the current frame and dispatch it without waiting
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);

        let Some(frame) = self.surface.current_frame().filter(|f| f.has_pixels()) else {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            trace!("No frame available, skipping tick");
            return TickOutcome::Skipped;
        };

        let (width, height) = (frame.width, frame.height);
        self.buffer.resize(width, height);
        self.buffer.render(&frame);
        self.dispatch(self.buffer.image().clone());

        TickOutcome::Dispatched { width, height }
    }

    fn dispatch(&self, image: RgbImage) {
        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);

        let encoder = Arc::clone(&self.encoder);
        let transport = Arc::clone(&self.transport);
        let stats = Arc::clone(&self.stats);

        self.tasks.spawn("upload", async move {
            let result = async {
                let encoded = tokio::task::spawn_blocking(move || {
                    encoder.encode(&image, EncodeParams::snapshot())
                })
                .await
                .map_err(|e| UploadError::TaskFailed(e.to_string()))??;
                transport.send(encoded).await
            }
            .await;

            match result {
                Ok(()) => stats.record_delivered(),
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    debug!(error = %e, "Snapshot upload dropped");
                }
            }
        });
    }

    /// Run [`tick`](Self::tick) every capture interval until stopped
    ///
    /// The first tick fires one interval after the call.
    pub fn spawn(mut self) -> CaptureLoopHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(Instant::now() + CAPTURE_INTERVAL, CAPTURE_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        self.tick();
                    }
                }
            }

            debug!("Capture loop stopped");
            self
        });

        CaptureLoopHandle {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    pub fn stats(&self) -> Arc<UploadStats> {
        Arc::clone(&self.stats)
    }

    /// Handle on the upload tasks, used to wait for in-flight uploads
    pub fn tasks(&self) -> DetachedTasks {
        self.tasks.clone()
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.buffer
    }
}

/// Running capture loop
pub struct CaptureLoopHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<CaptureUploader>,
}

impl CaptureLoopHandle {
    /// Stop ticking and get the uploader back
    ///
    /// Uploads already dispatched keep running.
    pub async fn stop(mut self) -> Result<CaptureUploader, UploadError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        (&mut self.handle)
            .await
            .map_err(|e| UploadError::TaskFailed(e.to_string()))
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
