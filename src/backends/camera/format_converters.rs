// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for raw capture buffers
//!
//! Capture threads decode whatever the driver delivers into tightly packed
//! RGBA so everything downstream of the [`super::types::FrameReceiver`] only
//! deals with one layout.

use super::types::{BackendError, BackendResult, CameraFrame};
use image::ImageFormat;

/// Capture encodings the converters understand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEncoding {
    /// Motion JPEG, one JPEG image per buffer
    Mjpeg,
    /// Packed YUV 4:2:2, Y0 U Y1 V
    Yuyv,
    /// Packed YUV 4:2:2, U Y0 V Y1
    Uyvy,
}

impl CaptureEncoding {
    /// Map a V4L2 FourCC to a supported encoding
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"MJPG" | b"JPEG" => Some(Self::Mjpeg),
            b"YUYV" | b"YUY2" => Some(Self::Yuyv),
            b"UYVY" => Some(Self::Uyvy),
            _ => None,
        }
    }

    pub fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            Self::Mjpeg => b"MJPG",
            Self::Yuyv => b"YUYV",
            Self::Uyvy => b"UYVY",
        }
    }
}

/// Decode one capture buffer into an RGBA frame
pub fn decode_frame(
    encoding: CaptureEncoding,
    data: &[u8],
    width: u32,
    height: u32,
) -> BackendResult<CameraFrame> {
    match encoding {
        CaptureEncoding::Mjpeg => {
            let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
                .map_err(|e| BackendError::Other(format!("MJPEG decode failed: {}", e)))?
                .to_rgba8();
            // The JPEG header is authoritative over the negotiated format
            let (w, h) = image.dimensions();
            Ok(CameraFrame::from_rgba(w, h, image.into_raw()))
        }
        CaptureEncoding::Yuyv | CaptureEncoding::Uyvy => {
            let expected = (width as usize) * (height as usize) * 2;
            if data.len() < expected {
                return Err(BackendError::Other(format!(
                    "Short {:?} buffer: {} < {} bytes",
                    encoding,
                    data.len(),
                    expected
                )));
            }
            let rgba = if encoding == CaptureEncoding::Yuyv {
                yuyv_to_rgba(&data[..expected], width, height)
            } else {
                uyvy_to_rgba(&data[..expected], width, height)
            };
            Ok(CameraFrame::from_rgba(width, height, rgba))
        }
    }
}

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, |c| (c[0], c[2], c[1], c[3]))
}

/// Convert UYVY (YUV 4:2:2) to RGBA
///
/// UYVY format: U0 Y0 V0 Y1 - each 4-byte group encodes 2 pixels.
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, |c| (c[1], c[3], c[0], c[2]))
}

/// Shared 4:2:2 unpacking; `split` returns (y0, y1, u, v) for a 4-byte group
fn packed_422_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    split: impl Fn(&[u8]) -> (u8, u8, u8, u8),
) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let (y0, y1, u, v) = split(chunk);
        for y in [y0, y1] {
            let (r, g, b) = yuv_to_rgb(y, u, v);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
        if rgba.len() >= pixel_count * 4 {
            break;
        }
    }

    rgba.truncate(pixel_count * 4);
    rgba
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}
