// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot encoding
//!
//! Encoders are synchronous and CPU-bound. The uploader calls them from
//! `spawn_blocking` so a slow encode never delays the next capture tick.

use crate::constants::encoding::QUALITY_FACTOR;
use crate::constants::upload::CONTENT_TYPE;
use crate::errors::EncodeError;
use image::RgbImage;
use tracing::debug;

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    Jpeg,
}

impl EncodingFormat {
    /// MIME type sent alongside the encoded bytes
    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => CONTENT_TYPE,
        }
    }
}

/// What an encoder is asked to produce
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub format: EncodingFormat,
    /// Quality factor in the 0.0..=1.0 range
    pub quality: f32,
}

impl EncodeParams {
    /// JPEG at the fixed snapshot quality
    pub fn snapshot() -> Self {
        Self {
            format: EncodingFormat::Jpeg,
            quality: QUALITY_FACTOR,
        }
    }

    /// Quality on the 1..=100 scale
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self::snapshot()
    }
}

/// Encoded image data ready for upload
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

/// Turns a rendered frame buffer into compressed bytes
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, image: &RgbImage, params: EncodeParams) -> Result<EncodedImage, EncodeError>;
}

/// Default encoder backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegEncoder;

impl FrameEncoder for JpegEncoder {
    fn encode(&self, image: &RgbImage, params: EncodeParams) -> Result<EncodedImage, EncodeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EncodeError::EmptyImage);
        }

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, params.jpeg_quality());

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| EncodeError::Failed(format!("JPEG encoding failed: {}", e)))?;

        debug!(
            width = image.width(),
            height = image.height(),
            size = buffer.len(),
            "Encoded snapshot"
        );

        Ok(EncodedImage {
            data: buffer,
            format: params.format,
            width: image.width(),
            height: image.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_params() {
        let params = EncodeParams::snapshot();
        assert_eq!(params.format, EncodingFormat::Jpeg);
        assert_eq!(params.quality, 0.6);
        assert_eq!(params.jpeg_quality(), 60);
    }

    #[test]
    fn test_jpeg_encode_produces_decodable_image() {
        let image = RgbImage::from_pixel(32, 24, image::Rgb([200, 40, 10]));
        let encoded = JpegEncoder.encode(&image, EncodeParams::snapshot()).unwrap();

        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
        let decoded =
            image::load_from_memory_with_format(&encoded.data, image::ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let image = RgbImage::new(0, 0);
        assert_eq!(
            JpegEncoder.encode(&image, EncodeParams::snapshot()).unwrap_err(),
            EncodeError::EmptyImage
        );
    }
}
