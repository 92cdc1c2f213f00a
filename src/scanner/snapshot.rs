// SPDX-License-Identifier: GPL-3.0-only

//! Still capture encoding
//!
//! A captured frame is stretched onto a square canvas (no letterboxing, the
//! aspect ratio is not kept) and encoded as JPEG for upload.

use crate::backends::camera::types::CameraFrame;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};

/// JPEG quality used for uploads
pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("frame could not be converted to RGB")]
    UnreadableFrame,
    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Draw `frame` into a `size`×`size` buffer and encode it as JPEG
pub fn encode_snapshot(frame: &CameraFrame, size: u32) -> Result<Vec<u8>, SnapshotError> {
    let rgb = frame.to_rgb().ok_or(SnapshotError::UnreadableFrame)?;
    let canvas = imageops::resize(&rgb, size, size, FilterType::Triangle);

    let mut bytes = Vec::new();
    canvas
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))
        .map_err(|e| SnapshotError::Encode(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    #[test]
    fn test_snapshot_is_square_jpeg() {
        let frame = CameraFrame::from_rgb(RgbImage::from_pixel(320, 180, Rgb([10, 200, 30])), 1);
        let bytes = encode_snapshot(&frame, 640).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 640));
    }

    #[test]
    fn test_unreadable_frame() {
        let mut frame = CameraFrame::from_rgb(RgbImage::new(4, 4), 1);
        frame.data = std::sync::Arc::from(&[0u8; 3][..]);
        assert_eq!(encode_snapshot(&frame, 64), Err(SnapshotError::UnreadableFrame));
    }
}
