// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use image::{GrayImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices (`/dev/video*`)
    #[default]
    V4l2,
    /// Still images served as a camera (file sources, tests)
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// A camera as reported by enumeration
///
/// `id` is backend specific (a device node path for V4L2, a file path or name for
/// virtual sources) and is matched exactly when a stream is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// True when the label names a rear-facing camera ("back" or "rear", any case)
    pub fn is_rear_facing(&self) -> bool {
        let label = self.label.to_lowercase();
        label.contains("back") || label.contains("rear")
    }
}

impl std::fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    YUYV,
    /// Motion JPEG - every buffer is a complete JPEG image
    MJPEG,
}

impl PixelFormat {
    /// Map a V4L2 FourCC to a supported pixel format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"MJPG" | b"JPEG" => Some(Self::MJPEG),
            b"YUYV" => Some(Self::YUYV),
            b"GREY" => Some(Self::Gray8),
            b"RGB3" => Some(Self::RGB24),
            b"AB24" => Some(Self::RGBA),
            _ => None,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Raw buffer contents in `format` layout
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (ignored for MJPEG)
    pub stride: u32,
    /// Monotonic per-stream frame counter
    pub sequence: u64,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap an RGB image as a frame
    pub fn from_rgb(image: RgbImage, sequence: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw().into_boxed_slice()),
            format: PixelFormat::RGB24,
            stride: width * 3,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Convert the frame to an 8-bit RGB image
    ///
    /// Returns `None` when the buffer is truncated or a JPEG payload fails to decode.
    pub fn to_rgb(&self) -> Option<RgbImage> {
        if self.format == PixelFormat::MJPEG {
            return image::load_from_memory_with_format(&self.data, ImageFormat::Jpeg)
                .ok()
                .map(|img| img.to_rgb8());
        }

        let (width, height) = (self.width as usize, self.height as usize);
        let stride = self.stride as usize;
        let mut rgb = Vec::with_capacity(width * height * 3);

        for y in 0..height {
            let row = self.data.get(y * stride..)?;
            match self.format {
                PixelFormat::RGBA => {
                    for px in row.get(..width * 4)?.chunks_exact(4) {
                        rgb.extend_from_slice(&px[..3]);
                    }
                }
                PixelFormat::RGB24 => rgb.extend_from_slice(row.get(..width * 3)?),
                PixelFormat::Gray8 => {
                    for &v in row.get(..width)? {
                        rgb.extend_from_slice(&[v, v, v]);
                    }
                }
                PixelFormat::YUYV => {
                    // Two pixels share one chroma pair: Y0 U Y1 V
                    for x in 0..width {
                        let base = (x & !1) * 2;
                        let quad = row.get(base..base + 4)?;
                        let luma = if x & 1 == 0 { quad[0] } else { quad[2] };
                        let (r, g, b) = yuv_to_rgb(luma, quad[1], quad[3]);
                        rgb.extend_from_slice(&[r, g, b]);
                    }
                }
                PixelFormat::MJPEG => unreachable!("handled above"),
            }
        }

        RgbImage::from_raw(self.width, self.height, rgb)
    }

    /// Convert the frame to a grayscale image for symbol decoding
    ///
    /// Luma-carrying formats are read directly without a colour round trip.
    pub fn to_luma(&self) -> Option<GrayImage> {
        let (width, height) = (self.width as usize, self.height as usize);
        let stride = self.stride as usize;

        match self.format {
            PixelFormat::MJPEG => image::load_from_memory_with_format(&self.data, ImageFormat::Jpeg)
                .ok()
                .map(|img| img.to_luma8()),
            PixelFormat::Gray8 => {
                let mut luma = Vec::with_capacity(width * height);
                for y in 0..height {
                    luma.extend_from_slice(self.data.get(y * stride..y * stride + width)?);
                }
                GrayImage::from_raw(self.width, self.height, luma)
            }
            PixelFormat::YUYV => {
                let mut luma = Vec::with_capacity(width * height);
                for y in 0..height {
                    let row = self.data.get(y * stride..y * stride + width * 2)?;
                    luma.extend(row.iter().step_by(2));
                }
                GrayImage::from_raw(self.width, self.height, luma)
            }
            PixelFormat::RGBA | PixelFormat::RGB24 => self
                .to_rgb()
                .map(|rgb| image::DynamicImage::ImageRgb8(rgb).to_luma8()),
        }
    }
}

/// Convert YUV (BT.601) to RGB
pub(crate) fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No camera API on this system
    #[error("Camera access is not supported: {0}")]
    Unsupported(String),
    /// The OS refused access to the camera
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),
    /// The requested device id does not match an enumerated device
    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The device opened but streaming could not start
    #[error("Failed to start camera stream: {0}")]
    InitializationFailed(String),
    /// The stream behind a lease has been released
    #[error("Camera stream is closed")]
    StreamClosed,
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl BackendError {
    /// Classify an I/O error raised while opening a device node
    pub fn from_open_error(device: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(device.to_string()),
            std::io::ErrorKind::NotFound => Self::DeviceUnavailable(device.to_string()),
            _ => Self::Io(format!("{}: {}", device, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(format: PixelFormat, width: u32, height: u32, stride: u32, data: &[u8]) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            format,
            stride,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_rgba_to_rgb_skips_stride_padding() {
        let data: Vec<u8> = vec![
            255, 0, 0, 255, // Red pixel
            0, 255, 0, 255, // Green pixel
            0, 0, // stride padding
            0, 0, 255, 255, // Blue pixel
            255, 255, 255, 255, // White pixel
            0, 0, // stride padding
        ];

        let rgb = frame(PixelFormat::RGBA, 2, 2, 10, &data).to_rgb().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 255, 0]);
        assert_eq!(rgb.get_pixel(0, 1).0, [0, 0, 255]);
        assert_eq!(rgb.get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_yuyv_luma_takes_every_other_byte() {
        // 2x1 frame: Y0=10 U=128 Y1=200 V=128
        let luma = frame(PixelFormat::YUYV, 2, 1, 4, &[10, 128, 200, 128])
            .to_luma()
            .unwrap();
        assert_eq!(luma.as_raw(), &vec![10, 200]);
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        let rgb = frame(PixelFormat::YUYV, 2, 1, 4, &[90, 128, 90, 128])
            .to_rgb()
            .unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [90, 90, 90]);
    }

    #[test]
    fn test_truncated_buffer_is_rejected() {
        assert!(frame(PixelFormat::RGB24, 4, 4, 12, &[0; 20]).to_rgb().is_none());
        assert!(frame(PixelFormat::Gray8, 4, 4, 4, &[0; 8]).to_luma().is_none());
    }

    #[test]
    fn test_rear_facing_label() {
        assert!(CameraDevice::new("b", "Back Camera").is_rear_facing());
        assert!(CameraDevice::new("r", "REAR wide").is_rear_facing());
        assert!(!CameraDevice::new("a", "Front Camera").is_rear_facing());
    }

    #[test]
    fn test_open_error_classification() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(
            BackendError::from_open_error("/dev/video0", &denied),
            BackendError::PermissionDenied("/dev/video0".into())
        );
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(
            BackendError::from_open_error("/dev/video9", &missing),
            BackendError::DeviceUnavailable(_)
        ));
    }
}
