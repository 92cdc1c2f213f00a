// SPDX-License-Identifier: GPL-3.0-only

//! Still-image sources for the virtual camera

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame};
use std::path::Path;
use tracing::info;

/// Load an image file as a camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Io(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgb = img.to_rgb8();
    info!(width = rgb.width(), height = rgb.height(), "Image loaded successfully");

    Ok(CameraFrame::from_rgb(rgb, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;

    #[test]
    fn test_load_png_as_rgb_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        image::RgbImage::from_pixel(8, 4, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.format, PixelFormat::RGB24);
        assert_eq!(frame.stride, 24);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_image_as_frame(Path::new("/nonexistent/label.png")).unwrap_err();
        assert!(matches!(err, BackendError::Io(_)));
    }
}
