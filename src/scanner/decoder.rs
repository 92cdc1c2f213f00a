// SPDX-License-Identifier: GPL-3.0-only

//! Symbol decoding
//!
//! Thin adapters over the decoding libraries: `rxing` for retail linear
//! barcodes and `rqrr` for QR codes. Frames are reduced to luma and
//! downscaled before decoding.

use crate::backends::camera::types::CameraFrame;
use image::GrayImage;
use image::imageops::{self, FilterType};
use rxing::BarcodeFormat;
use tracing::{debug, trace};

/// Frames larger than this (either side) are downscaled before decoding
const MAX_DECODE_DIMENSION: u32 = 640;

/// Barcode symbologies the scanner can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    Qr,
}

impl Symbology {
    /// Product barcodes found on retail packaging
    pub const RETAIL: [Symbology; 5] = [
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Code128,
    ];

    pub fn is_linear(self) -> bool {
        self != Symbology::Qr
    }

    fn barcode_format(self) -> BarcodeFormat {
        match self {
            Symbology::Ean13 => BarcodeFormat::EAN_13,
            Symbology::Ean8 => BarcodeFormat::EAN_8,
            Symbology::UpcA => BarcodeFormat::UPC_A,
            Symbology::UpcE => BarcodeFormat::UPC_E,
            Symbology::Code128 => BarcodeFormat::CODE_128,
            Symbology::Qr => BarcodeFormat::QR_CODE,
        }
    }
}

/// Decoder failures
///
/// Per-frame failures are transient: the decode loop logs and skips them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no symbologies enabled")]
    NoSymbologies,
    #[error("frame could not be converted for decoding")]
    UnreadableFrame,
}

/// Something that can find a symbol in a camera frame
pub trait SymbolDecoder: Send + Sync {
    /// Decoded text, or `None` when the frame holds no readable symbol
    fn decode(&self, frame: &CameraFrame) -> Result<Option<String>, DecodeError>;
}

/// Luma plane of `frame`, downscaled to fit the decode size
fn prepare_luma(frame: &CameraFrame) -> Result<GrayImage, DecodeError> {
    let luma = frame.to_luma().ok_or(DecodeError::UnreadableFrame)?;
    let (width, height) = luma.dimensions();
    if width <= MAX_DECODE_DIMENSION && height <= MAX_DECODE_DIMENSION {
        return Ok(luma);
    }

    let scale = (width as f32 / MAX_DECODE_DIMENSION as f32)
        .max(height as f32 / MAX_DECODE_DIMENSION as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    trace!(width, height, new_width, new_height, "Downscaling frame for decode");
    Ok(imageops::resize(&luma, new_width, new_height, FilterType::Triangle))
}

/// QR decoder backed by rqrr
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    fn decode_luma(&self, luma: &GrayImage) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            luma.width() as usize,
            luma.height() as usize,
            |x, y| luma.get_pixel(x as u32, y as u32).0[0],
        );

        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| match grid.decode() {
                Ok((_, content)) => Some(content),
                Err(e) => {
                    trace!(error = ?e, "QR grid decode failed");
                    None
                }
            })
    }
}

impl SymbolDecoder for QrDecoder {
    fn decode(&self, frame: &CameraFrame) -> Result<Option<String>, DecodeError> {
        Ok(self.decode_luma(&prepare_luma(frame)?))
    }
}

/// Linear barcode decoder backed by rxing
#[derive(Debug, Clone)]
pub struct LinearDecoder {
    formats: Vec<BarcodeFormat>,
}

impl LinearDecoder {
    pub fn new(symbologies: &[Symbology]) -> Result<Self, DecodeError> {
        let formats: Vec<_> = symbologies
            .iter()
            .filter(|s| s.is_linear())
            .map(|s| s.barcode_format())
            .collect();
        if formats.is_empty() {
            return Err(DecodeError::NoSymbologies);
        }
        Ok(Self { formats })
    }

    fn decode_luma(&self, luma: &GrayImage) -> Option<String> {
        let (width, height) = luma.dimensions();
        match rxing::helpers::detect_in_luma(luma.as_raw().clone(), width, height, None) {
            Ok(result) if self.formats.contains(result.getBarcodeFormat()) => {
                Some(result.getText().to_string())
            }
            Ok(result) => {
                trace!(format = ?result.getBarcodeFormat(), "Ignoring disabled symbology");
                None
            }
            // rxing reports "nothing found" as an error
            Err(_) => None,
        }
    }
}

impl SymbolDecoder for LinearDecoder {
    fn decode(&self, frame: &CameraFrame) -> Result<Option<String>, DecodeError> {
        Ok(self.decode_luma(&prepare_luma(frame)?))
    }
}

/// Decoder for a set of symbologies; linear formats are tried before QR
#[derive(Debug, Clone)]
pub struct MultiDecoder {
    linear: Option<LinearDecoder>,
    qr: Option<QrDecoder>,
}

impl MultiDecoder {
    pub fn new(symbologies: &[Symbology]) -> Result<Self, DecodeError> {
        if symbologies.is_empty() {
            return Err(DecodeError::NoSymbologies);
        }

        let linear = if symbologies.iter().any(|s| s.is_linear()) {
            Some(LinearDecoder::new(symbologies)?)
        } else {
            None
        };
        let qr = symbologies.contains(&Symbology::Qr).then_some(QrDecoder);

        debug!(?symbologies, "Symbol decoder ready");
        Ok(Self { linear, qr })
    }
}

impl SymbolDecoder for MultiDecoder {
    fn decode(&self, frame: &CameraFrame) -> Result<Option<String>, DecodeError> {
        let luma = prepare_luma(frame)?;

        if let Some(text) = self.linear.as_ref().and_then(|d| d.decode_luma(&luma)) {
            return Ok(Some(text));
        }
        Ok(self.qr.as_ref().and_then(|d| d.decode_luma(&luma)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn blank_frame(width: u32, height: u32) -> CameraFrame {
        CameraFrame::from_rgb(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])), 1)
    }

    #[test]
    fn test_empty_symbology_set_fails_init() {
        assert_eq!(MultiDecoder::new(&[]).unwrap_err(), DecodeError::NoSymbologies);
        assert_eq!(
            LinearDecoder::new(&[Symbology::Qr]).unwrap_err(),
            DecodeError::NoSymbologies
        );
    }

    #[test]
    fn test_blank_frame_has_no_symbol() {
        let decoder = MultiDecoder::new(&Symbology::RETAIL).unwrap();
        assert_eq!(decoder.decode(&blank_frame(64, 48)), Ok(None));
        assert_eq!(QrDecoder.decode(&blank_frame(64, 48)), Ok(None));
    }

    #[test]
    fn test_large_frames_are_downscaled() {
        let luma = prepare_luma(&blank_frame(1920, 1080)).unwrap();
        assert_eq!(luma.dimensions(), (640, 360));
    }

    #[test]
    fn test_truncated_frame_is_unreadable() {
        let mut frame = blank_frame(8, 8);
        frame.data = std::sync::Arc::from(&frame.data[..10]);
        assert_eq!(
            QrDecoder.decode(&frame),
            Err(DecodeError::UnreadableFrame)
        );
    }
}
