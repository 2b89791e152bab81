//! QR code generation and scanning.
//!
//! Symbol encoding is delegated to the `qrcode` crate and scanning to `rqrr`.
//! The [`QrEncoder`] trait is the seam the form uses, so callers can swap
//! the renderer (or stub it out in tests).

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Error-correction level of generated symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// Recovers about 7% of damaged codewords.
    L,
    /// Recovers about 15% of damaged codewords.
    #[default]
    M,
    /// Recovers about 25% of damaged codewords.
    Q,
    /// Recovers about 30% of damaged codewords.
    H,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => Self::L,
            ErrorCorrection::M => Self::M,
            ErrorCorrection::Q => Self::Q,
            ErrorCorrection::H => Self::H,
        }
    }
}

/// Rendering options for generated symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Error-correction level.
    pub error_correction: ErrorCorrection,
    /// Surround the symbol with the standard four-module margin.
    pub quiet_zone: bool,
    /// Minimum width and height of the rendered image in pixels.
    pub min_dimension: u32,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::M,
            quiet_zone: true,
            min_dimension: 200,
        }
    }
}

/// Something that turns text into a scannable QR raster.
pub trait QrEncoder {
    /// Encode UTF-8 text into a grayscale QR image.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be represented as a QR symbol.
    fn encode(&self, text: &str) -> Result<GrayImage>;
}

/// The default encoder, backed by the `qrcode` crate.
#[derive(Debug, Clone, Default)]
pub struct QrCodeEncoder {
    config: QrConfig,
}

impl QrCodeEncoder {
    /// Create an encoder with the given rendering options.
    #[must_use]
    pub fn new(config: QrConfig) -> Self {
        Self { config }
    }

    /// The rendering options in use.
    #[must_use]
    pub fn config(&self) -> &QrConfig {
        &self.config
    }
}

impl QrEncoder for QrCodeEncoder {
    fn encode(&self, text: &str) -> Result<GrayImage> {
        let code = QrCode::with_error_correction_level(
            text.as_bytes(),
            self.config.error_correction.into(),
        )
        .map_err(|e| Error::qr_encode(e.to_string()))?;

        let img = code
            .render::<Luma<u8>>()
            .quiet_zone(self.config.quiet_zone)
            .min_dimensions(self.config.min_dimension, self.config.min_dimension)
            .build();

        debug!(
            "Rendered QR symbol ({} bytes of text) as {}x{} image",
            text.len(),
            img.width(),
            img.height()
        );
        Ok(img)
    }
}

/// Scan a grayscale image and return the text of the first QR symbol found.
///
/// # Errors
///
/// Returns an error if no symbol is found or the symbol cannot be decoded.
pub fn scan(img: &GrayImage) -> Result<String> {
    let (width, height) = img.dimensions();
    #[allow(clippy::cast_possible_truncation)]
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| img.get_pixel(x as u32, y as u32).0[0],
    );

    let grids = prepared.detect_grids();
    let grid = grids
        .first()
        .ok_or_else(|| Error::qr_decode("no QR symbol found in image"))?;
    let (_meta, content) = grid
        .decode()
        .map_err(|e| Error::qr_decode(format!("{e:?}")))?;
    Ok(content)
}

/// Decode PNG bytes and scan them for a QR symbol.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid PNG or no symbol can be read.
pub fn scan_png(png: &[u8]) -> Result<String> {
    let img = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_luma8();
    scan(&img)
}
