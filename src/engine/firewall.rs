// src/engine/firewall.rs
//
// Image Firewall: the validation gate every upload passes before any pixel work.
// 1. header decode under the pixel ceiling      -> IMAGE_DECODE_FAILED
// 2. decoder-detected format in {jpeg,png,webp} -> IMAGE_DECODE_FAILED
// 3. width and height within max_dimension      -> IMAGE_DIMENSIONS_EXCEEDED

use crate::engine::decoder::{inspect, DecodedImageMeta};
use crate::error::CanonError;
use crate::policy::PolicyConstants;
use image::ImageFormat;

/// Formats accepted for canonicalization.
pub const ALLOWED_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Firewall {
    pub max_pixels: u64,
    pub max_dimension: u32,
}

impl Firewall {
    pub fn new(max_pixels: u64, max_dimension: u32) -> Self {
        Self {
            max_pixels,
            max_dimension,
        }
    }

    pub fn from_constants(constants: &PolicyConstants) -> Self {
        Self::new(constants.max_pixels, constants.max_dimension)
    }

    /// Run all three checks in order and hand back the header facts.
    pub fn screen(&self, data: &[u8]) -> Result<DecodedImageMeta, CanonError> {
        let meta = self.screen_header(data)?;
        self.enforce_dimensions(meta.width, meta.height)?;
        Ok(meta)
    }

    /// Pixel ceiling and format allowlist only. The per-axis cap is left to
    /// the caller so the header facts are known even when it fails.
    pub fn screen_header(&self, data: &[u8]) -> Result<DecodedImageMeta, CanonError> {
        let meta = inspect(data, self.max_pixels)?;
        self.enforce_format(meta.format)?;
        Ok(meta)
    }

    pub fn enforce_format(&self, format: ImageFormat) -> Result<(), CanonError> {
        if ALLOWED_FORMATS.contains(&format) {
            Ok(())
        } else {
            Err(CanonError::decode_failed(format!(
                "Image Firewall: format {format:?} is not allowed (expected jpeg, png or webp)"
            )))
        }
    }

    /// Per-axis cap, independent of the pixel ceiling: a 9000x1 strip passes
    /// the area check but still fails here.
    pub fn enforce_dimensions(&self, width: u32, height: u32) -> Result<(), CanonError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(CanonError::dimensions_exceeded(
                width,
                height,
                self.max_dimension,
            ));
        }
        Ok(())
    }
}
