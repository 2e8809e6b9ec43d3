// src/engine/encoder.rs
//
// WebP encoder (libwebp via the webp crate). Output is built from raw pixels,
// so EXIF, XMP and ICC from the source never reach the canonical file.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::error::CanonError;
use image::DynamicImage;
use std::borrow::Cow;

/// 品質値(0-100)から WebP エンコード設定を導出する。品質帯域は以下で固定
/// (filter_strength だけは sharp 互換の 80/60 しきい値を保持):
/// - High (>=85): 視覚品質重視
/// - Balanced (70-84): 画質と速度のバランス
/// - Fast (<70): 速度寄り
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
}

impl QualitySettings {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(100) as f32,
        }
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 85.0 {
            QualityBand::High
        } else if self.quality >= 70.0 {
            QualityBand::Balanced
        } else {
            QualityBand::Fast
        }
    }

    // Method 4 / single pass: sharp-equivalent speed/quality trade-off
    pub fn webp_method(&self) -> i32 {
        4
    }

    pub fn webp_pass(&self) -> i32 {
        1
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 80.0 {
            20
        } else if self.quality >= 60.0 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            QualityBand::Balanced | QualityBand::Fast => 0,
        }
    }
}

/// Lossy WebP encode at `quality`. Images with an alpha channel keep it.
pub fn encode_webp(img: &DynamicImage, quality: u8) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        let (w, h) = (img.width(), img.height());

        let rgba: Cow<'_, image::RgbaImage>;
        let rgb: Cow<'_, image::RgbImage>;
        let encoder = if img.color().has_alpha() {
            rgba = match img {
                DynamicImage::ImageRgba8(rgba_img) => Cow::Borrowed(rgba_img),
                _ => Cow::Owned(img.to_rgba8()),
            };
            webp::Encoder::from_rgba(&rgba, w, h)
        } else {
            rgb = match img {
                DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
                _ => Cow::Owned(img.to_rgb8()),
            };
            webp::Encoder::from_rgb(&rgb, w, h)
        };

        let mut config = webp::WebPConfig::new()
            .map_err(|_| CanonError::decode_failed("webp: failed to create WebPConfig"))?;

        let settings = QualitySettings::new(quality);
        config.lossless = 0;
        config.quality = settings.quality();
        config.method = settings.webp_method();
        config.pass = settings.webp_pass();
        config.preprocessing = 0;
        config.sns_strength = settings.webp_sns_strength();
        config.autofilter = 1;
        config.filter_strength = settings.webp_filter_strength();
        config.filter_sharpness = settings.webp_filter_sharpness();

        let mem = encoder
            .encode_advanced(&config)
            .map_err(|e| CanonError::decode_failed(format!("webp: encode failed: {e:?}")))?;

        Ok(mem.to_vec())
    })
}
