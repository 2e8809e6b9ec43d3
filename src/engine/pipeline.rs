// src/engine/pipeline.rs
//
// Pixel pipeline shared by the gentle and aggressive paths:
// auto-orient once, then fit-inside (no upscale) resize per encode attempt.

use crate::error::CanonError;
use crate::policy::SHRINK_FACTOR;
use fast_image_resize::{self as fir, MulDiv, PixelType, ResizeOptions};
use image::{DynamicImage, RgbImage, RgbaImage};
use std::borrow::Cow;

type PipelineResult<T> = std::result::Result<T, CanonError>;

#[derive(Debug)]
pub struct ResizeError {
    pub source_dims: (u32, u32),
    pub target_dims: (u32, u32),
    pub reason: String,
}

impl ResizeError {
    pub fn new(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_dims,
            target_dims,
            reason: reason.into(),
        }
    }
}

impl From<ResizeError> for CanonError {
    fn from(err: ResizeError) -> Self {
        CanonError::decode_failed(format!(
            "resize {}x{} -> {}x{} failed: {}",
            err.source_dims.0, err.source_dims.1, err.target_dims.0, err.target_dims.1, err.reason
        ))
    }
}

/// Rotate/flip according to an EXIF Orientation value (1-8).
pub fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(), // transpose
        6 => img.rotate90(),
        7 => img.rotate270().fliph(), // transverse
        8 => img.rotate270(),
        _ => img,
    }
}

/// Fit `orig_w x orig_h` inside a `max_long_side` square, keeping aspect ratio.
/// Never upscales; never returns a zero side.
pub fn fit_inside(orig_w: u32, orig_h: u32, max_long_side: u32) -> (u32, u32) {
    let long_side = orig_w.max(orig_h);
    if long_side <= max_long_side || long_side == 0 {
        return (orig_w, orig_h);
    }
    let ratio = max_long_side as f64 / long_side as f64;
    let w = ((orig_w as f64 * ratio).round() as u32).clamp(1, max_long_side);
    let h = ((orig_h as f64 * ratio).round() as u32).clamp(1, max_long_side);
    (w, h)
}

/// One shrink step: `round(current * 0.85)`, floored at `min_long_side`.
pub fn shrink_long_side(current: u32, min_long_side: u32) -> u32 {
    let shrunk = (current as f64 * SHRINK_FACTOR).round() as u32;
    shrunk.max(min_long_side)
}

/// Produce the pixels to encode for a given long-side bound.
/// Borrowed when no resize is needed.
pub fn fit_for_encode(
    img: &DynamicImage,
    max_long_side: u32,
) -> PipelineResult<Cow<'_, DynamicImage>> {
    let (w, h) = fit_inside(img.width(), img.height(), max_long_side);
    if (w, h) == (img.width(), img.height()) {
        return Ok(Cow::Borrowed(img));
    }
    Ok(Cow::Owned(fast_resize(img, w, h)?))
}

fn default_resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

/// Lanczos3 resize via fast_image_resize. Alpha is premultiplied around the resize.
pub fn fast_resize(
    img: &DynamicImage,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, ResizeError> {
    let src_width = img.width();
    let src_height = img.height();
    let dims_err = |reason: String| {
        ResizeError::new((src_width, src_height), (dst_width, dst_height), reason)
    };

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(dims_err("invalid dimensions for resize".to_string()));
    }

    // Keep alpha only when the source has it
    let (pixel_type, src_pixels): (PixelType, Vec<u8>) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.as_raw().clone()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.as_raw().clone()),
        other if other.color().has_alpha() => (PixelType::U8x4, other.to_rgba8().into_raw()),
        other => (PixelType::U8x3, other.to_rgb8().into_raw()),
    };

    let src_image =
        fir::images::Image::from_vec_u8(src_width, src_height, src_pixels, pixel_type)
            .map_err(|e| dims_err(format!("fir source image error: {e:?}")))?;

    resize_with_source_image(src_image, pixel_type, dst_width, dst_height).map_err(dims_err)
}

fn resize_with_source_image(
    mut src_image: fir::images::Image<'_>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    let needs_premultiply = matches!(pixel_type, PixelType::U8x4);
    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &default_resize_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    let dst_pixels = dst_image.into_vec();
    match pixel_type {
        PixelType::U8x3 => RgbImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "failed to create rgb image from resized data".to_string()),
        PixelType::U8x4 => RgbaImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "failed to create rgba image from resized data".to_string()),
        _ => Err("unsupported pixel type after resize".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, GrayImage};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    mod fit_tests {
        use super::*;

        #[test]
        fn test_landscape_fits_long_side() {
            assert_eq!(fit_inside(3000, 2000, 2048), (2048, 1365));
        }

        #[test]
        fn test_portrait_fits_long_side() {
            assert_eq!(fit_inside(2000, 3000, 2048), (1365, 2048));
        }

        #[test]
        fn test_no_upscale() {
            assert_eq!(fit_inside(100, 100, 512), (100, 100));
            assert_eq!(fit_inside(512, 10, 512), (512, 10));
        }

        #[test]
        fn test_extreme_aspect_never_zero() {
            assert_eq!(fit_inside(8000, 1, 100), (100, 1));
        }

        #[test]
        fn test_rounding_behavior() {
            // 101:51 -> 50:25.2... → 25に丸められるべき
            assert_eq!(fit_inside(101, 51, 50), (50, 25));
        }
    }

    mod shrink_tests {
        use super::*;

        #[test]
        fn test_shrinks_by_fifteen_percent() {
            assert_eq!(shrink_long_side(2048, 1024), 1741);
            assert_eq!(shrink_long_side(1741, 1024), 1480);
        }

        #[test]
        fn test_floor_holds() {
            assert_eq!(shrink_long_side(1100, 1024), 1024);
            assert_eq!(shrink_long_side(1024, 1024), 1024);
        }
    }

    mod orientation_tests {
        use super::*;

        #[test]
        fn test_rotate90_swaps_dimensions() {
            let img = create_test_image(10, 20);
            assert_eq!(apply_orientation(img, 6).dimensions(), (20, 10));
        }

        #[test]
        fn test_normal_and_invalid_are_identity() {
            let img = create_test_image(10, 20);
            assert_eq!(apply_orientation(img.clone(), 1).dimensions(), (10, 20));
            assert_eq!(apply_orientation(img, 42).dimensions(), (10, 20));
        }

        #[test]
        fn test_fliph_keeps_dimensions_and_mirrors() {
            let img = create_test_image(4, 2);
            let flipped = apply_orientation(img, 2).to_rgb8();
            assert_eq!(flipped.dimensions(), (4, 2));
            assert_eq!(flipped.get_pixel(0, 0).0[0], 3);
        }

        #[test]
        fn test_transpose_and_transverse_swap_dimensions() {
            let img = create_test_image(3, 7);
            assert_eq!(apply_orientation(img.clone(), 5).dimensions(), (7, 3));
            assert_eq!(apply_orientation(img, 7).dimensions(), (7, 3));
        }
    }

    mod resize_tests {
        use super::*;

        #[test]
        fn test_fast_resize_downscale() {
            let img = create_test_image(100, 50);
            let out = fast_resize(&img, 50, 25).unwrap();
            assert_eq!(out.dimensions(), (50, 25));
        }

        #[test]
        fn test_fast_resize_invalid_dimensions() {
            let img = create_test_image(1, 1);
            let err = fast_resize(&img, 0, 10).unwrap_err();
            assert_eq!(err.source_dims, (1, 1));
            assert_eq!(err.target_dims, (0, 10));
            let canon: CanonError = err.into();
            assert!(matches!(canon, CanonError::DecodeFailed { .. }));
        }

        #[test]
        fn test_fast_resize_rgba_keeps_alpha() {
            let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                40,
                40,
                image::Rgba([200, 100, 50, 0]),
            ));
            let out = fast_resize(&img, 20, 20).unwrap();
            assert!(out.color().has_alpha());
            assert_eq!(out.to_rgba8().get_pixel(5, 5).0[3], 0);
        }

        #[test]
        fn test_fast_resize_luma_becomes_rgb() {
            let img = DynamicImage::ImageLuma8(GrayImage::new(30, 30));
            let out = fast_resize(&img, 10, 10).unwrap();
            assert!(matches!(out, DynamicImage::ImageRgb8(_)));
        }

        #[test]
        fn test_fast_resize_luma_alpha_becomes_rgba() {
            let img = DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_pixel(
                30,
                12,
                image::LumaA([90, 255]),
            ));
            let out = fast_resize(&img, 15, 6).unwrap();
            assert!(matches!(out, DynamicImage::ImageRgba8(_)));
            assert_eq!(out.dimensions(), (15, 6));
        }

        #[test]
        fn test_fit_for_encode_borrows_when_small() {
            let img = create_test_image(64, 32);
            assert!(matches!(fit_for_encode(&img, 128).unwrap(), Cow::Borrowed(_)));
            let resized = fit_for_encode(&img, 32).unwrap();
            assert_eq!(resized.dimensions(), (32, 16));
        }
    }
}
