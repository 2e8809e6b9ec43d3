// src/engine/decoder.rs
//
// Decoder operations: header inspection, JPEG (mozjpeg), PNG (zune-png),
// WebP (libwebp). Every routine reads the header first and applies the pixel
// ceiling BEFORE the pixel buffer is allocated.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::error::CanonError;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, Limits, RgbImage,
    RgbaImage,
};
use mozjpeg::{ColorSpace as JpegColorSpace, Decompress};
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

/// Worst case bytes per pixel the fallback decoder may allocate (RGBA16).
const MAX_BYTES_PER_PIXEL: u64 = 8;

/// Header-level facts about an input, produced before any pixel decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImageMeta {
    pub width: u32,
    pub height: u32,
    /// Container format as determined by the decoder from magic bytes.
    pub format: ImageFormat,
}

impl DecodedImageMeta {
    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Read container header only (no pixel decode) with the pixel ceiling applied.
///
/// The caller-declared MIME type never reaches this function: the format is
/// whatever the magic bytes say.
pub fn inspect(data: &[u8], max_pixels: u64) -> EngineResult<DecodedImageMeta> {
    run_with_panic_policy("decode:inspect", || {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CanonError::decode_failed(format!("failed to read image header: {e}")))?;

        let format = reader
            .format()
            .ok_or_else(|| CanonError::decode_failed("unrecognized image container"))?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| CanonError::decode_failed(format!("failed to read dimensions: {e}")))?;

        check_pixel_ceiling(width, height, max_pixels)?;

        Ok(DecodedImageMeta {
            width,
            height,
            format,
        })
    })
}

/// Reject empty images and anything over `max_pixels`.
///
/// A violation is a decode failure, not a dimension error: it plays the role
/// of the decoder's own allocation limit.
pub fn check_pixel_ceiling(width: u32, height: u32, max_pixels: u64) -> EngineResult<()> {
    if width == 0 || height == 0 {
        return Err(CanonError::decode_failed(format!(
            "image has empty dimensions {width}x{height}"
        )));
    }
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(CanonError::decode_failed(format!(
            "{width}x{height} ({pixels} pixels) exceeds decoder limit of {max_pixels} pixels"
        )));
    }
    Ok(())
}

/// Decode pixels for an already inspected input.
/// Routes by the detected format; anything outside jpeg/png/webp is refused.
pub fn decode_pixels(
    data: &[u8],
    format: ImageFormat,
    max_pixels: u64,
) -> EngineResult<DynamicImage> {
    match format {
        ImageFormat::Jpeg => decode_jpeg_mozjpeg(data, max_pixels),
        ImageFormat::Png => decode_png_zune(data, max_pixels),
        ImageFormat::WebP => decode_webp_libwebp(data, max_pixels),
        other => Err(CanonError::decode_failed(format!(
            "no decoder for {other:?}"
        ))),
    }
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo).
/// CMYK/YCCK sources are read as CMYK and converted to RGB here.
pub fn decode_jpeg_mozjpeg(data: &[u8], max_pixels: u64) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(CanonError::decode_failed("mozjpeg: missing JPEG EOI marker"));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            CanonError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let width = u32::try_from(decompress.width())
            .map_err(|_| CanonError::decode_failed("mozjpeg: width out of range"))?;
        let height = u32::try_from(decompress.height())
            .map_err(|_| CanonError::decode_failed("mozjpeg: height out of range"))?;
        check_pixel_ceiling(width, height, max_pixels)?;

        let flat_pixels: Vec<u8> = match decompress.color_space() {
            JpegColorSpace::JCS_CMYK | JpegColorSpace::JCS_YCCK => {
                let mut started = decompress
                    .to_colorspace(JpegColorSpace::JCS_CMYK)
                    .map_err(|e| {
                        CanonError::decode_failed(format!("mozjpeg cmyk start failed: {e:?}"))
                    })?;
                let pixels: Vec<[u8; 4]> = started.read_scanlines().map_err(|e| {
                    CanonError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
                })?;
                cmyk_to_rgb(&pixels, has_adobe_marker(data))
            }
            _ => {
                let mut started = decompress.rgb().map_err(|e| {
                    CanonError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
                })?;
                let pixels: Vec<[u8; 3]> = started.read_scanlines().map_err(|e| {
                    CanonError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
                })?;
                pixels.into_iter().flatten().collect()
            }
        };

        let rgb_image = RgbImage::from_raw(width, height, flat_pixels).ok_or_else(|| {
            CanonError::decode_failed("mozjpeg: failed to create image from raw data")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

// APP14 "Adobe" segment: CMYK samples are stored inverted (255 = no ink).
fn has_adobe_marker(data: &[u8]) -> bool {
    data.windows(9)
        .any(|w| w[0] == 0xFF && w[1] == 0xEE && &w[4..9] == b"Adobe")
}

fn cmyk_to_rgb(pixels: &[[u8; 4]], inverted: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * 3);
    for &[c, m, y, k] in pixels {
        let (c, m, y, k) = if inverted {
            (c as u32, m as u32, y as u32, k as u32)
        } else {
            (255 - c as u32, 255 - m as u32, 255 - y as u32, 255 - k as u32)
        };
        out.push((c * k / 255) as u8);
        out.push((m * k / 255) as u8);
        out.push((y * k / 255) as u8);
    }
    out
}

/// Decode PNG using zune-png. 16bit入力は8bitへダウンサンプル。
pub fn decode_png_zune(data: &[u8], max_pixels: u64) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(Cursor::new(data), options);

        decoder
            .decode_headers()
            .map_err(|e| CanonError::decode_failed(format!("png: header decode failed: {e:?}")))?;
        let info = decoder
            .info()
            .ok_or_else(|| CanonError::decode_failed("png: missing header info"))?;
        let width = u32::try_from(info.width)
            .map_err(|_| CanonError::decode_failed("png: width out of range"))?;
        let height = u32::try_from(info.height)
            .map_err(|_| CanonError::decode_failed("png: height out of range"))?;
        check_pixel_ceiling(width, height, max_pixels)?;

        let pixels = decoder
            .decode()
            .map_err(|e| CanonError::decode_failed(format!("png: decode failed: {e:?}")))?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(CanonError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| CanonError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| CanonError::decode_failed("png: failed to build RGB image"))?,
            ColorSpace::RGBA => RgbaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(|| CanonError::decode_failed("png: failed to build RGBA image"))?,
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| CanonError::decode_failed("png: failed to build Luma image"))?,
            ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(|| CanonError::decode_failed("png: failed to build LumaA image"))?,
            other => {
                return Err(CanonError::decode_failed(format!(
                    "png: unsupported colorspace {other:?}"
                )))
            }
        };

        Ok(img)
    })
}

/// Decode WebP using libwebp. Animated WebP falls back to the image crate
/// (first frame) under an allocation limit derived from `max_pixels`.
pub fn decode_webp_libwebp(data: &[u8], max_pixels: u64) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        // Parse header first to avoid allocating huge buffers on malformed files
        let features = BitstreamFeatures::new(data)
            .ok_or_else(|| CanonError::decode_failed("webp: failed to read bitstream features"))?;

        check_pixel_ceiling(features.width(), features.height(), max_pixels)?;

        if features.has_animation() {
            let mut reader = ImageReader::with_format(Cursor::new(data), ImageFormat::WebP);
            let mut limits = Limits::default();
            limits.max_alloc = Some(max_pixels.saturating_mul(MAX_BYTES_PER_PIXEL));
            reader.limits(limits);
            return reader.decode().map_err(|e| {
                CanonError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| CanonError::decode_failed("webp: decode failed"))?;

        Ok(decoded.to_image())
    })
}

/// Width and height of an encoded WebP buffer, read from its bitstream header.
pub fn webp_dimensions(data: &[u8]) -> EngineResult<(u32, u32)> {
    run_with_panic_policy("decode:webp:header", || {
        let features = BitstreamFeatures::new(data)
            .ok_or_else(|| CanonError::decode_failed("webp: output header unreadable"))?;
        Ok((features.width(), features.height()))
    })
}

/// Extract EXIF Orientation tag (1-8). Returns None if missing or invalid.
pub fn detect_exif_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif_reader = exif::Reader::new();
    let exif = exif_reader.read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    // exif crate can represent as Short/Long; use get_uint for safety
    let value = field.value.get_uint(0)?;
    let orientation = u16::try_from(value).ok()?;
    if (1..=8).contains(&orientation) {
        Some(orientation)
    } else {
        None
    }
}
