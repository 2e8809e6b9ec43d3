//! Regression tests for fuzz-shaped inputs.
//! Each test should be cheap (single input) and run in the normal test suite.

use canon_image::engine::{decode_pixels, detect_exif_orientation, webp_dimensions};
use canon_image::{canonicalize, inspect, ErrorCode};
use image::ImageFormat;

const LIMIT: u64 = 100_000_000;

#[test]
fn fuzz_regression_jpeg_sof_without_scan() {
    // SOI + SOF0 declaring 16x16, then EOI with no scan data.
    let data: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x10, 0x00, 0x10, 0x01, 0x01, 0x11, 0x00,
        0xFF, 0xD9,
    ];

    // Header inspection should never panic.
    let _ = inspect(data, LIMIT);

    // JPEG-specific decoder path rejects it gracefully.
    assert!(decode_pixels(data, ImageFormat::Jpeg, LIMIT).is_err());

    let err = canonicalize(data, "gallery").unwrap_err();
    assert_eq!(err.code(), ErrorCode::ImageDecodeFailed);
}

#[test]
fn fuzz_regression_jpeg_huge_declared_size() {
    // SOF0 claims 65535x65535: must stop at the pixel ceiling, not allocate.
    let data: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x01, 0x11, 0x00,
        0xFF, 0xD9,
    ];
    assert!(decode_pixels(data, ImageFormat::Jpeg, LIMIT).is_err());
    let err = canonicalize(data, "gallery").unwrap_err();
    assert_eq!(err.code(), ErrorCode::ImageDecodeFailed);
}

#[test]
fn fuzz_regression_png_signature_only() {
    let data = b"\x89PNG\r\n\x1a\n";
    assert!(inspect(data, LIMIT).is_err());
    assert!(decode_pixels(data, ImageFormat::Png, LIMIT).is_err());
}

#[test]
fn fuzz_regression_riff_header_lies_about_length() {
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&u32::MAX.to_le_bytes());
    data.extend_from_slice(b"WEBP");
    assert!(inspect(&data, LIMIT).is_err());
    assert!(decode_pixels(&data, ImageFormat::WebP, LIMIT).is_err());
    assert!(webp_dimensions(&data).is_err());
}

#[test]
fn fuzz_regression_exif_with_dangling_ifd_offset() {
    // APP1 Exif segment whose IFD offset points far past the end.
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10];
    data.extend_from_slice(b"Exif\x00\x00");
    data.extend_from_slice(b"MM\x00\x2A\xFF\xFF\xFF\xF0");
    data.extend_from_slice(&[0xFF, 0xD9]);
    assert_eq!(detect_exif_orientation(&data), None);
}

#[test]
fn fuzz_regression_decoder_format_mismatch() {
    // Routed to a decoder that does not match the bytes.
    let data = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
    assert!(decode_pixels(data, ImageFormat::Png, LIMIT).is_err());
    assert!(decode_pixels(data, ImageFormat::Gif, LIMIT).is_err());
}
