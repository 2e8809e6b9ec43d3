// src/engine.rs
//
// The core of canon-image. One upload in, one canonical WebP out:
// 1. Screen the container (pixel ceiling, format allowlist, per-axis cap)
// 2. Pick gentle or aggressive mode from cheap risk signals
// 3. Decode once, auto-orient, then resize + encode until the size budget holds
//
// This file is a facade over the decomposed modules in engine/

mod canonicalizer;
mod common;
mod decoder;
mod encoder;
mod firewall;
mod mode;
mod pipeline;
mod pool;
mod report;

pub use canonicalizer::{
    canonicalize, default_canonicalizer, CanonicalImage, Canonicalizer, CANONICAL_MIME,
};
pub use common::EngineResult;
pub use decoder::{
    check_pixel_ceiling, decode_pixels, detect_exif_orientation, inspect, webp_dimensions,
    DecodedImageMeta,
};
pub use encoder::{encode_webp, QualitySettings};
pub use firewall::{Firewall, ALLOWED_FORMATS};
pub use mode::{select_mode, Mode};
pub use pipeline::{apply_orientation, fast_resize, fit_inside, shrink_long_side, ResizeError};
pub use pool::{configured_threads, pool_threads, process_batch, process_with_deadline, THREADS_ENV};
pub use report::{NoopReporter, ProcessRecord, Reporter, TracingReporter};
