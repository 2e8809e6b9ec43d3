// src/engine/report.rs
//
// Per-call observability record and the reporter seam it is delivered through.
// The canonicalizer hands one ProcessRecord to its reporter at the end of
// every call, success or failure. Per-attempt detail stays at debug level.

use crate::engine::mode::Mode;
use crate::error::ErrorCode;
use crate::policy::UploadKind;
use std::time::Duration;

/// Everything known about one call at the point it finished.
///
/// Fields after the point of failure stay `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub kind: UploadKind,
    pub input_bytes: usize,
    pub output_bytes: Option<usize>,
    pub input_dims: Option<(u32, u32)>,
    pub output_dims: Option<(u32, u32)>,
    pub mode: Option<Mode>,
    /// Quality of the encode that produced the returned buffer.
    pub quality: Option<u8>,
    pub encode_attempts: usize,
    pub elapsed: Duration,
    pub error: Option<ErrorCode>,
}

impl ProcessRecord {
    pub(crate) fn started(kind: UploadKind, input_bytes: usize) -> Self {
        Self {
            kind,
            input_bytes,
            output_bytes: None,
            input_dims: None,
            output_dims: None,
            mode: None,
            quality: None,
            encode_attempts: 0,
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, record: &ProcessRecord);
}

impl<F> Reporter for F
where
    F: Fn(&ProcessRecord) + Send + Sync,
{
    fn report(&self, record: &ProcessRecord) {
        self(record)
    }
}

/// Drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _record: &ProcessRecord) {}
}

/// Emits one structured `tracing` event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, r: &ProcessRecord) {
        let (input_width, input_height) = r.input_dims.unwrap_or_default();
        let (output_width, output_height) = r.output_dims.unwrap_or_default();
        let mode = r.mode.map(|m| m.as_str()).unwrap_or("none");
        let elapsed_ms = r.elapsed.as_millis() as u64;

        match r.error {
            None => tracing::info!(
                target: "canon_image",
                kind = r.kind.as_str(),
                input_bytes = r.input_bytes,
                output_bytes = r.output_bytes.unwrap_or_default(),
                input_width,
                input_height,
                output_width,
                output_height,
                mode,
                quality = r.quality.unwrap_or_default(),
                encode_attempts = r.encode_attempts,
                elapsed_ms,
                "image canonicalized"
            ),
            Some(code) => tracing::warn!(
                target: "canon_image",
                kind = r.kind.as_str(),
                input_bytes = r.input_bytes,
                input_width,
                input_height,
                mode,
                encode_attempts = r.encode_attempts,
                elapsed_ms,
                error_code = code.as_str(),
                "image canonicalization failed"
            ),
        }
    }
}
