// src/engine/canonicalizer.rs
//
// The canonicalization entry point:
//   screen (firewall) -> select mode -> decode + orient once
//   -> gentle: one encode | aggressive: quality ladder, then bounded shrink loop
//   -> read output dimensions back from the WebP bytes.
// Stateless per call; a Canonicalizer is cheap to clone and safe to share.

use crate::engine::decoder::{decode_pixels, detect_exif_orientation, webp_dimensions};
use crate::engine::encoder::encode_webp;
use crate::engine::firewall::Firewall;
use crate::engine::mode::{select_mode, Mode};
use crate::engine::pipeline::{apply_orientation, fit_for_encode, shrink_long_side};
use crate::engine::report::{ProcessRecord, Reporter, TracingReporter};
use crate::error::{CanonError, PolicyError, Result};
use crate::policy::{Policy, Profile, UploadKind, MAX_SHRINK_STEPS};
use image::DynamicImage;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

pub const CANONICAL_MIME: &str = "image/webp";

/// Canonical output. Owned by the caller; the pipeline keeps nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    pub buffer: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

impl CanonicalImage {
    /// File extension for storage paths.
    pub fn extension(&self) -> &'static str {
        "webp"
    }

    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

struct Encoded {
    buffer: Vec<u8>,
    quality: u8,
}

#[derive(Clone)]
pub struct Canonicalizer {
    policy: Arc<Policy>,
    firewall: Firewall,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Canonicalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canonicalizer")
            .field("policy", &self.policy)
            .field("firewall", &self.firewall)
            .finish_non_exhaustive()
    }
}

impl Canonicalizer {
    /// Validated policy, `tracing` reporter.
    pub fn new(policy: Policy) -> std::result::Result<Self, PolicyError> {
        Self::with_reporter(policy, TracingReporter)
    }

    pub fn with_reporter(
        policy: Policy,
        reporter: impl Reporter + 'static,
    ) -> std::result::Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self::from_validated(policy, Arc::new(reporter)))
    }

    fn from_validated(policy: Policy, reporter: Arc<dyn Reporter>) -> Self {
        let firewall = Firewall::from_constants(&policy.constants);
        Self {
            policy: Arc::new(policy),
            firewall,
            reporter,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// String-keyed entry: unknown kinds use the default profile.
    pub fn process_tagged(&self, data: &[u8], kind: &str) -> Result<CanonicalImage> {
        self.process(data, UploadKind::parse(kind))
    }

    /// Canonicalize one upload. Yields exactly one image or exactly one error,
    /// and reports exactly one record either way.
    pub fn process(&self, data: &[u8], kind: UploadKind) -> Result<CanonicalImage> {
        let started = Instant::now();
        let mut record = ProcessRecord::started(kind, data.len());

        let result = self.run(data, kind, &mut record);

        record.elapsed = started.elapsed();
        if let Err(err) = &result {
            record.error = Some(err.code());
        }
        self.reporter.report(&record);
        result
    }

    fn run(
        &self,
        data: &[u8],
        kind: UploadKind,
        record: &mut ProcessRecord,
    ) -> Result<CanonicalImage> {
        let constants = &self.policy.constants;
        let profile = self.policy.profile(kind);

        let meta = self.firewall.screen_header(data)?;
        record.input_dims = Some((meta.width, meta.height));
        self.firewall.enforce_dimensions(meta.width, meta.height)?;

        let mode = select_mode(data.len(), meta.width, meta.height, &profile, constants);
        record.mode = Some(mode);

        let decoded = decode_pixels(data, meta.format, constants.max_pixels)?;
        let source = match detect_exif_orientation(data) {
            Some(orientation) => apply_orientation(decoded, orientation),
            None => decoded,
        };

        let encoded = match mode {
            Mode::Gentle => self.encode_gentle(&source, &profile, record)?,
            Mode::Aggressive => self.encode_aggressive(&source, &profile, record)?,
        };
        record.quality = Some(encoded.quality);
        record.output_bytes = Some(encoded.buffer.len());

        // Ground truth comes from the encoded bytes, not the resize request.
        let (width, height) = webp_dimensions(&encoded.buffer)?;
        record.output_dims = Some((width, height));

        Ok(CanonicalImage {
            buffer: encoded.buffer,
            mime: CANONICAL_MIME,
            width,
            height,
        })
    }

    fn encode_gentle(
        &self,
        source: &DynamicImage,
        profile: &Profile,
        record: &mut ProcessRecord,
    ) -> Result<Encoded> {
        let quality = self.policy.constants.gentle_quality;
        let buffer = self.encode_at(source, profile.max_long_side, quality, record)?;
        Ok(Encoded { buffer, quality })
    }

    fn encode_aggressive(
        &self,
        source: &DynamicImage,
        profile: &Profile,
        record: &mut ProcessRecord,
    ) -> Result<Encoded> {
        let constants = &self.policy.constants;

        // Phase A: first rung that meets the target wins; otherwise keep the last one.
        let mut latest: Option<Encoded> = None;
        for &quality in &constants.aggressive_qualities {
            let buffer = self.encode_at(source, profile.max_long_side, quality, record)?;
            let meets_target = buffer.len() <= constants.target_bytes;
            latest = Some(Encoded { buffer, quality });
            if meets_target {
                break;
            }
        }
        let mut out = latest.ok_or_else(|| CanonError::decode_failed("empty quality ladder"))?;

        // Phase B: only when the hard ceiling is missed. Lowest rung, bounded steps.
        if out.buffer.len() > constants.max_output_bytes {
            let quality = self.policy.lowest_quality();
            let mut max_long_side = profile.max_long_side;
            for _ in 0..MAX_SHRINK_STEPS {
                if max_long_side <= profile.min_long_side {
                    break;
                }
                max_long_side = shrink_long_side(max_long_side, profile.min_long_side);
                let buffer = self.encode_at(source, max_long_side, quality, record)?;
                out = Encoded { buffer, quality };
                if out.buffer.len() <= constants.target_bytes {
                    break;
                }
            }
        }

        Ok(out)
    }

    fn encode_at(
        &self,
        source: &DynamicImage,
        max_long_side: u32,
        quality: u8,
        record: &mut ProcessRecord,
    ) -> Result<Vec<u8>> {
        record.encode_attempts += 1;
        let fitted = fit_for_encode(source, max_long_side)?;
        let buffer = encode_webp(&fitted, quality)?;
        tracing::debug!(
            target: "canon_image",
            attempt = record.encode_attempts,
            quality,
            max_long_side,
            bytes = buffer.len(),
            "encode attempt"
        );
        Ok(buffer)
    }
}

static DEFAULT_CANONICALIZER: OnceLock<Canonicalizer> = OnceLock::new();

/// Process-wide canonicalizer with the default policy and `tracing` reporter.
pub fn default_canonicalizer() -> &'static Canonicalizer {
    DEFAULT_CANONICALIZER
        .get_or_init(|| Canonicalizer::from_validated(Policy::default(), Arc::new(TracingReporter)))
}

/// `(buffer, kind)` entry contract against the default policy.
pub fn canonicalize(data: &[u8], kind: &str) -> Result<CanonicalImage> {
    default_canonicalizer().process_tagged(data, kind)
}
