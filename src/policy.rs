// src/policy.rs
//
// Static canonicalization policy: hard caps, aggressive-mode triggers,
// output byte targets, the quality ladder and per-kind sizing profiles.
// Built once at startup, never mutated afterwards.

use crate::error::PolicyError;

/// Fraction kept by each shrink step (`round(max_long_side * 0.85)`).
pub const SHRINK_FACTOR: f64 = 0.85;

/// Upper bound on shrink-loop iterations.
pub const MAX_SHRINK_STEPS: usize = 4;

/// What the upload is for. Supplied by the caller, selects a [`Profile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Gallery,
    BlogHero,
    Background,
    Avatar,
    GalleryThumb,
    /// Unknown tags land here.
    Default,
}

impl UploadKind {
    pub const ALL: [UploadKind; 6] = [
        UploadKind::Gallery,
        UploadKind::BlogHero,
        UploadKind::Background,
        UploadKind::Avatar,
        UploadKind::GalleryThumb,
        UploadKind::Default,
    ];

    /// Parse a caller tag. Never fails: anything unrecognized is `Default`.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "gallery" => Self::Gallery,
            "blogHero" => Self::BlogHero,
            "background" => Self::Background,
            "avatar" => Self::Avatar,
            "galleryThumb" => Self::GalleryThumb,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gallery => "gallery",
            Self::BlogHero => "blogHero",
            Self::Background => "background",
            Self::Avatar => "avatar",
            Self::GalleryThumb => "galleryThumb",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-side bounds for one upload kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile {
    /// Resize target on the long side (fit inside, no upscale).
    pub max_long_side: u32,
    /// Floor for the shrink loop.
    pub min_long_side: u32,
}

impl Profile {
    pub const fn new(max_long_side: u32, min_long_side: u32) -> Self {
        Self {
            max_long_side,
            min_long_side,
        }
    }
}

/// Process-wide numeric caps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyConstants {
    /// Pixel-count ceiling enforced by the decoder before allocation.
    pub max_pixels: u64,
    /// Per-axis cap on decoded width and height.
    pub max_dimension: u32,
    pub aggressive_threshold_bytes: usize,
    pub aggressive_threshold_pixels: u64,
    /// Hard ceiling. Missing it after the ladder enters the shrink loop.
    pub max_output_bytes: usize,
    /// Preferred stopping size for the ladder and shrink loop.
    pub target_bytes: usize,
    pub gentle_quality: u8,
    /// Descending quality ladder for aggressive mode.
    pub aggressive_qualities: Vec<u8>,
}

impl Default for PolicyConstants {
    fn default() -> Self {
        Self {
            max_pixels: 100_000_000,
            max_dimension: 8192,
            aggressive_threshold_bytes: 1_500_000,
            aggressive_threshold_pixels: 12_000_000,
            max_output_bytes: 2_000_000,
            target_bytes: 1_200_000,
            gentle_quality: 90,
            aggressive_qualities: vec![82, 78, 74],
        }
    }
}

/// The full policy table: constants plus one profile per kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    pub constants: PolicyConstants,
    pub gallery: Profile,
    pub blog_hero: Profile,
    pub background: Profile,
    pub avatar: Profile,
    pub gallery_thumb: Profile,
    pub default: Profile,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            constants: PolicyConstants::default(),
            gallery: Profile::new(2048, 1024),
            blog_hero: Profile::new(2400, 1200),
            background: Profile::new(2560, 1280),
            avatar: Profile::new(512, 128),
            gallery_thumb: Profile::new(640, 320),
            default: Profile::new(2048, 800),
        }
    }
}

impl Policy {
    pub fn profile(&self, kind: UploadKind) -> Profile {
        match kind {
            UploadKind::Gallery => self.gallery,
            UploadKind::BlogHero => self.blog_hero,
            UploadKind::Background => self.background,
            UploadKind::Avatar => self.avatar,
            UploadKind::GalleryThumb => self.gallery_thumb,
            UploadKind::Default => self.default,
        }
    }

    /// Lowest rung of the ladder; the shrink loop always encodes at this quality.
    pub fn lowest_quality(&self) -> u8 {
        self.constants
            .aggressive_qualities
            .last()
            .copied()
            .unwrap_or(self.constants.gentle_quality)
    }

    /// Worst-case number of encodes in one aggressive call.
    pub fn max_encode_attempts(&self) -> usize {
        self.constants.aggressive_qualities.len() + MAX_SHRINK_STEPS
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let c = &self.constants;

        if c.max_pixels == 0 {
            return Err(PolicyError::invalid_argument(
                "max_pixels",
                "0",
                "must be positive",
            ));
        }
        if c.max_dimension == 0 {
            return Err(PolicyError::invalid_argument(
                "max_dimension",
                "0",
                "must be positive",
            ));
        }
        check_quality("gentle_quality", c.gentle_quality)?;

        if c.aggressive_qualities.is_empty() {
            return Err(PolicyError::invalid_argument(
                "aggressive_qualities",
                "[]",
                "ladder needs at least one quality",
            ));
        }
        for q in &c.aggressive_qualities {
            check_quality("aggressive_qualities", *q)?;
        }
        if c.aggressive_qualities.windows(2).any(|w| w[0] <= w[1]) {
            return Err(PolicyError::invalid_argument(
                "aggressive_qualities",
                format!("{:?}", c.aggressive_qualities),
                "ladder must be strictly descending",
            ));
        }
        if c.target_bytes > c.max_output_bytes {
            return Err(PolicyError::invalid_argument(
                "target_bytes",
                c.target_bytes.to_string(),
                format!("must not exceed max_output_bytes ({})", c.max_output_bytes),
            ));
        }

        for kind in UploadKind::ALL {
            let p = self.profile(kind);
            if p.min_long_side == 0
                || p.min_long_side > p.max_long_side
                || p.max_long_side > c.max_dimension
            {
                return Err(PolicyError::invalid_argument(
                    format!("profile.{}", kind.as_str()),
                    format!("{}/{}", p.max_long_side, p.min_long_side),
                    format!(
                        "expected 0 < min_long_side <= max_long_side <= max_dimension ({})",
                        c.max_dimension
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn check_quality(name: &'static str, q: u8) -> Result<(), PolicyError> {
    if (1..=100).contains(&q) {
        Ok(())
    } else {
        Err(PolicyError::invalid_argument(
            name,
            q.to_string(),
            "must be within 1..=100",
        ))
    }
}
