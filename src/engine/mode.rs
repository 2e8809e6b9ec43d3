// src/engine/mode.rs
//
// Mode selection: a pure OR of independent risk signals. No weighting.

use crate::policy::{PolicyConstants, Profile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One encode at the gentle quality.
    Gentle,
    /// Quality ladder, then the shrink loop if the hard ceiling is still missed.
    Aggressive,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Gentle => "gentle",
            Mode::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggressive iff input bytes, pixel area or long side is over its threshold.
pub fn select_mode(
    input_bytes: usize,
    width: u32,
    height: u32,
    profile: &Profile,
    constants: &PolicyConstants,
) -> Mode {
    let long_side = width.max(height);
    let pixels = width as u64 * height as u64;

    let aggressive = input_bytes > constants.aggressive_threshold_bytes
        || pixels > constants.aggressive_threshold_pixels
        || long_side > profile.max_long_side;

    if aggressive {
        Mode::Aggressive
    } else {
        Mode::Gentle
    }
}
