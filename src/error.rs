// src/error.rs
//
// Unified error handling for canon-image
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy (user facing, both map to HTTP 422):
// - IMAGE_DECODE_FAILED: unreadable, corrupt, disallowed format, any encode failure
// - IMAGE_DIMENSIONS_EXCEEDED: valid image, too large on one axis

use std::borrow::Cow;
use thiserror::Error;

/// Stable machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ImageDecodeFailed,
    ImageDimensionsExceeded,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ImageDecodeFailed => "IMAGE_DECODE_FAILED",
            ErrorCode::ImageDimensionsExceeded => "IMAGE_DIMENSIONS_EXCEEDED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// canon-image processing error.
///
/// Exactly two kinds exist. Internal retry steps (quality ladder, shrink loop)
/// never get their own variant; any failure inside them is a `DecodeFailed`.
/// No variant carries a partial output buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonError {
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Image dimensions {width}x{height} exceed maximum {max} per side")]
    DimensionsExceeded { width: u32, height: u32, max: u32 },
}

// Constructor Helpers
impl CanonError {
    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimensions_exceeded(width: u32, height: u32, max: u32) -> Self {
        Self::DimensionsExceeded { width, height, max }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DecodeFailed { .. } => ErrorCode::ImageDecodeFailed,
            Self::DimensionsExceeded { .. } => ErrorCode::ImageDimensionsExceeded,
        }
    }

    /// HTTP status the upload endpoint should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::DecodeFailed { .. } | Self::DimensionsExceeded { .. } => 422,
        }
    }

    /// Human readable message (same text as `Display`).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Both kinds are terminal. The pipeline never retries across calls.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Invalid policy table. Raised at construction time, never from `process`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },
}

impl PolicyError {
    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, CanonError>;
