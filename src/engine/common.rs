// src/engine/common.rs
//
// Common utilities shared across engine modules.
// mozjpeg reports libjpeg errors by unwinding; other codecs may panic on
// malformed input. Every codec call goes through run_with_panic_policy so a
// panic surfaces as IMAGE_DECODE_FAILED instead of tearing down the caller.

use crate::error::CanonError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub type EngineResult<T> = std::result::Result<T, CanonError>;

/// Run `f`, converting a panic into `CanonError::DecodeFailed` tagged with `stage`.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CanonError::decode_failed(format!(
            "{stage}: codec panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
