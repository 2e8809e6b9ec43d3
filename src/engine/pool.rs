// src/engine/pool.rs
//
// Global thread pool for batch and deadline-bounded processing.
//
// One pool for the whole process, built lazily on first use. Changes to
// CANON_IMAGE_THREADS after that have no effect.
//
// Thread count:
// - CANON_IMAGE_THREADS when set to a positive integer
// - otherwise std::thread::available_parallelism() (respects cgroup quota)
// - MIN_THREADS when detection fails

use crate::engine::canonicalizer::{CanonicalImage, Canonicalizer};
use crate::error::{CanonError, Result};
use crate::policy::UploadKind;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::mpsc;
use std::sync::OnceLock;
use std::time::Duration;

pub const THREADS_ENV: &str = "CANON_IMAGE_THREADS";

const MIN_THREADS: usize = 1;

// None when no pool could be built; callers then use rayon's global pool.
static GLOBAL_THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

fn pool() -> Option<&'static ThreadPool> {
    GLOBAL_THREAD_POOL
        .get_or_init(|| {
            let num_threads = configured_threads(std::env::var(THREADS_ENV).ok().as_deref());
            let built = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("canon-image-{i}"))
                .build()
                .or_else(|e| {
                    tracing::warn!(
                        target: "canon_image",
                        num_threads,
                        error = %e,
                        "thread pool build failed, retrying with minimal pool"
                    );
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(MIN_THREADS)
                        .build()
                });
            match built {
                Ok(pool) => {
                    tracing::debug!(
                        target: "canon_image",
                        num_threads = pool.current_num_threads(),
                        "thread pool ready"
                    );
                    Some(pool)
                }
                Err(e) => {
                    tracing::warn!(
                        target: "canon_image",
                        error = %e,
                        "falling back to rayon global pool"
                    );
                    None
                }
            }
        })
        .as_ref()
}

/// Thread count for the pool given the raw env value.
pub fn configured_threads(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(MIN_THREADS)
        })
}

/// Number of worker threads actually serving batch work.
pub fn pool_threads() -> usize {
    match pool() {
        Some(pool) => pool.current_num_threads(),
        None => rayon::current_num_threads(),
    }
}

fn install<R, F>(f: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match pool() {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

/// Process independent uploads in parallel. Results keep input order;
/// one failure never affects the others.
pub fn process_batch<B>(
    canon: &Canonicalizer,
    items: &[(B, UploadKind)],
) -> Vec<Result<CanonicalImage>>
where
    B: AsRef<[u8]> + Sync,
{
    install(|| {
        items
            .par_iter()
            .map(|(data, kind)| canon.process(data.as_ref(), *kind))
            .collect()
    })
}

/// Run one call on the pool and wait at most `deadline` for it.
///
/// On timeout the caller gets `DecodeFailed`; the worker finishes in the
/// background and its result is dropped.
pub fn process_with_deadline(
    canon: &Canonicalizer,
    data: Vec<u8>,
    kind: UploadKind,
    deadline: Duration,
) -> Result<CanonicalImage> {
    let (tx, rx) = mpsc::channel();
    let canon = canon.clone();
    let job = move || {
        // receiver may already be gone
        let _ = tx.send(canon.process(&data, kind));
    };
    match pool() {
        Some(pool) => pool.spawn(job),
        None => rayon::spawn(job),
    }

    match rx.recv_timeout(deadline) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(
                target: "canon_image",
                kind = kind.as_str(),
                deadline_ms = deadline.as_millis() as u64,
                "processing deadline exceeded"
            );
            Err(CanonError::decode_failed(format!(
                "processing exceeded deadline of {}ms",
                deadline.as_millis()
            )))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(CanonError::decode_failed("worker exited without a result"))
        }
    }
}
