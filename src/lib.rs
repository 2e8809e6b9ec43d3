// lib.rs
//
// canon-image: upload canonicalization for user images
//
// Every accepted upload becomes a metadata-free WebP whose long side and byte
// size are bounded by the policy of its upload kind. Anything that is not a
// decodable JPEG, PNG or WebP inside the pixel and dimension caps is rejected
// with a typed error.

// Memory allocator optimization - jemalloc for large decode/resize buffers
// Note: jemalloc is not supported on Windows/MSVC, so we exclude it on that platform
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub mod engine;
pub mod error;
pub mod policy;

pub use engine::{
    canonicalize, inspect, process_batch, process_with_deadline, CanonicalImage, Canonicalizer,
    DecodedImageMeta, Mode, NoopReporter, ProcessRecord, Reporter, TracingReporter,
};
pub use error::{CanonError, ErrorCode, PolicyError, Result};
pub use policy::{Policy, PolicyConstants, Profile, UploadKind};
