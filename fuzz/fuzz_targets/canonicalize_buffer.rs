#![no_main]

//! Whole pipeline on arbitrary bytes: must return Ok or a typed error, never panic.

use arbitrary::Arbitrary;
use canon_image::{Canonicalizer, NoopReporter, Policy, UploadKind};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

#[derive(Arbitrary, Debug)]
struct Input {
    kind: u8,
    data: Vec<u8>,
}

fn canon() -> &'static Canonicalizer {
    static CANON: OnceLock<Canonicalizer> = OnceLock::new();
    CANON.get_or_init(|| {
        let mut policy = Policy::default();
        // keep decode allocations small under the fuzzer
        policy.constants.max_pixels = 4_000_000;
        Canonicalizer::with_reporter(policy, NoopReporter).unwrap()
    })
}

fuzz_target!(|input: Input| {
    let kind = UploadKind::ALL[input.kind as usize % UploadKind::ALL.len()];
    if let Ok(out) = canon().process(&input.data, kind) {
        assert_eq!(out.mime, "image/webp");
        assert!(out.width > 0 && out.height > 0);
    }
});
