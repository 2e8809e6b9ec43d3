#![no_main]

use canon_image::inspect;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(meta) = inspect(data, 100_000_000) {
        assert!(meta.pixels() <= 100_000_000);
    }
});
