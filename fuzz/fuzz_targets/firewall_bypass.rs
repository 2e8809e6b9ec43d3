#![no_main]

use arbitrary::Arbitrary;
use canon_image::engine::{check_pixel_ceiling, Firewall};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    max_pixels: u64,
    max_dimension: u32,
    width: u32,
    height: u32,
}

fuzz_target!(|data: Input| {
    let fw = Firewall::new(data.max_pixels, data.max_dimension);

    // Anything the firewall lets through must respect both caps.
    if fw.enforce_dimensions(data.width, data.height).is_ok() {
        assert!(data.width <= data.max_dimension);
        assert!(data.height <= data.max_dimension);
    }
    if check_pixel_ceiling(data.width, data.height, data.max_pixels).is_ok() {
        assert!(data.width as u64 * data.height as u64 <= data.max_pixels);
    }
});
