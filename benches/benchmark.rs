use canon_image::engine::{encode_webp, fit_inside, select_mode};
use canon_image::{process_batch, Canonicalizer, NoopReporter, Policy, UploadKind};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::hint::black_box;
use std::io::Cursor;

fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn canonicalizer() -> Canonicalizer {
    Canonicalizer::with_reporter(Policy::default(), NoopReporter).unwrap()
}

pub fn bench_process(c: &mut Criterion) {
    let canon = canonicalizer();
    let mut group = c.benchmark_group("process");
    group.sample_size(20);

    for (w, h, kind) in [
        (256, 256, UploadKind::Avatar),
        (1024, 768, UploadKind::Gallery),
        (3000, 2000, UploadKind::Gallery),
    ] {
        let png = encode(&create_test_image(w, h), ImageFormat::Png);
        let jpeg = encode(&create_test_image(w, h), ImageFormat::Jpeg);
        group.throughput(Throughput::Elements((w * h) as u64));
        group.bench_with_input(BenchmarkId::new("png", format!("{w}x{h}")), &png, |b, data| {
            b.iter(|| canon.process(black_box(data), kind).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("jpeg", format!("{w}x{h}")), &jpeg, |b, data| {
            b.iter(|| canon.process(black_box(data), kind).unwrap())
        });
    }
    group.finish();
}

pub fn bench_encode(c: &mut Criterion) {
    let img = create_test_image(1024, 1024);
    let mut group = c.benchmark_group("encode_webp");
    group.sample_size(20);
    for quality in [90u8, 82, 78, 74] {
        group.bench_with_input(BenchmarkId::from_parameter(quality), &quality, |b, &q| {
            b.iter(|| encode_webp(black_box(&img), q).unwrap())
        });
    }
    group.finish();
}

pub fn bench_batch(c: &mut Criterion) {
    let canon = canonicalizer();
    let items: Vec<(Vec<u8>, UploadKind)> = (0..16)
        .map(|i| {
            let png = encode(&create_test_image(200 + i, 150), ImageFormat::Png);
            (png, UploadKind::GalleryThumb)
        })
        .collect();

    c.bench_function("process_batch 16", |b| {
        b.iter(|| process_batch(&canon, black_box(&items)))
    });
}

pub fn bench_decisions(c: &mut Criterion) {
    let policy = Policy::default();
    let profile = policy.profile(UploadKind::Gallery);
    c.bench_function("select_mode + fit_inside", |b| {
        b.iter(|| {
            let mode = select_mode(black_box(3_000_000), 3000, 2000, &profile, &policy.constants);
            (mode, fit_inside(black_box(3000), 2000, profile.max_long_side))
        })
    });
}

criterion_group!(benches, bench_process, bench_encode, bench_batch, bench_decisions);
criterion_main!(benches);
