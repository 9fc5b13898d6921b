use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use armortrack::{
    erase_conflicting_armors, extract_light_blobs, find_armors, process_frame, ArmorRules,
    ExtractConfig, GyroData, LightBlob, PipelineConfig, TeamColor, TrackSet,
};

/// Dark frame with `pairs` armor-like red bar pairs and some clutter.
fn make_frame_fixture(w: u32, h: u32, pairs: usize, seed: u64) -> armortrack::Frame {
    let mut img = RgbImage::from_pixel(w, h, Rgb([12, 10, 14]));
    let mut rng = StdRng::seed_from_u64(seed);
    let paint = |img: &mut RgbImage, cx: i64, cy: i64, bw: i64, bh: i64| {
        for y in (cy - bh / 2).max(0)..(cy + bh / 2).min(h as i64) {
            for x in (cx - bw / 2).max(0)..(cx + bw / 2).min(w as i64) {
                img.put_pixel(x as u32, y as u32, Rgb([250, 40, 30]));
            }
        }
    };
    for _ in 0..pairs {
        let cx = rng.gen_range(80..w as i64 - 80);
        let cy = rng.gen_range(40..h as i64 - 40);
        let bh = rng.gen_range(20..40);
        let gap = bh * 2;
        paint(&mut img, cx - gap / 2, cy, 6, bh);
        paint(&mut img, cx + gap / 2, cy, 6, bh);
    }
    for _ in 0..pairs * 2 {
        let cx = rng.gen_range(0..w as i64);
        let cy = rng.gen_range(0..h as i64);
        paint(&mut img, cx, cy, rng.gen_range(2..8), rng.gen_range(2..8));
    }
    armortrack::Frame::from_color(img, TeamColor::Red, 80)
}

fn make_blob_fixture(n: usize, seed: u64) -> Vec<LightBlob> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| LightBlob {
            center: [rng.gen_range(0.0..1280.0), rng.gen_range(400.0..600.0)],
            width: rng.gen_range(4.0..8.0),
            height: rng.gen_range(20.0..40.0),
            angle: rng.gen_range(-8.0..8.0),
            contour: i,
        })
        .collect()
}

fn bench_extract(c: &mut Criterion) {
    let frame = make_frame_fixture(1280, 1024, 6, 7);
    let cfg = ExtractConfig::default();

    c.bench_function("extract_1280x1024_6pairs", |b| {
        b.iter(|| {
            let (_, blobs) = extract_light_blobs(black_box(&frame), black_box(&cfg));
            black_box(blobs.len())
        })
    });
}

fn bench_match(c: &mut Criterion) {
    let rules = ArmorRules::default();
    let blobs = make_blob_fixture(40, 11);

    c.bench_function("match_disambiguate_40blobs", |b| {
        b.iter(|| {
            let mut blobs = blobs.clone();
            let mut armors = find_armors(black_box(&mut blobs), black_box(&rules), 0.0);
            erase_conflicting_armors(&mut armors);
            black_box(armors.len())
        })
    });
}

fn bench_frame(c: &mut Criterion) {
    let frame = make_frame_fixture(1280, 1024, 6, 13);
    let cfg = PipelineConfig::default();
    let gyro = GyroData::default();

    c.bench_function("process_frame_1280x1024", |b| {
        b.iter(|| {
            let out = process_frame(black_box(&frame), TrackSet::new(), &gyro, 0.0, &cfg);
            black_box(out.stats)
        })
    });
}

criterion_group!(hotpaths, bench_extract, bench_match, bench_frame);
criterion_main!(hotpaths);
