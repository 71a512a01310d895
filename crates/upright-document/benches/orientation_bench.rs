// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the orientation pipeline in the upright-document
// crate. Both runs use a synthetic A4-ish page with no recognition backend,
// which is the layout-only path every page takes when Tesseract is missing.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma};

use upright_core::{Orientation, TuningConfig};
use upright_document::image::rotated;
use upright_document::{OrientationEngine, Preprocessor};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 1240x1754 page (A4 at 150 dpi) with forty lines of block "words" in the
/// upper two thirds.
fn synthetic_page() -> DynamicImage {
    let (width, height) = (1240u32, 1754u32);
    let mut img = GrayImage::from_pixel(width, height, Luma([245u8]));
    for line in 0..40u32 {
        let top = 120 + line * 28;
        for y in top..top + 14 {
            for x in 110..1130u32 {
                if (x / 9) % 6 != 5 {
                    img.put_pixel(x, y, Luma([20u8]));
                }
            }
        }
    }
    DynamicImage::ImageLuma8(img)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Denoise plus dual threshold on one full-size rendering.
fn bench_binarize(c: &mut Criterion) {
    let page = synthetic_page();
    let preprocessor = Preprocessor::new(&TuningConfig::default());

    c.bench_function("binarize (1240x1754)", |b| {
        b.iter(|| black_box(preprocessor.prepare(black_box(&page))));
    });
}

/// Full decision on an upside-down page: projection pair, then whitespace.
fn bench_decide_upside_down(c: &mut Criterion) {
    let page = rotated(&synthetic_page(), Orientation::Deg180);
    let engine = OrientationEngine::without_recognition(TuningConfig::default());

    c.bench_function("decide upside-down (1240x1754)", |b| {
        b.iter(|| black_box(engine.decide(black_box(&page), None)));
    });
}

criterion_group!(benches, bench_binarize, bench_decide_upside_down);
criterion_main!(benches);
