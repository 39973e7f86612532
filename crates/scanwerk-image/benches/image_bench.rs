// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scanwerk-image crate: delivery-time line
// conversion and the post-processing passes on a synthetic skewed sheet.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use scanwerk_core::types::ScanMode;
use scanwerk_image::post::{despeck, skew};
use scanwerk_image::{LineConverter, PixelLayout, PostProcessor, Raster};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Light sheet on a dark background with a slight clockwise tilt.
fn skewed_sheet(size: usize) -> Raster {
    let mut r = Raster::filled(PixelLayout::Gray, size, size, 0x10);
    let margin = size as f64 / 8.0;
    for y in 0..size {
        for x in 0..size {
            let (xf, yf) = (x as f64, y as f64);
            let top = margin + 0.03 * xf;
            let left = margin - 0.03 * (yf - margin);
            if yf >= top && yf < size as f64 - margin && xf >= left && xf < size as f64 - margin {
                r.row_mut(y)[x] = 0xe0;
            }
        }
    }
    r
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Color to lineart conversion of one 300 dpi letter-width line.
fn bench_line_conversion(c: &mut Criterion) {
    let conv = LineConverter {
        target_mode: ScanMode::Lineart,
        ..LineConverter::passthrough(ScanMode::Color, 2550, 300)
    };
    let line: Vec<u8> = (0..2550 * 3).map(|i| (i % 251) as u8).collect();
    let mut out = Vec::with_capacity(conv.target_bpl());
    let mut scratch = Vec::new();

    c.bench_function("color_to_lineart_line (2550 px)", |b| {
        b.iter(|| {
            out.clear();
            conv.convert_with(black_box(&line), &mut scratch, &mut out);
            black_box(&out);
        });
    });
}

fn bench_find_skew(c: &mut Criterion) {
    let sheet = skewed_sheet(400);
    c.bench_function("find_skew (400x400)", |b| {
        b.iter(|| black_box(skew::find_skew(black_box(&sheet), 100)));
    });
}

fn bench_despeck(c: &mut Criterion) {
    let sheet = skewed_sheet(400);
    c.bench_function("despeck d=2 (400x400)", |b| {
        b.iter(|| {
            let mut r = sheet.clone();
            despeck::despeck(&mut r, 2);
            black_box(r);
        });
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let sheet = skewed_sheet(400);
    let post = PostProcessor {
        deskew: true,
        crop: true,
        despeck: 1,
        blank_percent: 1.0,
        bg_color: 0x10,
        dpi_x: 100,
        dpi_y: 100,
    };
    c.bench_function("post_pipeline (400x400)", |b| {
        b.iter(|| black_box(post.run(black_box(sheet.clone()))));
    });
}

criterion_group!(
    benches,
    bench_line_conversion,
    bench_find_skew,
    bench_despeck,
    bench_pipeline
);
criterion_main!(benches);
