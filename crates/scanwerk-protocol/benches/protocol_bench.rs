// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for window encoding and sense interpretation in the
// scanwerk-protocol crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use scanwerk_core::quirks::QuirkTable;
use scanwerk_core::types::{ScanMode, Source};
use scanwerk_protocol::command::{self, WindowDescriptor, WindowRequest};
use scanwerk_protocol::status::{SenseData, StatusCache};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Build and encode a duplex color window for a three-head device.
fn bench_window_encode(c: &mut Criterion) {
    let profile = QuirkTable::builtin().lookup("DR-2510C");
    let req = WindowRequest {
        source: Source::AdfDuplex,
        mode: ScanMode::Color,
        dpi_x: 300,
        dpi_y: 300,
        tl_x: 0,
        tl_y: 0,
        width_px: 2550,
        height_px: 3300,
        page_x: 10_200,
        brightness: 0,
        contrast: 0,
        threshold: 128,
        rif: false,
        jpeg_quality: None,
    };

    c.bench_function("window_encode", |b| {
        b.iter(|| {
            let desc = WindowDescriptor::for_request(black_box(&req), &profile);
            black_box(command::set_window(&desc));
        });
    });
}

/// Parse and interpret a short-read sense block.
fn bench_sense_interpret(c: &mut Criterion) {
    let raw = SenseData::short_read(4096).encode();
    let mut cache = StatusCache::default();

    c.bench_function("sense_interpret", |b| {
        b.iter(|| {
            let sense = SenseData::parse(black_box(&raw)).expect("valid sense");
            black_box(cache.record(&sense));
        });
    });
}

criterion_group!(benches, bench_window_encode, bench_sense_interpret);
criterion_main!(benches);
