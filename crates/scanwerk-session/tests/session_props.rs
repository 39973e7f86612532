// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Property tests: reconstruction does not depend on how the device stream
// is chunked, side counters stay ordered, and a session delivers the same
// page whatever buffer sizes the caller and the device use.

use proptest::prelude::*;

use scanwerk_core::config::{ScanConfig, TransportTimeouts};
use scanwerk_core::geometry::{Geometry, UNITS_PER_INCH};
use scanwerk_core::quirks::QuirkTable;
use scanwerk_core::types::{ColorInterlace, DuplexInterlace, ScanMode, Source};
use scanwerk_protocol::retry::RecordingSleeper;
use scanwerk_protocol::transport::ScsiTransport;
use scanwerk_session::reconstruct::duplex::interleave;
use scanwerk_session::reconstruct::planes::{decode_color, encode_color};
use scanwerk_session::reconstruct::{
    ColorRaster, DuplexSplitter, JpegDuplexSplitter, LineAssembler, LineTransform,
};
use scanwerk_session::sim::interleaved_jpeg;
use scanwerk_session::{Delivery, ScanSession, ScanSide, Sheet, SimulatedScanner};

/// Cut `data` into consecutive pieces of the given sizes, cycling through
/// them until the data runs out.
fn pieces<'a>(data: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    let mut at = 0;
    for &n in sizes.iter().cycle() {
        if at >= data.len() {
            break;
        }
        let end = (at + n.max(1)).min(data.len());
        out.push(&data[at..end]);
        at = end;
    }
    out
}

/// Frame sizes whose header bytes cannot be mistaken for back-side
/// placeholder data.
fn clean_size(v: usize) -> bool {
    !(v as u16).to_be_bytes().contains(&0x22)
}

fn named_interlace() -> impl Strategy<Value = ColorInterlace> {
    prop_oneof![
        Just(ColorInterlace::Rgb),
        Just(ColorInterlace::Bgr),
        Just(ColorInterlace::Gbr),
        Just(ColorInterlace::Brg),
        Just(ColorInterlace::Rrggbb),
        Just(ColorInterlace::MirroredRrggbb),
    ]
}

fn split_interlace() -> impl Strategy<Value = DuplexInterlace> {
    prop_oneof![
        Just(DuplexInterlace::LineAlternate),
        Just(DuplexInterlace::ByteAlternate),
        Just(DuplexInterlace::RasterOffset),
    ]
}

proptest! {
    #[test]
    fn side_counters_stay_ordered(
        width in 1usize..48,
        height in 1usize..24,
        chunks in prop::collection::vec(1usize..300, 1..16),
        takes in prop::collection::vec(0usize..300, 1..16),
    ) {
        let bpl = width;
        let raw: Vec<u8> = (0..bpl * height).map(|i| i as u8).collect();
        let mut side = ScanSide::new(bpl * height, bpl, 0xee);
        let mut asm = LineAssembler::new(LineTransform::identity(width, bpl), None, 0, raw.len());
        let mut delivered = Vec::new();

        for (piece, &take) in pieces(&raw, &chunks).into_iter().zip(takes.iter().cycle()) {
            asm.push(piece, &mut side);
            prop_assert!(side.delivered() <= side.received());
            prop_assert!(side.received() <= side.expected());
            prop_assert_eq!(side.received() % bpl, 0);
            let n = take.min(side.pending());
            delivered.extend_from_slice(&side.ready()[..n]);
            side.consume(n);
            prop_assert!(side.delivered() <= side.received());
        }
        asm.finish(&mut side);
        delivered.extend_from_slice(side.ready());
        prop_assert_eq!(delivered, raw);
    }

    #[test]
    fn color_orders_are_undone(
        inter in named_interlace(),
        width in 1usize..64,
        seed in any::<u8>(),
    ) {
        let rgb: Vec<u8> = (0..3 * width).map(|i| (i as u8).wrapping_mul(31) ^ seed).collect();
        let mut raw = vec![0; rgb.len()];
        encode_color(inter, &rgb, width, &mut raw);
        let mut back = vec![0; rgb.len()];
        decode_color(inter, &raw, width, &mut back);
        prop_assert_eq!(back, rgb);
    }

    #[test]
    fn raster_offset_planes_realign(
        width in 1usize..24,
        height in 1usize..24,
        green in 0usize..6,
        blue in 0usize..6,
        chunks in prop::collection::vec(1usize..200, 1..12),
    ) {
        let offsets = [0, green, blue];
        let max = green.max(blue);
        let page: Vec<u8> = (0..3 * width * height).map(|i| (i * 7 % 251) as u8).collect();
        // raw line n carries plane c of page line n - offsets[c]
        let mut raw = Vec::new();
        for n in 0..height + max {
            for (c, &off) in offsets.iter().enumerate() {
                for x in 0..width {
                    let v = n
                        .checked_sub(off)
                        .filter(|&y| y < height)
                        .map_or(0xee, |y| page[3 * (y * width + x) + c]);
                    raw.push(v);
                }
            }
        }

        let mut side = ScanSide::new(page.len(), 3 * width, 0xee);
        let mut asm = LineAssembler::new(
            LineTransform::identity(width, 3 * width),
            Some(ColorRaster::new(offsets, width)),
            0,
            raw.len(),
        );
        for piece in pieces(&raw, &chunks) {
            asm.push(piece, &mut side);
            prop_assert!(side.received() <= side.expected());
        }
        asm.finish(&mut side);
        prop_assert_eq!(side.contents(), &page[..]);
    }

    #[test]
    fn duplex_split_ignores_chunking(
        inter in split_interlace(),
        bpl in 1usize..32,
        height in 1usize..16,
        lag in 0usize..8,
        chunks in prop::collection::vec(1usize..100, 1..12),
    ) {
        let front: Vec<u8> = (0..bpl * height).map(|i| i as u8).collect();
        let back: Vec<u8> = front.iter().map(|b| b ^ 0xff).collect();
        let stream = interleave(inter, bpl, lag, &front, &back);
        let mut split = DuplexSplitter::new(inter, bpl, lag, height).expect("shared stream");
        let (mut f, mut b) = (Vec::new(), Vec::new());
        for piece in pieces(&stream, &chunks) {
            split.split(piece, &mut f, &mut b);
        }
        prop_assert_eq!(split.pending(), 0);
        prop_assert_eq!(f, front);
        prop_assert_eq!(b, back);
    }

    #[test]
    fn jpeg_demux_ignores_chunking(
        width in 8usize..512,
        height in 8usize..512,
        chunks in prop::collection::vec(1usize..40, 1..12),
    ) {
        prop_assume!(clean_size(width) && clean_size(height));
        let stream = interleaved_jpeg(2 * width, height);
        let mut whole = [Vec::new(), Vec::new()];
        JpegDuplexSplitter::new(width, height, 300, 300).push(&stream, &mut whole);

        let mut split = JpegDuplexSplitter::new(width, height, 300, 300);
        let mut parts = [Vec::new(), Vec::new()];
        for piece in pieces(&stream, &chunks) {
            prop_assert!(!split.push(piece, &mut parts));
        }
        prop_assert_eq!(split.anomalies(), 0);
        prop_assert_eq!(&parts, &whole);
        prop_assert_eq!(parts[0].iter().filter(|&&b| b == 0x22).count(), 0);
        prop_assert_eq!(parts[1].iter().filter(|&&b| b == 0x22).count(), 32);
        for side in &parts {
            prop_assert_eq!(&side[..2], &[0xff, 0xd8]);
            prop_assert_eq!(&side[side.len() - 2..], &[0xff, 0xd9]);
            let restarts: Vec<u8> = side
                .windows(2)
                .filter(|w| w[0] == 0xff && (0xd0..=0xd7).contains(&w[1]))
                .map(|w| w[1])
                .collect();
            prop_assert_eq!(restarts, vec![0xd0]);
        }
    }

    #[test]
    fn single_width_jpeg_goes_to_front(
        width in 8usize..512,
        height in 8usize..512,
        chunks in prop::collection::vec(1usize..40, 1..12),
    ) {
        prop_assume!(clean_size(width) && clean_size(height));
        let stream = interleaved_jpeg(width, height);
        let mut split = JpegDuplexSplitter::new(width, height, 300, 300);
        let mut parts = [Vec::new(), Vec::new()];
        let abandoned: usize = pieces(&stream, &chunks)
            .into_iter()
            .map(|piece| usize::from(split.push(piece, &mut parts)))
            .sum();
        prop_assert_eq!(abandoned, 1);
        prop_assert!(split.is_abandoned());
        prop_assert_eq!(parts[0].iter().filter(|&&b| b == 0x22).count(), 32);
        prop_assert_eq!(&parts[0][parts[0].len() - 2..], &[0xff, 0xd9]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn session_output_ignores_buffer_sizes(
        buffer_size in 4096usize..20_000,
        reads in prop::collection::vec(1usize..5000, 1..8),
        duplex in any::<bool>(),
    ) {
        let profile = QuirkTable::builtin().lookup("DR-2580C");
        let sim = SimulatedScanner::new(profile.clone());
        sim.load([Sheet::Pattern]);
        let mut session = ScanSession::new(
            ScsiTransport::new(sim, TransportTimeouts::default()),
            profile,
        )
        .with_sleeper(Box::new(RecordingSleeper::default()));
        let source = if duplex { Source::AdfDuplex } else { Source::AdfFront };
        session
            .configure(ScanConfig {
                mode: ScanMode::Gray,
                source,
                dpi_x: 150,
                dpi_y: 150,
                geometry: Geometry::page(UNITS_PER_INCH, UNITS_PER_INCH / 2),
                buffer_size,
                ..ScanConfig::default()
            })
            .expect("configure");

        let expected = Sheet::Pattern.render(ScanMode::Gray, 150, 75);
        let sides = if duplex { 2 } else { 1 };
        for _ in 0..sides {
            session.start().expect("start");
            let mut page = Vec::new();
            for &len in reads.iter().cycle() {
                let mut buf = vec![0u8; len];
                match session.read(&mut buf).expect("read") {
                    Delivery::Bytes(n) => {
                        prop_assert!(n <= len);
                        page.extend_from_slice(&buf[..n]);
                    }
                    Delivery::EndOfData => break,
                }
            }
            prop_assert_eq!(&page, &expected);
        }
    }
}
