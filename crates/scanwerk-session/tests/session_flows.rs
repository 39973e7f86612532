// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end scans against the simulated scanner: every device family's
// wire layout must come back as the page the simulator rendered.

use scanwerk_core::config::{ScanConfig, TransportTimeouts};
use scanwerk_core::error::ScanwerkError;
use scanwerk_core::geometry::{Geometry, UNITS_PER_INCH};
use scanwerk_core::quirks::QuirkTable;
use scanwerk_core::types::{Compression, FrameFormat, ScanMode, Side, Source};
use scanwerk_protocol::command::opcode;
use scanwerk_protocol::retry::RecordingSleeper;
use scanwerk_protocol::status::SenseData;
use scanwerk_protocol::transport::ScsiTransport;
use scanwerk_session::{Delivery, ScanSession, Sheet, SimulatedScanner};

type SimSession = ScanSession<ScsiTransport<SimulatedScanner>>;

fn open(model: &str, sheets: &[Sheet]) -> (SimSession, SimulatedScanner) {
    let profile = QuirkTable::builtin().lookup(model);
    let sim = SimulatedScanner::new(profile.clone());
    sim.load(sheets.iter().copied());
    let session = ScanSession::new(
        ScsiTransport::new(sim.clone(), TransportTimeouts::default()),
        profile,
    )
    .with_sleeper(Box::new(RecordingSleeper::default()));
    (session, sim)
}

/// One square inch at `dpi`.
fn inch(mode: ScanMode, source: Source, dpi: u32) -> ScanConfig {
    ScanConfig {
        mode,
        source,
        dpi_x: dpi,
        dpi_y: dpi,
        geometry: Geometry::page(UNITS_PER_INCH, UNITS_PER_INCH),
        ..ScanConfig::default()
    }
}

/// Columns `left..left + width` of a rendered page.
fn columns(page: &[u8], page_width: usize, left: usize, width: usize, bytes_pp: usize) -> Vec<u8> {
    page.chunks(page_width * bytes_pp)
        .flat_map(|row| row[left * bytes_pp..(left + width) * bytes_pp].iter().copied())
        .collect()
}

fn scan_side(session: &mut SimSession) -> Vec<u8> {
    session.start().expect("start");
    session.read_frame().expect("frame")
}

// ---------------------------------------------------------------------------
// Simplex
// ---------------------------------------------------------------------------

#[test]
fn simplex_gray_matches_rendered_page() {
    let (mut s, _sim) = open("DR-9080C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    let frame = s.parameters().expect("params");
    assert_eq!((frame.width, frame.height, frame.bytes_per_line), (150, 150, 150));
    assert_eq!(frame.format, FrameFormat::Gray);

    s.start().expect("start");
    let mut buf = vec![0u8; 777];
    let mut page = Vec::new();
    loop {
        match s.read(&mut buf).expect("read") {
            Delivery::Bytes(n) => page.extend_from_slice(&buf[..n]),
            Delivery::EndOfData => break,
        }
    }
    assert_eq!(page, Sheet::Pattern.render(ScanMode::Gray, 150, 150));
    assert_eq!(s.sheets_done(), 1);
    assert!(matches!(s.read(&mut buf), Err(ScanwerkError::NotStarted)));
    assert!(matches!(s.start(), Err(ScanwerkError::NoDocuments)));
}

#[test]
fn lineart_comes_back_uninverted() {
    let (mut s, _sim) = open("DR-9080C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Lineart, Source::AdfFront, 150)).expect("configure");
    let frame = s.parameters().expect("params");
    assert_eq!(frame.width, 144);
    assert_eq!(frame.depth, 1);
    let page = scan_side(&mut s);
    assert_eq!(page, Sheet::Pattern.render(ScanMode::Lineart, 144, 150));
}

#[test]
fn fixed_width_device_delivers_the_centred_window() {
    let (mut s, _sim) = open("DR-M160", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Color, Source::AdfFront, 200)).expect("configure");
    let page = scan_side(&mut s);
    // 10200 units wide at 200 dpi, the inch centred at (10200 - 1200) / 2
    let full = Sheet::Pattern.render(ScanMode::Color, 1700, 200);
    assert_eq!(page, columns(&full, 1700, 750, 200, 3));
}

#[test]
fn card_source_feeds_on_scan() {
    let (mut s, sim) = open("P-215", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::CardFront, 150)).expect("configure");
    let frame = s.parameters().expect("params");
    let page = scan_side(&mut s);
    assert_eq!(page, Sheet::Pattern.render(ScanMode::Gray, frame.width, frame.height));
    let feeds = sim.opcodes().iter().filter(|&&op| op == opcode::OBJECT_POSITION).count();
    // only the discharge at batch start
    assert_eq!(feeds, 1);
}

#[test]
fn jpeg_frame_decodes_to_reported_size() {
    let (mut s, _sim) = open("DR-9080C", &[Sheet::Pattern]);
    let cfg = ScanConfig {
        compression: Compression::Jpeg,
        compress_arg: 90,
        ..inch(ScanMode::Color, Source::AdfFront, 150)
    };
    s.configure(cfg).expect("configure");
    let frame = s.parameters().expect("params");
    assert_eq!(frame.format, FrameFormat::Jpeg);
    let data = scan_side(&mut s);
    let img = image::load_from_memory(&data).expect("decode");
    assert_eq!(img.width() as usize, frame.width);
    assert_eq!(img.height() as usize, frame.height);
}

#[test]
fn short_page_repeats_last_line() {
    let (mut s, sim) = open("DR-9080C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    sim.truncate_sides(10);
    let page = scan_side(&mut s);
    assert_eq!(page.len(), 150 * 150);
    let rendered = Sheet::Pattern.render(ScanMode::Gray, 150, 10);
    assert_eq!(&page[..rendered.len()], &rendered[..]);
    let last = &rendered[9 * 150..];
    assert!(page.chunks(150).skip(10).all(|line| line == last));
}

// ---------------------------------------------------------------------------
// Duplex
// ---------------------------------------------------------------------------

#[test]
fn byte_alternate_duplex_restores_both_sides() {
    let (mut s, _sim) = open("DR-2580C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfDuplex, 150)).expect("configure");
    let expected = Sheet::Pattern.render(ScanMode::Gray, 150, 150);

    let front = scan_side(&mut s);
    assert_eq!(s.side(), Side::Front);
    let back = scan_side(&mut s);
    assert_eq!(s.side(), Side::Back);
    assert!(s.parameters().expect("params").last_frame);
    assert_eq!(front, expected);
    assert_eq!(back, expected);
    assert_eq!(s.sheets_done(), 1);
}

#[test]
fn line_alternate_duplex_restores_both_sides() {
    let (mut s, _sim) = open("DR-M160", &[Sheet::Pattern, Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfDuplex, 150)).expect("configure");
    let full = Sheet::Pattern.render(ScanMode::Gray, 1275, 150);
    let expected = columns(&full, 1275, 562, 150, 1);
    for sheet in 0..2 {
        assert_eq!(scan_side(&mut s), expected, "front of sheet {sheet}");
        assert_eq!(scan_side(&mut s), expected, "back of sheet {sheet}");
    }
    assert_eq!(s.sheets_done(), 2);
    assert!(matches!(s.start(), Err(ScanwerkError::NoDocuments)));
}

#[test]
fn raster_offset_duplex_aligns_planes_and_sides() {
    let (mut s, _sim) = open("M3091DC", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Color, Source::AdfDuplex, 150)).expect("configure");
    let expected = Sheet::Pattern.render(ScanMode::Color, 150, 150);
    assert_eq!(scan_side(&mut s), expected);
    assert_eq!(scan_side(&mut s), expected);
}

#[test]
fn three_head_duplex_frames_have_reported_size() {
    let (mut s, _sim) = open("DR-2510C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfDuplex, 300)).expect("configure");
    for _ in Side::BOTH {
        let page = scan_side(&mut s);
        let frame = s.parameters().expect("params");
        assert_eq!(page.len(), frame.bytes_per_line * frame.height);
    }
}

#[test]
fn interleaved_jpeg_duplex_is_split_per_side() {
    let (mut s, _sim) = open("fi-5750C", &[Sheet::Pattern]);
    let cfg = ScanConfig {
        compression: Compression::Jpeg,
        ..inch(ScanMode::Gray, Source::AdfDuplex, 150)
    };
    s.configure(cfg).expect("configure");
    let front = scan_side(&mut s);
    let back = scan_side(&mut s);
    for side in [&front, &back] {
        assert_eq!(&side[..2], &[0xff, 0xd8]);
        assert_eq!(&side[side.len() - 2..], &[0xff, 0xd9]);
    }
    assert_eq!(front.iter().filter(|&&b| b == 0x22).count(), 0);
    assert_eq!(back.iter().filter(|&&b| b == 0x22).count(), 32);
}

#[test]
fn single_width_duplex_jpeg_leaves_back_empty() {
    let (mut s, sim) = open("fi-5750C", &[Sheet::Pattern]);
    sim.send_single_width_jpeg();
    let cfg = ScanConfig {
        compression: Compression::Jpeg,
        ..inch(ScanMode::Gray, Source::AdfDuplex, 150)
    };
    s.configure(cfg).expect("configure");
    let front = scan_side(&mut s);
    assert_eq!(&front[..2], &[0xff, 0xd8]);
    assert_eq!(front.iter().filter(|&&b| b == 0x22).count(), 32);

    s.start().expect("start back");
    assert_eq!(s.side(), Side::Back);
    let mut buf = vec![0u8; 4096];
    assert_eq!(s.read(&mut buf).expect("read"), Delivery::EndOfData);
    assert!(matches!(s.read(&mut buf), Err(ScanwerkError::NotStarted)));
    assert_eq!(s.sheets_done(), 1);
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

fn shaded(v: u8, offset: u8, gain: u32) -> u8 {
    (u32::from(v.saturating_sub(offset)) * 240 / gain).min(255) as u8
}

#[test]
fn target_scans_correct_every_column() {
    let (mut s, sim) = open("DR-2580C", &[Sheet::Pattern]);
    let (dark, white) = ([0u8, 10, 20], [240u8, 120, 200]);
    sim.set_shading(dark.to_vec(), white.to_vec());
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    let page = scan_side(&mut s);

    let expected: Vec<u8> = Sheet::Pattern
        .render(ScanMode::Gray, 150, 150)
        .chunks(150)
        .flat_map(|row| {
            row.iter()
                .enumerate()
                .map(|(x, &v)| shaded(v, dark[x % 3], u32::from(white[x % 3])))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(page, expected);
    // lamp off, lamp on, then the sheet
    let scans = sim.opcodes().iter().filter(|&&op| op == opcode::SCAN).count();
    assert_eq!(scans, 3);
}

#[test]
fn shading_tables_are_kept_across_batches() {
    let (mut s, sim) = open("DR-2580C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    let first = scan_side(&mut s);
    assert!(matches!(s.start(), Err(ScanwerkError::NoDocuments)));

    sim.load([Sheet::Pattern]);
    assert_eq!(scan_side(&mut s), first);
    let scans = sim.opcodes().iter().filter(|&&op| op == opcode::SCAN).count();
    assert_eq!(scans, 4);

    // a new resolution needs new tables
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 300)).expect("configure");
    sim.load([Sheet::Pattern]);
    scan_side(&mut s);
    let scans = sim.opcodes().iter().filter(|&&op| op == opcode::SCAN).count();
    assert_eq!(scans, 7);
}

#[test]
fn device_shading_buffers_are_applied() {
    let (mut s, sim) = open("DR-2080C", &[Sheet::Pattern]);
    sim.set_shading(vec![4], vec![160]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    let page = scan_side(&mut s);

    // 1275 pixels across, padded to an even line, the inch centred at 562
    let full = Sheet::Pattern.render(ScanMode::Gray, 1276, 150);
    let expected: Vec<u8> = columns(&full, 1276, 562, 150, 1)
        .into_iter()
        .map(|v| shaded(v, 4, 160 * 3 / 4))
        .collect();
    assert_eq!(page, expected);
    let scans = sim.opcodes().iter().filter(|&&op| op == opcode::SCAN).count();
    assert_eq!(scans, 1);
}

// ---------------------------------------------------------------------------
// Flow control
// ---------------------------------------------------------------------------

#[test]
fn buffered_batch_uses_panel_counter() {
    let (mut s, sim) = open("DR-M160", &[Sheet::Pattern, Sheet::Pattern]);
    let cfg = ScanConfig {
        buffered: true,
        ..inch(ScanMode::Gray, Source::AdfFront, 150)
    };
    s.configure(cfg).expect("configure");
    let first = scan_side(&mut s);
    let second = scan_side(&mut s);
    assert_eq!(first, second);
    assert!(matches!(s.start(), Err(ScanwerkError::NoDocuments)));
    assert_eq!(sim.panel_counter(), 2);
    let scans = sim.opcodes().iter().filter(|&&op| op == opcode::SCAN).count();
    assert_eq!(scans, 1);
}

#[test]
fn busy_reads_deliver_nothing_then_resume() {
    let (mut s, sim) = open("DR-9080C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    s.start().expect("start");
    sim.inject_busy(3);
    let mut buf = vec![0u8; 4096];
    for _ in 0..3 {
        assert_eq!(s.read(&mut buf).expect("read"), Delivery::Bytes(0));
    }
    let mut page = Vec::new();
    loop {
        match s.read(&mut buf).expect("read") {
            Delivery::Bytes(n) => page.extend_from_slice(&buf[..n]),
            Delivery::EndOfData => break,
        }
    }
    assert_eq!(page, Sheet::Pattern.render(ScanMode::Gray, 150, 150));
}

#[test]
fn empty_hopper_fails_start() {
    let (mut s, _sim) = open("DR-9080C", &[]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    assert!(matches!(s.start(), Err(ScanwerkError::NoDocuments)));
    assert!(!s.is_started());
}

#[test]
fn paper_jam_ends_the_batch() {
    let (mut s, sim) = open("DR-9080C", &[Sheet::Pattern, Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    s.start().expect("start");
    sim.fail_next_read(SenseData::with_code(3, 0x80, 0x00));
    let mut buf = vec![0u8; 4096];
    assert!(matches!(s.read(&mut buf), Err(ScanwerkError::PaperJam)));
    assert!(!s.is_started());
    assert!(matches!(s.read(&mut buf), Err(ScanwerkError::NotStarted)));
}

#[test]
fn cancel_stops_the_device_and_is_reported_once() {
    let (mut s, sim) = open("DR-9080C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    s.start().expect("start");
    let mut buf = vec![0u8; 1024];
    assert!(matches!(s.read(&mut buf), Ok(Delivery::Bytes(_))));
    s.cancel();
    assert!(matches!(s.read(&mut buf), Err(ScanwerkError::Cancelled)));
    assert!(matches!(s.read(&mut buf), Err(ScanwerkError::NotStarted)));
    assert!(sim.opcodes().contains(&opcode::CANCEL));
}

#[test]
fn cancel_from_another_thread() {
    let (mut s, _sim) = open("DR-9080C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    s.start().expect("start");
    let handle = s.cancel_handle();
    std::thread::spawn(move || handle.cancel()).join().expect("join");
    let mut buf = vec![0u8; 1024];
    assert!(matches!(s.read(&mut buf), Err(ScanwerkError::Cancelled)));
}

#[test]
fn settings_are_locked_during_a_batch() {
    let (mut s, _sim) = open("DR-9080C", &[Sheet::Pattern]);
    s.configure(inch(ScanMode::Gray, Source::AdfFront, 150)).expect("configure");
    s.start().expect("start");
    assert!(matches!(
        s.configure(ScanConfig::default()),
        Err(ScanwerkError::InvalidRequest(_))
    ));
    assert!(matches!(s.start(), Err(ScanwerkError::TransferPending)));
}

#[test]
fn blank_sides_are_skipped() {
    let (mut s, _sim) = open("DR-9080C", &[Sheet::Blank, Sheet::Pattern]);
    let cfg = ScanConfig {
        blank_skip_percent: 1.0,
        ..inch(ScanMode::Gray, Source::AdfFront, 150)
    };
    s.configure(cfg.clone()).expect("configure");
    let page = scan_side(&mut s);
    assert_eq!(s.skipped_pages(), 1);
    assert_eq!(page, Sheet::Pattern.render(ScanMode::Gray, 150, 150));

    let (mut s, _sim) = open("DR-9080C", &[Sheet::Blank]);
    s.configure(cfg).expect("configure");
    assert!(matches!(s.start(), Err(ScanwerkError::NoDocuments)));
    assert_eq!(s.skipped_pages(), 1);
}
