// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated scanner behind the SCSI passthrough seam.
//
// The simulator keeps a hopper of sheets and answers the command set the
// sessions use. Image data is produced the way a device of the given profile
// would send it: each side is rendered, then scrambled through the inverse
// of every reorder the session undoes (plane orders, three-head, mirroring,
// binary inversion, raster offsets, duplex interleave, JPEG with an unknown
// frame height). End of a side is signalled with a short read carrying an
// ILI residual. Calibration target scans and the fine calibration buffers
// are answered from configurable sensor levels.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::geometry::{UNITS_PER_INCH, units_to_pixels};
use scanwerk_core::quirks::DeviceProfile;
use scanwerk_core::types::{ColorInterlace, DuplexInterlace, GrayInterlace, ScanMode, Side};
use scanwerk_protocol::command::{
    self, BufferMode, PanelState, PixelSize, WindowDescriptor, calibration, datatype, opcode,
};
use scanwerk_protocol::status::SenseData;
use scanwerk_protocol::transport::{ScsiPassthrough, ScsiReply};
use tracing::{debug, trace};

use crate::reconstruct::duplex::interleave;
use crate::reconstruct::jpeg::marker;
use crate::reconstruct::planes::{encode_color, encode_three_head};

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

/// Content of one sheet in the hopper. Both sides carry the same content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sheet {
    /// White paper.
    Blank,
    /// A deterministic test pattern.
    Pattern,
}

impl Sheet {
    /// The sheet as seen by the sensor, in delivered layout: gray bytes,
    /// RGB triples, or packed bits with 1 for black.
    pub fn render(self, mode: ScanMode, width: usize, height: usize) -> Vec<u8> {
        let bpl = line_bytes(mode, width);
        let mut out = vec![white(mode); bpl * height];
        if self == Self::Blank {
            return out;
        }
        for y in 0..height {
            let line = &mut out[y * bpl..(y + 1) * bpl];
            for x in 0..width {
                match mode {
                    ScanMode::Gray => line[x] = ((x * 7 + y * 3) % 251) as u8,
                    ScanMode::Color => {
                        line[3 * x] = (x * 5 + y) as u8;
                        line[3 * x + 1] = (x + 3 * y) as u8;
                        line[3 * x + 2] = (x ^ y) as u8;
                    }
                    ScanMode::Lineart | ScanMode::Halftone => {
                        if (x / 8 + y / 8) % 3 == 0 {
                            line[x / 8] |= 0x80 >> (x % 8);
                        }
                    }
                }
            }
        }
        out
    }
}

/// What passes the sensor during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Sheet(Sheet),
    /// Calibration target: every stored line cycles through these levels.
    Target(Vec<u8>),
}

impl Content {
    fn render(&self, mode: ScanMode, width: usize, height: usize) -> Vec<u8> {
        match self {
            Self::Sheet(sheet) => sheet.render(mode, width, height),
            Self::Target(levels) => {
                let bpl = line_bytes(mode, width);
                (0..bpl * height).map(|i| level(levels, i % bpl)).collect()
            }
        }
    }

    /// Line used where the device has no content, such as offset padding.
    fn fill_line(&self, mode: ScanMode, width: usize) -> Vec<u8> {
        match self {
            Self::Sheet(_) => vec![white(mode); line_bytes(mode, width)],
            Self::Target(_) => self.render(mode, width, 1),
        }
    }
}

fn level(levels: &[u8], i: usize) -> u8 {
    match levels.len() {
        0 => 0,
        n => levels[i % n],
    }
}

fn white(mode: ScanMode) -> u8 {
    if mode.is_binary() { 0x00 } else { 0xff }
}

fn line_bytes(mode: ScanMode, width: usize) -> usize {
    (width * mode.bits_per_pixel()).div_ceil(8)
}

// Pixels covered by `units` at `dpi`, rounded up so that a pixel count sent
// as base units comes back unchanged.
fn units_to_pixels_up(units: u32, dpi: u32) -> usize {
    (u64::from(units) * u64::from(dpi)).div_ceil(u64::from(UNITS_PER_INCH)) as usize
}

// ---------------------------------------------------------------------------
// Scan shape
// ---------------------------------------------------------------------------

/// What the device scans, worked out from the window like firmware would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shape {
    mode: ScanMode,
    dpi_x: u32,
    dpi_y: u32,
    width: usize,
    lines: usize,
    bpl: usize,
    jpeg: Option<u8>,
    duplex: bool,
    sides: [bool; 2],
}

impl Shape {
    fn from_window(desc: &WindowDescriptor, profile: &DeviceProfile, ids: &[u8]) -> Result<Self> {
        let mode = ScanMode::from_composition_code(desc.composition).ok_or_else(|| {
            ScanwerkError::InvalidRequest(format!("composition {:#04x}", desc.composition))
        })?;
        let (dpi_x, dpi_y) = (u32::from(desc.x_res), u32::from(desc.y_res));
        let jpeg = (desc.compress_type == 0x80).then_some(desc.compress_arg);
        let mut width = if profile.fixed_width {
            units_to_pixels(desc.width, dpi_x)
        } else {
            units_to_pixels_up(desc.width, dpi_x)
        };
        if mode.is_binary() || jpeg.is_some() {
            width -= width % 8;
        }
        width -= width % profile.ppl_mod.max(1);
        let bpp = mode.bits_per_pixel();
        if profile.even_bpl && width % 2 == 1 {
            width += 1;
        }
        let sides = [
            ids.contains(&Side::Front.window_id()),
            ids.contains(&Side::Back.window_id()),
        ];
        Ok(Self {
            mode,
            dpi_x,
            dpi_y,
            width,
            lines: units_to_pixels_up(desc.length, dpi_y),
            bpl: width * bpp / 8,
            jpeg,
            duplex: sides == [true, true],
            sides,
        })
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SimState {
    profile: DeviceProfile,
    hopper: VecDeque<Sheet>,
    window: Option<WindowDescriptor>,
    buffer_mode: BufferMode,
    /// Window ids from the last SCAN.
    scan_ids: Vec<u8>,
    scanning: bool,
    loaded: Option<Sheet>,
    /// Streams of the loaded sheet still to be read, with read cursor.
    segments: VecDeque<(Vec<u8>, usize)>,
    counter: u32,
    busy_reads: usize,
    read_fault: Option<SenseData>,
    feed_fault: Option<SenseData>,
    /// Lines per side the device stops after.
    short_lines: Option<usize>,
    /// Sensor levels on the calibration target, lamp off and lamp on.
    dark: Vec<u8>,
    white: Vec<u8>,
    /// Levels of the calibration target being scanned.
    target: Option<Vec<u8>>,
    /// Send JPEG duplex frames single width, the back side missing.
    single_width_jpeg: bool,
    opcodes: Vec<u8>,
}

/// A scanner that lives in memory. Clones share the same device.
#[derive(Debug, Clone)]
pub struct SimulatedScanner {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedScanner {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                profile,
                hopper: VecDeque::new(),
                window: None,
                buffer_mode: BufferMode::default(),
                scan_ids: Vec::new(),
                scanning: false,
                loaded: None,
                segments: VecDeque::new(),
                counter: 0,
                busy_reads: 0,
                read_fault: None,
                feed_fault: None,
                short_lines: None,
                dark: vec![0],
                white: vec![240],
                target: None,
                single_width_jpeg: false,
                opcodes: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Put sheets in the hopper.
    pub fn load(&self, sheets: impl IntoIterator<Item = Sheet>) {
        self.state().hopper.extend(sheets);
    }

    pub fn hopper_len(&self) -> usize {
        self.state().hopper.len()
    }

    /// Answer the next `reads` image reads with busy.
    pub fn inject_busy(&self, reads: usize) {
        self.state().busy_reads = reads;
    }

    /// Fail the next image read with `sense`.
    pub fn fail_next_read(&self, sense: SenseData) {
        self.state().read_fault = Some(sense);
    }

    /// Fail the next feed with `sense`.
    pub fn fail_next_feed(&self, sense: SenseData) {
        self.state().feed_fault = Some(sense);
    }

    /// Stop every side after `lines` lines, as a device losing the paper.
    pub fn truncate_sides(&self, lines: usize) {
        self.state().short_lines = Some(lines);
    }

    /// Levels the sensor reads on the calibration target, cycled per stored
    /// byte for target scans and per pixel for the device's own buffers.
    pub fn set_shading(&self, dark: Vec<u8>, white: Vec<u8>) {
        let mut st = self.state();
        st.dark = dark;
        st.white = white;
    }

    /// Send duplex JPEG pages as one single-width frame, as some firmware
    /// does for short sheets.
    pub fn send_single_width_jpeg(&self) {
        self.state().single_width_jpeg = true;
    }

    pub fn panel_counter(&self) -> u32 {
        self.state().counter
    }

    /// Opcodes of every command received.
    pub fn opcodes(&self) -> Vec<u8> {
        self.state().opcodes.clone()
    }
}

fn sense(s: SenseData) -> ScsiReply {
    ScsiReply {
        transferred: 0,
        sense: Some(s.encode().to_vec()),
    }
}

fn reply(data: &[u8], input: &mut [u8]) -> ScsiReply {
    let n = data.len().min(input.len());
    input[..n].copy_from_slice(&data[..n]);
    ScsiReply {
        transferred: n,
        sense: None,
    }
}

const NO_MEDIA: (u8, u8, u8) = (0x3, 0x3a, 0x00);
const SEQUENCE_ERROR: (u8, u8, u8) = (0x5, 0x2c, 0x00);
const INVALID_OPCODE: (u8, u8, u8) = (0x5, 0x20, 0x00);

fn code((k, asc, ascq): (u8, u8, u8)) -> ScsiReply {
    sense(SenseData::with_code(k, asc, ascq))
}

impl ScsiPassthrough for SimulatedScanner {
    fn command(
        &mut self,
        cdb: &[u8],
        out: &[u8],
        input: &mut [u8],
        _timeout_ms: u64,
    ) -> Result<ScsiReply> {
        let mut st = self.state();
        st.opcodes.push(cdb[0]);
        trace!(opcode = cdb[0], "simulated command");
        Ok(match cdb[0] {
            opcode::TEST_UNIT_READY => ScsiReply::default(),
            opcode::INQUIRY => st.inquiry(cdb, input),
            opcode::SET_WINDOW => {
                let desc = command::decode_set_window(out)?;
                if desc.window_id == Side::Front.window_id() || st.window.is_none() {
                    st.window = Some(desc);
                }
                st.counter = 0;
                ScsiReply::default()
            }
            opcode::SET_SCAN_MODE => {
                if out.len() > 0x0a {
                    st.buffer_mode = command::decode_buffer_mode(out);
                }
                ScsiReply::default()
            }
            opcode::SET_SCAN_MODE2 => {
                st.buffer_mode.buffered = out.get(3) == Some(&0);
                ScsiReply::default()
            }
            opcode::OBJECT_POSITION => {
                if command::decode_object_position(cdb) {
                    st.feed()?
                } else {
                    st.discharge();
                    ScsiReply::default()
                }
            }
            opcode::SCAN => st.scan(command::decode_scan(cdb, out))?,
            opcode::READ => {
                let (dt, len) = command::decode_read(cdb);
                st.read(dt, len, input)?
            }
            opcode::CANCEL => {
                debug!("simulated cancel");
                st.segments.clear();
                st.scanning = false;
                st.target = None;
                ScsiReply::default()
            }
            _ => code(INVALID_OPCODE),
        })
    }
}

impl SimState {
    fn inquiry(&self, cdb: &[u8], input: &mut [u8]) -> ScsiReply {
        if cdb[1] & 1 == 1 {
            return reply(&[0u8; command::INQUIRY_VPD_LEN], input);
        }
        let mut b = vec![0u8; command::INQUIRY_STD_LEN];
        b[0] = command::DEVICE_TYPE_SCANNER;
        b[3] = 0x02;
        let product = self.profile.model_patterns.first().map_or("SIM", String::as_str);
        write_ascii(&mut b[0x08..0x10], "CANON");
        write_ascii(&mut b[0x10..0x20], product);
        write_ascii(&mut b[0x20..0x24], "1.00");
        reply(&b, input)
    }

    fn feed(&mut self) -> Result<ScsiReply> {
        if let Some(fault) = self.feed_fault.take() {
            return Ok(sense(fault));
        }
        if self.loaded.is_some() {
            return Ok(ScsiReply::default());
        }
        if !self.load_next()? {
            return Ok(code(NO_MEDIA));
        }
        Ok(ScsiReply::default())
    }

    fn discharge(&mut self) {
        if self.loaded.take().is_some() {
            debug!("sheet discharged");
        }
        self.segments.clear();
        self.scanning = false;
        self.target = None;
    }

    fn scan(&mut self, ids: Vec<u8>) -> Result<ScsiReply> {
        if self.window.is_none() {
            return Ok(code(SEQUENCE_ERROR));
        }
        if let Some(&kind) = ids.first() {
            if kind == calibration::DARK || kind == calibration::WHITE {
                return self.scan_target(kind);
            }
        }
        self.scan_ids = ids;
        self.scanning = true;
        if self.loaded.is_none() {
            // card slots take the sheet on SCAN
            if !self.load_next()? {
                return Ok(code(NO_MEDIA));
            }
        } else if self.segments.is_empty() {
            self.build_segments()?;
        }
        Ok(ScsiReply::default())
    }

    // Both sides of the calibration target, no sheet involved.
    fn scan_target(&mut self, kind: u8) -> Result<ScsiReply> {
        let levels = if kind == calibration::DARK {
            self.dark.clone()
        } else {
            self.white.clone()
        };
        debug!(kind, "calibration target scan");
        self.scan_ids = vec![Side::Front.window_id(), Side::Back.window_id()];
        self.scanning = true;
        self.target = Some(levels);
        self.build_segments()?;
        Ok(ScsiReply::default())
    }

    // Take the next sheet from the hopper; false when empty.
    fn load_next(&mut self) -> Result<bool> {
        let Some(sheet) = self.hopper.pop_front() else {
            return Ok(false);
        };
        self.loaded = Some(sheet);
        self.counter += 1;
        debug!(?sheet, counter = self.counter, "sheet loaded");
        if self.scanning {
            self.build_segments()?;
        }
        Ok(true)
    }

    fn read(&mut self, dt: u8, len: usize, input: &mut [u8]) -> Result<ScsiReply> {
        match dt {
            datatype::IMAGE => self.read_image(len, input),
            datatype::PANEL => {
                let panel = PanelState {
                    counter: self.counter,
                    ..PanelState::default()
                };
                Ok(reply(&panel.encode(), input))
            }
            datatype::SENSORS => Ok(reply(&[u8::from(!self.hopper.is_empty())], input)),
            datatype::FINE_OFFSET | datatype::FINE_GAIN => {
                let levels = if dt == datatype::FINE_OFFSET {
                    &self.dark
                } else {
                    &self.white
                };
                // one byte per pixel, front and back alternating
                let data: Vec<u8> = (0..len).map(|i| level(levels, i / 2)).collect();
                Ok(reply(&data, input))
            }
            datatype::PIXEL_SIZE => {
                let Some(shape) = self.shape()? else {
                    return Ok(code(SEQUENCE_ERROR));
                };
                let size = PixelSize {
                    width: shape.width as u32,
                    height: shape.lines as u32,
                    valid: true,
                    ..PixelSize::default()
                };
                Ok(reply(&size.encode(), input))
            }
            _ => Ok(code(INVALID_OPCODE)),
        }
    }

    fn read_image(&mut self, len: usize, input: &mut [u8]) -> Result<ScsiReply> {
        if let Some(fault) = self.read_fault.take() {
            return Ok(sense(fault));
        }
        if self.busy_reads > 0 {
            self.busy_reads -= 1;
            return Ok(code((0x2, 0x00, 0x00)));
        }
        if !self.scanning || self.segments.is_empty() {
            return Ok(code(SEQUENCE_ERROR));
        }
        let Some((data, cursor)) = self.segments.front_mut() else {
            return Ok(code(SEQUENCE_ERROR));
        };
        let n = (data.len() - *cursor).min(len);
        input[..n].copy_from_slice(&data[*cursor..*cursor + n]);
        *cursor += n;
        if n == len {
            return Ok(ScsiReply {
                transferred: n,
                sense: None,
            });
        }

        let residual = (len - n) as u32;
        self.segments.pop_front();
        trace!(sent = n, residual, "end of stream");
        if self.segments.is_empty() {
            if self.target.take().is_some() {
                self.scanning = false;
            } else {
                self.sheet_done()?;
            }
        }
        Ok(ScsiReply {
            transferred: n,
            sense: Some(SenseData::short_read(residual).encode().to_vec()),
        })
    }

    fn sheet_done(&mut self) -> Result<()> {
        self.loaded = None;
        debug!(counter = self.counter, "sheet ejected");
        if self.buffer_mode.buffered {
            // the device scans ahead while the host catches up
            self.load_next()?;
        } else {
            self.scanning = false;
        }
        Ok(())
    }

    fn shape(&self) -> Result<Option<Shape>> {
        match &self.window {
            Some(desc) => Shape::from_window(desc, &self.profile, &self.scan_ids).map(Some),
            None => Ok(None),
        }
    }

    // -- Data generation -----------------------------------------------------

    fn build_segments(&mut self) -> Result<()> {
        let content = match (&self.target, self.loaded) {
            (Some(levels), _) => Content::Target(levels.clone()),
            (None, Some(sheet)) => Content::Sheet(sheet),
            (None, None) => return Ok(()),
        };
        let Some(shape) = self.shape()? else {
            return Ok(());
        };
        let p = &self.profile;
        let sides: Vec<Side> = Side::BOTH
            .into_iter()
            .filter(|s| shape.sides[s.index()])
            .collect();
        self.segments.clear();

        if let Some(quality) = shape.jpeg {
            if shape.duplex && p.jpeg_duplex_interlaced {
                let width = if self.single_width_jpeg {
                    shape.width
                } else {
                    2 * shape.width
                };
                self.segments.push_back((interleaved_jpeg(width, shape.lines), 0));
            } else {
                let clean = content.render(shape.mode, shape.width, shape.lines);
                for _ in &sides {
                    self.segments.push_back((encode_jpeg(&clean, &shape, quality)?, 0));
                }
            }
        } else {
            let wire: Vec<Vec<u8>> = sides
                .iter()
                .map(|&side| self.side_wire(&content, &shape, side))
                .collect();
            match (shape.duplex, p.duplex_interlace) {
                (true, DuplexInterlace::None) | (false, _) => {
                    for w in wire {
                        self.segments.push_back((w, 0));
                    }
                }
                (true, DuplexInterlace::RasterOffset) => {
                    let lag = units_to_pixels(p.duplex_raster_offset * 4, shape.dpi_y);
                    let stream = interleave(DuplexInterlace::RasterOffset, shape.bpl, lag, &wire[0], &wire[1]);
                    self.segments.push_back((stream, 0));
                }
                (true, inter) => {
                    let stream = interleave(inter, shape.bpl, 0, &wire[0], &wire[1]);
                    self.segments.push_back((stream, 0));
                }
            }
        }
        debug!(
            segments = self.segments.len(),
            bytes = self.segments.iter().map(|(d, _)| d.len()).sum::<usize>(),
            "sheet data ready"
        );
        Ok(())
    }

    /// Raw bytes one side produces, in wire order.
    fn side_wire(&self, content: &Content, shape: &Shape, side: Side) -> Vec<u8> {
        let p = &self.profile;
        let (w, bpl, lines) = (shape.width, shape.bpl, shape.lines);
        let color_inter = p.color_interlace_for(side, shape.dpi_x);
        let raster_color = shape.mode == ScanMode::Color && color_inter == ColorInterlace::RasterOffset;

        let offsets = if raster_color {
            let base = p.color_raster_offset as usize;
            let dpi = shape.dpi_y as usize;
            [0, base * dpi / 150, base * dpi / 300]
        } else {
            [0; 3]
        };
        let max_off = offsets.iter().copied().max().unwrap_or(0);
        let pad = if shape.duplex
            && p.duplex_offset > 0
            && p.duplex_interlace != DuplexInterlace::RasterOffset
            && side == p.duplex_offset_side
        {
            units_to_pixels(p.duplex_offset, shape.dpi_y)
        } else {
            0
        };

        let content_lines = lines.saturating_sub(max_off + pad);
        let blank_line = content.fill_line(shape.mode, w);
        let mut clean = blank_line.repeat(lines);
        clean[pad * bpl..(pad + content_lines) * bpl]
            .copy_from_slice(&content.render(shape.mode, w, content_lines));
        let row = |y: usize| &clean[y * bpl..(y + 1) * bpl];

        let keep = self.short_lines.unwrap_or(lines).min(lines);
        let mut out = Vec::with_capacity(keep * bpl);
        let mut raw = vec![0u8; bpl];
        for y in 0..keep {
            if raster_color {
                for (c, &off) in offsets.iter().enumerate() {
                    let src = match y.checked_sub(off) {
                        Some(t) => row(t),
                        None => &blank_line[..],
                    };
                    for x in 0..w {
                        raw[c * w + x] = src[3 * x + c];
                    }
                }
            } else {
                encode_line(shape.mode, p, side, color_inter, row(y), w, &mut raw);
            }
            if shape.mode.is_binary() && p.reverse_binary {
                for b in raw.iter_mut() {
                    *b ^= 0xff;
                }
            }
            out.extend_from_slice(&raw);
        }
        out
    }
}

fn encode_line(
    mode: ScanMode,
    p: &DeviceProfile,
    side: Side,
    color_inter: ColorInterlace,
    line: &[u8],
    width: usize,
    raw: &mut [u8],
) {
    match mode {
        ScanMode::Color => match color_inter {
            ColorInterlace::ThreeHead => encode_three_head(line, 3, raw),
            other => encode_color(other, line, width, raw),
        },
        ScanMode::Gray => match p.gray_interlace[side.index()] {
            GrayInterlace::None => raw.copy_from_slice(&line[..raw.len()]),
            GrayInterlace::Mirrored => {
                for (r, l) in raw.iter_mut().zip(line.iter().rev()) {
                    *r = *l;
                }
            }
            GrayInterlace::ThreeHead => encode_three_head(line, 1, raw),
        },
        ScanMode::Lineart | ScanMode::Halftone => raw.copy_from_slice(&line[..raw.len()]),
    }
}

fn write_ascii(field: &mut [u8], text: &str) {
    field.fill(b' ');
    for (f, b) in field.iter_mut().zip(text.bytes()) {
        *f = b;
    }
}

/// Baseline JPEG whose frame header carries height 0, as these devices
/// send it before the page length is known.
fn encode_jpeg(clean: &[u8], shape: &Shape, quality: u8) -> Result<Vec<u8>> {
    let color = match shape.mode {
        ScanMode::Color => ExtendedColorType::Rgb8,
        _ => ExtendedColorType::L8,
    };
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, quality.clamp(1, 100))
        .encode(clean, shape.width as u32, shape.lines as u32, color)
        .map_err(|e| ScanwerkError::Image(e.to_string()))?;
    if let Some(at) = data.windows(2).position(|w| w == [0xff, marker::SOF0]) {
        if let Some(h) = data.get_mut(at + 5..at + 7) {
            h.fill(0);
        }
    }
    Ok(data)
}

/// Double-width JPEG whose restart intervals alternate front and back.
/// The entropy data is a placeholder: 0x11 bytes for the front, 0x22 for
/// the back.
pub fn interleaved_jpeg(width: usize, height: usize) -> Vec<u8> {
    let mut s = vec![0xff, marker::SOI];
    s.extend_from_slice(&crate::reconstruct::jpeg::jfif_app0(300, 300));
    for table in 0..2u8 {
        s.extend_from_slice(&[0xff, 0xdb, 0x00, 0x43, table]);
        s.extend(std::iter::repeat_n(1u8, 64));
    }
    let [wh, wl] = (width.min(usize::from(u16::MAX)) as u16).to_be_bytes();
    let [hh, hl] = (height.min(usize::from(u16::MAX)) as u16).to_be_bytes();
    s.extend_from_slice(&[0xff, marker::SOF0, 0x00, 0x0b, 8, hh, hl, wh, wl, 1, 1, 0x11, 0]);
    s.extend_from_slice(&[0xff, marker::SOS, 0x00, 0x08, 1, 1, 0x00, 0, 63, 0]);
    for n in 0..4u8 {
        let fill = if n % 2 == 0 { 0x11 } else { 0x22 };
        s.extend(std::iter::repeat_n(fill, 16));
        s.extend_from_slice(&[0xff, marker::RST0 + n]);
    }
    s.extend_from_slice(&[0xff, marker::EOI]);
    s
}
