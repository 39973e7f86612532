// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JPEG stream fix-ups.
//
// Simplex devices send a frame header whose size fields are not yet known,
// so the patcher writes the scan size into the SOF segment as the bytes go
// by. Duplex devices with interleaved JPEG send one double-width image whose
// restart intervals alternate between the sides; the splitter turns it into
// two standalone streams.

use scanwerk_core::types::Side;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

pub mod marker {
    pub const SOF0: u8 = 0xc0;
    pub const DHT: u8 = 0xc4;
    pub const JPG: u8 = 0xc8;
    pub const DAC: u8 = 0xcc;
    pub const RST0: u8 = 0xd0;
    pub const RST7: u8 = 0xd7;
    pub const SOI: u8 = 0xd8;
    pub const EOI: u8 = 0xd9;
    pub const SOS: u8 = 0xda;
    pub const APP0: u8 = 0xe0;
    pub const TEM: u8 = 0x01;
}

fn is_sof(code: u8) -> bool {
    (0xc0..=0xcf).contains(&code) && code != marker::DHT && code != marker::JPG && code != marker::DAC
}

/// JFIF APP0 segment carrying the resolution in dots per inch.
pub fn jfif_app0(dpi_x: u16, dpi_y: u16) -> [u8; 18] {
    let [xh, xl] = dpi_x.to_be_bytes();
    let [yh, yl] = dpi_y.to_be_bytes();
    [
        0xff,
        marker::APP0,
        0x00,
        0x10,
        b'J',
        b'F',
        b'I',
        b'F',
        0x00,
        0x01,
        0x01,
        0x01,
        xh,
        xl,
        yh,
        yl,
        0x00,
        0x00,
    ]
}

// ---------------------------------------------------------------------------
// Simplex
// ---------------------------------------------------------------------------

/// Rewrites the height and width of the first SOF0 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SofPatcher {
    width: u16,
    height: u16,
    in_sof: bool,
    /// Bytes since the last 0xff, until the SOF has been patched.
    since_ff: Option<usize>,
}

impl SofPatcher {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.min(usize::from(u16::MAX)) as u16,
            height: height.min(usize::from(u16::MAX)) as u16,
            in_sof: false,
            since_ff: None,
        }
    }

    /// Whether the frame header has gone by.
    pub fn is_done(&self) -> bool {
        self.in_sof && self.since_ff.is_some_and(|n| n >= 8)
    }

    pub fn patch(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            if self.is_done() {
                return;
            }
            if !self.in_sof && *b == 0xff {
                self.since_ff = Some(0);
                continue;
            }
            let Some(n) = self.since_ff.as_mut() else {
                continue;
            };
            *n += 1;
            match (*n, self.in_sof) {
                (1, false) if *b == marker::SOF0 => self.in_sof = true,
                (5, true) => *b = self.height.to_be_bytes()[0],
                (6, true) => *b = self.height.to_be_bytes()[1],
                (7, true) => *b = self.width.to_be_bytes()[0],
                (8, true) => {
                    *b = self.width.to_be_bytes()[1];
                    debug!(width = self.width, height = self.height, "frame size patched");
                }
                _ => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Duplex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between segments, expecting 0xff.
    Idle,
    /// After 0xff outside entropy data.
    Marker,
    /// Collecting the two length bytes of a segment.
    Length,
    /// Collecting the segment body.
    Body { remaining: usize },
    /// Entropy-coded data.
    Entropy,
    /// 0xff inside entropy-coded data.
    EntropyFf,
    /// Interleaving abandoned; everything goes to the front.
    Front,
}

/// Splits a double-width interleaved JPEG into one stream per side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegDuplexSplitter {
    state: State,
    /// Width and height of one side in pixels.
    side_width: u16,
    side_height: u16,
    dpi: (u16, u16),
    /// Marker segment being collected.
    segment: Vec<u8>,
    /// The segment after SOI has not been seen yet.
    after_soi: bool,
    owner: Side,
    /// Side has received at least one restart interval.
    started: [bool; 2],
    /// Restart marker owed to a side, written with its next entropy byte.
    pending: [bool; 2],
    /// Next restart number per side.
    restarts: [u8; 2],
    anomalies: usize,
}

impl JpegDuplexSplitter {
    pub fn new(side_width: usize, side_height: usize, dpi_x: u32, dpi_y: u32) -> Self {
        let clamp = |v: u32| v.min(u32::from(u16::MAX)) as u16;
        Self {
            state: State::Idle,
            side_width: side_width.min(usize::from(u16::MAX)) as u16,
            side_height: side_height.min(usize::from(u16::MAX)) as u16,
            dpi: (clamp(dpi_x), clamp(dpi_y)),
            segment: Vec::new(),
            after_soi: false,
            owner: Side::Front,
            started: [true, false],
            pending: [false; 2],
            restarts: [0; 2],
            anomalies: 0,
        }
    }

    /// The stream turned out not to be interleaved.
    pub fn is_abandoned(&self) -> bool {
        self.state == State::Front
    }

    /// Marker sequence problems seen so far.
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }

    /// Route `input` into `out[front]` and `out[back]`.
    ///
    /// Returns true when this call found the stream is not interleaved; the
    /// caller must then drop whatever the back side has received.
    pub fn push(&mut self, input: &[u8], out: &mut [Vec<u8>; 2]) -> bool {
        let was_abandoned = self.is_abandoned();
        for &b in input {
            self.step(b, out);
        }
        !was_abandoned && self.is_abandoned()
    }

    fn both(out: &mut [Vec<u8>; 2], bytes: &[u8]) {
        out[0].extend_from_slice(bytes);
        out[1].extend_from_slice(bytes);
    }

    fn anomaly(&mut self, what: &str, byte: u8) {
        self.anomalies += 1;
        warn!(what, byte, owner = ?self.owner, "unexpected byte in interleaved jpeg");
    }

    fn step(&mut self, b: u8, out: &mut [Vec<u8>; 2]) {
        match self.state {
            State::Front => out[0].push(b),
            State::Idle => {
                if b == 0xff {
                    self.state = State::Marker;
                } else {
                    self.anomaly("data outside segment", b);
                    out[self.owner.index()].push(b);
                }
            }
            State::Marker => self.marker(b, out),
            State::Length => {
                self.segment.push(b);
                if self.segment.len() == 4 {
                    let len = usize::from(u16::from_be_bytes([self.segment[2], self.segment[3]]));
                    if len < 2 {
                        self.anomaly("segment length", b);
                        Self::both(out, &self.segment);
                        self.segment.clear();
                        self.state = State::Idle;
                    } else if len == 2 {
                        self.segment_done(out);
                    } else {
                        self.state = State::Body { remaining: len - 2 };
                    }
                }
            }
            State::Body { remaining } => {
                self.segment.push(b);
                if remaining == 1 {
                    self.segment_done(out);
                } else {
                    self.state = State::Body { remaining: remaining - 1 };
                }
            }
            State::Entropy => {
                if b == 0xff {
                    self.state = State::EntropyFf;
                } else {
                    self.entropy(&[b], out);
                }
            }
            State::EntropyFf => match b {
                0x00 => {
                    self.entropy(&[0xff, 0x00], out);
                    self.state = State::Entropy;
                }
                0xff => out[self.owner.index()].push(0xff),
                marker::RST0..=marker::RST7 => {
                    self.restart();
                    self.state = State::Entropy;
                }
                marker::EOI => {
                    self.pending = [false; 2];
                    Self::both(out, &[0xff, marker::EOI]);
                    self.state = State::Idle;
                }
                other => {
                    self.pending = [false; 2];
                    self.marker(other, out);
                }
            },
        }
    }

    /// Entropy-coded bytes for the current owner, preceded by the restart
    /// marker it is owed. An interval that never gets data gets no marker.
    fn entropy(&mut self, bytes: &[u8], out: &mut [Vec<u8>; 2]) {
        let i = self.owner.index();
        if self.pending[i] {
            self.pending[i] = false;
            out[i].extend_from_slice(&[0xff, marker::RST0 + self.restarts[i] % 8]);
            self.restarts[i] = self.restarts[i].wrapping_add(1);
        }
        out[i].extend_from_slice(bytes);
    }

    fn restart(&mut self) {
        self.owner = self.owner.other();
        let i = self.owner.index();
        if self.started[i] {
            self.pending[i] = true;
        }
        self.started[i] = true;
    }

    fn marker(&mut self, code: u8, out: &mut [Vec<u8>; 2]) {
        match code {
            0xff => self.state = State::Marker,
            marker::SOI => {
                Self::both(out, &[0xff, marker::SOI]);
                self.after_soi = true;
                self.owner = Side::Front;
                self.started = [true, false];
                self.pending = [false; 2];
                self.restarts = [0; 2];
                self.state = State::Idle;
            }
            marker::EOI => {
                Self::both(out, &[0xff, marker::EOI]);
                self.state = State::Idle;
            }
            marker::TEM => {
                Self::both(out, &[0xff, code]);
                self.state = State::Idle;
            }
            marker::RST0..=marker::RST7 => {
                self.anomaly("restart outside scan", code);
                out[self.owner.index()].extend_from_slice(&[0xff, code]);
                self.state = State::Idle;
            }
            _ => {
                if self.after_soi {
                    self.after_soi = false;
                    if code != marker::APP0 {
                        debug!("adding JFIF header");
                        Self::both(out, &jfif_app0(self.dpi.0, self.dpi.1));
                    }
                }
                self.segment.clear();
                self.segment.extend_from_slice(&[0xff, code]);
                self.state = State::Length;
            }
        }
    }

    fn segment_done(&mut self, out: &mut [Vec<u8>; 2]) {
        let code = self.segment[1];
        let mut seg = std::mem::take(&mut self.segment);
        self.state = if code == marker::SOS {
            self.owner = Side::Front;
            State::Entropy
        } else {
            State::Idle
        };

        if is_sof(code) && seg.len() >= 9 {
            let width = u16::from_be_bytes([seg[7], seg[8]]);
            if width == self.side_width.saturating_mul(2) {
                seg[5..7].copy_from_slice(&self.side_height.to_be_bytes());
                seg[7..9].copy_from_slice(&self.side_width.to_be_bytes());
                debug!(width, side_width = self.side_width, "interleaved frame halved");
            } else if width == self.side_width {
                warn!(width, "frame is single width, not interleaved");
                seg[5..7].copy_from_slice(&self.side_height.to_be_bytes());
                out[0].extend_from_slice(&seg);
                self.state = State::Front;
                return;
            } else {
                self.anomaly("frame width", seg[8]);
            }
        }
        Self::both(out, &seg);
    }
}
