// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconstruction engine: raw device bytes in, ordered side buffers out.
//
// Shared streams are first split per side (`duplex`, `jpeg`); each side's
// raw bytes then go through a `LineAssembler`, which cuts them into lines,
// drops padding lines and applies the line transform (`planes`) or the
// raster-offset color scatter (`raster`).

pub mod duplex;
pub mod jpeg;
pub mod planes;
pub mod raster;

pub use duplex::{DuplexSplitter, LineRouter};
pub use jpeg::{JpegDuplexSplitter, SofPatcher};
pub use planes::LineTransform;
pub use raster::ColorRaster;

use tracing::trace;

use crate::side::ScanSide;

/// Turns one side's raw stream into stored lines.
#[derive(Debug, Clone)]
pub struct LineAssembler {
    transform: LineTransform,
    raster: Option<ColorRaster>,
    /// Raw lines dropped at the top.
    skip: usize,
    /// Raw bytes the device sends for this side.
    expected: usize,
    /// Raw bytes consumed so far, including carry.
    received: usize,
    /// Whole raw lines seen.
    lines_in: usize,
    carry: Vec<u8>,
    scratch: Vec<u8>,
}

impl LineAssembler {
    pub fn new(transform: LineTransform, raster: Option<ColorRaster>, skip: usize, expected: usize) -> Self {
        let bpl = transform.bpl();
        Self {
            transform,
            raster,
            skip,
            expected,
            received: 0,
            lines_in: 0,
            carry: Vec::new(),
            scratch: vec![0; bpl],
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.received
    }

    /// Raw bytes still due from the device.
    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }

    /// Whole raw lines consumed so far.
    pub fn raw_lines(&self) -> usize {
        self.lines_in
    }

    /// Feed raw bytes, clamped to what the side still expects.
    pub fn push(&mut self, bytes: &[u8], side: &mut ScanSide) {
        let bytes = &bytes[..bytes.len().min(self.remaining())];
        let bpl = self.transform.bpl();
        if bpl == 0 || bytes.is_empty() {
            return;
        }
        self.received += bytes.len();
        let mut rest = bytes;
        if !self.carry.is_empty() {
            let take = (bpl - self.carry.len()).min(rest.len());
            self.carry.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.carry.len() == bpl {
                let line = std::mem::take(&mut self.carry);
                self.line(&line, side);
            }
        }
        let mut chunks = rest.chunks_exact(bpl);
        for line in &mut chunks {
            self.line(line, side);
        }
        self.carry.extend_from_slice(chunks.remainder());
        trace!(bytes = bytes.len(), carry = self.carry.len(), "raw bytes assembled");
    }

    fn line(&mut self, raw: &[u8], side: &mut ScanSide) {
        let n = self.lines_in;
        self.lines_in += 1;
        if let Some(raster) = &self.raster {
            raster.push_line(n, raw, side, &self.transform);
            return;
        }
        if n < self.skip || n - self.skip >= side.lines() {
            return;
        }
        self.transform.apply(raw, &mut self.scratch);
        side.append(&self.scratch);
    }

    /// End of data: settle the side so it is complete.
    pub fn finish(&mut self, side: &mut ScanSide) {
        self.carry.clear();
        if let Some(raster) = &self.raster {
            raster.finish(self.raw_lines(), side, &self.transform);
        }
        side.fill_to_end();
        self.received = self.expected;
    }
}
