// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-side buffer with independent producer and consumer cursors.
//
// The buffer is sized to the whole side when a page starts and pre-filled
// with the device background, so raster-offset reconstruction can write
// planes ahead of the producer cursor. Bytes below `received` are final and
// never rewritten; bytes below `delivered` have been handed to the caller.

use tracing::debug;

/// Counters and storage for one side of the current page.
#[derive(Debug, Clone, Default)]
pub struct ScanSide {
    buffer: Vec<u8>,
    /// Bytes the side will hold once complete.
    expected: usize,
    /// Bytes reconstructed and ready for delivery.
    received: usize,
    /// Bytes handed to the caller.
    delivered: usize,
    /// Bytes per stored line.
    line_bytes: usize,
    eof: bool,
    /// The last transfer for this side was short.
    short_transfer: bool,
    /// End of data has been reported to the caller.
    finished: bool,
}

impl ScanSide {
    /// Side of `expected` bytes in lines of `line_bytes`, filled with `bg`.
    pub fn new(expected: usize, line_bytes: usize, bg: u8) -> Self {
        Self {
            buffer: vec![bg; expected],
            expected,
            line_bytes: line_bytes.max(1),
            ..Self::default()
        }
    }

    // -- Counters ------------------------------------------------------------

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn line_bytes(&self) -> usize {
        self.line_bytes
    }

    /// Whole lines the side holds once complete.
    pub fn lines(&self) -> usize {
        self.expected / self.line_bytes
    }

    /// Lines ready for delivery.
    pub fn lines_received(&self) -> usize {
        self.received / self.line_bytes
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn short_transfer(&self) -> bool {
        self.short_transfer
    }

    /// Bytes ready but not yet handed out.
    pub fn pending(&self) -> usize {
        self.received - self.delivered
    }

    /// Everything the side will ever hold has been delivered.
    pub fn is_drained(&self) -> bool {
        self.eof && self.delivered == self.expected
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    // -- Producer ------------------------------------------------------------

    /// Append bytes at the producer cursor, dropping what does not fit.
    ///
    /// Returns the number of bytes accepted.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.expected - self.received);
        if n < bytes.len() {
            debug!(
                dropped = bytes.len() - n,
                expected = self.expected,
                "side full, dropping excess bytes"
            );
        }
        self.buffer[self.received..self.received + n].copy_from_slice(&bytes[..n]);
        self.received += n;
        n
    }

    /// Mutable access to a line that has not been released yet.
    pub fn line_mut(&mut self, line: usize) -> Option<&mut [u8]> {
        let start = line * self.line_bytes;
        let end = start + self.line_bytes;
        if start < self.received || end > self.expected {
            return None;
        }
        Some(&mut self.buffer[start..end])
    }

    /// Release everything up to `lines` whole lines for delivery.
    pub fn release_lines(&mut self, lines: usize) {
        let upto = (lines * self.line_bytes).min(self.expected);
        if upto > self.received {
            self.received = upto;
        }
    }

    /// Mark end of data. `short` records that the device sent less than asked.
    pub fn set_eof(&mut self, short: bool) {
        self.eof = true;
        self.short_transfer = short;
    }

    /// Repeat the last complete line until the side is full.
    ///
    /// Bytes already received stay as they are: a trailing partial line is
    /// completed from the same columns of the last complete line. Without a
    /// complete line the side keeps its background fill.
    pub fn fill_to_end(&mut self) {
        let lb = self.line_bytes;
        if self.received < self.expected {
            debug!(
                missing = self.expected - self.received,
                "short page, repeating last line"
            );
        }
        let whole = self.received - self.received % lb;
        if whole >= lb {
            let last = whole - lb;
            let partial = self.received - whole;
            let mut at = whole;
            if partial != 0 {
                at = (whole + lb).min(self.expected);
                self.buffer
                    .copy_within(last + partial..last + (at - whole), self.received);
            }
            while at + lb <= self.expected {
                self.buffer.copy_within(last..last + lb, at);
                at += lb;
            }
        }
        self.received = self.expected;
    }

    /// Shrink the expected size to what actually arrived. Used for
    /// compressed streams whose length is only known at the end.
    pub fn shrink_to_received(&mut self) {
        self.expected = self.received;
        self.buffer.truncate(self.received);
    }

    /// Drop all content; the side becomes empty and complete.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.expected = 0;
        self.received = 0;
        self.delivered = 0;
    }

    /// Replace the content of a complete side, e.g. after post-processing.
    pub fn replace(&mut self, data: Vec<u8>, line_bytes: usize) {
        self.expected = data.len();
        self.received = data.len();
        self.delivered = 0;
        self.line_bytes = line_bytes.max(1);
        self.buffer = data;
    }

    // -- Consumer ------------------------------------------------------------

    /// Bytes ready for delivery.
    pub fn ready(&self) -> &[u8] {
        &self.buffer[self.delivered..self.received]
    }

    /// Mark `n` ready bytes as delivered.
    pub fn consume(&mut self, n: usize) {
        self.delivered += n.min(self.pending());
    }

    /// Whole received content, for post-processing.
    pub fn contents(&self) -> &[u8] {
        &self.buffer[..self.received]
    }
}
