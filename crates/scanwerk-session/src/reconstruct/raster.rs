// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster-offset color reconstruction.
//
// The sensor rows for green and blue sit a few lines behind red, so raw
// line n carries red for output line n but green and blue for output lines
// n - k. Each plane is written straight into the side buffer ahead of the
// producer cursor; a line is released once its last plane has arrived.

use crate::reconstruct::planes::LineTransform;
use crate::side::ScanSide;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRaster {
    /// Lag of the red, green and blue planes in lines.
    offsets: [usize; 3],
    max_offset: usize,
    /// Pixels per line.
    width: usize,
}

impl ColorRaster {
    pub fn new(offsets: [usize; 3], width: usize) -> Self {
        Self {
            offsets,
            max_offset: offsets.iter().copied().max().unwrap_or(0),
            width,
        }
    }

    /// Scatter raw plane-ordered line `n` into the lines it feeds, then
    /// release every line whose planes are all present.
    pub fn push_line(&self, n: usize, raw: &[u8], side: &mut ScanSide, transform: &LineTransform) {
        let lines = side.lines();
        let w = self.width;
        for (c, &off) in self.offsets.iter().enumerate() {
            let Some(target) = n.checked_sub(off) else { continue };
            if target >= lines {
                continue;
            }
            if let Some(line) = side.line_mut(target) {
                for x in 0..w {
                    line[3 * x + c] = raw[c * w + x];
                }
            }
        }
        let complete = (n + 1).saturating_sub(self.max_offset).min(lines);
        release(side, complete, transform);
    }

    /// At end of data, release every line that received at least its red
    /// plane. Planes that never arrived keep the background fill.
    pub fn finish(&self, raw_lines: usize, side: &mut ScanSide, transform: &LineTransform) {
        let upto = raw_lines.min(side.lines());
        release(side, upto, transform);
    }
}

fn release(side: &mut ScanSide, upto: usize, transform: &LineTransform) {
    for line in side.lines_received()..upto {
        if let Some(buf) = side.line_mut(line) {
            transform.finish(buf);
        }
    }
    side.release_lines(upto);
}
