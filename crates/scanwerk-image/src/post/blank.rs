// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blank page detection by dark-pixel density.

use crate::raster::{PixelLayout, Raster};

/// Mean darkness of the page, 0.0 (white) to 1.0 (black).
///
/// Each line's darkness is averaged over its bytes (gray and color) or its
/// pixels (binary), then the lines are averaged.
pub fn density(raster: &Raster) -> f64 {
    if raster.is_empty() {
        return 0.0;
    }
    let row_len = raster.layout.bytes_per_line(raster.width);
    let total: f64 = (0..raster.height)
        .map(|y| match raster.layout {
            PixelLayout::Binary => {
                let dark = (0..raster.width).filter(|&x| raster.bit(x, y)).count();
                dark as f64 / raster.width as f64
            }
            PixelLayout::Gray | PixelLayout::Rgb => {
                let row = &raster.row(y)[..row_len];
                let dark: u64 = row.iter().map(|&v| u64::from(255 - v)).sum();
                dark as f64 / row_len as f64 / 255.0
            }
        })
        .sum();
    total / raster.height as f64
}

/// Whether the page's density is at or below `percent` (0..=100).
pub fn is_blank(raster: &Raster, percent: f64) -> bool {
    density(raster) <= percent / 100.0
}
