// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan geometry in the shared base unit (1/1200 inch) and conversions to
// pixels, lines, and millimetres.

use serde::{Deserialize, Serialize};

/// Base units per inch. All geometry is carried in this unit.
pub const UNITS_PER_INCH: u32 = 1200;

/// Convert a base-unit distance to pixels at `dpi`.
pub fn units_to_pixels(units: u32, dpi: u32) -> usize {
    (u64::from(units) * u64::from(dpi) / u64::from(UNITS_PER_INCH)) as usize
}

/// Convert a pixel count at `dpi` back to base units.
pub fn pixels_to_units(pixels: usize, dpi: u32) -> u32 {
    if dpi == 0 {
        return 0;
    }
    (pixels as u64 * u64::from(UNITS_PER_INCH) / u64::from(dpi)) as u32
}

/// Convert millimetres to base units.
pub fn mm_to_units(mm: f64) -> u32 {
    (mm / 25.4 * f64::from(UNITS_PER_INCH)).round().max(0.0) as u32
}

/// Scan area and paper size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub tl_x: u32,
    pub tl_y: u32,
    pub br_x: u32,
    pub br_y: u32,
    /// Paper width, used to centre the window in sheet feeders.
    pub page_x: u32,
    pub page_y: u32,
}

impl Geometry {
    /// Full US letter page.
    pub fn letter() -> Self {
        Self::page(8 * UNITS_PER_INCH + UNITS_PER_INCH / 2, 11 * UNITS_PER_INCH)
    }

    /// Full A4 page.
    pub fn a4() -> Self {
        Self::page(mm_to_units(210.0), mm_to_units(297.0))
    }

    /// Scan area covering a whole page of the given size.
    pub fn page(width: u32, height: u32) -> Self {
        Self {
            tl_x: 0,
            tl_y: 0,
            br_x: width,
            br_y: height,
            page_x: width,
            page_y: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.br_x.saturating_sub(self.tl_x)
    }

    pub fn height(&self) -> u32 {
        self.br_y.saturating_sub(self.tl_y)
    }

    /// Whether the rectangle is non-empty and sits inside the paper.
    pub fn is_valid(&self) -> bool {
        self.br_x > self.tl_x
            && self.br_y > self.tl_y
            && self.br_x <= self.page_x
            && self.br_y <= self.page_y
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::letter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_is_ten_thousand_two_hundred_wide() {
        let g = Geometry::letter();
        assert_eq!(g.width(), 10_200);
        assert_eq!(units_to_pixels(g.width(), 300), 2550);
    }

    #[test]
    fn pixel_conversion_round_trips_on_whole_inches() {
        assert_eq!(pixels_to_units(600, 600), 1200);
        assert_eq!(units_to_pixels(1200, 150), 150);
    }

    #[test]
    fn a4_is_valid() {
        let g = Geometry::a4();
        assert!(g.is_valid());
        assert_eq!(g.width(), 9921);
    }

    #[test]
    fn crop_outside_paper_is_invalid() {
        let mut g = Geometry::letter();
        g.br_x = g.page_x + 1;
        assert!(!g.is_valid());
    }
}
