// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew detection and rotation.

use image::{GrayImage, Luma, Rgb};
use imageproc::geometric_transformations::{Interpolation, rotate};
use scanwerk_core::error::Result;
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

use super::edges::{Edge, left_edge, top_edge, transitions};
use crate::raster::{PixelLayout, Raster};

/// Detected rotation of the sheet against the background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Skew {
    /// Rise per column of the top edge.
    pub slope: f64,
    /// Pivot keeping the sheet's top-left corner in place.
    pub center_x: i32,
    pub center_y: i32,
}

impl Skew {
    /// Rotation angle in radians, clockwise positive in image coordinates.
    pub fn angle(&self) -> f64 {
        self.slope.atan()
    }
}

/// Find the page's skew, or `None` when the top edge is flat or missing.
pub fn find_skew(raster: &Raster, dpi_y: u32) -> Option<Skew> {
    if raster.is_empty() {
        return None;
    }
    let top = transitions(raster, Edge::Top, dpi_y);
    let bot = transitions(raster, Edge::Bottom, dpi_y);

    let t = top_edge(raster.width, dpi_y, &top);
    if t.slope.abs() < 0.0001 {
        debug!(slope = t.slope, "top edge flat, no skew");
        return None;
    }

    let l_slope = -1.0 / t.slope;
    let (_, l_y_inter) = left_edge(raster.width, raster.height, &top, &bot, l_slope);

    // Intersect the bisectors of the two edges' angles.
    let t_half = (t.slope.atan() / 2.0).tan();
    let t_offset = f64::from(l_y_inter);
    let quarter = if l_slope < 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 };
    let l_half = ((l_slope.atan() + quarter) / 2.0).tan();
    let l_offset = -l_half * f64::from(t.x_intercept);

    let center_x = ((l_offset - t_offset) / (t_half - l_half)) as i32;
    let center_y = (t_half * f64::from(center_x) + t_offset) as i32;

    Some(Skew {
        slope: t.slope,
        center_x,
        center_y,
    })
}

/// Rotate the page to undo `skew`, filling uncovered corners with `bg`.
pub fn deskew(raster: &Raster, skew: &Skew, bg: u8) -> Result<Raster> {
    let center = (skew.center_x as f32, skew.center_y as f32);
    let theta = -skew.angle() as f32;
    match raster.layout {
        PixelLayout::Rgb => {
            let img = raster.to_rgb_image()?;
            let out = rotate(&img, center, theta, Interpolation::Nearest, Rgb([bg; 3]));
            Raster::from_rgb_image(&out)
        }
        PixelLayout::Gray => {
            let out = rotate_gray(&raster.to_gray_image()?, center, theta, bg);
            Raster::from_gray_image(&out, PixelLayout::Gray, 0)
        }
        PixelLayout::Binary => {
            let out = rotate_gray(&raster.to_gray_image()?, center, theta, bg);
            Raster::from_gray_image(&out, PixelLayout::Binary, 0x80)
        }
    }
}

fn rotate_gray(img: &GrayImage, center: (f32, f32), theta: f32, bg: u8) -> GrayImage {
    rotate(img, center, theta, Interpolation::Nearest, Luma([bg]))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Light sheet on a dark background, top edge tilted by `slope`.
    fn tilted(width: usize, height: usize, slope: f64) -> Raster {
        let mut r = Raster::filled(PixelLayout::Gray, width, height, 0x10);
        for y in 0..height {
            for x in 0..width {
                let top = 40.0 + slope * x as f64;
                let left = 30.0 - (y as f64 - 40.0) * slope;
                let bottom = 260.0 + slope * x as f64;
                let right = 270.0 - (y as f64 - 40.0) * slope;
                let (xf, yf) = (x as f64, y as f64);
                if yf >= top && yf < bottom && xf >= left && xf < right {
                    r.row_mut(y)[x] = 0xf0;
                }
            }
        }
        r
    }

    #[test]
    fn straight_page_has_no_skew() {
        let r = tilted(300, 300, 0.0);
        assert!(find_skew(&r, 100).is_none());
    }

    #[test]
    fn tilted_page_reports_slope() {
        let r = tilted(300, 300, 0.05);
        let skew = find_skew(&r, 100).expect("skew");
        assert!((skew.slope - 0.05).abs() < 0.01, "slope {}", skew.slope);
    }

    #[test]
    fn deskew_straightens() {
        let r = tilted(300, 300, 0.05);
        let skew = find_skew(&r, 100).expect("skew");
        let fixed = deskew(&r, &skew, 0x10).expect("rotate");
        assert_eq!((fixed.width, fixed.height), (300, 300));
        let after = find_skew(&fixed, 100).map(|s| s.slope.abs()).unwrap_or(0.0);
        assert!(after < skew.slope.abs() / 2.0, "after {after}");
    }

    #[test]
    fn binary_pages_rotate() {
        let mut r = Raster::filled(PixelLayout::Binary, 64, 64, 0xff);
        r.set_bit(10, 10, true);
        let skew = Skew {
            slope: 0.0,
            center_x: 32,
            center_y: 32,
        };
        let out = deskew(&r, &skew, 0xff).expect("rotate");
        assert_eq!(out.layout, PixelLayout::Binary);
        assert_eq!((out.width, out.height), (64, 64));
        let black = out.data.iter().map(|b| b.count_ones()).sum::<u32>();
        assert_eq!(black, 1);
    }
}
