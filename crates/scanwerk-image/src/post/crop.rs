// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content bounding box and in-place crop.

use scanwerk_core::error::{Result, ScanwerkError};
use tracing::debug;

use super::edges::{Edge, transitions};
use crate::raster::{PixelLayout, Raster};

/// Half-open rectangle of sheet content, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// Locate the sheet inside the background.
///
/// Top and bottom come from rows where the left and right transitions
/// bracket something; left and right from columns where top and bottom do,
/// ignoring columns whose hits lie outside the rows already found (feeders
/// pad the image after the paper runs out). Four agreeing lanes in a row
/// are required before an edge is trusted.
pub fn find_edges(raster: &Raster, dpi_x: u32, dpi_y: u32) -> Option<Bounds> {
    if raster.is_empty() {
        return None;
    }
    let width = raster.width as i32;
    let height = raster.height as i32;

    let top_buf = transitions(raster, Edge::Top, dpi_y);
    let bot_buf = transitions(raster, Edge::Bottom, dpi_y);
    let left_buf = transitions(raster, Edge::Left, dpi_x);
    let right_buf = transitions(raster, Edge::Right, dpi_x);

    let rows_hit = |i: usize| right_buf[i] > left_buf[i];
    let top = first_run((0..height).map(|i| i as usize), rows_hit, height)?;
    let bot = first_run((0..height).rev().map(|i| i as usize), rows_hit, -1)?;
    if top > bot {
        debug!(top, bot, "no top/bottom edge");
        return None;
    }

    let cols_hit = |i: usize| {
        bot_buf[i] > top_buf[i] && (bot_buf[i] - 10 < bot || top_buf[i] + 10 > top)
    };
    let left = first_run((0..width).map(|i| i as usize), cols_hit, width)?;
    let right = first_run((0..width).rev().map(|i| i as usize), cols_hit, -1)?;
    if left > right {
        debug!(left, right, "no left/right edge");
        return None;
    }

    Some(Bounds {
        top: top as usize,
        bottom: bot as usize,
        left: left as usize,
        right: right as usize,
    })
}

// Walk lanes in order; return the extreme index of the first run of more
// than three consecutive hits.
fn first_run(
    lanes: impl Iterator<Item = usize>,
    hit: impl Fn(usize) -> bool,
    missing: i32,
) -> Option<i32> {
    let mut found = missing;
    let mut count = 0;
    let ascending = missing > 0;
    for i in lanes {
        if hit(i) {
            let i = i as i32;
            if (ascending && found > i) || (!ascending && found < i) {
                found = i;
            }
            count += 1;
            if count > 3 {
                break;
            }
        } else {
            count = 0;
            found = missing;
        }
    }
    (found != missing).then_some(found)
}

/// Crop `raster` to `bounds`. Binary rasters widen to whole bytes.
pub fn crop(raster: &mut Raster, bounds: Bounds) -> Result<()> {
    let Bounds {
        top,
        bottom,
        mut left,
        mut right,
    } = bounds;
    if top >= bottom || left >= right || bottom > raster.height || right > raster.width {
        return Err(ScanwerkError::Image(format!(
            "crop {bounds:?} outside {}x{}",
            raster.width, raster.height
        )));
    }

    let (pixels, bytes) = match raster.layout {
        PixelLayout::Rgb => {
            let pixels = right - left;
            left *= 3;
            right *= 3;
            (pixels, right - left)
        }
        PixelLayout::Gray => (right - left, right - left),
        PixelLayout::Binary => {
            left /= 8;
            right = right.div_ceil(8);
            (8 * (right - left), right - left)
        }
    };

    let bpl = raster.bpl;
    let mut pos = 0;
    for y in top..bottom {
        let start = y * bpl + left;
        raster.data.copy_within(start..start + bytes, pos);
        pos += bytes;
    }
    raster.data.truncate(pos);
    raster.width = pixels;
    raster.height = bottom - top;
    raster.bpl = bytes;
    Ok(())
}
