// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper edge detection against the scanner background.
//
// For every column (or row) the first significant brightness change seen
// from one side of the page is recorded. Gray and color compare two sliding
// nine-pixel windows; binary looks for the first flipped bit. Isolated hits
// without neighbours inside half an inch are discarded as noise.
//
// A simplified Hough transform then bins pairs of top-edge transitions by
// slope and offset, zooming in over several passes to find the page's upper
// edge line.

use crate::raster::{PixelLayout, Raster};

const WINDOW: i32 = 9;

/// Which edge of the image to scan from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Per-column (top/bottom) or per-row (left/right) position of the first
/// transition. Columns without one hold the sentinel just past the far
/// edge: `height` for top, `-1` for bottom, and likewise for rows.
pub fn transitions(raster: &Raster, from: Edge, dpi: u32) -> Vec<i32> {
    let vertical = matches!(from, Edge::Top | Edge::Bottom);
    let (count, len) = if vertical {
        (raster.width, raster.height as i32)
    } else {
        (raster.height, raster.width as i32)
    };
    let (first, last, dir) = match from {
        Edge::Top | Edge::Left => (0, len, 1),
        Edge::Bottom | Edge::Right => (len - 1, -1, -1),
    };

    // Sample at position `p` along the scan of lane `lane`.
    let sample = |lane: usize, p: i32| -> i32 {
        let (x, y) = if vertical {
            (lane, p as usize)
        } else {
            (p as usize, lane)
        };
        raster.sample_sum(x, y)
    };

    let mut out = vec![last; count];
    if len <= 0 {
        return out;
    }
    let depth = raster.layout.channels() as i32;

    for (lane, slot) in out.iter_mut().enumerate() {
        if raster.layout == PixelLayout::Binary {
            let start = sample(lane, first);
            let mut p = first + dir;
            while p != last {
                if sample(lane, p) != start {
                    *slot = p;
                    break;
                }
                p += dir;
            }
            continue;
        }

        let mut near = sample(lane, first) * WINDOW;
        let mut far = near;
        let mut p = first + dir;
        while p != last {
            let mut far_p = p - WINDOW * 2 * dir;
            let mut near_p = p - WINDOW * dir;
            if !(0..len).contains(&far_p) {
                far_p = first;
            }
            if !(0..len).contains(&near_p) {
                near_p = first;
            }
            far -= sample(lane, far_p);
            far += sample(lane, near_p);
            near -= sample(lane, near_p);
            near += sample(lane, p);

            if (near - far).abs() > 50 * WINDOW * depth - near * 40 / 255 {
                *slot = p;
                break;
            }
            p += dir;
        }
    }

    // Noise filter: keep hits with at least two of the next seven lanes
    // within half an inch.
    let half_inch = (dpi / 2) as i32;
    for i in 0..count.saturating_sub(7) {
        let neighbours = (1..=7)
            .filter(|j| (out[i + j] - out[i]).abs() < half_inch)
            .count();
        if neighbours < 2 {
            out[i] = last;
        }
    }
    out
}

/// Best line found through a transition list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLine {
    pub slope: f64,
    pub x_intercept: i32,
    pub y_intercept: i32,
}

/// Zoom in on the dominant top edge of the page.
///
/// Returns a flat line when the first pass finds nothing dense enough to
/// trust.
pub fn top_edge(width: usize, resolution: u32, top: &[i32]) -> EdgeLine {
    const SLOPES: usize = 31;
    const OFFSETS: usize = 31;
    let mut min_slope = -1.0f64;
    let mut max_slope = 1.0f64;
    let mut min_offset = -(resolution as i32);
    let mut max_offset = resolution as i32;

    let mut best = Bin::default();

    for pass in 1..=7 {
        let s_step = (max_slope - min_slope) / SLOPES as f64;
        let o_step = (max_offset - min_offset) / OFFSETS as i32;
        best = Bin::default();

        // Four slightly shifted grids so an edge split across bins still wins.
        for i in 0..2 {
            let s_shift = s_step * f64::from(i) / 2.0;
            for j in 0..2 {
                let o_shift = o_step * j / 2;
                let found = densest_line(
                    width,
                    top,
                    SLOPES,
                    min_slope + s_shift,
                    max_slope + s_shift,
                    OFFSETS,
                    min_offset + o_shift,
                    max_offset + o_shift,
                );
                if found.density > best.density {
                    best = found;
                }
            }
        }

        if pass == 1 && best.density < (width / 5) as i32 {
            best = Bin::default();
            break;
        }

        let mut zoom = false;
        if s_step >= 0.0001 {
            min_slope = best.slope - s_step;
            max_slope = best.slope + s_step;
            zoom = true;
        }
        if o_step != 0 {
            min_offset = best.offset - o_step;
            max_offset = best.offset + o_step;
            zoom = true;
        }
        if !zoom {
            break;
        }
    }

    if best.slope == 0.0 {
        return EdgeLine {
            slope: 0.0,
            x_intercept: 0,
            y_intercept: 0,
        };
    }
    // Offsets are measured at the centre column; convert to intercepts.
    let y_intercept = (f64::from(best.offset) - best.slope * width as f64 / 2.0) as i32;
    let x_intercept = (f64::from(y_intercept) / -best.slope) as i32;
    EdgeLine {
        slope: best.slope,
        x_intercept,
        y_intercept,
    }
}

/// Left edge of the paper: slide a line of `slope` (perpendicular to the top
/// edge) across the top and bottom transitions and keep the smallest X
/// intercept.
pub fn left_edge(width: usize, height: usize, top: &[i32], bot: &[i32], slope: f64) -> (i32, i32) {
    let scan = |list: &[i32], valid: &dyn Fn(i32) -> bool| -> (i32, i32) {
        let mut x_inter = width as i32;
        let mut y_inter = 0;
        let mut run = 0;
        for (i, &v) in list.iter().enumerate().take(width) {
            if valid(v) {
                let yi = (f64::from(v) - slope * i as f64) as i32;
                let xi = (f64::from(yi) / -slope) as i32;
                if x_inter > xi {
                    x_inter = xi;
                    y_inter = yi;
                }
                run += 1;
                if run > 5 {
                    break;
                }
            } else {
                x_inter = width as i32;
                y_inter = 0;
                run = 0;
            }
        }
        (x_inter, y_inter)
    };

    let h = height as i32;
    let from_top = scan(top, &|v| v < h);
    let from_bot = scan(bot, &|v| v > -1);
    if from_bot.0 < from_top.0 {
        from_bot
    } else {
        from_top
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    slope: f64,
    offset: i32,
    density: i32,
}

// One Hough pass over pairs of transitions at most a third of the width apart.
#[allow(clippy::too_many_arguments)]
fn densest_line(
    width: usize,
    buff: &[i32],
    slopes: usize,
    min_slope: f64,
    max_slope: f64,
    offsets: usize,
    min_offset: i32,
    max_offset: i32,
) -> Bin {
    let abs_slope = max_slope.abs().max(min_slope.abs());
    let abs_offset = max_offset.abs().max(min_offset.abs()).max(1);
    let half = (width / 2) as f64;
    let s_range = max_slope - min_slope;
    let o_range = f64::from(max_offset - min_offset);

    let slope_center: Vec<f64> = (0..slopes)
        .map(|j| {
            let a = j as f64 * s_range / slopes as f64 + min_slope;
            let b = (j + 1) as f64 * s_range / slopes as f64 + min_slope;
            (a + b) / 2.0
        })
        .collect();
    let slope_scale: Vec<i32> = slope_center
        .iter()
        .map(|c| (101.0 - c.abs() * 100.0 / abs_slope) as i32)
        .collect();
    let offset_center: Vec<f64> = (0..offsets)
        .map(|j| {
            let a = j as f64 / offsets as f64 * o_range + f64::from(min_offset);
            let b = (j + 1) as f64 / offsets as f64 * o_range + f64::from(min_offset);
            (a + b) / 2.0
        })
        .collect();
    let offset_scale: Vec<i32> = offset_center
        .iter()
        .map(|c| (101.0 - c.abs() * 100.0 / f64::from(abs_offset)) as i32)
        .collect();

    let mut bins = vec![vec![0i32; offsets]; slopes];
    let reach = width / 3;
    for i in 0..width.min(buff.len()) {
        for j in (i + 1)..width.min(buff.len()).min(i + reach) {
            let slope = f64::from(buff[j] - buff[i]) / (j - i) as f64;
            if slope >= max_slope || slope < min_slope {
                continue;
            }
            let offset = (slope * half + f64::from(buff[i]) - slope * i as f64) as i32;
            if offset >= max_offset || offset < min_offset {
                continue;
            }
            let s_idx = ((slope - min_slope) * slopes as f64 / s_range) as usize;
            if s_idx >= slopes {
                continue;
            }
            let o_idx = (f64::from(offset - min_offset) * offsets as f64 / o_range) as usize;
            if o_idx >= offsets {
                continue;
            }
            bins[s_idx][o_idx] += 1;
        }
    }

    let max_density = bins.iter().flatten().copied().max().unwrap_or(0).max(1);

    let mut best = Bin::default();
    for (i, row) in bins.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let weighted = (count as f32 / max_density as f32
                * slope_scale[i] as f32
                * offset_scale[j] as f32) as i32;
            if weighted > best.density {
                best = Bin {
                    slope: slope_center[i],
                    offset: offset_center[j] as i32,
                    density: weighted,
                };
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(width: usize, height: usize, rect: (usize, usize, usize, usize)) -> Raster {
        let mut r = Raster::filled(PixelLayout::Gray, width, height, 0x10);
        let (x0, y0, x1, y1) = rect;
        for y in y0..y1 {
            r.row_mut(y)[x0..x1].fill(0xf0);
        }
        r
    }

    #[test]
    fn top_transitions_find_the_sheet() {
        let r = page(60, 60, (10, 20, 50, 50));
        let top = transitions(&r, Edge::Top, 75);
        assert!(top[30] >= 20 && top[30] <= 21, "got {}", top[30]);
        assert_eq!(top[2], 60);
        let bot = transitions(&r, Edge::Bottom, 75);
        assert!(bot[30] >= 48 && bot[30] <= 49, "got {}", bot[30]);
    }

    #[test]
    fn side_transitions_find_the_sheet() {
        let r = page(60, 60, (10, 20, 50, 50));
        let left = transitions(&r, Edge::Left, 75);
        assert!(left[30] >= 10 && left[30] <= 11);
        let right = transitions(&r, Edge::Right, 75);
        assert!(right[30] >= 48 && right[30] <= 49);
        assert_eq!(right[5], -1);
    }

    #[test]
    fn binary_uses_first_flip() {
        let mut r = Raster::filled(PixelLayout::Binary, 16, 16, 0xff);
        for y in 5..16 {
            for x in 0..16 {
                r.set_bit(x, y, true);
            }
        }
        let top = transitions(&r, Edge::Top, 10);
        assert!(top.iter().all(|&t| t == 5));
    }

    #[test]
    fn flat_edge_has_zero_slope() {
        let top: Vec<i32> = vec![40; 300];
        let line = top_edge(300, 100, &top);
        assert!(line.slope.abs() < 0.001, "slope {}", line.slope);
    }
}
