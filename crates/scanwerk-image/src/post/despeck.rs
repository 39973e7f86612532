// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Speckle removal.
//
// A `diameter` x `diameter` window is slid over the page. When nothing in the
// one-pixel ring around it is as dark as a threshold derived from the
// window's darkest pixel, the window is an isolated spot and is painted with
// the ring's average (gray and color) or cleared to white (binary).

use crate::raster::{PixelLayout, Raster};

/// Remove isolated spots up to `diameter` pixels across.
pub fn despeck(raster: &mut Raster, diameter: usize) {
    let d = diameter;
    if d == 0 || raster.height < d + 2 || raster.width < d + 2 {
        return;
    }
    for y in 1..raster.height - 1 - d {
        for x in 1..raster.width - 1 - d {
            match raster.layout {
                PixelLayout::Binary => despeck_binary(raster, x, y, d),
                PixelLayout::Gray | PixelLayout::Rgb => despeck_sampled(raster, x, y, d),
            }
        }
    }
}

// Ring cells around the window at (x, y).
fn ring(x: usize, y: usize, d: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..d + 2).flat_map(move |k| {
        (0..d + 2).filter_map(move |l| {
            let edge = k == 0 || k == d + 1 || l == 0 || l == d + 1;
            edge.then(|| (x + l - 1, y + k - 1))
        })
    })
}

fn despeck_sampled(r: &mut Raster, x: usize, y: usize, d: usize) {
    let depth = r.layout.channels();
    let full = 255 * depth as i32;

    let mut darkest = full;
    for k in 0..d {
        for l in 0..d {
            darkest = darkest.min(r.sample_sum(x + l, y + k));
        }
    }
    let thresh = (darkest + 2 * full) / 3;

    let mut outer = [0i32; 3];
    for (px, py) in ring(x, y, d) {
        if r.sample_sum(px, py) < thresh {
            return;
        }
        let base = py * r.bpl + px * depth;
        for (n, acc) in outer.iter_mut().enumerate().take(depth) {
            *acc += i32::from(r.data[base + n]);
        }
    }

    let cells = 4 * d as i32 + 4;
    for k in 0..d {
        for l in 0..d {
            let base = (y + k) * r.bpl + (x + l) * depth;
            for (n, acc) in outer.iter().enumerate().take(depth) {
                r.data[base + n] = (acc / cells) as u8;
            }
        }
    }
}

fn despeck_binary(r: &mut Raster, x: usize, y: usize, d: usize) {
    let any_black = (0..d).any(|k| (0..d).any(|l| r.bit(x + l, y + k)));
    if !any_black {
        return;
    }
    if ring(x, y, d).any(|(px, py)| r.bit(px, py)) {
        return;
    }
    for k in 0..d {
        for l in 0..d {
            r.set_bit(x + l, y + k, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_gray_dot_is_removed() {
        let mut r = Raster::filled(PixelLayout::Gray, 16, 16, 0xf0);
        r.row_mut(8)[8] = 0x00;
        despeck(&mut r, 1);
        assert_eq!(r.row(8)[8], 0xf0);
    }

    #[test]
    fn dots_larger_than_window_survive() {
        let mut r = Raster::filled(PixelLayout::Gray, 16, 16, 0xf0);
        for y in 6..10 {
            r.row_mut(y)[6..10].fill(0);
        }
        despeck(&mut r, 2);
        assert_eq!(r.row(7)[7], 0);
    }

    #[test]
    fn color_dot_takes_ring_average() {
        let mut r = Raster::filled(PixelLayout::Rgb, 10, 10, 0xc8);
        r.row_mut(5)[15..18].copy_from_slice(&[0, 0, 0]);
        despeck(&mut r, 1);
        assert_eq!(&r.row(5)[15..18], &[0xc8, 0xc8, 0xc8]);
    }

    #[test]
    fn binary_speck_cleared() {
        let mut r = Raster::filled(PixelLayout::Binary, 24, 24, 0xff);
        r.set_bit(10, 10, true);
        r.set_bit(11, 10, true);
        r.set_bit(10, 11, true);
        r.set_bit(11, 11, true);
        despeck(&mut r, 2);
        assert!(r.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_diameter_is_noop() {
        let mut r = Raster::filled(PixelLayout::Gray, 8, 8, 0x10);
        r.row_mut(3)[3] = 0xff;
        let before = r.clone();
        despeck(&mut r, 0);
        assert_eq!(r, before);
    }
}
