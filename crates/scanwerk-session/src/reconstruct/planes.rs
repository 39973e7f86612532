// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-line sample reordering.
//
// Devices deliver each line in their sensor's order. The transforms here put
// one line back into plain gray or interleaved RGB without looking at any
// other line. Every reorder has an exact inverse, used by the simulator to
// produce wire data.

use scanwerk_core::quirks::DeviceProfile;
use scanwerk_core::types::{ColorInterlace, GrayInterlace, ScanMode, Side};
use scanwerk_image::{Calibration, Lut};

use crate::params::ScanParams;

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Source position within a three-head plane for each output sample.
///
/// The first head covers every third sample counted from the end, the second
/// the first three quarters of the plane, the third the samples one before
/// the first head's. The orders overlap at some widths; the result is then
/// no permutation and the last write wins when inverting.
pub fn three_head_order(plane: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(plane);
    order.extend((0..plane).rev().step_by(3));
    let quarter3 = plane * 3 / 4;
    if quarter3 >= 3 {
        order.extend((0..=quarter3 - 3).rev().step_by(3));
    }
    if plane >= 2 {
        order.extend((0..=plane - 2).rev().step_by(3));
    }
    order.truncate(plane);
    order
}

/// Raw byte holding channel `c` of pixel `x` for a line of `width` pixels.
///
/// Raster-offset lines are plane ordered within the line. Three-head color
/// has its own order and is handled by [`LineTransform`].
pub fn color_source(inter: ColorInterlace, width: usize, x: usize, c: usize) -> usize {
    match inter {
        ColorInterlace::Rgb | ColorInterlace::ThreeHead => 3 * x + c,
        ColorInterlace::Bgr => 3 * x + 2 - c,
        ColorInterlace::Gbr => 3 * x + [2, 0, 1][c],
        ColorInterlace::Brg => 3 * x + [1, 2, 0][c],
        ColorInterlace::Rrggbb | ColorInterlace::RasterOffset => c * width + x,
        ColorInterlace::MirroredRrggbb => c * width + (width - 1 - x),
    }
}

/// Reorder one raw color line into interleaved RGB.
pub fn decode_color(inter: ColorInterlace, raw: &[u8], width: usize, out: &mut [u8]) {
    for x in 0..width {
        for c in 0..3 {
            out[3 * x + c] = raw[color_source(inter, width, x, c)];
        }
    }
}

/// Inverse of [`decode_color`].
pub fn encode_color(inter: ColorInterlace, rgb: &[u8], width: usize, out: &mut [u8]) {
    for x in 0..width {
        for c in 0..3 {
            out[color_source(inter, width, x, c)] = rgb[3 * x + c];
        }
    }
}

/// Inverse of the three-head reorder: place output samples back at their
/// sensor positions. `channels` is 1 for gray and 3 for color.
pub fn encode_three_head(line: &[u8], channels: usize, out: &mut [u8]) {
    let plane = out.len() / channels;
    for (k, &src) in three_head_order(plane).iter().enumerate() {
        for c in 0..channels {
            if let Some(&v) = line.get(k * channels + c) {
                out[c * plane + src] = v;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Line transform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reorder {
    None,
    Mirror,
    GrayThreeHead(Vec<usize>),
    Color(ColorInterlace),
    ColorThreeHead(Vec<usize>),
}

/// Everything done to one raw line before it is stored: reorder, inversion
/// of binary data, shading correction and the software brightness/contrast
/// table, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTransform {
    reorder: Reorder,
    width: usize,
    bpl: usize,
    valid_bpl: usize,
    invert: bool,
    calibration: Option<Calibration>,
    lut: Option<Lut>,
}

impl LineTransform {
    /// Transform for lines of `side` under the given parameters.
    pub fn for_side(params: &ScanParams, profile: &DeviceProfile, side: Side) -> Self {
        let scan = &params.scan;
        let reorder = if params.is_jpeg() {
            Reorder::None
        } else {
            match scan.mode {
                ScanMode::Gray => match profile.gray_interlace[side.index()] {
                    GrayInterlace::None => Reorder::None,
                    GrayInterlace::Mirrored => Reorder::Mirror,
                    GrayInterlace::ThreeHead => Reorder::GrayThreeHead(three_head_order(scan.bpl)),
                },
                ScanMode::Color => match profile.color_interlace_for(side, scan.dpi_x) {
                    ColorInterlace::Rgb | ColorInterlace::RasterOffset => Reorder::None,
                    ColorInterlace::ThreeHead => {
                        Reorder::ColorThreeHead(three_head_order(scan.bpl / 3))
                    }
                    other => Reorder::Color(other),
                },
                ScanMode::Lineart | ScanMode::Halftone => Reorder::None,
            }
        };
        let lut = (profile.sw_lut && !params.is_jpeg() && !scan.mode.is_binary())
            .then(|| Lut::brightness_contrast(params.brightness, params.contrast))
            .filter(|lut| !lut.is_identity());
        Self {
            reorder,
            width: scan.width,
            bpl: scan.bpl,
            valid_bpl: scan.valid_bpl,
            invert: profile.reverse_binary && scan.mode.is_binary() && !params.is_jpeg(),
            calibration: None,
            lut,
        }
    }

    /// Add shading correction for gray and color lines.
    pub fn with_calibration(mut self, calibration: Option<Calibration>) -> Self {
        self.calibration = calibration.filter(|c| !c.is_identity());
        self
    }

    /// Transform that stores lines unchanged.
    pub fn identity(width: usize, bpl: usize) -> Self {
        Self {
            reorder: Reorder::None,
            width,
            bpl,
            valid_bpl: bpl,
            invert: false,
            calibration: None,
            lut: None,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.reorder == Reorder::None
            && !self.invert
            && self.calibration.is_none()
            && self.lut.is_none()
    }

    /// Bytes per raw and stored line.
    pub fn bpl(&self) -> usize {
        self.bpl
    }

    /// Write the stored form of `raw` into `out`. Both hold one line.
    pub fn apply(&self, raw: &[u8], out: &mut [u8]) {
        let bpl = self.bpl;
        match &self.reorder {
            Reorder::None => out[..bpl].copy_from_slice(&raw[..bpl]),
            Reorder::Mirror => {
                for (o, r) in out[..bpl].iter_mut().zip(raw[..bpl].iter().rev()) {
                    *o = *r;
                }
            }
            Reorder::GrayThreeHead(order) => {
                out[..bpl].fill(0);
                for (o, &src) in out.iter_mut().zip(order) {
                    *o = raw[src];
                }
            }
            Reorder::Color(inter) => decode_color(*inter, raw, self.width, out),
            Reorder::ColorThreeHead(order) => {
                let plane = bpl / 3;
                out[..bpl].fill(0);
                for (k, &src) in order.iter().enumerate() {
                    for c in 0..3 {
                        out[3 * k + c] = raw[c * plane + src];
                    }
                }
            }
        }
        self.finish(&mut out[..bpl]);
    }

    /// Inversion, shading and LUT only, for lines assembled elsewhere.
    pub fn finish(&self, line: &mut [u8]) {
        if self.invert {
            for b in line.iter_mut() {
                *b ^= 0xff;
            }
        }
        let n = self.valid_bpl.min(line.len());
        if let Some(cal) = &self.calibration {
            cal.apply(&mut line[..n]);
        }
        if let Some(lut) = &self.lut {
            lut.apply(&mut line[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_head_order_for_twelve_samples() {
        assert_eq!(three_head_order(12), vec![11, 8, 5, 2, 6, 3, 0, 10, 7, 4, 1]);
    }

    #[test]
    fn three_head_order_never_exceeds_plane() {
        for plane in 0..64 {
            let order = three_head_order(plane);
            assert!(order.len() <= plane);
            assert!(order.iter().all(|&i| i < plane.max(1)));
        }
    }

    #[test]
    fn named_orders_place_channels() {
        let raw = [10, 20, 30];
        let mut out = [0u8; 3];
        decode_color(ColorInterlace::Bgr, &raw, 1, &mut out);
        assert_eq!(out, [30, 20, 10]);
        decode_color(ColorInterlace::Gbr, &raw, 1, &mut out);
        assert_eq!(out, [30, 10, 20]);
        decode_color(ColorInterlace::Brg, &raw, 1, &mut out);
        assert_eq!(out, [20, 30, 10]);
    }

    #[test]
    fn plane_orders_interleave() {
        let raw = [1, 2, 10, 20, 100, 200];
        let mut out = [0u8; 6];
        decode_color(ColorInterlace::Rrggbb, &raw, 2, &mut out);
        assert_eq!(out, [1, 10, 100, 2, 20, 200]);
        decode_color(ColorInterlace::MirroredRrggbb, &raw, 2, &mut out);
        assert_eq!(out, [2, 20, 200, 1, 10, 100]);
    }

    #[test]
    fn gray_three_head_pads_last_twelfth() {
        let t = LineTransform {
            reorder: Reorder::GrayThreeHead(three_head_order(12)),
            ..LineTransform::identity(12, 12)
        };
        let raw: Vec<u8> = (0..12).collect();
        let mut out = [0xaa; 12];
        t.apply(&raw, &mut out);
        assert_eq!(out, [11, 8, 5, 2, 6, 3, 0, 10, 7, 4, 1, 0]);
    }

    #[test]
    fn three_head_round_trips_at_multiples_of_twelve() {
        let plane = 24;
        let line: Vec<u8> = (1..=(plane * 11 / 12) as u8).collect();
        let mut raw = vec![0u8; plane];
        encode_three_head(&line, 1, &mut raw);
        let t = LineTransform {
            reorder: Reorder::GrayThreeHead(three_head_order(plane)),
            ..LineTransform::identity(plane, plane)
        };
        let mut out = vec![0u8; plane];
        t.apply(&raw, &mut out);
        assert_eq!(&out[..line.len()], &line[..]);
    }

    #[test]
    fn binary_lines_are_inverted() {
        let t = LineTransform {
            invert: true,
            ..LineTransform::identity(16, 2)
        };
        let mut out = [0u8; 2];
        t.apply(&[0x0f, 0xff], &mut out);
        assert_eq!(out, [0xf0, 0x00]);
    }

    #[test]
    fn lut_stops_at_valid_bytes() {
        let t = LineTransform {
            valid_bpl: 2,
            lut: Some(Lut::brightness_contrast(100, 0)),
            ..LineTransform::identity(3, 3)
        };
        let mut out = [0u8; 3];
        t.apply(&[50, 50, 50], &mut out);
        assert!(out[0] > 50 && out[1] > 50);
        assert_eq!(out[2], 50);
    }

    #[test]
    fn shading_comes_before_the_lut() {
        let lut = Lut::brightness_contrast(0, 60);
        let t = LineTransform {
            valid_bpl: 2,
            lut: Some(lut.clone()),
            ..LineTransform::identity(3, 3)
        }
        .with_calibration(Some(Calibration::new(vec![20, 0, 0], vec![120, 120, 120])));
        let mut out = [0u8; 3];
        t.apply(&[80, 50, 50], &mut out);
        // (80 - 20) * 2, 50 * 2, then the table
        assert_eq!(out[..2], [lut.get(120), lut.get(100)]);
        assert_eq!(out[2], 50);
    }

    #[test]
    fn flat_shading_is_dropped() {
        let t = LineTransform::identity(2, 2)
            .with_calibration(Some(Calibration::new(vec![0, 0], vec![240, 240])));
        assert!(t.is_identity());
    }
}
