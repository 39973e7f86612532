// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Brightness/contrast lookup table for devices that ignore the window's
// enhancement fields.
//
// Contrast picks the slope of the transfer line: -127..=127 maps onto an
// angle between 0 and 90 degrees, whose tangent is the rise. Brightness
// shifts the line vertically by up to half the output range. The line pivots
// on the centre of the table so zero contrast is the identity.

use std::f64::consts::FRAC_PI_4;

/// Transfer table for 8-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lut {
    table: [u8; 256],
}

impl Lut {
    pub fn identity() -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self { table }
    }

    /// Table for the given contrast (slope) and brightness (offset), both
    /// in -127..=127.
    pub fn brightness_contrast(brightness: i32, contrast: i32) -> Self {
        let values = transfer_curve(8, 8, 0, 255, contrast, brightness);
        let mut table = [0u8; 256];
        for (dst, src) in table.iter_mut().zip(values) {
            *dst = src as u8;
        }
        Self { table }
    }

    pub fn get(&self, v: u8) -> u8 {
        self.table[usize::from(v)]
    }

    pub fn is_identity(&self) -> bool {
        self.table.iter().enumerate().all(|(i, &v)| usize::from(v) == i)
    }

    /// Map every byte of `samples` in place.
    pub fn apply(&self, samples: &mut [u8]) {
        for s in samples {
            *s = self.table[usize::from(*s)];
        }
    }
}

/// Tan-slope transfer curve from `in_bits` inputs to `out_bits` outputs,
/// clamped to `out_min..=out_max`.
pub fn transfer_curve(
    in_bits: u32,
    out_bits: u32,
    out_min: i32,
    out_max: i32,
    slope: i32,
    offset: i32,
) -> Vec<i32> {
    let max_in = f64::from((1u32 << in_bits) - 1);
    let max_out = f64::from((1u32 << out_bits) - 1);

    let rise = (f64::from(slope) / 128.0 * FRAC_PI_4 + FRAC_PI_4).tan() * max_out / max_in;
    let mut shift = max_out / 2.0 - rise * max_in / 2.0;
    shift += f64::from(offset) / 127.0 * max_out / 2.0;

    (0..=max_in as u32)
        .map(|i| ((rise * f64::from(i) + shift) as i32).clamp(out_min, out_max))
        .collect()
}
