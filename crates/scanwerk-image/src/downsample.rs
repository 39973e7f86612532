// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Delivery-time line conversion.
//
// When the device scans in a richer mode, at a higher horizontal resolution,
// or wider than the caller asked for, each stored line is widened to RGB,
// decimated, shifted past the left margin and reduced to the caller's mode
// as it is handed out.

use scanwerk_core::types::{GrayConversion, ScanMode};

use crate::raster::PixelLayout;

/// Maps one hardware line onto one delivered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineConverter {
    pub source_mode: ScanMode,
    pub source_width: usize,
    pub source_dpi: u32,
    pub target_mode: ScanMode,
    pub target_width: usize,
    pub target_dpi: u32,
    /// Pixels skipped at the left of each line, after decimation.
    pub left_offset: usize,
    /// Binarization cut point.
    pub threshold: u8,
    pub gray_conversion: GrayConversion,
}

impl LineConverter {
    /// Converter that copies lines unchanged.
    pub fn passthrough(mode: ScanMode, width: usize, dpi: u32) -> Self {
        Self {
            source_mode: mode,
            source_width: width,
            source_dpi: dpi,
            target_mode: mode,
            target_width: width,
            target_dpi: dpi,
            left_offset: 0,
            threshold: 0x80,
            gray_conversion: GrayConversion::Average,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.source_mode == self.target_mode
            && self.source_width == self.target_width
            && self.source_dpi == self.target_dpi
            && self.left_offset == 0
    }

    pub fn source_bpl(&self) -> usize {
        PixelLayout::for_mode(self.source_mode).bytes_per_line(self.source_width)
    }

    pub fn target_bpl(&self) -> usize {
        PixelLayout::for_mode(self.target_mode).bytes_per_line(self.target_width)
    }

    /// Append the converted form of `src` (one source line) to `out`.
    pub fn convert(&self, src: &[u8], out: &mut Vec<u8>) {
        self.convert_with(src, &mut Vec::new(), out);
    }

    /// As [`convert`](Self::convert), widening into `scratch` so repeated
    /// calls reuse one allocation.
    pub fn convert_with(&self, src: &[u8], scratch: &mut Vec<u8>, out: &mut Vec<u8>) {
        if self.is_passthrough() {
            let n = self.source_bpl().min(src.len());
            out.extend_from_slice(&src[..n]);
            return;
        }

        self.widen(src, scratch);
        self.decimate(scratch);
        let line = &scratch[..];

        let px = |i: usize| -> [u8; 3] {
            let p = self.left_offset + i;
            if p < self.source_width {
                [line[p * 3], line[p * 3 + 1], line[p * 3 + 2]]
            } else {
                [0xff; 3]
            }
        };

        match PixelLayout::for_mode(self.target_mode) {
            PixelLayout::Rgb => {
                for i in 0..self.target_width {
                    out.extend_from_slice(&px(i));
                }
            }
            PixelLayout::Gray => {
                for i in 0..self.target_width {
                    out.push(self.to_gray(px(i)));
                }
            }
            PixelLayout::Binary => {
                let threshold = u32::from(self.threshold);
                for byte in 0..self.target_bpl() {
                    let mut packed = 0u8;
                    for bit in 0..8 {
                        let i = byte * 8 + bit;
                        if i < self.target_width
                            && u32::from(self.to_gray(px(i))) < threshold
                        {
                            packed |= 1 << (7 - bit);
                        }
                    }
                    out.push(packed);
                }
            }
        }
    }

    // Source line as 24-bit color.
    fn widen(&self, src: &[u8], line: &mut Vec<u8>) {
        let w = self.source_width;
        line.clear();
        line.resize(w * 3, 0xff);
        match PixelLayout::for_mode(self.source_mode) {
            PixelLayout::Rgb => {
                let n = (w * 3).min(src.len());
                line[..n].copy_from_slice(&src[..n]);
            }
            PixelLayout::Gray => {
                for (i, &v) in src.iter().take(w).enumerate() {
                    line[i * 3..i * 3 + 3].fill(v);
                }
            }
            PixelLayout::Binary => {
                for i in 0..w {
                    let Some(&byte) = src.get(i / 8) else { break };
                    let v = if byte >> (7 - i % 8) & 1 == 1 { 0 } else { 0xff };
                    line[i * 3..i * 3 + 3].fill(v);
                }
            }
        }
    }

    // Nearest-neighbour horizontal decimation, in place.
    fn decimate(&self, line: &mut [u8]) {
        if self.source_dpi == self.target_dpi || self.target_dpi == 0 {
            return;
        }
        let w = self.source_width;
        for i in 0..w {
            let source = i * self.source_dpi as usize / self.target_dpi as usize;
            if source >= w {
                break;
            }
            line.copy_within(source * 3..source * 3 + 3, i * 3);
        }
    }

    fn to_gray(&self, px: [u8; 3]) -> u8 {
        match self.gray_conversion {
            GrayConversion::Average => {
                ((u32::from(px[0]) + u32::from(px[1]) + u32::from(px[2])) / 3) as u8
            }
            GrayConversion::Channel(c) => px[usize::from(c.min(2))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter(source: ScanMode, target: ScanMode, width: usize) -> LineConverter {
        LineConverter {
            target_mode: target,
            ..LineConverter::passthrough(source, width, 300)
        }
    }

    #[test]
    fn color_to_gray_averages() {
        let c = converter(ScanMode::Color, ScanMode::Gray, 2);
        let mut out = Vec::new();
        c.convert(&[30, 60, 90, 255, 255, 255], &mut out);
        assert_eq!(out, vec![60, 255]);
    }

    #[test]
    fn color_to_gray_selects_channel() {
        let mut c = converter(ScanMode::Color, ScanMode::Gray, 1);
        c.gray_conversion = GrayConversion::Channel(1);
        let mut out = Vec::new();
        c.convert(&[10, 20, 30], &mut out);
        assert_eq!(out, vec![20]);
    }

    #[test]
    fn color_to_binary_packs_eight_pixels() {
        let c = converter(ScanMode::Color, ScanMode::Lineart, 8);
        let mut src = vec![0xffu8; 24];
        src[0..3].fill(0);
        src[21..24].fill(0x10);
        let mut out = Vec::new();
        c.convert(&src, &mut out);
        assert_eq!(out, vec![0b1000_0001]);
    }

    #[test]
    fn threshold_is_configurable() {
        let mut c = converter(ScanMode::Gray, ScanMode::Lineart, 8);
        c.threshold = 0x20;
        let mut out = Vec::new();
        c.convert(&[0x10, 0x30, 0x10, 0x30, 0x10, 0x30, 0x10, 0x30], &mut out);
        assert_eq!(out, vec![0b1010_1010]);
    }

    #[test]
    fn decimation_and_left_margin() {
        let c = LineConverter {
            source_mode: ScanMode::Gray,
            source_width: 8,
            source_dpi: 600,
            target_mode: ScanMode::Gray,
            target_width: 2,
            target_dpi: 300,
            left_offset: 1,
            threshold: 0x80,
            gray_conversion: GrayConversion::Average,
        };
        let mut out = Vec::new();
        c.convert(&[0, 1, 2, 3, 4, 5, 6, 7], &mut out);
        assert_eq!(out, vec![2, 4]);
        assert_eq!(c.source_bpl(), 8);
        assert_eq!(c.target_bpl(), 2);
    }

    #[test]
    fn scratch_is_reused_across_lines() {
        let c = converter(ScanMode::Gray, ScanMode::Lineart, 8);
        let mut scratch = Vec::new();
        let mut out = Vec::new();
        c.convert_with(&[0; 8], &mut scratch, &mut out);
        let capacity = scratch.capacity();
        c.convert_with(&[0xff, 0, 0xff, 0, 0xff, 0, 0xff, 0], &mut scratch, &mut out);
        assert_eq!(out, vec![0xff, 0b0101_0101]);
        assert_eq!(scratch.len(), 24);
        assert_eq!(scratch.capacity(), capacity);
    }

    #[test]
    fn passthrough_copies() {
        let c = LineConverter::passthrough(ScanMode::Lineart, 16, 200);
        assert!(c.is_passthrough());
        let mut out = Vec::new();
        c.convert(&[0xaa, 0x55, 0xff], &mut out);
        assert_eq!(out, vec![0xaa, 0x55]);
    }
}
