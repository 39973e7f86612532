// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory raster of one materialized scan side.
//
// Scan data stays in the layout the caller receives it in: packed one-bit
// lines (most significant bit first, set bit is black), 8-bit gray, or
// interleaved RGB. Conversion to `image` buffers happens only where a
// transform needs it.

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::ScanMode;
use serde::{Deserialize, Serialize};

/// Sample layout of a raster line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelLayout {
    /// One bit per pixel, set bit is black.
    Binary,
    Gray,
    Rgb,
}

impl PixelLayout {
    pub fn for_mode(mode: ScanMode) -> Self {
        match mode {
            ScanMode::Lineart | ScanMode::Halftone => Self::Binary,
            ScanMode::Gray => Self::Gray,
            ScanMode::Color => Self::Rgb,
        }
    }

    /// Samples per pixel. Binary counts as one.
    pub fn channels(self) -> usize {
        match self {
            Self::Binary | Self::Gray => 1,
            Self::Rgb => 3,
        }
    }

    /// Minimum bytes needed for `width` pixels.
    pub fn bytes_per_line(self, width: usize) -> usize {
        match self {
            Self::Binary => width.div_ceil(8),
            Self::Gray => width,
            Self::Rgb => width * 3,
        }
    }
}

/// A fully materialized page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub layout: PixelLayout,
    /// Pixels per line.
    pub width: usize,
    /// Lines.
    pub height: usize,
    /// Bytes per line, at least `layout.bytes_per_line(width)`.
    pub bpl: usize,
    pub data: Vec<u8>,
}

impl Raster {
    // -- Construction ---------------------------------------------------------

    /// Page of uniform background. `bg` is a gray level; binary pages are
    /// white when it is at least mid-range.
    pub fn filled(layout: PixelLayout, width: usize, height: usize, bg: u8) -> Self {
        let bpl = layout.bytes_per_line(width);
        let fill = match layout {
            PixelLayout::Binary if bg >= 0x80 => 0x00,
            PixelLayout::Binary => 0xff,
            _ => bg,
        };
        Self {
            layout,
            width,
            height,
            bpl,
            data: vec![fill; bpl * height],
        }
    }

    /// Wrap raw line data, dropping any trailing partial line.
    pub fn from_bytes(
        layout: PixelLayout,
        width: usize,
        height: usize,
        bpl: usize,
        mut data: Vec<u8>,
    ) -> Result<Self> {
        if bpl < layout.bytes_per_line(width) {
            return Err(ScanwerkError::Image(format!(
                "{bpl} bytes per line cannot hold {width} {layout:?} pixels"
            )));
        }
        let needed = bpl * height;
        if data.len() < needed {
            return Err(ScanwerkError::Image(format!(
                "{} bytes given for a {width}x{height} raster needing {needed}",
                data.len()
            )));
        }
        data.truncate(needed);
        Ok(Self {
            layout,
            width,
            height,
            bpl,
            data,
        })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.bpl..(y + 1) * self.bpl]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let bpl = self.bpl;
        &mut self.data[y * bpl..(y + 1) * bpl]
    }

    /// Whether a binary pixel is black.
    pub fn bit(&self, x: usize, y: usize) -> bool {
        self.data[y * self.bpl + x / 8] >> (7 - x % 8) & 1 == 1
    }

    pub fn set_bit(&mut self, x: usize, y: usize, black: bool) {
        let idx = y * self.bpl + x / 8;
        let mask = 1u8 << (7 - x % 8);
        if black {
            self.data[idx] |= mask;
        } else {
            self.data[idx] &= !mask;
        }
    }

    /// Sum of the samples of one pixel; binary reports 0 for black and 255
    /// for white.
    pub fn sample_sum(&self, x: usize, y: usize) -> i32 {
        match self.layout {
            PixelLayout::Binary => {
                if self.bit(x, y) {
                    0
                } else {
                    255
                }
            }
            PixelLayout::Gray => i32::from(self.data[y * self.bpl + x]),
            PixelLayout::Rgb => {
                let i = y * self.bpl + x * 3;
                self.data[i..i + 3].iter().map(|&v| i32::from(v)).sum()
            }
        }
    }

    // -- Conversion -----------------------------------------------------------

    /// Gray view of the page. Color is averaged, binary maps to 0/255.
    pub fn to_gray_image(&self) -> Result<GrayImage> {
        let (w, h) = self.dimensions()?;
        let channels = self.layout.channels() as i32;
        Ok(GrayImage::from_fn(w, h, |x, y| {
            Luma([(self.sample_sum(x as usize, y as usize) / channels) as u8])
        }))
    }

    /// RGB copy of the page. Requires an RGB raster.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        if self.layout != PixelLayout::Rgb {
            return Err(ScanwerkError::Image(format!(
                "{:?} raster is not RGB",
                self.layout
            )));
        }
        let (w, h) = self.dimensions()?;
        let row_len = self.layout.bytes_per_line(self.width);
        let mut packed = Vec::with_capacity(row_len * self.height);
        for y in 0..self.height {
            packed.extend_from_slice(&self.row(y)[..row_len]);
        }
        RgbImage::from_raw(w, h, packed)
            .ok_or_else(|| ScanwerkError::Image("RGB buffer size mismatch".into()))
    }

    /// Page as a `DynamicImage` for encoding.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        match self.layout {
            PixelLayout::Rgb => Ok(DynamicImage::ImageRgb8(self.to_rgb_image()?)),
            PixelLayout::Gray | PixelLayout::Binary => {
                Ok(DynamicImage::ImageLuma8(self.to_gray_image()?))
            }
        }
    }

    /// Build a gray or binary raster from a gray image. Binary pixels darker
    /// than `threshold` become black.
    pub fn from_gray_image(img: &GrayImage, layout: PixelLayout, threshold: u8) -> Result<Self> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        match layout {
            PixelLayout::Gray => Self::from_bytes(layout, w, h, w, img.as_raw().clone()),
            PixelLayout::Binary => {
                let mut out = Self::filled(layout, w, h, 0xff);
                for (x, y, px) in img.enumerate_pixels() {
                    if px.0[0] < threshold {
                        out.set_bit(x as usize, y as usize, true);
                    }
                }
                Ok(out)
            }
            PixelLayout::Rgb => Err(ScanwerkError::Image(
                "gray image cannot become an RGB raster".into(),
            )),
        }
    }

    pub fn from_rgb_image(img: &RgbImage) -> Result<Self> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        Self::from_bytes(PixelLayout::Rgb, w, h, w * 3, img.as_raw().clone())
    }

    fn dimensions(&self) -> Result<(u32, u32)> {
        let w = u32::try_from(self.width)
            .map_err(|_| ScanwerkError::Image(format!("width {} too large", self.width)))?;
        let h = u32::try_from(self.height)
            .map_err(|_| ScanwerkError::Image(format!("height {} too large", self.height)))?;
        Ok((w, h))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_line_rounds_up_to_bytes() {
        assert_eq!(PixelLayout::Binary.bytes_per_line(9), 2);
        assert_eq!(PixelLayout::Rgb.bytes_per_line(9), 27);
    }

    #[test]
    fn white_binary_page_is_zero_bits() {
        let r = Raster::filled(PixelLayout::Binary, 16, 2, 0xee);
        assert!(r.data.iter().all(|&b| b == 0));
        assert_eq!(r.sample_sum(3, 1), 255);
    }

    #[test]
    fn short_data_is_rejected() {
        let err = Raster::from_bytes(PixelLayout::Gray, 4, 4, 4, vec![0; 15]);
        assert!(matches!(err, Err(ScanwerkError::Image(_))));
    }

    #[test]
    fn padded_rows_survive_rgb_export() {
        let mut data = vec![0u8; 2 * 8];
        data[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let r = Raster::from_bytes(PixelLayout::Rgb, 2, 2, 8, data).expect("raster");
        let img = r.to_rgb_image().expect("rgb");
        assert_eq!(img.get_pixel(1, 0).0, [4, 5, 6]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0]);
    }

    #[test]
    fn binary_gray_round_trip() {
        let mut r = Raster::filled(PixelLayout::Binary, 10, 3, 0xff);
        r.set_bit(9, 2, true);
        let gray = r.to_gray_image().expect("gray");
        assert_eq!(gray.get_pixel(9, 2).0, [0]);
        let back = Raster::from_gray_image(&gray, PixelLayout::Binary, 128).expect("binary");
        assert_eq!(back, r);
    }
}
