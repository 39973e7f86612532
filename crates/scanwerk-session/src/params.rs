// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan parameter derivation.
//
// Every page is described three times: what the caller asked for (user),
// what the device is told to scan once its quirks are applied (scan), and
// what the per-side buffers hold after padding lines are dropped (image).
// Buffers store lines in the scan layout; the line converter maps them onto
// the image layout as they are delivered.

use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::geometry::{Geometry, units_to_pixels};
use scanwerk_core::quirks::DeviceProfile;
use scanwerk_core::types::{
    ColorInterlace, Compression, DuplexInterlace, FrameFormat, GrayConversion, ScanMode, Side,
    Source,
};
use scanwerk_image::LineConverter;
use scanwerk_protocol::command::{PixelSize, WindowRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Size and layout of one version of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageParams {
    pub source: Source,
    pub mode: ScanMode,
    pub format: FrameFormat,
    pub dpi_x: u32,
    pub dpi_y: u32,
    pub geometry: Geometry,
    /// Pixels per line.
    pub width: usize,
    /// Lines per side.
    pub height: usize,
    pub bpp: usize,
    /// Bytes per line.
    pub bpl: usize,
    /// Pixels and bytes of a line that carry image data; the rest is padding.
    pub valid_width: usize,
    pub valid_bpl: usize,
    /// Raw lines dropped at the top of each side.
    pub skip_lines: [usize; 2],
}

impl ImageParams {
    fn new(source: Source, mode: ScanMode, dpi_x: u32, dpi_y: u32, geometry: Geometry) -> Self {
        let mut p = Self {
            source,
            mode,
            format: FrameFormat::Gray,
            dpi_x,
            dpi_y,
            geometry,
            width: units_to_pixels(geometry.width(), dpi_x),
            height: units_to_pixels(geometry.height(), dpi_y),
            bpp: 0,
            bpl: 0,
            valid_width: 0,
            valid_bpl: 0,
            skip_lines: [0; 2],
        };
        p.set_mode(mode);
        p
    }

    fn set_mode(&mut self, mode: ScanMode) {
        self.mode = mode;
        self.bpp = mode.bits_per_pixel();
        if self.format != FrameFormat::Jpeg {
            self.format = if mode == ScanMode::Color {
                FrameFormat::Rgb
            } else {
                FrameFormat::Gray
            };
        }
    }

    fn update_bpl(&mut self) {
        self.bpl = self.width * self.bpp / 8;
        self.valid_width = self.width;
        self.valid_bpl = self.bpl;
    }

    /// Bytes a side of this size occupies.
    pub fn side_bytes(&self) -> usize {
        self.bpl * self.height
    }
}

/// How image data for the sides comes off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadPath {
    /// Each side is read with its own stream.
    PerSide,
    /// Both sides share one stream split by the interlace.
    Interleaved(DuplexInterlace),
    /// Both sides share one stream of whole lines, the back lagging the front.
    RasterOffset,
    /// Double-width JPEG with restart intervals alternating between sides.
    JpegInterleaved,
}

impl ReadPath {
    fn select(source: Source, format: FrameFormat, profile: &DeviceProfile) -> Self {
        if !source.is_duplex() {
            return Self::PerSide;
        }
        if format == FrameFormat::Jpeg {
            return if profile.jpeg_duplex_interlaced {
                Self::JpegInterleaved
            } else {
                Self::PerSide
            };
        }
        match profile.duplex_interlace {
            DuplexInterlace::None => Self::PerSide,
            DuplexInterlace::RasterOffset => Self::RasterOffset,
            other => Self::Interleaved(other),
        }
    }

    /// Whether both sides are filled by the same reads.
    pub fn is_shared(self) -> bool {
        self != Self::PerSide
    }
}

/// User, scan and image parameters for one batch, plus the reconstruction
/// constants derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    pub user: ImageParams,
    pub scan: ImageParams,
    pub image: ImageParams,
    pub path: ReadPath,
    /// Vertical lag of the red, green and blue planes in lines, for
    /// raster-offset color.
    pub color_offsets: [usize; 3],
    /// Lines the back trails the front in a raster-offset duplex stream.
    pub duplex_lag: usize,
    /// Pixels skipped at the left of each delivered line.
    pub left_offset: usize,
    pub threshold: u8,
    pub gray_conversion: GrayConversion,
    pub brightness: i32,
    pub contrast: i32,
    pub rif: bool,
    pub compress_arg: u8,
}

// First standard resolution at or above `dpi`.
fn snap_up(dpi: u32, supported: &[u32]) -> Option<u32> {
    if supported.is_empty() {
        return Some(dpi);
    }
    supported.iter().copied().filter(|&d| d >= dpi).min()
}

impl ScanParams {
    /// Work out what to ask the device for and what the buffers will hold.
    pub fn derive(cfg: &ScanConfig, profile: &DeviceProfile) -> Result<Self> {
        let ppl_mod = profile.ppl_mod.max(1);
        let geom = cfg.geometry;

        // -- User ------------------------------------------------------------
        let mut user = ImageParams::new(cfg.source, cfg.mode, cfg.dpi_x, cfg.dpi_y, geom);
        if user.mode.is_binary() {
            user.width -= user.width % 8;
        }
        user.width -= user.width % ppl_mod;
        if cfg.compression == Compression::Jpeg && user.mode >= ScanMode::Gray {
            if !profile.has_jpeg {
                return Err(ScanwerkError::Unsupported(format!(
                    "{} has no JPEG compression",
                    profile.family
                )));
            }
            user.format = FrameFormat::Jpeg;
            user.width -= user.width % 8;
            user.height -= user.height % 8;
        }
        user.update_bpl();
        if user.width == 0 || user.height == 0 {
            return Err(ScanwerkError::InvalidOption(format!(
                "scan area is {}x{} pixels",
                user.width, user.height
            )));
        }

        // -- Scan ------------------------------------------------------------
        let mut scan = user.clone();
        if scan.mode.is_binary() && !profile.supports_mode(scan.mode) {
            scan.set_mode(ScanMode::Gray);
        }
        if scan.mode == ScanMode::Gray && !profile.can_gray {
            scan.set_mode(ScanMode::Color);
        }
        if scan.mode == ScanMode::Color && !profile.can_color {
            return Err(ScanwerkError::Unsupported(format!(
                "{} cannot scan {:?}",
                profile.family, user.mode
            )));
        }
        if scan.format == FrameFormat::Jpeg && scan.mode != user.mode {
            return Err(ScanwerkError::Unsupported(format!(
                "{} cannot compress {:?} scans",
                profile.family, user.mode
            )));
        }

        scan.dpi_x = snap_up(cfg.dpi_x, &profile.std_dpi_x).ok_or_else(|| {
            ScanwerkError::InvalidOption(format!(
                "{} dpi exceeds what {} supports",
                cfg.dpi_x, profile.family
            ))
        })?;

        if profile.fixed_width {
            scan.geometry.tl_x = 0;
            scan.geometry.br_x = profile.max_x;
            scan.geometry.page_x = profile.max_x;
        }
        scan.width = units_to_pixels(scan.geometry.width(), scan.dpi_x);
        if scan.mode.is_binary() || scan.format == FrameFormat::Jpeg {
            scan.width -= scan.width % 8;
        }
        scan.width -= scan.width % ppl_mod;
        scan.update_bpl();
        if profile.even_bpl && scan.width % 2 == 1 {
            scan.width += 1;
            scan.bpl = scan.width * scan.bpp / 8;
        }
        if profile.color_interlace[Side::Front.index()] == ColorInterlace::ThreeHead {
            scan.valid_bpl = scan.bpl * 11 / 12;
            scan.valid_width = scan.width * 11 / 12;
        }

        let path = ReadPath::select(cfg.source, scan.format, profile);
        let duplex_offset = profile.duplex_offset + cfg.duplex_offset;
        let pads_offset_side =
            cfg.source.is_duplex() && duplex_offset > 0 && path != ReadPath::RasterOffset;
        if pads_offset_side {
            scan.height = units_to_pixels(geom.height() + duplex_offset, cfg.dpi_y);
        }
        scan.height += scan.height % 2;

        let raster_color = scan.mode == ScanMode::Color
            && scan.format != FrameFormat::Jpeg
            && profile.color_interlace_for(Side::Front, scan.dpi_x) == ColorInterlace::RasterOffset;
        let color_offsets = if raster_color {
            let base = i64::from(profile.color_raster_offset);
            let dpi = i64::from(scan.dpi_y);
            let lag = |delta: i32, per: i64| ((base + i64::from(delta)) * dpi / per).max(0) as usize;
            [0, lag(cfg.green_offset, 150), lag(cfg.blue_offset, 300)]
        } else {
            [0; 3]
        };
        scan.height += color_offsets.iter().copied().max().unwrap_or(0);

        let duplex_lag = if path == ReadPath::RasterOffset {
            units_to_pixels(profile.duplex_raster_offset * 4, cfg.dpi_y)
                + units_to_pixels(cfg.duplex_offset, cfg.dpi_y)
        } else {
            0
        };

        // -- Image -----------------------------------------------------------
        let mut image = user.clone();
        if pads_offset_side {
            image.skip_lines[profile.duplex_offset_side.index()] =
                units_to_pixels(duplex_offset, image.dpi_y);
        }

        let left_offset = if profile.fixed_width && image.width != scan.width {
            let units =
                profile.valid_x.saturating_sub(image.geometry.page_x) / 2 + image.geometry.tl_x;
            units_to_pixels(units, image.dpi_x)
        } else {
            0
        };

        let params = Self {
            user,
            scan,
            image,
            path,
            color_offsets,
            duplex_lag,
            left_offset,
            threshold: cfg.threshold,
            gray_conversion: cfg.gray_conversion,
            brightness: cfg.brightness,
            contrast: cfg.contrast,
            rif: cfg.rif,
            compress_arg: cfg.compress_arg,
        };
        debug!(
            user_w = params.user.width,
            user_h = params.user.height,
            scan_w = params.scan.width,
            scan_h = params.scan.height,
            scan_mode = ?params.scan.mode,
            scan_dpi = params.scan.dpi_x,
            path = ?params.path,
            "scan parameters derived"
        );
        Ok(params)
    }

    /// Whether the delivered bytes are a compressed stream.
    pub fn is_jpeg(&self) -> bool {
        self.scan.format == FrameFormat::Jpeg
    }

    /// Raw bytes the device sends for one side.
    pub fn scan_bytes(&self, side: Side) -> usize {
        if self.scan.source.covers(side) {
            self.scan.side_bytes()
        } else {
            0
        }
    }

    /// Bytes the side buffer holds once complete.
    pub fn stored_bytes(&self, side: Side) -> usize {
        if !self.image.source.covers(side) {
            0
        } else if self.is_jpeg() {
            self.image.side_bytes()
        } else {
            self.image.height * self.scan.bpl
        }
    }

    /// Bytes per stored line.
    pub fn stored_bpl(&self) -> usize {
        if self.is_jpeg() {
            self.image.bpl
        } else {
            self.scan.bpl
        }
    }

    /// Converter from stored lines to delivered lines.
    pub fn converter(&self) -> LineConverter {
        LineConverter {
            source_mode: self.scan.mode,
            source_width: self.scan.width,
            source_dpi: self.scan.dpi_x,
            target_mode: self.image.mode,
            target_width: self.image.width,
            target_dpi: self.image.dpi_x,
            left_offset: self.left_offset,
            threshold: self.threshold,
            gray_conversion: self.gray_conversion,
        }
    }

    /// What to put in the SET WINDOW descriptor.
    pub fn window_request(&self) -> WindowRequest {
        let s = &self.scan;
        WindowRequest {
            source: s.source,
            mode: s.mode,
            dpi_x: s.dpi_x,
            dpi_y: s.dpi_y,
            tl_x: s.geometry.tl_x,
            tl_y: s.geometry.tl_y,
            width_px: s.width,
            height_px: s.height,
            page_x: s.geometry.page_x,
            brightness: self.brightness,
            contrast: self.contrast,
            threshold: self.threshold,
            rif: self.rif,
            jpeg_quality: self.is_jpeg().then_some(self.compress_arg),
        }
    }

    /// Replace the computed size with what the device measured.
    ///
    /// Returns whether anything changed.
    pub fn apply_pixel_size(&mut self, size: &PixelSize) -> bool {
        let (w, h) = (size.width as usize, size.height as usize);
        if w == 0 || h == 0 || (w == self.scan.width && h == self.scan.height) {
            return false;
        }
        debug!(
            from_w = self.scan.width,
            from_h = self.scan.height,
            to_w = w,
            to_h = h,
            "device reported image size"
        );
        let scan_dpi = self.scan.dpi_x as usize;
        self.scan.width = w;
        self.scan.height = h;
        self.scan.update_bpl();
        for p in [&mut self.user, &mut self.image] {
            p.width = w * p.dpi_x as usize / scan_dpi.max(1);
            if p.mode.is_binary() {
                p.width -= p.width % 8;
            }
            p.height = h;
            p.update_bpl();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanwerk_core::geometry::UNITS_PER_INCH;
    use scanwerk_core::quirks::QuirkTable;

    fn profile(model: &str) -> DeviceProfile {
        QuirkTable::builtin().lookup(model)
    }

    #[test]
    fn lineart_width_rounds_to_bytes() {
        let cfg = ScanConfig::default();
        let p = ScanParams::derive(&cfg, &profile("DR-9080C")).expect("derive");
        assert_eq!(p.user.width, 2544);
        assert_eq!(p.user.bpl, 318);
        assert_eq!(p.user.height, 3300);
        assert_eq!(p.scan, p.user);
        assert!(p.converter().is_passthrough());
    }

    #[test]
    fn missing_lineart_moves_up_and_dpi_snaps() {
        let cfg = ScanConfig {
            dpi_x: 200,
            dpi_y: 200,
            ..ScanConfig::default()
        };
        let p = ScanParams::derive(&cfg, &profile("DR-2510C")).expect("derive");
        assert_eq!(p.scan.mode, ScanMode::Gray);
        assert_eq!(p.scan.dpi_x, 300);
        assert_eq!(p.scan.dpi_y, 200);
        assert_eq!(p.scan.width, 2550);
        assert_eq!(p.scan.valid_bpl, 2550 * 11 / 12);
        assert_eq!(p.image.mode, ScanMode::Lineart);
        assert_eq!(p.image.width, 1696);
        assert!(!p.converter().is_passthrough());
    }

    #[test]
    fn fixed_width_centres_narrow_pages() {
        let half = UNITS_PER_INCH * 4;
        let cfg = ScanConfig {
            mode: ScanMode::Gray,
            geometry: Geometry::page(half, half),
            ..ScanConfig::default()
        };
        let dev = profile("DR-2510C");
        let p = ScanParams::derive(&cfg, &dev).expect("derive");
        assert_eq!(p.scan.geometry.tl_x, 0);
        assert_eq!(p.scan.width, units_to_pixels(dev.max_x, 300));
        assert_eq!(p.image.width, 1200);
        assert_eq!(p.left_offset, units_to_pixels((dev.valid_x - half) / 2, 300));
    }

    #[test]
    fn even_bpl_pads_scan_but_not_image() {
        let cfg = ScanConfig {
            mode: ScanMode::Gray,
            dpi_x: 75,
            dpi_y: 75,
            geometry: Geometry::page(16 * 15 + 16, UNITS_PER_INCH),
            ..ScanConfig::default()
        };
        let mut dev = profile("DR-2050C");
        dev.fixed_width = false;
        let p = ScanParams::derive(&cfg, &dev).expect("derive");
        assert_eq!(p.image.width, 16);
        assert_eq!(p.scan.width, 16);

        let odd = ScanConfig {
            geometry: Geometry::page(16 * 17, UNITS_PER_INCH),
            ..cfg
        };
        let p = ScanParams::derive(&odd, &dev).expect("derive");
        assert_eq!(p.image.width, 17);
        assert_eq!(p.scan.width, 18);
        assert_eq!(p.scan.valid_width, 17);
    }

    #[test]
    fn duplex_offset_lengthens_scan_and_skips_lines() {
        let cfg = ScanConfig {
            mode: ScanMode::Gray,
            source: Source::AdfDuplex,
            dpi_x: 300,
            dpi_y: 300,
            ..ScanConfig::default()
        };
        let p = ScanParams::derive(&cfg, &profile("DR-2580C")).expect("derive");
        assert_eq!(p.path, ReadPath::Interleaved(DuplexInterlace::ByteAlternate));
        assert_eq!(p.scan.height, 3300 + 108);
        assert_eq!(p.image.height, 3300);
        assert_eq!(p.image.skip_lines, [0, 108]);
    }

    #[test]
    fn scan_height_is_even() {
        let cfg = ScanConfig {
            mode: ScanMode::Gray,
            geometry: Geometry::page(UNITS_PER_INCH, 1204),
            ..ScanConfig::default()
        };
        let p = ScanParams::derive(&cfg, &profile("DR-9080C")).expect("derive");
        assert_eq!(p.user.height, 301);
        assert_eq!(p.scan.height, 302);
        assert_eq!(p.stored_bytes(Side::Front), 301 * 300);
        assert_eq!(p.stored_bytes(Side::Back), 0);
    }

    #[test]
    fn jpeg_rounds_to_blocks() {
        let cfg = ScanConfig {
            mode: ScanMode::Color,
            compression: Compression::Jpeg,
            geometry: Geometry::page(1210, 1210),
            ..ScanConfig::default()
        };
        let p = ScanParams::derive(&cfg, &profile("DR-9080C")).expect("derive");
        assert_eq!(p.user.format, FrameFormat::Jpeg);
        assert_eq!((p.user.width, p.user.height), (296, 296));
        assert_eq!(p.window_request().jpeg_quality, Some(50));

        let err = ScanParams::derive(&cfg, &profile("DR-7090C")).unwrap_err();
        assert!(matches!(err, ScanwerkError::Unsupported(_)));
    }

    #[test]
    fn color_on_mono_device_is_unsupported() {
        let cfg = ScanConfig {
            mode: ScanMode::Color,
            ..ScanConfig::default()
        };
        assert!(matches!(
            ScanParams::derive(&cfg, &profile("DR-5060F")),
            Err(ScanwerkError::Unsupported(_))
        ));
    }

    #[test]
    fn raster_offsets_scale_with_resolution() {
        let cfg = ScanConfig {
            mode: ScanMode::Color,
            source: Source::AdfDuplex,
            ..ScanConfig::default()
        };
        let p = ScanParams::derive(&cfg, &profile("M3091DC")).expect("derive");
        assert_eq!(p.path, ReadPath::RasterOffset);
        assert_eq!(p.color_offsets, [0, 8, 4]);
        assert_eq!(p.scan.height, 3300 + 8);
        assert_eq!(p.duplex_lag, 12);
        assert_eq!(p.image.skip_lines, [0, 0]);

        let calibrated = ScanConfig {
            green_offset: -10,
            blue_offset: 2,
            ..cfg
        };
        let p = ScanParams::derive(&calibrated, &profile("M3091DC")).expect("derive");
        assert_eq!(p.color_offsets, [0, 0, 6]);
    }

    #[test]
    fn pixel_size_overrides_computed_size() {
        let cfg = ScanConfig {
            mode: ScanMode::Gray,
            ..ScanConfig::default()
        };
        let mut p = ScanParams::derive(&cfg, &profile("DR-9050C")).expect("derive");
        let size = PixelSize {
            width: 2400,
            height: 3000,
            ..PixelSize::default()
        };
        assert!(p.apply_pixel_size(&size));
        assert_eq!((p.scan.width, p.scan.height, p.scan.bpl), (2400, 3000, 2400));
        assert_eq!((p.image.width, p.image.height), (2400, 3000));
        assert!(!p.apply_pixel_size(&size));
        assert!(!p.apply_pixel_size(&PixelSize::default()));
    }
}
