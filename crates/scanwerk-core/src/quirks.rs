// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data-driven device quirk table.
//
// One record per device family: capability overrides, line and pixel
// boundary multiples, sample interlacing and raster offsets. The table is
// consulted once when a session is opened; nothing downstream branches on
// model names.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::UNITS_PER_INCH;
use crate::types::{ColorInterlace, DuplexInterlace, GrayInterlace, STANDARD_DPI, ScanMode, Side};

/// Which SET SCAN MODE flavour the device speaks, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanModeCommand {
    None,
    /// Six-byte command with a 0x14-byte page payload.
    Standard { payload_head_len: bool },
    /// Twelve-byte command with a 0x10-byte payload.
    Extended,
}

/// Where per-pixel shading correction comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FineCalibration {
    #[default]
    None,
    /// Scan the calibration target lamp off, then lamp on, and average.
    Scan,
    /// Read the offset and gain buffers the device keeps.
    DeviceBuffer,
}

/// Capabilities and wire quirks of one device family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Human-readable family name.
    pub family: String,
    /// Substrings matched against the INQUIRY product id.
    pub model_patterns: Vec<String>,

    // -- Transport framing --
    /// USB reads carry a 12-byte header before data and status.
    pub padded_read: bool,
    /// USB devices that send an extra status block with a length.
    pub extra_status: bool,

    // -- Geometry, 1/1200 inch --
    pub max_x: u32,
    pub max_y: u32,
    /// Width the sensor actually covers; fixed-width devices pad beyond it.
    pub valid_x: u32,
    pub max_x_fb: u32,
    pub max_y_fb: u32,

    // -- Capabilities --
    pub can_lineart: bool,
    pub can_halftone: bool,
    pub can_gray: bool,
    pub can_color: bool,
    pub has_flatbed: bool,
    pub has_adf: bool,
    pub has_duplex: bool,
    pub has_card: bool,
    pub has_jpeg: bool,
    /// Brightness/threshold/contrast fields honoured in the window.
    pub has_btc: bool,
    /// READ of the pixel-size page reports the true image size.
    pub has_pixel_size: bool,
    /// Panel counter can be read to detect a new sheet in buffered mode.
    pub has_panel_counter: bool,
    pub scan_mode_command: ScanModeCommand,
    /// Standard resolutions accepted horizontally and vertically.
    pub std_dpi_x: Vec<u32>,
    pub std_dpi_y: Vec<u32>,

    // -- Wire quirks --
    /// Device always scans full width.
    pub fixed_width: bool,
    /// Bytes per line must be even.
    pub even_bpl: bool,
    /// Upper-left Y is sent bitwise inverted.
    pub invert_tly: bool,
    /// Width is rounded down to this pixel multiple.
    pub ppl_mod: usize,
    /// Value of the undocumented window byte 0x2a.
    pub window_reserved: u8,
    /// Window rgb format field.
    pub rgb_format: u8,
    /// Background fill used for rotation and missing raster lines.
    pub bg_color: u8,
    /// Apply brightness/contrast in software.
    pub sw_lut: bool,
    /// One-bit data arrives inverted.
    pub reverse_binary: bool,
    /// Send OBJECT POSITION for every sheet, not only the first.
    pub always_feed: bool,
    /// Shading correction applied to gray and color lines.
    pub fine_calibration: FineCalibration,

    // -- Interlacing --
    pub color_interlace: [ColorInterlace; 2],
    /// Per-resolution overrides of the front color interlace.
    pub color_interlace_by_dpi: Vec<(u32, ColorInterlace)>,
    pub gray_interlace: [GrayInterlace; 2],
    pub duplex_interlace: DuplexInterlace,
    /// JPEG duplex frames arrive double width with alternating restart intervals.
    pub jpeg_duplex_interlaced: bool,
    /// Default vertical offset between duplex sides, 1/1200 inch.
    pub duplex_offset: u32,
    /// Side padded at the top by the duplex offset.
    pub duplex_offset_side: Side,
    /// Green/blue sensor row distance, 1/300 inch.
    pub color_raster_offset: u32,
    /// Front/back sensor distance for single-stream duplex, 1/300 inch.
    pub duplex_raster_offset: u32,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        let letter_width = 8 * UNITS_PER_INCH + UNITS_PER_INCH / 2;
        Self {
            family: "generic".into(),
            model_patterns: Vec::new(),
            padded_read: false,
            extra_status: false,
            max_x: letter_width,
            max_y: 14 * UNITS_PER_INCH,
            valid_x: letter_width,
            max_x_fb: letter_width,
            max_y_fb: 14 * UNITS_PER_INCH,
            can_lineart: true,
            can_halftone: true,
            can_gray: true,
            can_color: false,
            has_flatbed: false,
            has_adf: true,
            has_duplex: true,
            has_card: false,
            has_jpeg: false,
            has_btc: true,
            has_pixel_size: false,
            has_panel_counter: true,
            scan_mode_command: ScanModeCommand::Standard {
                payload_head_len: false,
            },
            std_dpi_x: STANDARD_DPI.to_vec(),
            std_dpi_y: STANDARD_DPI.to_vec(),
            fixed_width: false,
            even_bpl: false,
            invert_tly: false,
            ppl_mod: 1,
            window_reserved: 0,
            rgb_format: 0,
            bg_color: 0xee,
            sw_lut: false,
            reverse_binary: true,
            always_feed: true,
            fine_calibration: FineCalibration::None,
            color_interlace: [ColorInterlace::Rgb; 2],
            color_interlace_by_dpi: Vec::new(),
            gray_interlace: [GrayInterlace::None; 2],
            duplex_interlace: DuplexInterlace::None,
            jpeg_duplex_interlaced: false,
            duplex_offset: 0,
            duplex_offset_side: Side::Back,
            color_raster_offset: 0,
            duplex_raster_offset: 0,
        }
    }
}

impl DeviceProfile {
    /// Whether the profile matches an INQUIRY product id.
    pub fn matches(&self, model: &str) -> bool {
        self.model_patterns.iter().any(|p| model.contains(p.as_str()))
    }

    /// Whether the device can produce `mode` natively.
    pub fn supports_mode(&self, mode: ScanMode) -> bool {
        match mode {
            ScanMode::Lineart => self.can_lineart,
            ScanMode::Halftone => self.can_halftone,
            ScanMode::Gray => self.can_gray,
            ScanMode::Color => self.can_color,
        }
    }

    /// Color interlace for a side at a given horizontal resolution.
    pub fn color_interlace_for(&self, side: Side, dpi_x: u32) -> ColorInterlace {
        if side == Side::Front {
            if let Some((_, inter)) = self.color_interlace_by_dpi.iter().find(|(d, _)| *d == dpi_x) {
                return *inter;
            }
        }
        self.color_interlace[side.index()]
    }
}

/// The set of known device families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuirkTable {
    pub profiles: Vec<DeviceProfile>,
}

impl QuirkTable {
    /// Table of families with known quirks.
    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles(),
        }
    }

    /// Load a table from JSON, e.g. a site override file.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Profile for a product id, falling back to a generic record.
    ///
    /// The generic record assumes color support when the product id carries
    /// a "C" suffix, as these families name their color models.
    pub fn lookup(&self, model: &str) -> DeviceProfile {
        if let Some(profile) = self.profiles.iter().find(|p| p.matches(model)) {
            return profile.clone();
        }
        DeviceProfile {
            family: format!("generic ({})", model.trim()),
            can_color: model.contains('C'),
            ..DeviceProfile::default()
        }
    }

    pub fn get(&self, family: &str) -> Option<&DeviceProfile> {
        self.profiles.iter().find(|p| p.family == family)
    }
}

impl Default for QuirkTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn builtin_profiles() -> Vec<DeviceProfile> {
    let base = DeviceProfile::default();
    let three_head_x = vec![60, 75, 120, 160, 180, 300, 320, 480, 600, 800, 1200];
    let mid_range = vec![100, 150, 200, 240, 300, 400, 600];
    let mobile = vec![100, 150, 200, 300, 400, 600];

    vec![
        DeviceProfile {
            family: "DR-9080".into(),
            model_patterns: patterns(&["DR-9080", "DR-7580"]),
            can_color: true,
            has_jpeg: true,
            rgb_format: 2,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-7090".into(),
            model_patterns: patterns(&["DR-7090"]),
            can_color: true,
            has_flatbed: true,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-9050".into(),
            model_patterns: patterns(&["DR-9050", "DR-7550", "DR-6050", "DR-G1100", "DR-G1130"]),
            can_color: true,
            has_pixel_size: true,
            std_dpi_x: mid_range.clone(),
            std_dpi_y: mid_range,
            scan_mode_command: ScanModeCommand::Extended,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-4080".into(),
            model_patterns: patterns(&["DR-4080", "DR-4580", "DR-7080"]),
            can_color: true,
            has_flatbed: true,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-2580".into(),
            model_patterns: patterns(&["DR-2580"]),
            can_color: true,
            can_lineart: false,
            can_halftone: false,
            invert_tly: true,
            rgb_format: 1,
            color_interlace: [ColorInterlace::Rrggbb, ColorInterlace::MirroredRrggbb],
            gray_interlace: [GrayInterlace::None, GrayInterlace::Mirrored],
            duplex_interlace: DuplexInterlace::ByteAlternate,
            duplex_offset: 432,
            duplex_offset_side: Side::Back,
            fine_calibration: FineCalibration::Scan,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-2510".into(),
            model_patterns: patterns(&["DR-2510", "DR-2010"]),
            can_color: true,
            can_lineart: false,
            can_halftone: false,
            rgb_format: 1,
            always_feed: false,
            window_reserved: 0x80,
            fixed_width: true,
            valid_x: 8 * UNITS_PER_INCH + UNITS_PER_INCH / 2,
            gray_interlace: [GrayInterlace::ThreeHead; 2],
            color_interlace: [ColorInterlace::ThreeHead; 2],
            duplex_interlace: DuplexInterlace::ThreeHead,
            duplex_offset: 400,
            sw_lut: true,
            fine_calibration: FineCalibration::Scan,
            std_dpi_x: three_head_x.clone(),
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-3010".into(),
            model_patterns: patterns(&["DR-3010"]),
            can_color: true,
            can_lineart: false,
            can_halftone: false,
            rgb_format: 1,
            always_feed: false,
            window_reserved: 0x80,
            fixed_width: true,
            valid_x: 8 * UNITS_PER_INCH + UNITS_PER_INCH / 2,
            gray_interlace: [GrayInterlace::ThreeHead; 2],
            color_interlace: [ColorInterlace::ThreeHead; 2],
            duplex_interlace: DuplexInterlace::ThreeHead,
            duplex_offset: 400,
            sw_lut: true,
            invert_tly: true,
            fine_calibration: FineCalibration::Scan,
            std_dpi_x: three_head_x,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-2050".into(),
            model_patterns: patterns(&["DR-2050", "DR-2080"]),
            can_color: true,
            can_lineart: false,
            can_halftone: false,
            fixed_width: true,
            even_bpl: true,
            color_interlace: [ColorInterlace::Rrggbb; 2],
            duplex_interlace: DuplexInterlace::ByteAlternate,
            bg_color: 0x08,
            duplex_offset: 840,
            sw_lut: true,
            fine_calibration: FineCalibration::DeviceBuffer,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-3080".into(),
            model_patterns: patterns(&["DR-3080"]),
            can_color: true,
            has_btc: false,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-5060F".into(),
            model_patterns: patterns(&["DR-5060F", "DR-5020"]),
            has_btc: false,
            ppl_mod: 32,
            reverse_binary: false,
            ..base.clone()
        },
        DeviceProfile {
            family: "P-208".into(),
            model_patterns: patterns(&["P-208"]),
            can_color: true,
            invert_tly: true,
            window_reserved: 0x88,
            rgb_format: 1,
            ppl_mod: 8,
            scan_mode_command: ScanModeCommand::Standard {
                payload_head_len: true,
            },
            color_interlace: [ColorInterlace::Rrggbb, ColorInterlace::MirroredRrggbb],
            gray_interlace: [GrayInterlace::None, GrayInterlace::Mirrored],
            duplex_interlace: DuplexInterlace::ByteAlternate,
            ..base.clone()
        },
        DeviceProfile {
            family: "P-215".into(),
            model_patterns: patterns(&["P-215"]),
            can_color: true,
            has_card: true,
            invert_tly: true,
            window_reserved: 0x88,
            rgb_format: 1,
            ppl_mod: 8,
            scan_mode_command: ScanModeCommand::Standard {
                payload_head_len: true,
            },
            color_interlace: [ColorInterlace::MirroredRrggbb, ColorInterlace::Rrggbb],
            gray_interlace: [GrayInterlace::Mirrored, GrayInterlace::None],
            duplex_interlace: DuplexInterlace::ByteAlternate,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-M160".into(),
            model_patterns: patterns(&["DR-M160"]),
            can_color: true,
            can_lineart: false,
            can_halftone: false,
            has_jpeg: true,
            rgb_format: 1,
            always_feed: false,
            fixed_width: true,
            invert_tly: true,
            scan_mode_command: ScanModeCommand::Extended,
            std_dpi_x: mobile.clone(),
            std_dpi_y: mobile.clone(),
            color_interlace_by_dpi: vec![
                (100, ColorInterlace::Gbr),
                (150, ColorInterlace::Gbr),
                (200, ColorInterlace::Brg),
                (400, ColorInterlace::Gbr),
            ],
            duplex_interlace: DuplexInterlace::LineAlternate,
            duplex_offset_side: Side::Front,
            ..base.clone()
        },
        DeviceProfile {
            family: "DR-M140".into(),
            model_patterns: patterns(&["DR-M140"]),
            can_color: true,
            can_lineart: false,
            can_halftone: false,
            has_jpeg: true,
            rgb_format: 1,
            always_feed: false,
            fixed_width: true,
            invert_tly: true,
            scan_mode_command: ScanModeCommand::Extended,
            std_dpi_x: mobile.clone(),
            std_dpi_y: mobile,
            color_interlace_by_dpi: vec![
                (100, ColorInterlace::Gbr),
                (150, ColorInterlace::Gbr),
                (200, ColorInterlace::Brg),
                (400, ColorInterlace::Gbr),
            ],
            duplex_interlace: DuplexInterlace::LineAlternate,
            duplex_offset_side: Side::Back,
            ..base.clone()
        },
        DeviceProfile {
            family: "fi-5750".into(),
            model_patterns: patterns(&["fi-5750", "fi-5650", "fi-4990"]),
            can_color: true,
            has_jpeg: true,
            has_pixel_size: true,
            jpeg_duplex_interlaced: true,
            duplex_interlace: DuplexInterlace::None,
            scan_mode_command: ScanModeCommand::None,
            has_panel_counter: false,
            ..base.clone()
        },
        DeviceProfile {
            family: "M3091".into(),
            model_patterns: patterns(&["M3091", "M3092"]),
            can_color: true,
            can_halftone: false,
            color_interlace: [ColorInterlace::RasterOffset; 2],
            duplex_interlace: DuplexInterlace::RasterOffset,
            color_raster_offset: 4,
            duplex_raster_offset: 12,
            scan_mode_command: ScanModeCommand::None,
            has_panel_counter: false,
            bg_color: 0xff,
            ..base
        },
    ]
}
