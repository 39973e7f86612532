// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};
use crate::geometry::Geometry;
use crate::types::{Compression, GrayConversion, ScanMode, Source};

/// Default transfer chunk size (2 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Settings chosen by the caller for one scan batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: ScanMode,
    pub source: Source,
    /// Horizontal resolution in dots per inch.
    pub dpi_x: u32,
    /// Vertical resolution in dots per inch.
    pub dpi_y: u32,
    /// Scan area in 1/1200 inch.
    pub geometry: Geometry,
    pub compression: Compression,
    /// JPEG quality argument passed to the device.
    pub compress_arg: u8,
    /// -127..=127
    pub brightness: i32,
    /// -127..=127
    pub contrast: i32,
    /// Binarization cut point, 0..=255.
    pub threshold: u8,
    /// Reverse image format flag in the window.
    pub rif: bool,
    pub gray_conversion: GrayConversion,
    /// Software deskew.
    pub deskew: bool,
    /// Software crop to content.
    pub crop: bool,
    /// Software despeckle diameter in pixels, 0 to disable.
    pub despeck: u32,
    /// Blank-page skip threshold in percent, 0.0 to disable.
    pub blank_skip_percent: f64,
    /// Maximum bytes requested per READ.
    pub buffer_size: usize,
    /// Let the device buffer whole pages ahead of the host.
    pub buffered: bool,
    /// Manual vertical offset between duplex sides, 1/1200 inch.
    pub duplex_offset: u32,
    /// Calibration deltas added to the device raster offsets, 1/300 inch.
    pub green_offset: i32,
    pub blue_offset: i32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Lineart,
            source: Source::AdfFront,
            dpi_x: 300,
            dpi_y: 300,
            geometry: Geometry::letter(),
            compression: Compression::None,
            compress_arg: 50,
            brightness: 0,
            contrast: 0,
            threshold: 128,
            rif: false,
            gray_conversion: GrayConversion::Average,
            deskew: false,
            crop: false,
            despeck: 0,
            blank_skip_percent: 0.0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            buffered: false,
            duplex_offset: 0,
            green_offset: 0,
            blue_offset: 0,
        }
    }
}

impl ScanConfig {
    /// Reject settings no device could honour.
    pub fn validate(&self) -> Result<()> {
        if self.dpi_x == 0 || self.dpi_y == 0 {
            return Err(ScanwerkError::InvalidOption("resolution must be non-zero".into()));
        }
        if !self.geometry.is_valid() {
            return Err(ScanwerkError::InvalidOption(format!(
                "scan area {:?} is empty or exceeds the page",
                self.geometry
            )));
        }
        if !(-127..=127).contains(&self.brightness) {
            return Err(ScanwerkError::InvalidOption(format!(
                "brightness {} outside -127..=127",
                self.brightness
            )));
        }
        if !(-127..=127).contains(&self.contrast) {
            return Err(ScanwerkError::InvalidOption(format!(
                "contrast {} outside -127..=127",
                self.contrast
            )));
        }
        if let GrayConversion::Channel(c) = self.gray_conversion {
            if c > 2 {
                return Err(ScanwerkError::InvalidOption(format!("no color channel {c}")));
            }
        }
        if !(0.0..=100.0).contains(&self.blank_skip_percent) {
            return Err(ScanwerkError::InvalidOption(format!(
                "blank threshold {}% outside 0..=100",
                self.blank_skip_percent
            )));
        }
        if self.despeck > 9 {
            return Err(ScanwerkError::InvalidOption(format!(
                "despeckle diameter {} larger than 9",
                self.despeck
            )));
        }
        if self.buffer_size < 4096 {
            return Err(ScanwerkError::InvalidOption(format!(
                "buffer size {} below 4096",
                self.buffer_size
            )));
        }
        Ok(())
    }

    /// Whether any post-processing step needs the full page in memory.
    pub fn needs_full_page(&self) -> bool {
        self.deskew || self.crop || self.despeck > 0 || self.blank_skip_percent > 0.0
    }
}

/// Per-phase transport timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportTimeouts {
    pub command_ms: u64,
    pub data_ms: u64,
    pub status_ms: u64,
    /// Divisor applied for short-timeout calls such as TEST UNIT READY.
    pub short_divisor: u64,
}

impl TransportTimeouts {
    pub fn command(&self, short: bool) -> u64 {
        self.scaled(self.command_ms, short)
    }

    pub fn data(&self, short: bool) -> u64 {
        self.scaled(self.data_ms, short)
    }

    pub fn status(&self, short: bool) -> u64 {
        self.scaled(self.status_ms, short)
    }

    fn scaled(&self, ms: u64, short: bool) -> u64 {
        if short { ms / self.short_divisor.max(1) } else { ms }
    }
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            command_ms: 30_000,
            data_ms: 30_000,
            status_ms: 30_000,
            short_divisor: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn brightness_out_of_range_rejected() {
        let cfg = ScanConfig {
            brightness: 200,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ScanwerkError::InvalidOption(_))));
    }

    #[test]
    fn short_timeout_divides() {
        let t = TransportTimeouts::default();
        assert_eq!(t.status(false), 30_000);
        assert_eq!(t.status(true), 500);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: ScanConfig = serde_json::from_str(r#"{"mode":"Color","dpi_x":200,"dpi_y":200}"#)
            .expect("parse");
        assert_eq!(cfg.mode, ScanMode::Color);
        assert_eq!(cfg.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(!cfg.needs_full_page());
    }
}
