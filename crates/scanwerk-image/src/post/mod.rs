// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Software post-processing of a fully materialized page.
//
// Steps run in a fixed order: skew detection and rotation, content crop,
// speckle removal, then the blank-page check. Each step is optional.

pub mod blank;
pub mod crop;
pub mod despeck;
pub mod edges;
pub mod skew;

use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::Result;
use tracing::{debug, info, instrument};

use crate::raster::Raster;

/// Result of post-processing one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// The processed page.
    Page(Raster),
    /// The page was blank and should be skipped.
    Blank,
}

/// Which post-processing steps to run, and the scan context they need.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessor {
    pub deskew: bool,
    pub crop: bool,
    /// Largest speckle diameter to remove, 0 to disable.
    pub despeck: usize,
    /// Blank threshold in percent, 0.0 to disable.
    pub blank_percent: f64,
    /// Fill for areas uncovered by rotation.
    pub bg_color: u8,
    pub dpi_x: u32,
    pub dpi_y: u32,
}

impl PostProcessor {
    pub fn from_config(cfg: &ScanConfig, bg_color: u8) -> Self {
        Self {
            deskew: cfg.deskew,
            crop: cfg.crop,
            despeck: cfg.despeck as usize,
            blank_percent: cfg.blank_skip_percent,
            bg_color,
            dpi_x: cfg.dpi_x,
            dpi_y: cfg.dpi_y,
        }
    }

    /// Whether any step is enabled.
    pub fn is_active(&self) -> bool {
        self.deskew || self.crop || self.despeck > 0 || self.blank_percent > 0.0
    }

    #[instrument(skip(self, raster), fields(width = raster.width, height = raster.height))]
    pub fn run(&self, mut raster: Raster) -> Result<PostOutcome> {
        if self.deskew {
            match skew::find_skew(&raster, self.dpi_y) {
                Some(s) => {
                    info!(slope = s.slope, cx = s.center_x, cy = s.center_y, "Deskewing page");
                    raster = skew::deskew(&raster, &s, self.bg_color)?;
                }
                None => debug!("No skew detected"),
            }
        }

        if self.crop {
            match crop::find_edges(&raster, self.dpi_x, self.dpi_y) {
                Some(b) => {
                    info!(?b, "Cropping page");
                    crop::crop(&mut raster, b)?;
                }
                None => debug!("No edges found, page left uncropped"),
            }
        }

        if self.despeck > 0 {
            debug!(diameter = self.despeck, "Removing speckles");
            despeck::despeck(&mut raster, self.despeck);
        }

        if self.blank_percent > 0.0 {
            let density = blank::density(&raster);
            if density <= self.blank_percent / 100.0 {
                info!(density, threshold = self.blank_percent, "Blank page skipped");
                return Ok(PostOutcome::Blank);
            }
            debug!(density, "Page has content");
        }

        Ok(PostOutcome::Page(raster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelLayout;

    fn processor() -> PostProcessor {
        PostProcessor {
            deskew: false,
            crop: false,
            despeck: 0,
            blank_percent: 0.0,
            bg_color: 0x10,
            dpi_x: 75,
            dpi_y: 75,
        }
    }

    #[test]
    fn inactive_processor_returns_page_unchanged() {
        let p = processor();
        assert!(!p.is_active());
        let r = Raster::filled(PixelLayout::Gray, 8, 8, 0x42);
        assert_eq!(p.run(r.clone()).expect("run"), PostOutcome::Page(r));
    }

    #[test]
    fn blank_page_is_reported() {
        let p = PostProcessor {
            blank_percent: 2.0,
            ..processor()
        };
        let r = Raster::filled(PixelLayout::Gray, 32, 32, 0xff);
        assert_eq!(p.run(r).expect("run"), PostOutcome::Blank);
    }

    #[test]
    fn crop_shrinks_to_sheet() {
        let p = PostProcessor {
            crop: true,
            ..processor()
        };
        let mut r = Raster::filled(PixelLayout::Gray, 120, 120, 0x10);
        for y in 30..90 {
            r.row_mut(y)[20..100].fill(0xf0);
        }
        match p.run(r).expect("run") {
            PostOutcome::Page(out) => {
                assert!(out.width < 90 && out.width > 70, "width {}", out.width);
                assert!(out.height < 65 && out.height > 50, "height {}", out.height);
            }
            PostOutcome::Blank => panic!("sheet reported blank"),
        }
    }

    #[test]
    fn from_config_copies_toggles() {
        let cfg = ScanConfig {
            deskew: true,
            despeck: 3,
            ..ScanConfig::default()
        };
        let p = PostProcessor::from_config(&cfg, 0xee);
        assert!(p.deskew && !p.crop);
        assert_eq!(p.despeck, 3);
        assert!(p.is_active());
    }
}
