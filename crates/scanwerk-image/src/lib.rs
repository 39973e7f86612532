// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-image: raster handling for scanned pages.
//
// Provides the raster model used for fully buffered sides, delivery-time
// line conversion (color to gray or binary, horizontal decimation, margin
// skip), per-pixel shading correction, the software brightness/contrast
// table, and page post-processing (deskew, crop, despeckle, blank detection).

pub mod calibration;
pub mod downsample;
pub mod lut;
pub mod post;
pub mod raster;

pub use calibration::Calibration;
pub use downsample::LineConverter;
pub use lut::Lut;
pub use post::{PostOutcome, PostProcessor};
pub use raster::{PixelLayout, Raster};
