// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: core types, error definitions, configuration and the device quirk
// table shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod human_errors;
pub mod quirks;
pub mod types;

pub use config::{ScanConfig, TransportTimeouts};
pub use error::ScanwerkError;
pub use geometry::Geometry;
pub use quirks::{DeviceProfile, QuirkTable};
pub use types::*;
