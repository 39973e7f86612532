// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-session: scan sessions on top of the command channel.
//
// Derives scan parameters from user settings and device quirks, runs the
// start/read/cancel state machine, reconstructs the device's raw streams
// into ordered per-side buffers, keeps the registry of attached devices and
// provides an in-memory simulated scanner.

pub mod params;
pub mod reconstruct;
pub mod registry;
pub mod session;
pub mod side;
pub mod sim;

pub use params::{ImageParams, ReadPath, ScanParams};
pub use registry::{DeviceInfo, DeviceRegistry, DynSession};
pub use session::{CancelHandle, Delivery, FrameParams, ScanSession};
pub use side::ScanSide;
pub use sim::{Sheet, SimulatedScanner};
