// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk Protocol: fixed-layout command blocks, request-sense
// interpretation, SCSI and USB bulk transports, and the command channel that
// joins them under a bounded busy-retry policy.

pub mod bytes;
pub mod channel;
pub mod command;
pub mod retry;
pub mod status;
pub mod transport;

pub use channel::{CommandChannel, Transfer};
pub use command::{Command, WindowDescriptor, WindowRequest};
pub use retry::{RetryPolicy, classify_error};
pub use status::{Outcome, SenseData, StatusCache};
pub use transport::{BulkPipe, ScsiPassthrough, ScsiTransport, Transport, UsbTransport};
