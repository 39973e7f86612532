// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport adapter: one `execute` call per command over direct SCSI
// passthrough or USB bulk framing.
//
// Transports zero their input buffers, clamp reads to the requested length
// and tell short reads apart from hard failures. They never retry.

use scanwerk_core::error::Result;

use crate::command::Command;
use crate::status::SenseData;

pub mod mock;
pub mod scsi;
pub mod usb;

pub use mock::{MockPipe, MockPassthrough};
pub use scsi::{ScsiPassthrough, ScsiReply, ScsiTransport};
pub use usb::{BulkPipe, UsbTransport};

/// How a command finished at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// All requested bytes arrived and status was good.
    Complete,
    /// Status was good but fewer bytes arrived than requested.
    ShortRead,
    /// The device reported a check condition; sense was fetched.
    CheckCondition(SenseData),
}

/// Result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Bytes received, never more than requested.
    pub data: Vec<u8>,
    /// Bytes the command asked for.
    pub requested: usize,
    pub completion: Completion,
}

impl Response {
    pub fn sense(&self) -> Option<&SenseData> {
        match &self.completion {
            Completion::CheckCondition(sense) => Some(sense),
            _ => None,
        }
    }
}

/// A physical link to one device.
pub trait Transport: Send {
    /// Send a command with its payload and collect up to
    /// `cmd.response_len` bytes back.
    fn execute(&mut self, cmd: &Command) -> Result<Response>;

    /// Short label for logs.
    fn kind(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&mut self, cmd: &Command) -> Result<Response> {
        (**self).execute(cmd)
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}
