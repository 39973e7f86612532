// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Direct SCSI transport. Command and status framing is done by the host
// passthrough driver; this layer only prepares buffers and decodes sense.

use scanwerk_core::config::TransportTimeouts;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, trace};

use super::{Completion, Response, Transport};
use crate::command::Command;
use crate::status::SenseData;

/// What the passthrough driver reports for one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScsiReply {
    /// Bytes written into the input buffer.
    pub transferred: usize,
    /// Sense block when the device reported CHECK CONDITION.
    pub sense: Option<Vec<u8>>,
}

/// Host-side SCSI generic passthrough.
pub trait ScsiPassthrough: Send {
    fn command(
        &mut self,
        cdb: &[u8],
        out: &[u8],
        input: &mut [u8],
        timeout_ms: u64,
    ) -> Result<ScsiReply>;
}

pub struct ScsiTransport<D> {
    device: D,
    timeouts: TransportTimeouts,
}

impl<D: ScsiPassthrough> ScsiTransport<D> {
    pub fn new(device: D, timeouts: TransportTimeouts) -> Self {
        Self { device, timeouts }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: ScsiPassthrough> Transport for ScsiTransport<D> {
    fn execute(&mut self, cmd: &Command) -> Result<Response> {
        trace!(cmd = cmd.name, cdb = %hex::encode(&cmd.cdb), "scsi >>");
        if !cmd.payload.is_empty() {
            trace!(out = %hex::encode(&cmd.payload), "scsi out >>");
        }

        let mut input = vec![0u8; cmd.response_len];
        let timeout = self.timeouts.command(cmd.short_timeout);
        let reply = self
            .device
            .command(&cmd.cdb, &cmd.payload, &mut input, timeout)?;

        let received = reply.transferred.min(cmd.response_len);
        input.truncate(received);

        let completion = match reply.sense {
            Some(raw) if cmd.fetch_sense => Completion::CheckCondition(SenseData::parse(&raw)?),
            Some(_) => {
                debug!(cmd = cmd.name, "check condition without sense fetch");
                return Err(ScanwerkError::Transport(format!(
                    "{} reported check condition",
                    cmd.name
                )));
            }
            None if received < cmd.response_len => Completion::ShortRead,
            None => Completion::Complete,
        };
        debug!(cmd = cmd.name, requested = cmd.response_len, received, ?completion, "scsi <<");

        Ok(Response {
            data: input,
            requested: cmd.response_len,
            completion,
        })
    }

    fn kind(&self) -> &'static str {
        "scsi"
    }
}
