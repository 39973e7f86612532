// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// USB bulk transport.
//
// Each command travels in up to four bulk phases: a 12-byte header wrapping
// the command block, an optional header-wrapped payload, an optional data
// read and a 4-byte status read. A non-zero status byte, a zero-length data
// read or a failed status read clears the pipe and fetches sense with a
// nested REQUEST SENSE.

use std::thread;
use std::time::Duration;

use scanwerk_core::config::TransportTimeouts;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::quirks::DeviceProfile;
use tracing::{debug, trace, warn};

use super::{Completion, Response, Transport};
use crate::bytes::get_be;
use crate::command::{self, Command};
use crate::status::SenseData;

pub const USB_HEADER_LEN: usize = 12;
pub const USB_COMMAND_LEN: usize = 12;
pub const USB_STATUS_LEN: usize = 4;
const EXTRA_STATUS_LEN: usize = 4;

/// Raw bulk endpoints of one USB device.
pub trait BulkPipe: Send {
    /// Write `data`, returning the number of bytes accepted.
    fn write_bulk(&mut self, data: &[u8], timeout_ms: u64) -> Result<usize>;
    /// Read into `buf`, returning the number of bytes received.
    fn read_bulk(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize>;
    fn clear_halt(&mut self) -> Result<()>;
}

struct StatusPhase {
    sense: Option<SenseData>,
    extra_len: usize,
}

pub struct UsbTransport<P> {
    pipe: P,
    timeouts: TransportTimeouts,
    /// Data and status reads carry a 12-byte header.
    padded_read: bool,
    /// An extra status block with a length follows every command.
    extra_status: bool,
    clear_delay: Duration,
}

impl<P: BulkPipe> UsbTransport<P> {
    pub fn new(pipe: P, timeouts: TransportTimeouts, profile: &DeviceProfile) -> Self {
        Self {
            pipe,
            timeouts,
            padded_read: profile.padded_read,
            extra_status: profile.extra_status,
            clear_delay: Duration::from_millis(100),
        }
    }

    /// Pause before clearing a halted pipe.
    pub fn with_clear_delay(mut self, delay: Duration) -> Self {
        self.clear_delay = delay;
        self
    }

    pub fn pipe(&self) -> &P {
        &self.pipe
    }

    fn write_packet(&mut self, phase: &str, kind: u8, tag: u8, body: &[u8], timeout: u64) -> Result<()> {
        let mut packet = vec![0u8; USB_HEADER_LEN + body.len()];
        packet[3] = (packet.len() - 4) as u8;
        packet[5] = kind;
        packet[6] = tag;
        packet[USB_HEADER_LEN..].copy_from_slice(body);
        trace!(phase, packet = %hex::encode(&packet), timeout, "usb >>");

        let wrote = self.pipe.write_bulk(&packet, timeout)?;
        if wrote != packet.len() {
            debug!(phase, wrote, expected = packet.len(), "usb short write");
            return Err(ScanwerkError::Transport(format!(
                "{phase}: wrote {wrote} of {} bytes",
                packet.len()
            )));
        }
        Ok(())
    }

    fn read_status(&mut self, cmd: &Command) -> Result<StatusPhase> {
        let padding = if self.padded_read { USB_HEADER_LEN } else { 0 };
        let status_offset = padding + USB_STATUS_LEN - 1;
        let mut len = padding + USB_STATUS_LEN;
        if self.extra_status {
            len += EXTRA_STATUS_LEN;
        }

        let mut buf = vec![0u8; len];
        let timeout = self.timeouts.status(cmd.short_timeout);
        let sense = match self.pipe.read_bulk(&mut buf, timeout) {
            Err(e) => {
                debug!(cmd = cmd.name, error = %e, "usb status read failed, clearing");
                Some(self.clear(true, cmd.fetch_sense)?)
            }
            Ok(n) if n != len => {
                debug!(cmd = cmd.name, got = n, expected = len, "usb short status, clearing");
                Some(self.clear(true, cmd.fetch_sense)?)
            }
            Ok(_) if buf[status_offset] != 0 => {
                debug!(cmd = cmd.name, status = buf[status_offset], "usb check condition");
                Some(self.clear(false, cmd.fetch_sense)?)
            }
            Ok(_) => None,
        };
        trace!(status = %hex::encode(&buf), "usb status <<");

        let extra_len = if self.extra_status {
            get_be(&buf, 4, 4) as usize
        } else {
            0
        };
        Ok(StatusPhase { sense, extra_len })
    }

    /// Recover from a failed phase, returning the device's sense data.
    fn clear(&mut self, clear_halt: bool, fetch_sense: bool) -> Result<SenseData> {
        if !self.clear_delay.is_zero() {
            thread::sleep(self.clear_delay);
        }
        if clear_halt {
            debug!("usb clear halt");
            self.pipe.clear_halt()?;
        }
        if !fetch_sense {
            return Err(ScanwerkError::Transport("check condition".into()));
        }

        let resp = self.execute(&command::request_sense())?;
        match resp.completion {
            Completion::Complete => SenseData::parse(&resp.data),
            Completion::ShortRead | Completion::CheckCondition(_) => {
                warn!(got = resp.data.len(), "usb request sense came back short");
                Err(ScanwerkError::Transport("request sense failed".into()))
            }
        }
    }
}

impl<P: BulkPipe> Transport for UsbTransport<P> {
    fn execute(&mut self, cmd: &Command) -> Result<Response> {
        let empty = |completion| Response {
            data: Vec::new(),
            requested: cmd.response_len,
            completion,
        };

        // command phase
        let mut block = [0u8; USB_COMMAND_LEN];
        let n = cmd.cdb.len().min(USB_COMMAND_LEN);
        block[..n].copy_from_slice(&cmd.cdb[..n]);
        let timeout = self.timeouts.command(cmd.short_timeout);
        self.write_packet("cmd", 1, 0x90, &block, timeout)?;

        let mut extra_len = 0;
        if self.extra_status {
            let status = self.read_status(cmd)?;
            if let Some(sense) = status.sense {
                return Ok(empty(Completion::CheckCondition(sense)));
            }
            extra_len = status.extra_len;
        }

        if !cmd.payload.is_empty() {
            let timeout = self.timeouts.data(cmd.short_timeout);
            self.write_packet("out", 2, 0xb0, &cmd.payload, timeout)?;
        }

        // data phase
        let offset = if self.padded_read { USB_HEADER_LEN } else { 0 };
        let in_length = offset + cmd.response_len;
        let mut input = Vec::new();
        if cmd.response_len > 0 {
            let mut want = in_length;
            if self.extra_status && extra_len > 0 && cmd.response_len > extra_len {
                debug!(requested = cmd.response_len, extra_len, "usb adjusting read to extra length");
                want = offset + extra_len;
            }
            input = vec![0u8; want];
            let timeout = self.timeouts.data(cmd.short_timeout);
            let actual = match self.pipe.read_bulk(&mut input, timeout) {
                Ok(n) => n.min(want),
                Err(e) => {
                    debug!(cmd = cmd.name, error = %e, "usb data read failed");
                    0
                }
            };
            if actual == 0 {
                debug!(cmd = cmd.name, "usb got no data, clearing");
                let sense = self.clear(true, cmd.fetch_sense)?;
                return Ok(empty(Completion::CheckCondition(sense)));
            }
            if actual < offset {
                return Err(ScanwerkError::Transport(format!(
                    "{}: read {actual} bytes, shorter than header",
                    cmd.name
                )));
            }
            input.truncate(actual);
        }

        let status = self.read_status(cmd)?;
        let data = input.get(offset..).map(<[u8]>::to_vec).unwrap_or_default();
        let completion = match status.sense {
            Some(sense) => Completion::CheckCondition(sense),
            None if cmd.response_len > 0 && input.len() != in_length => {
                debug!(cmd = cmd.name, got = input.len(), expected = in_length, "usb short read");
                Completion::ShortRead
            }
            None => Completion::Complete,
        };
        debug!(cmd = cmd.name, requested = cmd.response_len, received = data.len(), ?completion, "usb <<");

        Ok(Response {
            data,
            requested: cmd.response_len,
            completion,
        })
    }

    fn kind(&self) -> &'static str {
        "usb"
    }
}
