// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command channel: transport, status interpretation and busy retry joined
// behind one call per protocol operation.
//
// Short transfers and end-of-medium come back as data plus an end-of-data
// flag; every other non-success outcome becomes a `ScanwerkError`.

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::quirks::ScanModeCommand;
use scanwerk_core::types::Source;
use tracing::{debug, instrument, warn};

use crate::command::{
    self, BufferMode, Command, InquiryData, PanelState, PixelSize, Sensors, VpdData,
    WindowDescriptor, datatype,
};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper, is_busy, retry};
use crate::status::{Outcome, StatusCache};
use crate::transport::{Completion, Transport};

/// Bytes received by one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transfer {
    pub data: Vec<u8>,
    /// The device has no more data for this request.
    pub end_of_data: bool,
}

pub struct CommandChannel<T> {
    transport: T,
    status: StatusCache,
    sleeper: Box<dyn Sleeper + Send>,
}

fn exec_once<T: Transport>(
    transport: &mut T,
    status: &mut StatusCache,
    cmd: &Command,
) -> Result<Transfer> {
    debug!(cmd = cmd.name, transport = transport.kind(), "exec");
    let resp = transport.execute(cmd)?;
    match resp.completion {
        Completion::Complete => {
            status.clear();
            Ok(Transfer {
                data: resp.data,
                end_of_data: false,
            })
        }
        Completion::ShortRead => {
            status.clear();
            status.short_transfer = true;
            Ok(Transfer {
                data: resp.data,
                end_of_data: true,
            })
        }
        Completion::CheckCondition(sense) => {
            let outcome = status.record(&sense);
            outcome.into_result(&sense, cmd.name)?;
            let mut data = resp.data;
            if let Outcome::ShortTransfer { residual } = outcome {
                let expected = resp.requested.saturating_sub(residual as usize);
                if data.len() > expected {
                    debug!(got = data.len(), expected, residual, "trimming to residual");
                    data.truncate(expected);
                } else if data.len() < expected {
                    debug!(got = data.len(), expected, residual, "read less than residual implies");
                }
            }
            Ok(Transfer {
                data,
                end_of_data: outcome.ends_data(),
            })
        }
    }
}

impl<T: Transport> CommandChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            status: StatusCache::default(),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace the sleeper used between busy retries.
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper + Send>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Flags cached from the last status block.
    pub fn status(&self) -> &StatusCache {
        &self.status
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back, e.g. when a session closes.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Execute once; busy comes back as an error.
    pub fn exec(&mut self, cmd: &Command) -> Result<Transfer> {
        exec_once(&mut self.transport, &mut self.status, cmd)
    }

    /// Execute, retrying busy replies under `policy`.
    pub fn exec_with(&mut self, cmd: &Command, policy: &RetryPolicy) -> Result<Transfer> {
        retry(policy, &mut *self.sleeper, is_busy, || {
            exec_once(&mut self.transport, &mut self.status, cmd)
        })
    }

    // -- Operations --

    /// Poll TEST UNIT READY three times. A device still busy after that is
    /// waited out; any other failure is returned.
    #[instrument(skip(self))]
    pub fn wait_ready(&mut self) -> Result<()> {
        let tur = command::test_unit_ready();
        let mut last = ScanwerkError::Busy;
        for attempt in 0..3 {
            match self.exec(&tur) {
                Ok(_) => return Ok(()),
                Err(e) => {
                    debug!(attempt, error = %e, "device not ready");
                    last = e;
                }
            }
        }
        if !is_busy(&last) {
            return Err(last);
        }
        self.exec_with(&tur, &RetryPolicy::warm_up()).map(|_| ())
    }

    pub fn inquiry(&mut self) -> Result<InquiryData> {
        let t = self.exec(&command::inquiry())?;
        InquiryData::parse(&t.data)
    }

    pub fn inquiry_vpd(&mut self) -> Result<VpdData> {
        let t = self.exec(&command::inquiry_vpd())?;
        VpdData::parse(&t.data)
    }

    /// Send the window; duplex sources get it a second time for the back.
    pub fn set_window(&mut self, desc: &WindowDescriptor, source: Source) -> Result<()> {
        self.exec(&command::set_window(desc))?;
        if source.is_duplex() {
            let back = WindowDescriptor {
                window_id: scanwerk_core::types::Side::Back.window_id(),
                ..*desc
            };
            self.exec(&command::set_window(&back))?;
        }
        Ok(())
    }

    pub fn set_scan_mode(&mut self, flavour: ScanModeCommand, mode: BufferMode) -> Result<()> {
        match command::set_scan_mode(flavour, mode) {
            Some(cmd) => self.exec(&cmd).map(|_| ()),
            None => {
                debug!("device has no scan mode command");
                Ok(())
            }
        }
    }

    /// Feed waits for the paper; discharge fails fast.
    pub fn object_position(&mut self, feed: bool) -> Result<()> {
        let policy = if feed {
            RetryPolicy::warm_up()
        } else {
            RetryPolicy::fail_fast()
        };
        self.exec_with(&command::object_position(feed), &policy)
            .map(|_| ())
    }

    pub fn start_scan(&mut self, source: Source) -> Result<()> {
        self.exec_with(&command::scan(source), &RetryPolicy::warm_up())
            .map(|_| ())
    }

    /// Scan the calibration target on both sides, `kind` from
    /// [`command::calibration`].
    pub fn calibration_scan(&mut self, kind: u8) -> Result<()> {
        self.exec_with(&command::calibration_scan(kind), &RetryPolicy::warm_up())
            .map(|_| ())
    }

    /// Fetch one of the fine calibration buffers the device keeps per
    /// resolution.
    pub fn read_fine(&mut self, data_type: u8, uid: u8, dpi_x: u32, len: usize) -> Result<Vec<u8>> {
        let t = self.exec_with(
            &command::read_fine(data_type, uid, dpi_x, len),
            &RetryPolicy::warm_up(),
        )?;
        if t.data.len() < len {
            warn!(got = t.data.len(), len, data_type, "short calibration buffer");
        }
        Ok(t.data)
    }

    /// Read image data. A busy device yields an empty transfer.
    pub fn read_image(&mut self, len: usize) -> Result<Transfer> {
        match self.exec(&command::read(datatype::IMAGE, len)) {
            Err(ScanwerkError::Busy) => {
                debug!(len, "busy while reading, no data this round");
                Ok(Transfer::default())
            }
            other => other,
        }
    }

    pub fn read_panel(&mut self) -> Result<PanelState> {
        let t = self.exec(&command::read(datatype::PANEL, command::PANEL_LEN))?;
        PanelState::parse(&t.data)
    }

    pub fn read_sensors(&mut self) -> Result<Sensors> {
        let t = self.exec(&command::read(datatype::SENSORS, command::SENSORS_LEN))?;
        Sensors::parse(&t.data)
    }

    pub fn read_pixel_size(&mut self) -> Result<PixelSize> {
        let t = self.exec_with(
            &command::read(datatype::PIXEL_SIZE, command::PIXEL_SIZE_LEN),
            &RetryPolicy::warm_up(),
        )?;
        PixelSize::parse(&t.data)
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.exec(&command::cancel()).map(|_| ())
    }
}
