// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status/error interpreter.
//
// Decodes the fixed request-sense block into a closed outcome taxonomy. The
// decision is a lookup on the sense key refined by ASC/ASCQ; a refinement
// that is not in the table falls back to the default for its key.

use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, trace};

use crate::bytes::{get_be, get_bits, put_be, set_bits};
use crate::command::REQUEST_SENSE_LEN;

/// Decoded request-sense block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SenseData {
    pub key: u8,
    pub asc: u8,
    pub ascq: u8,
    /// End of medium.
    pub eom: bool,
    /// Incorrect length indicator: the transfer was short.
    pub ili: bool,
    /// Residual byte count when `ili` is set.
    pub information: u32,
}

impl SenseData {
    pub fn parse(b: &[u8]) -> Result<Self> {
        if b.len() < REQUEST_SENSE_LEN {
            return Err(ScanwerkError::Transport(format!(
                "sense block of {} bytes, need {REQUEST_SENSE_LEN}",
                b.len()
            )));
        }
        trace!(sense = %hex::encode(&b[..REQUEST_SENSE_LEN]), "sense block");
        Ok(Self {
            key: get_bits(b[2], 0x0f, 0),
            eom: get_bits(b[2], 1, 6) == 1,
            ili: get_bits(b[2], 1, 5) == 1,
            information: get_be(b, 3, 4) as u32,
            asc: b[0x0c],
            ascq: b[0x0d],
        })
    }

    /// Encode as a fixed-format sense block.
    pub fn encode(&self) -> [u8; REQUEST_SENSE_LEN] {
        let mut b = [0u8; REQUEST_SENSE_LEN];
        b[0] = 0x70;
        set_bits(&mut b[2], 0x0f, 0, self.key);
        set_bits(&mut b[2], 1, 6, u8::from(self.eom));
        set_bits(&mut b[2], 1, 5, u8::from(self.ili));
        put_be(&mut b, 3, 4, u64::from(self.information));
        b[7] = 6;
        b[0x0c] = self.asc;
        b[0x0d] = self.ascq;
        b
    }

    pub fn short_read(residual: u32) -> Self {
        Self {
            ili: true,
            information: residual,
            ..Self::default()
        }
    }

    pub fn with_code(key: u8, asc: u8, ascq: u8) -> Self {
        Self {
            key,
            asc,
            ascq,
            ..Self::default()
        }
    }
}

/// What a status block means for the command that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Good,
    /// Success, but `residual` of the requested bytes were not sent.
    ShortTransfer { residual: u32 },
    EndOfMedium,
    Busy,
    PaperJam,
    CoverOpen,
    NoMedia,
    Unsupported,
    InvalidRequest,
    OutOfMemory,
    Cancelled,
    HardwareFault,
    UnknownFault,
}

impl Outcome {
    /// Whether the command completed and its data can be used.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Good | Self::ShortTransfer { .. } | Self::EndOfMedium)
    }

    /// Whether no more data follows this transfer.
    pub fn ends_data(self) -> bool {
        matches!(self, Self::ShortTransfer { .. } | Self::EndOfMedium)
    }

    /// Convert a failing outcome into the matching error.
    pub fn into_result(self, sense: &SenseData, command: &str) -> Result<()> {
        match self {
            Self::Good | Self::ShortTransfer { .. } | Self::EndOfMedium => Ok(()),
            Self::Busy => Err(ScanwerkError::Busy),
            Self::PaperJam => Err(ScanwerkError::PaperJam),
            Self::CoverOpen => Err(ScanwerkError::CoverOpen),
            Self::NoMedia => Err(ScanwerkError::NoDocuments),
            Self::Unsupported => Err(ScanwerkError::Unsupported(command.to_string())),
            Self::InvalidRequest => Err(ScanwerkError::InvalidRequest(format!(
                "{command} (asc {:#04x}, ascq {:#04x})",
                sense.asc, sense.ascq
            ))),
            Self::OutOfMemory => Err(ScanwerkError::DeviceOutOfMemory),
            Self::Cancelled => Err(ScanwerkError::Cancelled),
            Self::HardwareFault => Err(ScanwerkError::HardwareFault {
                sense: sense.key,
                asc: sense.asc,
                ascq: sense.ascq,
            }),
            Self::UnknownFault => Err(ScanwerkError::UnknownFault {
                sense: sense.key,
                asc: sense.asc,
                ascq: sense.ascq,
            }),
        }
    }
}

/// Map a sense block to an outcome.
pub fn interpret(s: &SenseData) -> Outcome {
    match s.key {
        0x0 => {
            if s.ili {
                Outcome::ShortTransfer {
                    residual: s.information,
                }
            } else if s.eom {
                Outcome::EndOfMedium
            } else {
                Outcome::Good
            }
        }
        // recovered error, e.g. parameter rounded
        0x1 => Outcome::Good,
        0x2 => Outcome::Busy,
        0x3 => match (s.asc, s.ascq) {
            (0x3a, 0x00) => Outcome::NoMedia,
            (0x80, 0x00) | (0x81, 0x01) | (0x81, 0x02) | (0x81, 0x04) => Outcome::PaperJam,
            (0x80, 0x01) => Outcome::CoverOpen,
            _ => Outcome::HardwareFault,
        },
        0x4 => Outcome::HardwareFault,
        0x5 => match (s.asc, s.ascq) {
            (0x25, _) => Outcome::Unsupported,
            (0x3a, _) => Outcome::NoMedia,
            (0x55, _) => Outcome::OutOfMemory,
            _ => Outcome::InvalidRequest,
        },
        0x6 => match s.asc {
            // device reset, or parameters changed by another initiator
            0x29 | 0x2a => Outcome::Good,
            _ => Outcome::HardwareFault,
        },
        0xb => match (s.asc, s.ascq) {
            (0x00, 0x00) => Outcome::Cancelled,
            _ => Outcome::HardwareFault,
        },
        _ => Outcome::UnknownFault,
    }
}

/// Flags from the last status block, kept for the read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCache {
    /// Bytes the device did not send on the last short transfer.
    pub residual: u32,
    pub short_transfer: bool,
    pub end_of_medium: bool,
}

impl StatusCache {
    /// Interpret a sense block and remember its transfer flags.
    pub fn record(&mut self, sense: &SenseData) -> Outcome {
        let outcome = interpret(sense);
        self.short_transfer = matches!(outcome, Outcome::ShortTransfer { .. });
        self.end_of_medium = matches!(outcome, Outcome::EndOfMedium);
        self.residual = match outcome {
            Outcome::ShortTransfer { residual } => residual,
            _ => 0,
        };
        debug!(
            key = sense.key,
            asc = sense.asc,
            ascq = sense.ascq,
            ?outcome,
            residual = self.residual,
            "status interpreted"
        );
        outcome
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
