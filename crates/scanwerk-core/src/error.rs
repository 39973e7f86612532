// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
///
/// The device-outcome variants mirror the closed status taxonomy decoded from
/// request-sense data; transport and session variants cover everything that
/// happens on this side of the wire.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Device outcomes --
    #[error("device busy")]
    Busy,

    #[error("paper jam")]
    PaperJam,

    #[error("cover open")]
    CoverOpen,

    #[error("no documents loaded")]
    NoDocuments,

    #[error("request not supported by the device: {0}")]
    Unsupported(String),

    #[error("device rejected the request: {0}")]
    InvalidRequest(String),

    #[error("device out of memory")]
    DeviceOutOfMemory,

    #[error("operation cancelled")]
    Cancelled,

    #[error("hardware fault (sense {sense:#x}, asc {asc:#04x}, ascq {ascq:#04x})")]
    HardwareFault { sense: u8, asc: u8, ascq: u8 },

    #[error("unknown device fault (sense {sense:#x}, asc {asc:#04x}, ascq {ascq:#04x})")]
    UnknownFault { sense: u8, asc: u8, ascq: u8 },

    // -- Transport --
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("transport timed out after {0} ms")]
    Timeout(u64),

    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -- Session --
    #[error("no such device: {0}")]
    UnknownDevice(String),

    #[error("no such session: {0}")]
    UnknownSession(String),

    #[error("scan not started")]
    NotStarted,

    #[error("previous transfer not finished")]
    TransferPending,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("buffer allocation of {0} bytes failed")]
    OutOfMemory(usize),

    // -- Image --
    #[error("image processing error: {0}")]
    Image(String),

    // -- Configuration --
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
