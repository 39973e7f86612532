// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people at the scanner.
//
// Every technical error collapses onto a short, stable list of failures that
// does not depend on the device family, each with a plain-language message and
// a clear suggestion.

use crate::error::ScanwerkError;

/// The failures a user can ever be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFailure {
    DeviceUnreachable,
    PaperJam,
    CoverOpen,
    OutOfPaper,
    OutOfMemory,
    InvalidRequest,
}

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Bus blip or busy device; we can retry automatically.
    Transient,
    /// User must do something (load paper, close cover, clear jam).
    ActionRequired,
    /// Cannot be fixed by retrying or by the user.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Which failure on the stable list this is; `None` for cancellation.
    pub failure: Option<UserFailure>,
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the system should auto-retry.
    pub retriable: bool,
    pub severity: Severity,
}

/// Map any error onto the stable user-visible list.
///
/// Returns `None` for cancellation, which is not a failure.
pub fn user_failure(err: &ScanwerkError) -> Option<UserFailure> {
    match err {
        ScanwerkError::PaperJam => Some(UserFailure::PaperJam),
        ScanwerkError::CoverOpen => Some(UserFailure::CoverOpen),
        ScanwerkError::NoDocuments => Some(UserFailure::OutOfPaper),
        ScanwerkError::DeviceOutOfMemory | ScanwerkError::OutOfMemory(_) => {
            Some(UserFailure::OutOfMemory)
        }
        ScanwerkError::Unsupported(_)
        | ScanwerkError::InvalidRequest(_)
        | ScanwerkError::InvalidOption(_)
        | ScanwerkError::NotStarted
        | ScanwerkError::TransferPending
        | ScanwerkError::UnknownSession(_)
        | ScanwerkError::Image(_)
        | ScanwerkError::Serialization(_) => Some(UserFailure::InvalidRequest),
        ScanwerkError::Busy
        | ScanwerkError::HardwareFault { .. }
        | ScanwerkError::UnknownFault { .. }
        | ScanwerkError::Transport(_)
        | ScanwerkError::Timeout(_)
        | ScanwerkError::Io(_)
        | ScanwerkError::UnknownDevice(_) => Some(UserFailure::DeviceUnreachable),
        ScanwerkError::Cancelled => None,
    }
}

/// Convert a `ScanwerkError` into a `HumanError`.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    let failure = user_failure(err);
    match failure {
        None => HumanError {
            failure,
            message: "Scanning was stopped.".into(),
            suggestion: "Start the scan again when you are ready.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        Some(UserFailure::PaperJam) => HumanError {
            failure,
            message: "The paper is stuck in the scanner.".into(),
            suggestion: "Open the feeder, gently pull out the paper, close it, and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        Some(UserFailure::CoverOpen) => HumanError {
            failure,
            message: "The scanner cover is open.".into(),
            suggestion: "Close the cover until it clicks, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        Some(UserFailure::OutOfPaper) => HumanError {
            failure,
            message: "There is no paper in the scanner.".into(),
            suggestion: "Put your pages face down in the feeder, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        Some(UserFailure::OutOfMemory) => HumanError {
            failure,
            message: "The scan is too big to hold in memory.".into(),
            suggestion: "Try a lower resolution or a smaller scan area.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        Some(UserFailure::InvalidRequest) => HumanError {
            failure,
            message: "The scanner can't do that.".into(),
            suggestion: format!("Check the scan settings and try again. ({err})"),
            retriable: false,
            severity: Severity::Permanent,
        },
        Some(UserFailure::DeviceUnreachable) => {
            let transient = matches!(
                err,
                ScanwerkError::Busy | ScanwerkError::Timeout(_) | ScanwerkError::Transport(_)
            );
            HumanError {
                failure,
                message: "We can't talk to the scanner.".into(),
                suggestion: if transient {
                    "Wait a moment; the scanner may still be warming up.".into()
                } else {
                    format!("Check that the scanner is on and plugged in, then try again. ({err})")
                },
                retriable: transient,
                severity: if transient {
                    Severity::Transient
                } else {
                    Severity::Permanent
                },
            }
        }
    }
}
