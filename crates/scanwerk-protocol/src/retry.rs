// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded retry for busy devices.
//
// Classifies errors into Transient (auto-retry), UserAction (wait for user),
// and Permanent (give up). Only slow warm-up style operations retry at all;
// everything else fails fast on the first busy reply.

use std::time::Duration;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::ErrorClass;
use tracing::{debug, info, warn};

/// How long to keep retrying and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep between attempts.
    pub interval: Duration,
    /// Total time budget for sleeping; zero disables retries.
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// No retries.
    pub fn fail_fast() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_wait: Duration::ZERO,
        }
    }

    /// Half-second polling for up to three minutes, for lamp warm-up and
    /// paper feeding.
    pub fn warm_up() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(180),
        }
    }

    /// Number of retries (not counting the first attempt) this policy allows.
    pub fn max_retries(&self) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        (self.max_wait.as_millis() / self.interval.as_millis()) as u32
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry; the error is permanent or needs the user.
    GiveUp(ErrorClass),
    /// Maximum retries exhausted.
    Exhausted,
}

/// Something that can pause the calling thread.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps for real.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested sleeps without pausing.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    pub slept: Vec<Duration>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }
}

/// Classify a `ScanwerkError` into an `ErrorClass` for retry decisions.
pub fn classify_error(err: &ScanwerkError) -> ErrorClass {
    match err {
        // Transient: device still warming up, bus hiccups
        ScanwerkError::Busy => ErrorClass::Transient,
        ScanwerkError::Timeout(_) => ErrorClass::Transient,
        ScanwerkError::Transport(_) => ErrorClass::Transient,

        // User action needed
        ScanwerkError::PaperJam => ErrorClass::UserAction,
        ScanwerkError::CoverOpen => ErrorClass::UserAction,
        ScanwerkError::NoDocuments => ErrorClass::UserAction,

        // Permanent: the device said no, or the request is wrong
        ScanwerkError::Unsupported(_) => ErrorClass::Permanent,
        ScanwerkError::InvalidRequest(_) => ErrorClass::Permanent,
        ScanwerkError::DeviceOutOfMemory => ErrorClass::Permanent,
        ScanwerkError::Cancelled => ErrorClass::Permanent,
        ScanwerkError::HardwareFault { .. } => ErrorClass::Permanent,
        ScanwerkError::UnknownFault { .. } => ErrorClass::Permanent,
        ScanwerkError::UnknownDevice(_) => ErrorClass::Permanent,
        ScanwerkError::UnknownSession(_) => ErrorClass::Permanent,
        ScanwerkError::NotStarted => ErrorClass::Permanent,
        ScanwerkError::TransferPending => ErrorClass::Permanent,
        ScanwerkError::InvalidOption(_) => ErrorClass::Permanent,
        ScanwerkError::OutOfMemory(_) => ErrorClass::Permanent,
        ScanwerkError::Image(_) => ErrorClass::Permanent,
        ScanwerkError::Serialization(_) => ErrorClass::Permanent,

        // IO errors depend on the kind
        ScanwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock => ErrorClass::Transient,
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::UserAction
            }
            _ => ErrorClass::Permanent,
        },
    }
}

/// Retry predicate for device-busy replies only.
pub fn is_busy(err: &ScanwerkError) -> bool {
    matches!(err, ScanwerkError::Busy)
}

/// Decide whether to retry based on the error class and attempt count.
pub fn should_retry(err: &ScanwerkError, attempt: u32, policy: &RetryPolicy) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!(error = %err, "permanent error, not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::UserAction => {
            info!(error = %err, "user action required, not retrying");
            RetryDecision::GiveUp(ErrorClass::UserAction)
        }
        ErrorClass::Transient => {
            if attempt >= policy.max_retries() {
                RetryDecision::Exhausted
            } else {
                RetryDecision::RetryAfter(policy.interval)
            }
        }
    }
}

/// Run `op` until it succeeds, fails with an error `retryable` rejects, or the
/// policy runs out.
pub fn retry<T>(
    policy: &RetryPolicy,
    sleeper: &mut dyn Sleeper,
    retryable: impl Fn(&ScanwerkError) -> bool,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut attempt = 0u32;
    loop {
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !retryable(&err) {
            return Err(err);
        }
        match should_retry(&err, attempt, policy) {
            RetryDecision::RetryAfter(delay) => {
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                sleeper.sleep(delay);
                attempt += 1;
            }
            RetryDecision::Exhausted => {
                if attempt > 0 {
                    warn!(attempt, error = %err, "retry limit exhausted");
                }
                return Err(err);
            }
            RetryDecision::GiveUp(_) => return Err(err),
        }
    }
}
