// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted transports for tests: a bulk pipe and a SCSI passthrough that
// replay queued replies and record what was sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use scanwerk_core::error::{Result, ScanwerkError};

use super::scsi::{ScsiPassthrough, ScsiReply};
use super::usb::BulkPipe;
use crate::status::SenseData;

#[derive(Default)]
struct PipeScript {
    reads: VecDeque<Option<Vec<u8>>>,
    writes: Vec<Vec<u8>>,
    read_sizes: Vec<usize>,
    clears: usize,
}

/// Bulk pipe replaying queued reads. Clones share one script.
#[derive(Clone, Default)]
pub struct MockPipe {
    inner: Arc<Mutex<PipeScript>>,
}

impl MockPipe {
    fn script(&self) -> MutexGuard<'_, PipeScript> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the bytes returned by the next read.
    pub fn push_read(&self, data: Vec<u8>) {
        self.script().reads.push_back(Some(data));
    }

    /// Queue a failing read.
    pub fn push_read_error(&self) {
        self.script().reads.push_back(None);
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.script().writes.clone()
    }

    /// Buffer sizes offered to each read, in order.
    pub fn read_sizes(&self) -> Vec<usize> {
        self.script().read_sizes.clone()
    }

    pub fn clear_count(&self) -> usize {
        self.script().clears
    }
}

impl BulkPipe for MockPipe {
    fn write_bulk(&mut self, data: &[u8], _timeout_ms: u64) -> Result<usize> {
        self.script().writes.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bulk(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize> {
        let mut script = self.script();
        script.read_sizes.push(buf.len());
        match script.reads.pop_front() {
            Some(Some(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(None) | None => Err(ScanwerkError::Timeout(timeout_ms)),
        }
    }

    fn clear_halt(&mut self) -> Result<()> {
        self.script().clears += 1;
        Ok(())
    }
}

/// A command seen by [`MockPassthrough`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCommand {
    pub cdb: Vec<u8>,
    pub out: Vec<u8>,
}

enum ScriptedReply {
    Data(Vec<u8>),
    Reply(ScsiReply),
    Fail,
}

#[derive(Default)]
struct PassthroughScript {
    replies: VecDeque<ScriptedReply>,
    sent: Vec<SentCommand>,
}

/// SCSI passthrough replaying queued replies. When the queue is empty every
/// command succeeds without data.
#[derive(Clone, Default)]
pub struct MockPassthrough {
    inner: Arc<Mutex<PassthroughScript>>,
}

impl MockPassthrough {
    fn script(&self) -> MutexGuard<'_, PassthroughScript> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_data(&mut self, data: Vec<u8>) {
        self.script().replies.push_back(ScriptedReply::Data(data));
    }

    pub fn push_reply(&mut self, reply: ScsiReply) {
        self.script().replies.push_back(ScriptedReply::Reply(reply));
    }

    pub fn push_sense(&mut self, sense: SenseData) {
        self.push_reply(ScsiReply {
            transferred: 0,
            sense: Some(sense.encode().to_vec()),
        });
    }

    pub fn push_failure(&mut self) {
        self.script().replies.push_back(ScriptedReply::Fail);
    }

    pub fn sent(&self) -> Vec<SentCommand> {
        self.script().sent.clone()
    }

    /// Opcodes of every command sent so far.
    pub fn opcodes(&self) -> Vec<u8> {
        self.script().sent.iter().map(|c| c.cdb[0]).collect()
    }
}

impl ScsiPassthrough for MockPassthrough {
    fn command(
        &mut self,
        cdb: &[u8],
        out: &[u8],
        input: &mut [u8],
        _timeout_ms: u64,
    ) -> Result<ScsiReply> {
        let mut script = self.script();
        script.sent.push(SentCommand {
            cdb: cdb.to_vec(),
            out: out.to_vec(),
        });
        match script.replies.pop_front() {
            Some(ScriptedReply::Data(data)) => {
                let n = data.len().min(input.len());
                input[..n].copy_from_slice(&data[..n]);
                Ok(ScsiReply {
                    transferred: n,
                    sense: None,
                })
            }
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            Some(ScriptedReply::Fail) => Err(ScanwerkError::Transport("scripted failure".into())),
            None => Ok(ScsiReply::default()),
        }
    }
}
