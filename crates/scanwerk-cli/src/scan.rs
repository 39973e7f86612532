// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `scan` subcommand: identify a simulated device through the registry, run
// a batch until the feeder is empty and write one image per delivered side.

use std::path::PathBuf;

use scanwerk_core::config::{ScanConfig, TransportTimeouts};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::quirks::QuirkTable;
use scanwerk_core::types::Side;
use scanwerk_protocol::transport::ScsiTransport;
use scanwerk_session::{DeviceRegistry, DynSession, Sheet, SimulatedScanner};
use serde::Serialize;
use tracing::{info, instrument};

use crate::services::pages;

const DEVICE_NAME: &str = "sim0";

/// Everything one scan run needs.
#[derive(Debug, Clone)]
pub struct ScanJob {
    /// Product id the simulated device reports.
    pub model: String,
    pub config: ScanConfig,
    /// Feeder contents, top sheet first.
    pub sheets: Vec<Sheet>,
    pub output: PathBuf,
    pub quirks: QuirkTable,
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub device: String,
    pub family: String,
    pub files: Vec<PathBuf>,
    pub sheets: u32,
    pub skipped: usize,
}

#[instrument(skip(job), fields(model = %job.model, sheets = job.sheets.len()))]
pub fn run(job: &ScanJob) -> Result<ScanReport> {
    let sim = SimulatedScanner::new(job.quirks.lookup(&job.model));
    sim.load(job.sheets.iter().copied());

    let mut registry = DeviceRegistry::new(job.quirks.clone());
    let profile = registry.identify(
        DEVICE_NAME,
        Box::new(ScsiTransport::new(sim, TransportTimeouts::default())),
    )?;
    let id = registry.open(DEVICE_NAME)?;
    let result = registry
        .session_mut(id)
        .and_then(|session| scan_batch(session, job));
    registry.shutdown();

    let (files, sheets, skipped) = result?;
    info!(files = files.len(), sheets, skipped, "scan finished");
    Ok(ScanReport {
        device: DEVICE_NAME.to_string(),
        family: profile.family,
        files,
        sheets,
        skipped,
    })
}

fn scan_batch(session: &mut DynSession, job: &ScanJob) -> Result<(Vec<PathBuf>, u32, usize)> {
    session.configure(job.config.clone())?;
    let duplex = job.config.source.is_duplex();
    let mut files = Vec::new();
    let (mut sheet, mut last) = (0u32, None);
    loop {
        match session.start() {
            Ok(()) => {}
            // an empty feeder ends the batch once anything was scanned
            Err(ScanwerkError::NoDocuments) if session.sheets_done() > 0 => break,
            Err(e) => return Err(e),
        }
        let side = session.side();
        // a back directly after its front belongs to the same sheet
        if !(duplex && side == Side::Back && last == Some(Side::Front)) {
            sheet += 1;
        }
        last = Some(side);
        let frame = session.parameters()?;
        let data = session.read_frame()?;
        let name = pages::file_name(sheet, side, frame.format);
        let path = pages::write_frame(&job.output, &name, &frame, data)?;
        info!(path = %path.display(), ?side, "page written");
        files.push(path);
    }
    Ok((files, session.sheets_done(), session.skipped_pages()))
}
