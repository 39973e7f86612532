// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session state machine.
//
// One session drives one device through a batch: `start` prepares the next
// side (sending the window and feeding paper when a new sheet is due),
// `read` pulls device data into the side buffers and hands delivered bytes
// to the caller, and `cancel` may be called from any thread through a
// `CancelHandle`. Any error tears the batch down; the next `start` begins a
// new one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::geometry::UNITS_PER_INCH;
use scanwerk_core::quirks::{DeviceProfile, FineCalibration};
use scanwerk_core::types::{Compression, DuplexInterlace, FrameFormat, ScanMode, SessionId, Side, Source};
use scanwerk_image::{Calibration, LineConverter, PixelLayout, PostOutcome, PostProcessor, Raster};
use scanwerk_protocol::channel::CommandChannel;
use scanwerk_protocol::command::{BufferMode, WindowDescriptor, calibration, datatype, fine_uid};
use scanwerk_protocol::retry::Sleeper;
use scanwerk_protocol::transport::Transport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::params::{ImageParams, ReadPath, ScanParams};
use crate::reconstruct::{
    ColorRaster, DuplexSplitter, JpegDuplexSplitter, LineAssembler, LineTransform, SofPatcher,
};
use crate::side::ScanSide;

/// Consecutive empty reads tolerated before the device counts as stuck.
const IDLE_READ_LIMIT: usize = 1000;

/// Lines scanned of the calibration target.
const CALIBRATION_LINES: u32 = 8;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Layout of the frame the next reads deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameParams {
    pub format: FrameFormat,
    pub last_frame: bool,
    /// Pixels per line.
    pub width: usize,
    /// Lines in the frame.
    pub height: usize,
    pub bytes_per_line: usize,
    /// Bits per sample.
    pub depth: usize,
}

impl FrameParams {
    fn for_image(p: &ImageParams) -> Self {
        Self {
            format: p.format,
            last_frame: true,
            width: p.width,
            height: p.height,
            bytes_per_line: p.bpl,
            // color is reported per channel
            depth: if p.bpp == 24 { 8 } else { p.bpp },
        }
    }
}

/// Result of one `read` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Bytes written to the caller's buffer; may be zero while the device
    /// is busy.
    Bytes(usize),
    /// The current side is complete.
    EndOfData,
}

/// Thread-safe cancel request for a session.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Shading
// ---------------------------------------------------------------------------

/// Shading tables measured for one resolution and mode.
#[derive(Debug, Clone)]
struct FineTables {
    dpi_x: u32,
    mode: ScanMode,
    sides: [Calibration; 2],
}

impl FineTables {
    fn matches(&self, params: &ScanParams) -> bool {
        self.dpi_x == params.scan.dpi_x && self.mode == params.scan.mode
    }

    fn for_side(&self, params: &ScanParams, side: Side) -> Option<Calibration> {
        (self.matches(params) && !params.is_jpeg()).then(|| self.sides[side.index()].clone())
    }
}

// ---------------------------------------------------------------------------
// Page state
// ---------------------------------------------------------------------------

/// Buffers and reconstruction state for the sheet being scanned.
#[derive(Debug, Default)]
struct Page {
    sides: [ScanSide; 2],
    assemblers: [Option<LineAssembler>; 2],
    /// `None` when stored lines are delivered as they are.
    converters: [Option<LineConverter>; 2],
    /// Converted bytes of the line being delivered.
    staging: [Vec<u8>; 2],
    /// Working line for conversion.
    scratch: Vec<u8>,
    frames: [Option<FrameParams>; 2],
    splitter: Option<DuplexSplitter>,
    jpeg_split: Option<JpegDuplexSplitter>,
    sof: Option<SofPatcher>,
}

impl Page {
    fn new(params: &ScanParams, profile: &DeviceProfile, fine: Option<&FineTables>) -> Self {
        let jpeg = params.is_jpeg();
        let bg = profile.bg_color;
        let raster = (params.color_offsets != [0; 3])
            .then(|| ColorRaster::new(params.color_offsets, params.scan.width));
        let converter = params.converter();
        let frame = FrameParams::for_image(&params.image);

        let sides = Side::BOTH.map(|s| ScanSide::new(params.stored_bytes(s), params.stored_bpl(), bg));
        let assemblers = Side::BOTH.map(|s| {
            (!jpeg).then(|| {
                LineAssembler::new(
                    LineTransform::for_side(params, profile, s)
                        .with_calibration(fine.and_then(|f| f.for_side(params, s))),
                    raster.clone(),
                    params.image.skip_lines[s.index()],
                    params.scan_bytes(s),
                )
            })
        });
        let direct = jpeg || converter.is_passthrough();
        let splitter = match params.path {
            ReadPath::Interleaved(d) => DuplexSplitter::new(d, params.scan.bpl, 0, 0),
            ReadPath::RasterOffset => DuplexSplitter::new(
                DuplexInterlace::RasterOffset,
                params.scan.bpl,
                params.duplex_lag,
                params.scan.height,
            ),
            ReadPath::PerSide | ReadPath::JpegInterleaved => None,
        };
        let jpeg_split = (params.path == ReadPath::JpegInterleaved).then(|| {
            JpegDuplexSplitter::new(
                params.image.width,
                params.image.height,
                params.image.dpi_x,
                params.image.dpi_y,
            )
        });
        Self {
            sides,
            assemblers,
            converters: [(!direct).then(|| converter.clone()), (!direct).then_some(converter)],
            staging: [Vec::new(), Vec::new()],
            scratch: Vec::new(),
            frames: [Some(frame); 2],
            splitter,
            jpeg_split,
            sof: jpeg.then(|| SofPatcher::new(params.image.width, params.image.height)),
        }
    }

    /// Raw bytes still due for every side the stream carries.
    fn raw_remaining(&self, jpeg: bool) -> usize {
        let due: usize = (0..2)
            .map(|i| match &self.assemblers[i] {
                Some(a) if !jpeg => a.remaining(),
                _ => self.sides[i].expected() - self.sides[i].received(),
            })
            .sum();
        due.saturating_sub(self.splitter.as_ref().map_or(0, DuplexSplitter::pending))
    }

    fn is_drained(&self, side: Side) -> bool {
        let i = side.index();
        self.sides[i].is_drained() && self.staging[i].is_empty()
    }

    /// Hand out ready bytes of `side`, converting whole lines as needed.
    fn deliver(&mut self, side: Side, buf: &mut [u8]) -> usize {
        let i = side.index();
        let data = &mut self.sides[i];
        let Some(conv) = &self.converters[i] else {
            let n = buf.len().min(data.pending());
            buf[..n].copy_from_slice(&data.ready()[..n]);
            data.consume(n);
            return n;
        };

        let staging = &mut self.staging[i];
        let scratch = &mut self.scratch;
        let lb = data.line_bytes();
        let mut written = 0;
        while written < buf.len() {
            if staging.is_empty() {
                if data.pending() < lb {
                    break;
                }
                conv.convert_with(&data.ready()[..lb], scratch, staging);
                data.consume(lb);
                if staging.is_empty() {
                    continue;
                }
            }
            let n = (buf.len() - written).min(staging.len());
            buf[written..written + n].copy_from_slice(&staging[..n]);
            staging.drain(..n);
            written += n;
        }
        written
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An open device and the batch in progress on it.
pub struct ScanSession<T> {
    id: SessionId,
    channel: CommandChannel<T>,
    profile: DeviceProfile,
    config: ScanConfig,
    params: Option<ScanParams>,
    /// Shading tables, kept until resolution or mode change.
    fine: Option<FineTables>,
    page: Page,
    side: Side,
    started: bool,
    cancel: CancelHandle,
    /// A cancel tore down the batch and has not been reported by `read` yet.
    cancel_unreported: bool,
    sheets_done: u32,
    skipped: usize,
    idle_reads: usize,
}

impl<T: Transport> ScanSession<T> {
    pub fn new(transport: T, profile: DeviceProfile) -> Self {
        Self {
            id: SessionId::new(),
            channel: CommandChannel::new(transport),
            profile,
            config: ScanConfig::default(),
            params: None,
            fine: None,
            page: Page::default(),
            side: Side::Front,
            started: false,
            cancel: CancelHandle::default(),
            cancel_unreported: false,
            sheets_done: 0,
            skipped: 0,
            idle_reads: 0,
        }
    }

    /// Replace the sleeper used between busy retries.
    pub fn with_sleeper(self, sleeper: Box<dyn Sleeper + Send>) -> Self {
        Self {
            channel: self.channel.with_sleeper(sleeper),
            ..self
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn channel(&self) -> &CommandChannel<T> {
        &self.channel
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Side the current frame belongs to.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Sheets read completely in this batch.
    pub fn sheets_done(&self) -> u32 {
        self.sheets_done
    }

    /// Sides dropped as blank in this batch.
    pub fn skipped_pages(&self) -> usize {
        self.skipped
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Apply new settings. Rejected while a batch is running.
    #[instrument(skip(self, config), fields(session = %self.id))]
    pub fn configure(&mut self, config: ScanConfig) -> Result<()> {
        if self.started {
            return Err(ScanwerkError::InvalidRequest(
                "settings cannot change during a batch".into(),
            ));
        }
        config.validate()?;
        ScanParams::derive(&config, &self.profile)?;
        debug!(mode = ?config.mode, source = ?config.source, dpi = config.dpi_x, "configured");
        self.config = config;
        Ok(())
    }

    /// Frame layout for the current side, or for the next start when idle.
    pub fn parameters(&self) -> Result<FrameParams> {
        if self.started {
            if let Some(frame) = self.page.frames[self.side.index()] {
                return Ok(frame);
            }
        }
        let params = ScanParams::derive(&self.config, &self.profile)?;
        Ok(FrameParams::for_image(&params.image))
    }

    /// Prepare the next side for reading.
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn start(&mut self) -> Result<()> {
        self.cancel.reset();
        self.cancel_unreported = false;
        let result = self.start_side();
        if let Err(e) = &result {
            debug!(error = %e, "start failed, batch ended");
            self.started = false;
            self.cancel.reset();
        }
        result
    }

    /// Copy delivered bytes of the current side into `buf`.
    #[instrument(skip(self, buf), fields(session = %self.id, len = buf.len()))]
    pub fn read(&mut self, buf: &mut [u8]) -> Result<Delivery> {
        if !self.started {
            if std::mem::take(&mut self.cancel_unreported) {
                return Err(ScanwerkError::Cancelled);
            }
            return Err(ScanwerkError::NotStarted);
        }
        let i = self.side.index();
        if self.page.sides[i].is_finished() {
            return Err(ScanwerkError::NotStarted);
        }
        if self.page.is_drained(self.side) {
            debug!(side = ?self.side, delivered = self.page.sides[i].delivered(), "end of frame");
            self.page.sides[i].mark_finished();
            return Ok(Delivery::EndOfData);
        }

        let result = self.read_chunk(buf);
        if result.is_err() {
            self.started = false;
            self.cancel.reset();
        }
        result
    }

    /// Request cancellation. A running batch is stopped at once; the next
    /// `read` reports `Cancelled`.
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        let was_started = self.started;
        if self.check_for_cancel().is_err() && was_started {
            self.cancel_unreported = true;
        }
    }

    /// Read the current side to its end.
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; self.config.buffer_size];
        loop {
            match self.read(&mut buf)? {
                Delivery::Bytes(n) => out.extend_from_slice(&buf[..n]),
                Delivery::EndOfData => return Ok(out),
            }
        }
    }

    /// End the session and give the transport back.
    pub fn close(mut self) -> T {
        if self.started {
            self.cancel();
        }
        info!(session = %self.id, sheets = self.sheets_done, "session closed");
        self.channel.into_transport()
    }

    // -- Start ---------------------------------------------------------------

    fn start_side(&mut self) -> Result<()> {
        loop {
            if self.started && !self.page.sides[self.side.index()].is_finished() {
                return Err(ScanwerkError::TransferPending);
            }
            if self.started {
                self.next_side()?;
            } else {
                self.begin_batch()?;
            }

            let jpeg = self.params()?.is_jpeg();
            if self.config.needs_full_page() && !jpeg {
                self.drain_side()?;
                if !self.post_process()? {
                    self.skipped += 1;
                    continue;
                }
            }
            return self.check_for_cancel();
        }
    }

    fn begin_batch(&mut self) -> Result<()> {
        let source = self.config.source;
        self.side = source.first_side();

        // a sheet left over from an aborted batch
        if let Err(e) = self.channel.object_position(false) {
            debug!(error = %e, "discharge before batch failed");
        }
        self.channel.wait_ready()?;
        self.calibrate()?;

        let params = ScanParams::derive(&self.config, &self.profile)?;
        let desc = WindowDescriptor::for_request(&params.window_request(), &self.profile);
        self.channel.set_window(&desc, source)?;
        self.channel.set_scan_mode(
            self.profile.scan_mode_command,
            BufferMode::for_source(source, self.config.buffered),
        )?;
        self.page = Page::new(&params, &self.profile, self.fine.as_ref());
        self.params = Some(params);
        self.sheets_done = 0;
        self.skipped = 0;

        if !source.is_card() {
            self.channel.object_position(true)?;
            self.channel.wait_ready()?;
        }
        self.channel.start_scan(source)?;
        self.query_pixel_size()?;
        self.started = true;
        info!(source = ?source, mode = ?self.config.mode, "batch started");
        Ok(())
    }

    fn next_side(&mut self) -> Result<()> {
        let source = self.config.source;
        if source.is_duplex() {
            self.side = self.side.other();
        }
        if self.side == Side::Back && source.is_duplex() {
            debug!("back side of the current sheet");
            return Ok(());
        }

        let params = self.params()?.clone();
        self.page = Page::new(&params, &self.profile, self.fine.as_ref());
        let buffered = self.config.buffered;
        if self.profile.always_feed || !buffered || !self.profile.has_panel_counter {
            self.channel.object_position(true)?;
            if !buffered {
                self.channel.start_scan(source)?;
            }
        } else {
            let panel = self.channel.read_panel()?;
            if panel.counter == self.sheets_done {
                info!(counter = panel.counter, "no further sheet scanned");
                return Err(ScanwerkError::NoDocuments);
            }
        }
        self.query_pixel_size()?;
        debug!(sheet = self.sheets_done + 1, "next sheet");
        Ok(())
    }

    fn query_pixel_size(&mut self) -> Result<()> {
        if !self.profile.has_pixel_size {
            return Ok(());
        }
        let size = self.channel.read_pixel_size()?;
        let params = self.params.as_mut().ok_or(ScanwerkError::NotStarted)?;
        if params.apply_pixel_size(&size) {
            self.page = Page::new(params, &self.profile, self.fine.as_ref());
        }
        Ok(())
    }

    // -- Calibration ---------------------------------------------------------

    /// Measure shading tables for the configured resolution and mode unless
    /// the held ones already match. Only raw gray and color lines use them.
    fn calibrate(&mut self) -> Result<()> {
        let method = self.profile.fine_calibration;
        if method == FineCalibration::None {
            return Ok(());
        }
        let user = ScanParams::derive(&self.config, &self.profile)?;
        if user.is_jpeg() || user.scan.mode.is_binary() {
            return Ok(());
        }
        let params = ScanParams::derive(&self.calibration_config(method), &self.profile)?;
        if self.fine.as_ref().is_some_and(|f| f.matches(&params)) {
            debug!(dpi = params.scan.dpi_x, "shading tables current");
            return Ok(());
        }
        self.fine = None;
        let sides = match method {
            FineCalibration::Scan => self.calibration_scans(&params)?,
            FineCalibration::DeviceBuffer => self.calibration_buffers(&params)?,
            FineCalibration::None => return Ok(()),
        };
        info!(dpi = params.scan.dpi_x, mode = ?params.scan.mode, ?method, "fine calibration done");
        self.fine = Some(FineTables {
            dpi_x: params.scan.dpi_x,
            mode: params.scan.mode,
            sides,
        });
        Ok(())
    }

    /// A few duplex lines from the top, raw and without enhancement.
    fn calibration_config(&self, method: FineCalibration) -> ScanConfig {
        let lines = if method == FineCalibration::Scan {
            CALIBRATION_LINES
        } else {
            1
        };
        let mut geometry = self.config.geometry;
        geometry.tl_y = 0;
        geometry.br_y = (lines * UNITS_PER_INCH / self.config.dpi_y.max(1)).max(1);
        ScanConfig {
            source: Source::AdfDuplex,
            geometry,
            compression: Compression::None,
            brightness: 0,
            contrast: 0,
            buffered: false,
            ..self.config.clone()
        }
    }

    /// Scan the target lamp off, then lamp on, and average each column.
    fn calibration_scans(&mut self, params: &ScanParams) -> Result<[Calibration; 2]> {
        let source = params.scan.source;
        let desc = WindowDescriptor::for_request(&params.window_request(), &self.profile);
        self.channel.set_scan_mode(
            self.profile.scan_mode_command,
            BufferMode::for_source(source, false),
        )?;
        self.channel.set_window(&desc, source)?;

        let dark = self.scan_target(params, calibration::DARK)?;
        let white = self.scan_target(params, calibration::WHITE)?;
        let (bpl, valid) = (params.scan.bpl, params.scan.valid_bpl);
        Ok(Side::BOTH.map(|s| {
            let i = s.index();
            Calibration::from_scans(&dark[i], &white[i], bpl, valid)
        }))
    }

    /// Both sides of one calibration target scan, as stored lines.
    fn scan_target(&mut self, params: &ScanParams, kind: u8) -> Result<[Vec<u8>; 2]> {
        self.channel.calibration_scan(kind)?;
        self.page = Page::new(params, &self.profile, None);
        let previous = self.params.replace(params.clone());
        let drained = self.drain_target(params.path.is_shared());
        self.params = previous;
        drained?;
        let page = std::mem::take(&mut self.page);
        for (side, data) in Side::BOTH.iter().zip(&page.sides) {
            if data.contents().is_empty() {
                return Err(ScanwerkError::InvalidRequest(format!(
                    "calibration scan {kind:#04x} returned nothing for {side:?}"
                )));
            }
        }
        Ok(page.sides.map(|s| s.contents().to_vec()))
    }

    fn drain_target(&mut self, shared: bool) -> Result<()> {
        for side in Side::BOTH {
            while !self.page.sides[side.index()].is_eof() {
                if shared {
                    self.read_shared()?;
                } else {
                    self.read_side(side)?;
                }
                self.check_for_cancel()?;
            }
        }
        Ok(())
    }

    /// Fetch the offset and gain buffers the device keeps per resolution.
    fn calibration_buffers(&mut self, params: &ScanParams) -> Result<[Calibration; 2]> {
        let scan = &params.scan;
        let len = scan.width * 2;
        let offset = self.channel.read_fine(datatype::FINE_OFFSET, 0, scan.dpi_x, len)?;
        let uids: &[u8] = if scan.mode == ScanMode::Color {
            &[fine_uid::RED, fine_uid::GREEN, fine_uid::BLUE]
        } else {
            &[fine_uid::GRAY]
        };
        let mut gains = Vec::with_capacity(uids.len());
        for &uid in uids {
            gains.push(self.channel.read_fine(datatype::FINE_GAIN, uid, scan.dpi_x, len)?);
        }
        Ok(Side::BOTH.map(|s| {
            Calibration::from_device_buffers(&offset, &gains, s.index(), scan.valid_width)
        }))
    }

    fn drain_side(&mut self) -> Result<()> {
        while !self.page.sides[self.side.index()].is_eof() {
            self.fill()?;
            self.check_for_cancel()?;
        }
        Ok(())
    }

    /// Run the software post-processing on the current side. Returns false
    /// when the side was blank and dropped.
    fn post_process(&mut self) -> Result<bool> {
        let params = self.params()?.clone();
        let i = self.side.index();
        let data = &mut self.page.sides[i];
        if data.expected() == 0 {
            return Ok(true);
        }
        let raster = Raster::from_bytes(
            PixelLayout::for_mode(params.scan.mode),
            params.scan.width,
            data.lines(),
            data.line_bytes(),
            data.contents().to_vec(),
        )?;
        let (orig_w, orig_h) = (raster.width, raster.height);
        let post = PostProcessor {
            dpi_x: params.scan.dpi_x,
            dpi_y: params.scan.dpi_y,
            ..PostProcessor::from_config(&self.config, self.profile.bg_color)
        };

        match post.run(raster)? {
            PostOutcome::Blank => {
                info!(side = ?self.side, "blank side dropped");
                data.clear();
                data.mark_finished();
                Ok(false)
            }
            PostOutcome::Page(r) => {
                let mut conv = params.converter();
                if r.width != orig_w || r.height != orig_h {
                    conv.source_width = r.width;
                    conv.left_offset = 0;
                    let mut w = r.width * params.image.dpi_x as usize / params.scan.dpi_x.max(1) as usize;
                    if params.image.mode.is_binary() && w >= 8 {
                        w -= w % 8;
                    }
                    conv.target_width = w;
                    debug!(width = r.width, height = r.height, delivered_width = w, "page reshaped");
                }
                let frame = FrameParams {
                    width: conv.target_width,
                    height: r.height,
                    bytes_per_line: conv.target_bpl(),
                    ..FrameParams::for_image(&params.image)
                };
                data.replace(r.data, r.bpl);
                self.page.staging[i].clear();
                self.page.frames[i] = Some(frame);
                self.page.converters[i] = (!conv.is_passthrough()).then_some(conv);
                Ok(true)
            }
        }
    }

    // -- Read ----------------------------------------------------------------

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Delivery> {
        self.fill()?;
        let n = self.page.deliver(self.side, buf);
        self.check_for_cancel()?;
        Ok(Delivery::Bytes(n))
    }

    /// One device read, if the current side still expects data.
    fn fill(&mut self) -> Result<()> {
        let shared = self.params()?.path.is_shared();
        let sides = &self.page.sides;
        if shared {
            if !(sides[0].is_eof() && sides[1].is_eof()) {
                self.read_shared()?;
            }
        } else if !sides[self.side.index()].is_eof() {
            self.read_side(self.side)?;
        }
        Ok(())
    }

    /// Read length: whole lines (pairs of lines for shared streams) that
    /// fit the buffer, kept even.
    fn chunk_len(&self, params: &ScanParams) -> usize {
        let lines = if params.path.is_shared() { 2 } else { 1 };
        let unit = (lines * params.scan.bpl).max(1);
        let size = self.config.buffer_size;
        let mut bytes = size - size % unit;
        if bytes % 2 == 1 {
            bytes = bytes.saturating_sub(unit);
        }
        bytes.max(unit)
    }

    fn read_side(&mut self, side: Side) -> Result<()> {
        let params = self.params()?;
        let jpeg = params.is_jpeg();
        let len = self.chunk_len(params);
        let t = self.channel.read_image(len)?;
        let mut data = t.data;
        let i = side.index();
        let page = &mut self.page;
        if jpeg {
            if let Some(sof) = page.sof.as_mut() {
                sof.patch(&mut data);
            }
            page.sides[i].append(&data);
        } else if let Some(a) = page.assemblers[i].as_mut() {
            a.push(&data, &mut page.sides[i]);
        }
        self.note_read(data.len(), t.end_of_data)?;
        if t.end_of_data {
            self.end_of_data(&[side], jpeg);
        }
        Ok(())
    }

    fn read_shared(&mut self) -> Result<()> {
        let params = self.params()?;
        let jpeg = params.is_jpeg();
        let len = self.chunk_len(params);
        let t = self.channel.read_image(len)?;
        let mut data = t.data;
        let page = &mut self.page;
        data.truncate(page.raw_remaining(jpeg));

        if let Some(split) = page.jpeg_split.as_mut() {
            let mut out = [Vec::new(), Vec::new()];
            if split.push(&data, &mut out) {
                warn!("JPEG stream is not interleaved, back side dropped");
                page.sides[Side::Back.index()].clear();
            }
            for (side, bytes) in page.sides.iter_mut().zip(&out) {
                side.append(bytes);
            }
        } else if let Some(split) = page.splitter.as_mut() {
            let (mut front, mut back) = (Vec::new(), Vec::new());
            split.split(&data, &mut front, &mut back);
            for (i, bytes) in [front, back].iter().enumerate() {
                if let Some(a) = page.assemblers[i].as_mut() {
                    a.push(bytes, &mut page.sides[i]);
                }
            }
        }
        self.note_read(data.len(), t.end_of_data)?;
        if t.end_of_data {
            self.end_of_data(&Side::BOTH, jpeg);
        }
        Ok(())
    }

    fn note_read(&mut self, len: usize, end: bool) -> Result<()> {
        if len > 0 || end {
            self.idle_reads = 0;
            return Ok(());
        }
        self.idle_reads += 1;
        if self.idle_reads > IDLE_READ_LIMIT {
            warn!(reads = self.idle_reads, "device keeps returning no data");
            self.idle_reads = 0;
            return Err(ScanwerkError::Busy);
        }
        Ok(())
    }

    fn end_of_data(&mut self, sides: &[Side], jpeg: bool) {
        let short = self.channel.status().short_transfer;
        for &side in sides {
            let i = side.index();
            let data = &mut self.page.sides[i];
            if jpeg {
                data.shrink_to_received();
            } else if let Some(a) = self.page.assemblers[i].as_mut() {
                a.finish(data);
            }
            data.set_eof(short);
            debug!(side = ?side, bytes = data.expected(), "side complete");
        }
        let source = self.config.source;
        let sheet_done = Side::BOTH
            .iter()
            .all(|&s| !source.covers(s) || self.page.sides[s.index()].is_eof());
        if sheet_done {
            self.sheets_done += 1;
            debug!(sheets = self.sheets_done, "sheet read");
        }
    }

    // -- Cancel --------------------------------------------------------------

    /// Act on a pending cancel request: stop the device and end the batch.
    fn check_for_cancel(&mut self) -> Result<()> {
        if !self.cancel.is_cancelled() {
            return Ok(());
        }
        self.cancel.reset();
        if self.started {
            info!("cancelling scan");
            if let Err(e) = self.channel.cancel() {
                debug!(error = %e, "cancel command failed");
            }
            if let Err(e) = self.channel.object_position(false) {
                debug!(error = %e, "discharge after cancel failed");
            }
            self.started = false;
        }
        Err(ScanwerkError::Cancelled)
    }

    fn params(&self) -> Result<&ScanParams> {
        self.params.as_ref().ok_or(ScanwerkError::NotStarted)
    }
}
