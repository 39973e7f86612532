// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command encoder.
//
// Pure functions from session settings to fixed-layout command blocks, plus
// decoders for the fixed-layout replies (INQUIRY, VPD, panel, sensors, pixel
// size). Geometry arrives in 1/1200 inch, which is also the unit these
// devices use on the wire, so the window builder only has to convert pixel
// counts back to base units.

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::geometry::pixels_to_units;
use scanwerk_core::quirks::{DeviceProfile, ScanModeCommand};
use scanwerk_core::types::{ScanMode, Side, Source, STANDARD_DPI};

use crate::bytes::{get_ascii, get_be, get_bits, put_be, set_bits};

/// Operation codes.
pub mod opcode {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const INQUIRY: u8 = 0x12;
    pub const SCAN: u8 = 0x1b;
    pub const SET_WINDOW: u8 = 0x24;
    pub const READ: u8 = 0x28;
    pub const OBJECT_POSITION: u8 = 0x31;
    pub const SET_SCAN_MODE: u8 = 0xd6;
    pub const CANCEL: u8 = 0xd8;
    pub const SET_SCAN_MODE2: u8 = 0xe5;
}

/// READ data type codes.
pub mod datatype {
    pub const IMAGE: u8 = 0x00;
    pub const PIXEL_SIZE: u8 = 0x80;
    pub const PANEL: u8 = 0x84;
    pub const SENSORS: u8 = 0x8b;
    pub const FINE_OFFSET: u8 = 0x90;
    pub const FINE_GAIN: u8 = 0x91;
}

/// Buffer ids for READ of the fine gain.
pub mod fine_uid {
    pub const GRAY: u8 = 0x07;
    pub const RED: u8 = 0x0c;
    pub const GREEN: u8 = 0x0a;
    pub const BLUE: u8 = 0x09;
}

/// SCAN window ids that scan the calibration target instead of paper.
pub mod calibration {
    /// Lamp off.
    pub const DARK: u8 = 0xff;
    /// Lamp on.
    pub const WHITE: u8 = 0xfe;
}

pub const REQUEST_SENSE_LEN: usize = 0x0e;
pub const INQUIRY_STD_LEN: usize = 0x30;
pub const INQUIRY_VPD_LEN: usize = 0x1e;
pub const INQUIRY_VPD_PAGE: u8 = 0xf0;
pub const WINDOW_HEADER_LEN: usize = 8;
pub const WINDOW_DESC_LEN: usize = 0x2c;
pub const PANEL_LEN: usize = 0x08;
pub const SENSORS_LEN: usize = 0x01;
pub const PIXEL_SIZE_LEN: usize = 0x20;

const SSM_PAY_LEN: usize = 0x14;
const SSM_PAY_HEAD_LEN: u8 = 0x13;
const SSM_PAGE_BUFFER: u8 = 0x32;
const SSM_PAGE_LEN: u8 = 0x0e;
const SSM2_PAY_LEN: usize = 0x10;
const SSM2_PAGE_BUFFER: u8 = 0x02;

/// One protocol operation, built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub cdb: Vec<u8>,
    /// Data sent after the command block.
    pub payload: Vec<u8>,
    /// Bytes requested back, 0 when the command returns nothing.
    pub response_len: usize,
    /// Use the short transport timeouts.
    pub short_timeout: bool,
    /// Issue REQUEST SENSE when the device reports a check condition.
    pub fetch_sense: bool,
}

impl Command {
    fn new(name: &'static str, len: usize, op: u8) -> Self {
        let mut cdb = vec![0u8; len];
        cdb[0] = op;
        Self {
            name,
            cdb,
            payload: Vec::new(),
            response_len: 0,
            short_timeout: false,
            fetch_sense: true,
        }
    }

    pub fn opcode(&self) -> u8 {
        self.cdb[0]
    }
}

// ---------------------------------------------------------------------------
// Simple commands
// ---------------------------------------------------------------------------

/// TEST UNIT READY, polled with short timeouts. Sense is fetched so a
/// warming device reads as busy rather than as a dead link.
pub fn test_unit_ready() -> Command {
    Command {
        short_timeout: true,
        ..Command::new("test_unit_ready", 6, opcode::TEST_UNIT_READY)
    }
}

pub fn request_sense() -> Command {
    let mut cmd = Command::new("request_sense", 6, opcode::REQUEST_SENSE);
    cmd.cdb[4] = REQUEST_SENSE_LEN as u8;
    cmd.response_len = REQUEST_SENSE_LEN;
    cmd.fetch_sense = false;
    cmd
}

/// Standard INQUIRY.
pub fn inquiry() -> Command {
    let mut cmd = Command::new("inquiry", 6, opcode::INQUIRY);
    cmd.cdb[4] = INQUIRY_STD_LEN as u8;
    cmd.response_len = INQUIRY_STD_LEN;
    cmd
}

/// INQUIRY for the vendor capability page.
pub fn inquiry_vpd() -> Command {
    let mut cmd = Command::new("inquiry_vpd", 6, opcode::INQUIRY);
    set_bits(&mut cmd.cdb[1], 0x1, 0, 1);
    cmd.cdb[2] = INQUIRY_VPD_PAGE;
    cmd.cdb[4] = INQUIRY_VPD_LEN as u8;
    cmd.response_len = INQUIRY_VPD_LEN;
    cmd
}

pub fn cancel() -> Command {
    Command::new("cancel", 6, opcode::CANCEL)
}

/// OBJECT POSITION: feed the next sheet or discharge the current one.
pub fn object_position(feed: bool) -> Command {
    let mut cmd = Command::new("object_position", 10, opcode::OBJECT_POSITION);
    set_bits(&mut cmd.cdb[1], 0x7, 0, u8::from(feed));
    cmd
}

/// Decode the feed flag of an OBJECT POSITION block.
pub fn decode_object_position(cdb: &[u8]) -> bool {
    get_bits(cdb[1], 0x7, 0) == 1
}

/// READ `len` bytes of the given data type.
pub fn read(data_type: u8, len: usize) -> Command {
    let mut cmd = Command::new("read", 10, opcode::READ);
    cmd.cdb[2] = data_type;
    put_be(&mut cmd.cdb, 6, 3, len as u64);
    cmd.response_len = len;
    cmd
}

/// Decode a READ block into (data type, length).
pub fn decode_read(cdb: &[u8]) -> (u8, usize) {
    (cdb[2], get_be(cdb, 6, 3) as usize)
}

/// READ of a fine calibration buffer kept by the device. The buffers are
/// selected by resolution in tens of dpi.
pub fn read_fine(data_type: u8, uid: u8, dpi_x: u32, len: usize) -> Command {
    let mut cmd = read(data_type, len);
    cmd.name = "read_fine";
    cmd.cdb[4] = uid;
    cmd.cdb[5] = (dpi_x / 10).min(0xff) as u8;
    cmd
}

/// Decode the (uid, dpi / 10) selectors of a fine calibration READ.
pub fn decode_read_fine(cdb: &[u8]) -> (u8, u8) {
    (cdb[4], cdb[5])
}

/// SCAN with the window ids for the sides the source covers.
pub fn scan(source: Source) -> Command {
    let mut cmd = Command::new("scan", 6, opcode::SCAN);
    cmd.payload = if source.is_duplex() {
        vec![Side::Front.window_id(), Side::Back.window_id()]
    } else {
        vec![source.first_side().window_id()]
    };
    cmd.cdb[4] = cmd.payload.len() as u8;
    cmd
}

/// SCAN of the calibration target on both sides; `kind` is one of the
/// [`calibration`] ids.
pub fn calibration_scan(kind: u8) -> Command {
    let mut cmd = Command::new("calibration_scan", 6, opcode::SCAN);
    cmd.payload = vec![kind, kind];
    cmd.cdb[4] = 2;
    cmd
}

/// Decode the window ids carried by a SCAN command.
pub fn decode_scan(cdb: &[u8], payload: &[u8]) -> Vec<u8> {
    let n = usize::from(cdb[4]).min(payload.len());
    payload[..n].to_vec()
}

// ---------------------------------------------------------------------------
// Set scan mode
// ---------------------------------------------------------------------------

/// Contents of the buffer-control scan mode page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferMode {
    pub duplex: bool,
    pub flatbed: bool,
    pub card: bool,
    /// Let the device scan ahead of the host.
    pub buffered: bool,
}

impl BufferMode {
    pub fn for_source(source: Source, buffered: bool) -> Self {
        Self {
            duplex: source.is_duplex(),
            flatbed: source == Source::Flatbed,
            card: source.is_card(),
            buffered,
        }
    }
}

/// SET SCAN MODE for the buffer page, in whichever flavour the device speaks.
///
/// Returns `None` when the device has no scan mode command.
pub fn set_scan_mode(flavour: ScanModeCommand, mode: BufferMode) -> Option<Command> {
    match flavour {
        ScanModeCommand::None => None,
        ScanModeCommand::Standard { payload_head_len } => {
            let mut cmd = Command::new("set_scan_mode", 6, opcode::SET_SCAN_MODE);
            set_bits(&mut cmd.cdb[1], 0x1, 4, 1);
            cmd.cdb[4] = SSM_PAY_LEN as u8;

            let mut out = vec![0u8; SSM_PAY_LEN];
            if payload_head_len {
                out[0x01] = SSM_PAY_HEAD_LEN;
            }
            out[0x04] = SSM_PAGE_BUFFER;
            out[0x05] = SSM_PAGE_LEN;
            set_bits(&mut out[0x06], 0x1, 1, u8::from(mode.duplex));
            if mode.flatbed {
                set_bits(&mut out[0x0a], 0x1, 4, 1);
            } else if mode.card {
                set_bits(&mut out[0x0a], 0x1, 3, 1);
            }
            set_bits(&mut out[0x0a], 0x1, 6, u8::from(mode.buffered));
            cmd.payload = out;
            Some(cmd)
        }
        ScanModeCommand::Extended => {
            let mut cmd = Command::new("set_scan_mode2", 12, opcode::SET_SCAN_MODE2);
            cmd.cdb[2] = SSM2_PAGE_BUFFER;
            cmd.cdb[8] = SSM2_PAY_LEN as u8;

            let mut out = vec![0u8; SSM2_PAY_LEN];
            out[0x03] = u8::from(!mode.buffered);
            out[0x06] = 0x40;
            out[0x09] = u8::from(!mode.buffered);
            cmd.payload = out;
            Some(cmd)
        }
    }
}

/// Decode a standard SET SCAN MODE buffer page.
pub fn decode_buffer_mode(payload: &[u8]) -> BufferMode {
    BufferMode {
        duplex: get_bits(payload[0x06], 0x1, 1) == 1,
        flatbed: get_bits(payload[0x0a], 0x1, 4) == 1,
        card: get_bits(payload[0x0a], 0x1, 3) == 1,
        buffered: get_bits(payload[0x0a], 0x1, 6) == 1,
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// What the session wants scanned, in pixels and base units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRequest {
    pub source: Source,
    pub mode: ScanMode,
    pub dpi_x: u32,
    pub dpi_y: u32,
    pub tl_x: u32,
    pub tl_y: u32,
    pub width_px: usize,
    pub height_px: usize,
    pub page_x: u32,
    pub brightness: i32,
    pub contrast: i32,
    pub threshold: u8,
    pub rif: bool,
    /// JPEG quality, `None` for uncompressed.
    pub jpeg_quality: Option<u8>,
}

/// The 0x2c-byte window descriptor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowDescriptor {
    pub window_id: u8,
    pub x_res: u16,
    pub y_res: u16,
    pub ulx: u32,
    pub uly: u32,
    pub width: u32,
    pub length: u32,
    pub brightness: u8,
    pub threshold: u8,
    pub contrast: u8,
    pub composition: u8,
    pub bits_per_pixel: u8,
    pub ht_type: u8,
    pub ht_pattern: u8,
    pub rif: bool,
    pub rgb: u8,
    pub padding: u8,
    pub bit_order: u16,
    pub compress_type: u8,
    pub compress_arg: u8,
    pub reserved: u8,
}

impl WindowDescriptor {
    /// Build the descriptor a device profile expects for a request.
    pub fn for_request(req: &WindowRequest, profile: &DeviceProfile) -> Self {
        let width_units = pixels_to_units(req.width_px, req.dpi_x);
        let (ulx, width) = if profile.fixed_width {
            (0, profile.max_x)
        } else if req.source == Source::Flatbed {
            (req.tl_x, width_units)
        } else {
            (
                profile.max_x.saturating_sub(req.page_x) / 2 + req.tl_x,
                width_units,
            )
        };
        let uly = if profile.invert_tly { !req.tl_y } else { req.tl_y };

        let mut desc = Self {
            window_id: req.source.first_side().window_id(),
            x_res: req.dpi_x as u16,
            y_res: req.dpi_y as u16,
            ulx,
            uly,
            width,
            length: pixels_to_units(req.height_px, req.dpi_y),
            composition: req.mode.composition_code(),
            bits_per_pixel: match req.mode {
                ScanMode::Color => 8,
                other => other.bits_per_pixel() as u8,
            },
            rif: req.rif,
            rgb: profile.rgb_format,
            reserved: profile.window_reserved,
            ..Self::default()
        };
        if profile.has_btc {
            desc.brightness = (req.brightness + 128).clamp(0, 255) as u8;
            desc.threshold = req.threshold;
            desc.contrast = (req.contrast + 128).clamp(0, 255) as u8;
        }
        if let Some(quality) = req.jpeg_quality {
            desc.compress_type = 0x80;
            desc.compress_arg = quality;
        }
        desc
    }

    pub fn encode(&self) -> [u8; WINDOW_DESC_LEN] {
        let mut b = [0u8; WINDOW_DESC_LEN];
        b[0x00] = self.window_id;
        put_be(&mut b, 0x02, 2, u64::from(self.x_res));
        put_be(&mut b, 0x04, 2, u64::from(self.y_res));
        put_be(&mut b, 0x06, 4, u64::from(self.ulx));
        put_be(&mut b, 0x0a, 4, u64::from(self.uly));
        put_be(&mut b, 0x0e, 4, u64::from(self.width));
        put_be(&mut b, 0x12, 4, u64::from(self.length));
        b[0x16] = self.brightness;
        b[0x17] = self.threshold;
        b[0x18] = self.contrast;
        b[0x19] = self.composition;
        b[0x1a] = self.bits_per_pixel;
        b[0x1b] = self.ht_type;
        b[0x1c] = self.ht_pattern;
        set_bits(&mut b[0x1d], 0x1, 7, u8::from(self.rif));
        set_bits(&mut b[0x1d], 0x7, 4, self.rgb);
        set_bits(&mut b[0x1d], 0x7, 0, self.padding);
        put_be(&mut b, 0x1e, 2, u64::from(self.bit_order));
        b[0x20] = self.compress_type;
        b[0x21] = self.compress_arg;
        b[0x2a] = self.reserved;
        b
    }

    pub fn decode(b: &[u8]) -> Result<Self> {
        if b.len() < WINDOW_DESC_LEN {
            return Err(ScanwerkError::InvalidRequest(format!(
                "window descriptor of {} bytes, need {WINDOW_DESC_LEN}",
                b.len()
            )));
        }
        Ok(Self {
            window_id: b[0x00],
            x_res: get_be(b, 0x02, 2) as u16,
            y_res: get_be(b, 0x04, 2) as u16,
            ulx: get_be(b, 0x06, 4) as u32,
            uly: get_be(b, 0x0a, 4) as u32,
            width: get_be(b, 0x0e, 4) as u32,
            length: get_be(b, 0x12, 4) as u32,
            brightness: b[0x16],
            threshold: b[0x17],
            contrast: b[0x18],
            composition: b[0x19],
            bits_per_pixel: b[0x1a],
            ht_type: b[0x1b],
            ht_pattern: b[0x1c],
            rif: get_bits(b[0x1d], 0x1, 7) == 1,
            rgb: get_bits(b[0x1d], 0x7, 4),
            padding: get_bits(b[0x1d], 0x7, 0),
            bit_order: get_be(b, 0x1e, 2) as u16,
            compress_type: b[0x20],
            compress_arg: b[0x21],
            reserved: b[0x2a],
        })
    }
}

/// SET WINDOW carrying one descriptor.
pub fn set_window(desc: &WindowDescriptor) -> Command {
    let mut cmd = Command::new("set_window", 10, opcode::SET_WINDOW);
    let mut out = vec![0u8; WINDOW_HEADER_LEN + WINDOW_DESC_LEN];
    put_be(&mut out, 6, 2, WINDOW_DESC_LEN as u64);
    out[WINDOW_HEADER_LEN..].copy_from_slice(&desc.encode());
    put_be(&mut cmd.cdb, 6, 3, out.len() as u64);
    cmd.payload = out;
    cmd
}

/// Extract the descriptor from a SET WINDOW payload.
pub fn decode_set_window(payload: &[u8]) -> Result<WindowDescriptor> {
    if payload.len() < WINDOW_HEADER_LEN {
        return Err(ScanwerkError::InvalidRequest("set window payload too short".into()));
    }
    let desc_len = get_be(payload, 6, 2) as usize;
    let end = (WINDOW_HEADER_LEN + desc_len).min(payload.len());
    WindowDescriptor::decode(&payload[WINDOW_HEADER_LEN..end])
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Standard INQUIRY reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InquiryData {
    pub peripheral_qualifier: u8,
    pub device_type: u8,
    pub response_format: u8,
    pub vendor: String,
    pub product: String,
    pub version: String,
}

pub const DEVICE_TYPE_SCANNER: u8 = 0x06;

impl InquiryData {
    pub fn parse(b: &[u8]) -> Result<Self> {
        if b.len() < 0x24 {
            return Err(ScanwerkError::Transport(format!(
                "inquiry reply of {} bytes",
                b.len()
            )));
        }
        Ok(Self {
            peripheral_qualifier: get_bits(b[0], 0x07, 5),
            device_type: get_bits(b[0], 0x1f, 0),
            response_format: get_bits(b[3], 0x07, 0),
            vendor: get_ascii(b, 0x08, 0x08),
            product: get_ascii(b, 0x10, 0x10),
            version: get_ascii(b, 0x20, 0x04),
        })
    }

    pub fn is_scanner(&self) -> bool {
        self.device_type == DEVICE_TYPE_SCANNER
    }
}

/// Vendor capability page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpdData {
    pub basic_x_res: u32,
    pub basic_y_res: u32,
    pub max_x_res: u32,
    pub max_y_res: u32,
    pub min_x_res: u32,
    pub min_y_res: u32,
    /// Standard resolutions the device advertises.
    pub std_res: Vec<u32>,
    /// Maximum window, 1/1200 inch.
    pub window_width: u32,
    pub window_length: u32,
    pub multilevel: bool,
    pub halftone: bool,
    pub monochrome: bool,
}

impl VpdData {
    pub fn parse(b: &[u8]) -> Result<Self> {
        if b.len() < INQUIRY_VPD_LEN - 1 {
            return Err(ScanwerkError::Transport(format!("vpd reply of {} bytes", b.len())));
        }
        let bits = get_be(b, 0x12, 2) as u16;
        let std_res = STANDARD_DPI
            .iter()
            .enumerate()
            .filter(|(i, _)| bits & (0x8000 >> i) != 0)
            .map(|(_, dpi)| *dpi)
            .collect();
        Ok(Self {
            basic_x_res: get_be(b, 0x05, 2) as u32,
            basic_y_res: get_be(b, 0x07, 2) as u32,
            max_x_res: get_be(b, 0x0a, 2) as u32,
            max_y_res: get_be(b, 0x0c, 2) as u32,
            min_x_res: get_be(b, 0x0e, 2) as u32,
            min_y_res: get_be(b, 0x10, 2) as u32,
            std_res,
            window_width: get_be(b, 0x14, 4) as u32,
            window_length: get_be(b, 0x18, 4) as u32,
            multilevel: get_bits(b[0x1c], 1, 3) == 1,
            halftone: get_bits(b[0x1c], 1, 2) == 1,
            monochrome: get_bits(b[0x1c], 1, 1) == 1,
        })
    }
}

/// Front panel buttons and page counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelState {
    pub start: bool,
    pub stop: bool,
    pub button3: bool,
    pub new_file: bool,
    pub count_only: bool,
    pub bypass_mode: bool,
    pub enable_led: bool,
    pub counter: u32,
}

impl PanelState {
    pub fn parse(b: &[u8]) -> Result<Self> {
        if b.len() < PANEL_LEN {
            return Err(ScanwerkError::Transport(format!("panel reply of {} bytes", b.len())));
        }
        Ok(Self {
            start: get_bits(b[0], 1, 7) == 1,
            stop: get_bits(b[0], 1, 6) == 1,
            button3: get_bits(b[0], 1, 2) == 1,
            new_file: get_bits(b[1], 1, 0) == 1,
            count_only: get_bits(b[1], 1, 1) == 1,
            bypass_mode: get_bits(b[1], 1, 2) == 1,
            enable_led: get_bits(b[2], 1, 0) == 1,
            counter: get_be(b, 0x04, 4) as u32,
        })
    }

    pub fn encode(&self) -> [u8; PANEL_LEN] {
        let mut b = [0u8; PANEL_LEN];
        set_bits(&mut b[0], 1, 7, u8::from(self.start));
        set_bits(&mut b[0], 1, 6, u8::from(self.stop));
        set_bits(&mut b[0], 1, 2, u8::from(self.button3));
        set_bits(&mut b[1], 1, 0, u8::from(self.new_file));
        set_bits(&mut b[1], 1, 1, u8::from(self.count_only));
        set_bits(&mut b[1], 1, 2, u8::from(self.bypass_mode));
        set_bits(&mut b[2], 1, 0, u8::from(self.enable_led));
        put_be(&mut b, 0x04, 4, u64::from(self.counter));
        b
    }
}

/// Paper sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sensors {
    pub adf_loaded: bool,
    pub card_loaded: bool,
}

impl Sensors {
    pub fn parse(b: &[u8]) -> Result<Self> {
        let first = b
            .first()
            .ok_or_else(|| ScanwerkError::Transport("empty sensor reply".into()))?;
        Ok(Self {
            adf_loaded: get_bits(*first, 1, 0) == 1,
            card_loaded: get_bits(*first, 1, 3) == 1,
        })
    }
}

/// Image size reported by the device after it has seen the paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
    /// Detected paper size, 1/1200 inch.
    pub paper_width: u32,
    pub paper_length: u32,
    pub driver_crop: bool,
    pub driver_lut: bool,
    pub valid: bool,
}

impl PixelSize {
    pub fn parse(b: &[u8]) -> Result<Self> {
        if b.len() < 0x11 {
            return Err(ScanwerkError::Transport(format!(
                "pixel size reply of {} bytes",
                b.len()
            )));
        }
        Ok(Self {
            width: get_be(b, 0x00, 4) as u32,
            height: get_be(b, 0x04, 4) as u32,
            paper_width: get_be(b, 0x08, 4) as u32,
            paper_length: get_be(b, 0x0c, 4) as u32,
            driver_crop: get_bits(b[0x10], 1, 7) == 1,
            driver_lut: get_bits(b[0x10], 1, 6) == 1,
            valid: get_bits(b[0x10], 1, 0) == 1,
        })
    }

    pub fn encode(&self) -> [u8; PIXEL_SIZE_LEN] {
        let mut b = [0u8; PIXEL_SIZE_LEN];
        put_be(&mut b, 0x00, 4, u64::from(self.width));
        put_be(&mut b, 0x04, 4, u64::from(self.height));
        put_be(&mut b, 0x08, 4, u64::from(self.paper_width));
        put_be(&mut b, 0x0c, 4, u64::from(self.paper_length));
        set_bits(&mut b[0x10], 1, 7, u8::from(self.driver_crop));
        set_bits(&mut b[0x10], 1, 6, u8::from(self.driver_lut));
        set_bits(&mut b[0x10], 1, 0, u8::from(self.valid));
        b
    }
}
