// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Scanwerk scanner sessions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an open scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One face of a scanned sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    /// Index into per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Front => 0,
            Self::Back => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    /// Window identifier used by SET WINDOW and SCAN.
    pub fn window_id(self) -> u8 {
        match self {
            Self::Front => 0x00,
            Self::Back => 0x01,
        }
    }

    pub const BOTH: [Side; 2] = [Side::Front, Side::Back];
}

/// Scan mode, ordered from lowest to highest fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScanMode {
    Lineart,
    Halftone,
    Gray,
    Color,
}

impl ScanMode {
    /// Window descriptor image composition code.
    pub fn composition_code(self) -> u8 {
        match self {
            Self::Lineart => 0x00,
            Self::Halftone => 0x01,
            Self::Gray => 0x02,
            Self::Color => 0x05,
        }
    }

    pub fn from_composition_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Lineart),
            0x01 => Some(Self::Halftone),
            0x02 => Some(Self::Gray),
            0x03..=0x05 => Some(Self::Color),
            _ => None,
        }
    }

    /// Bits per pixel delivered in this mode.
    pub fn bits_per_pixel(self) -> usize {
        match self {
            Self::Lineart | Self::Halftone => 1,
            Self::Gray => 8,
            Self::Color => 24,
        }
    }

    /// Whether this is a one-bit mode.
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Lineart | Self::Halftone)
    }
}

/// Where paper comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Flatbed,
    AdfFront,
    AdfBack,
    AdfDuplex,
    CardFront,
    CardBack,
    CardDuplex,
}

impl Source {
    pub fn is_duplex(self) -> bool {
        matches!(self, Self::AdfDuplex | Self::CardDuplex)
    }

    pub fn is_card(self) -> bool {
        matches!(self, Self::CardFront | Self::CardBack | Self::CardDuplex)
    }

    /// Side scanned first in a batch.
    pub fn first_side(self) -> Side {
        match self {
            Self::AdfBack | Self::CardBack => Side::Back,
            _ => Side::Front,
        }
    }

    /// Whether this source produces data for the given side.
    pub fn covers(self, side: Side) -> bool {
        match side {
            Side::Front => !matches!(self, Self::AdfBack | Self::CardBack),
            Side::Back => matches!(
                self,
                Self::AdfBack | Self::AdfDuplex | Self::CardBack | Self::CardDuplex
            ),
        }
    }
}

/// Hardware compression requested in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compression {
    None,
    Jpeg,
}

impl Compression {
    pub fn window_code(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Jpeg => 0x80,
        }
    }
}

/// Layout of bytes handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameFormat {
    Gray,
    Rgb,
    Jpeg,
}

/// How the device orders the color samples of one scan line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorInterlace {
    /// rgbrgb...
    Rgb,
    /// bgrbgr...
    Bgr,
    /// brgbrg...
    Brg,
    /// gbrgbr...
    Gbr,
    /// RRR...GGG...BBB...
    Rrggbb,
    /// RRR...GGG...BBB... with each plane mirrored
    MirroredRrggbb,
    /// three-head contact sensor layout with 1/12 padding
    ThreeHead,
    /// RRR...GGG...BBB... with green and blue arriving k lines late
    RasterOffset,
}

/// How the device orders the samples of one gray scan line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrayInterlace {
    None,
    /// mirrored line
    Mirrored,
    /// three-head contact sensor layout with 1/12 padding
    ThreeHead,
}

/// How front and back data share one transfer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DuplexInterlace {
    /// Each side is read with its own transfer.
    None,
    /// Whole front line then whole back line.
    LineAlternate,
    /// Alternating bytes: front, back, front, back.
    ByteAlternate,
    /// Six-byte groups split across the three-head sensors.
    ThreeHead,
    /// Single stream of lines, back trailing front by a fixed offset.
    RasterOffset,
}

/// How a color sample is reduced to gray at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrayConversion {
    /// Mean of the three channels.
    Average,
    /// Single channel (0 = red, 1 = green, 2 = blue).
    Channel(u8),
}

impl Default for GrayConversion {
    fn default() -> Self {
        Self::Average
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Busy device or bus blip; safe to retry automatically.
    Transient,
    /// User must act (load paper, close cover, clear jam).
    UserAction,
    /// Retrying will not help.
    Permanent,
}

/// Standard resolutions, ascending.
pub const STANDARD_DPI: [u32; 16] = [
    60, 75, 100, 120, 150, 160, 180, 200, 240, 300, 320, 400, 480, 600, 800, 1200,
];
