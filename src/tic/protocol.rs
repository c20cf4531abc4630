//! # TIC Protocol Constants and Types
//!
//! Core definitions for the meter teleinformation stream.

use serde::Deserialize;

/// Start of frame
pub const TIC_STX: u8 = 0x02;

/// End of frame
pub const TIC_ETX: u8 = 0x03;

/// Frame interrupted by the meter
pub const TIC_EOT: u8 = 0x04;

/// Start of information group
pub const TIC_LF: u8 = 0x0A;

/// End of information group
pub const TIC_CR: u8 = 0x0D;

/// Historic mode field separator (space)
pub const TIC_SEP_HISTORIC: u8 = 0x20;

/// Standard mode field separator (horizontal tab)
pub const TIC_SEP_STANDARD: u8 = 0x09;

/// Largest information group accepted between LF and CR.
///
/// Standard mode groups with an horodate stay well below this.
pub const TIC_MAX_GROUP_SIZE: usize = 64;

/// Baud rate of the historic stream
pub const TIC_BAUD_HISTORIC: u32 = 1200;

/// Baud rate of the standard stream
pub const TIC_BAUD_STANDARD: u32 = 9600;

/// Teleinformation mode the meter is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicMode {
    /// Legacy "historique" stream, 1200 baud, space separated
    Historic,
    /// Linky "standard" stream, 9600 baud, tab separated
    Standard,
}

impl TicMode {
    /// Field separator byte used by this mode
    pub fn separator(self) -> u8 {
        match self {
            TicMode::Historic => TIC_SEP_HISTORIC,
            TicMode::Standard => TIC_SEP_STANDARD,
        }
    }

    /// Serial baud rate used by this mode
    pub fn baud_rate(self) -> u32 {
        match self {
            TicMode::Historic => TIC_BAUD_HISTORIC,
            TicMode::Standard => TIC_BAUD_STANDARD,
        }
    }

    /// Whether the separator preceding the checksum is part of the checksum
    pub fn checksum_covers_last_separator(self) -> bool {
        matches!(self, TicMode::Standard)
    }
}

/// One decoded key/value pair from the meter stream.
///
/// Ephemeral: owned by the loop iteration that decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord {
    /// Group label (e.g. `PAPP`)
    pub name: String,
    /// Raw text value, unparsed
    pub data: String,
    /// Whether the record carries a decoded value
    pub present: bool,
}

impl TelemetryRecord {
    /// Create a present record from a label and its raw data
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            present: true,
        }
    }
}
