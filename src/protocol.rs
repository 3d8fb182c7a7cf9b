//! Wire types of the sensor hub bootloader protocol.

use std::fmt;

use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

/// Status byte returned by every sensor hub transaction.
///
/// Any byte outside the documented set decodes to [`Status::Unknown`]. A
/// non-success status is a peripheral outcome, not a transport failure, and is
/// surfaced to the host verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    /// Illegal family and/or index byte.
    UnavailableCommand = 0x01,
    /// Function not implemented.
    UnavailableFunction = 0x02,
    /// Wrong number of bytes sent for the requested family byte.
    DataFormat = 0x03,
    /// Illegal configuration value.
    InputValue = 0x04,
    /// Device busy, or command invalid for the current operating mode.
    TryAgainOrInvalidMode = 0x05,
    /// General error while receiving/flashing a page.
    BootloaderGeneral = 0x80,
    /// Checksum error while decrypting/checking page data.
    BootloaderChecksum = 0x81,
    /// Authorization error.
    BootloaderAuth = 0x82,
    /// The flashed application is not valid.
    BootloaderInvalidApp = 0x83,
    /// Device busy, try again.
    TryAgain = 0xFE,
    #[num_enum(default)]
    Unknown = 0xFF,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

/// Operating mode reported by the sensor hub.
///
/// The hub reports its mode; the driver never tracks it locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum OpMode {
    Application = 0x00,
    Reset = 0x02,
    Bootloader = 0x08,
}

impl fmt::Display for OpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpMode::Application => "Application",
            OpMode::Reset => "Reset",
            OpMode::Bootloader => "Bootloader",
        };
        write!(f, "{}", name)
    }
}

/// A major.minor.rev triple.
///
/// Both the bootloader version and the application firmware version use this
/// shape on the wire: a status byte followed by one byte per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub rev: u8,
}

impl Version {
    /// Decode from the three bytes following the status byte.
    pub fn from_payload(payload: &[u8; 3]) -> Self {
        Version {
            major: payload[0],
            minor: payload[1],
            rev: payload[2],
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.rev)
    }
}
