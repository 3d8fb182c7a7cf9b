//! Abstract hardware interfaces consumed by the bridge.
//!
//! The bridge only ever needs four narrow capabilities: an addressed
//! write/read bus, two output-only control lines, a blocking delay, and the
//! byte-stream serial link to the host. Platform implementations live in
//! [`crate::linux`]; tests script these traits directly.

use anyhow::Result;

/// Addressed two-wire bus transactions.
///
/// `addr` is always the fixed 8-bit device address. A returned error means the
/// transport itself failed; protocol-level failures come back as status bytes
/// in the read payload.
pub trait Bus {
    fn set_frequency(&mut self, hz: u32) -> Result<()>;
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()>;
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()>;
}

/// A single output-only control line (MFIO or RSTN). No read-back.
pub trait ControlLine {
    fn set(&mut self, level: bool) -> Result<()>;
}

/// Blocking delay source.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
    fn delay_us(&mut self, us: u32);
}

/// [`Delay`] backed by [`std::thread::sleep`].
pub struct SysDelay;

impl Delay for SysDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// Byte-stream serial link to the host application.
///
/// Assumed reliable, in-order and byte-preserving: no byte value is escaped
/// or disallowed in either direction.
pub trait HostPort {
    /// Whether at least one byte is waiting to be read.
    fn available(&mut self) -> Result<bool>;
    fn read_byte(&mut self) -> Result<u8>;
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}
