//! MAX32664 sensor hub bootloader bridge.
//!
//! Drives the hub's firmware-update protocol over I2C plus the MFIO/RSTN
//! control lines, and exposes it to a host application as a line-oriented
//! serial command set.

pub mod bootloader;
pub mod constants;
pub mod dispatcher;
pub mod hal;
pub mod protocol;

#[cfg(feature = "linux")]
pub mod linux;

pub use self::bootloader::Bootloader;
pub use self::dispatcher::Dispatcher;
pub use self::hal::{Bus, ControlLine, Delay, HostPort, SysDelay};
pub use self::protocol::{OpMode, Status, Version};

#[cfg(test)]
pub(crate) mod testutil;
