//! Linux platform glue.
//!
//! I2C goes through the kernel's i2c-dev interface, control lines through the
//! GPIO character device (the sysfs interface is deprecated), and the host
//! link through a serial port.

use anyhow::{anyhow, Context, Result};
use embedded_hal::blocking::i2c::{Read as _, Write as _};
use gpiocdev::line::Value;
use gpiocdev::request::{Config, Request};
use linux_embedded_hal::I2cdev;

use crate::hal::{Bus, ControlLine};

/// I2C bus via `/dev/i2c-N`.
pub struct LinuxI2cBus {
    dev: I2cdev,
}

impl LinuxI2cBus {
    pub fn open(path: &str) -> Result<Self> {
        let dev = I2cdev::new(path).with_context(|| format!("opening i2c device {}", path))?;
        log::info!("Opened i2c device {}", path);
        Ok(LinuxI2cBus { dev })
    }
}

impl Bus for LinuxI2cBus {
    fn set_frequency(&mut self, hz: u32) -> Result<()> {
        // The kernel driver owns the bus clock (device tree / module
        // parameter); nothing to do per client.
        log::debug!("i2c bus clock is kernel-managed, protocol expects {} Hz", hz);
        Ok(())
    }

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        // The protocol states addresses in 8-bit form, the kernel in 7-bit.
        self.dev
            .write(addr >> 1, bytes)
            .map_err(|e| anyhow!("i2c write failed: {:?}", e))
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        self.dev
            .read(addr >> 1, buf)
            .map_err(|e| anyhow!("i2c read failed: {:?}", e))
    }
}

/// One GPIO output line requested from a gpiochip character device.
pub struct CdevLine {
    request: Request,
    offset: u32,
}

impl CdevLine {
    /// Request `offset` on `chip` (e.g. `/dev/gpiochip0`) as an output,
    /// initially high: both control lines idle high.
    pub fn open(chip: &str, offset: u32) -> Result<Self> {
        let mut config = Config::default();
        config.with_line(offset).as_output(Value::Active);

        let request = Request::from_config(config)
            .on_chip(chip)
            .with_consumer("max32664-bridge")
            .request()
            .with_context(|| format!("requesting GPIO line {} on {}", offset, chip))?;
        Ok(CdevLine { request, offset })
    }
}

impl ControlLine for CdevLine {
    fn set(&mut self, level: bool) -> Result<()> {
        let value = if level { Value::Active } else { Value::Inactive };
        self.request
            .set_value(self.offset, value)
            .map_err(|e| anyhow!("gpio set failed: {}", e))?;
        Ok(())
    }
}

#[cfg(feature = "util")]
pub use self::serial::SerialHost;

#[cfg(feature = "util")]
mod serial {
    use std::io::{Read, Write};
    use std::time::Duration;

    use anyhow::{Context, Result};

    use crate::hal::HostPort;

    const SERIAL_TIMEOUT_MS: u64 = 1000;

    /// Host application link over a serial port.
    pub struct SerialHost {
        port: Box<dyn serialport::SerialPort>,
    }

    impl SerialHost {
        pub fn open(path: &str, baud: u32) -> Result<Self> {
            log::info!("Opening serial port: \"{}\" @ {} baud", path, baud);
            let port = serialport::new(path, baud)
                .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
                .open()
                .with_context(|| format!("opening serial port {}", path))?;
            Ok(SerialHost { port })
        }
    }

    impl HostPort for SerialHost {
        fn available(&mut self) -> Result<bool> {
            Ok(self.port.bytes_to_read()? > 0)
        }

        fn read_byte(&mut self) -> Result<u8> {
            let mut byte = [0u8; 1];
            self.port.read_exact(&mut byte)?;
            Ok(byte[0])
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            self.port.write_all(bytes)?;
            self.port.flush()?;
            Ok(())
        }
    }
}
