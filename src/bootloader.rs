//! Protocol driver for the sensor hub bootloader.
//!
//! Translates each logical operation into the exact wire bytes and MFIO/RSTN
//! timing the hub requires, and decodes each response into a [`Status`] plus
//! typed payload. The driver keeps no state beyond its handles: the hub's
//! mode is never assumed, only queried or forced.

use anyhow::{ensure, Result};
use scroll::{Pread, BE};

use crate::constants::{commands, delays};
use crate::constants::{
    AES_AUTH_SIZE, AES_NONCE_SIZE, BUS_FREQUENCY_HZ, PAGE_TRANSFER_SIZE, SENSOR_HUB_ADDR,
};
use crate::hal::{Bus, ControlLine, Delay};
use crate::protocol::{OpMode, Status, Version};

pub struct Bootloader<B, L, D> {
    bus: B,
    mfio: L,
    rstn: L,
    delay: D,
}

impl<B, L, D> Bootloader<B, L, D>
where
    B: Bus,
    L: ControlLine,
    D: Delay,
{
    /// Take ownership of the bus and control lines and bring both lines to
    /// their idle-high state.
    pub fn new(mut bus: B, mut mfio: L, mut rstn: L, mut delay: D) -> Result<Self> {
        bus.set_frequency(BUS_FREQUENCY_HZ)?;
        rstn.set(true)?;
        mfio.set(true)?;

        // The pins glitch low for ~20us while they initialize; let that pass
        // before any sequencing.
        delay.delay_ms(delays::POWER_ON_SETTLE_MS);

        Ok(Bootloader {
            bus,
            mfio,
            rstn,
            delay,
        })
    }

    /// Force the hub into bootloader mode.
    ///
    /// The pulse sequence only opens a window: the hub reverts to application
    /// mode after ~780 ms unless the enter-bootloader command lands inside it.
    pub fn enter_bootloader(&mut self) -> Result<Status> {
        self.rstn.set(false)?;
        self.mfio.set(false)?;
        self.delay.delay_ms(delays::RESET_HOLD_MS);
        self.rstn.set(true)?;
        self.delay.delay_ms(delays::MODE_SELECT_MS);
        self.mfio.set(true)?;

        let resp = self.transact(&commands::ENTER_BOOTLOADER, delays::CMD_MS, 1)?;
        Ok(Status::from(resp[0]))
    }

    /// Return the hub to application mode. Pure timing sequence, no
    /// transaction; waits out the application's ~1.5 s self-init.
    pub fn exit_bootloader(&mut self) -> Result<Status> {
        self.rstn.set(false)?;
        self.mfio.set(true)?;
        self.delay.delay_ms(delays::RESET_HOLD_MS);
        self.rstn.set(true)?;
        self.delay.delay_ms(delays::MODE_SELECT_MS);

        self.delay.delay_ms(delays::APP_INIT_MS);
        Ok(Status::Success)
    }

    /// Hardware reset pulse on RSTN.
    pub fn reset(&mut self) -> Result<()> {
        self.rstn.set(false)?;
        self.delay.delay_ms(delays::RESET_HOLD_MS);
        self.rstn.set(true)?;
        Ok(())
    }

    pub fn bootloader_version(&mut self) -> Result<(Status, Option<Version>)> {
        let resp = self.transact(&commands::GET_BOOTLOADER_VERSION, delays::CMD_MS, 4)?;
        let status = Status::from(resp[0]);
        if !status.is_success() {
            return Ok((status, None));
        }
        let version = Version::from_payload(&[resp[1], resp[2], resp[3]]);
        Ok((status, Some(version)))
    }

    /// Application firmware version. Only answered in application mode, and
    /// needs the MFIO wake pulses.
    pub fn firmware_version(&mut self) -> Result<(Status, Option<Version>)> {
        let resp = self.transact_awake(&commands::GET_FIRMWARE_VERSION, delays::CMD_MS, 4)?;
        let status = Status::from(resp[0]);
        if !status.is_success() {
            return Ok((status, None));
        }
        let version = Version::from_payload(&[resp[1], resp[2], resp[3]]);
        Ok((status, Some(version)))
    }

    pub fn operating_mode(&mut self) -> Result<(Status, Option<OpMode>)> {
        let resp = self.transact_awake(&commands::GET_OPERATING_MODE, delays::CMD_MS, 2)?;
        let status = Status::from(resp[0]);
        Ok((status, OpMode::try_from(resp[1]).ok()))
    }

    /// Page size supported by the bootloader, big-endian on the wire.
    pub fn page_size(&mut self) -> Result<(Status, Option<u16>)> {
        let resp = self.transact(&commands::GET_PAGE_SIZE, delays::CMD_MS, 3)?;
        let status = Status::from(resp[0]);
        if !status.is_success() {
            return Ok((status, None));
        }
        let size = resp.pread_with::<u16>(1, BE)?;
        Ok((status, Some(size)))
    }

    /// Number of pages the upcoming image transfer will carry. The wire field
    /// is a two-byte count, MSB first; the high byte is always zero here.
    pub fn set_page_count(&mut self, count: u8) -> Result<Status> {
        let mut send = commands::SET_PAGE_COUNT.to_vec();
        send.extend_from_slice(&[0x00, count]);

        let resp = self.transact(&send, delays::CMD_MS, 1)?;
        Ok(Status::from(resp[0]))
    }

    /// Send the AES initialization vector from the firmware image.
    pub fn set_iv(&mut self, iv: &[u8]) -> Result<Status> {
        ensure!(
            iv.len() == AES_NONCE_SIZE,
            "IV must be {} bytes, got {}",
            AES_NONCE_SIZE,
            iv.len()
        );
        let mut send = commands::SET_IV.to_vec();
        send.extend_from_slice(iv);

        let resp = self.transact(&send, delays::CMD_MS, 1)?;
        Ok(Status::from(resp[0]))
    }

    /// Send the AES authentication tag from the firmware image.
    pub fn set_auth(&mut self, auth: &[u8]) -> Result<Status> {
        ensure!(
            auth.len() == AES_AUTH_SIZE,
            "auth tag must be {} bytes, got {}",
            AES_AUTH_SIZE,
            auth.len()
        );
        let mut send = commands::SET_AUTH.to_vec();
        send.extend_from_slice(auth);

        let resp = self.transact(&send, delays::CMD_MS, 1)?;
        Ok(Status::from(resp[0]))
    }

    /// Erase the existing application flash.
    pub fn erase(&mut self) -> Result<Status> {
        let resp = self.transact(&commands::ERASE, delays::ERASE_MS, 1)?;
        Ok(Status::from(resp[0]))
    }

    /// Flash one page: payload plus trailing check bytes.
    pub fn flash(&mut self, page: &[u8]) -> Result<Status> {
        ensure!(
            page.len() == PAGE_TRANSFER_SIZE,
            "page must be {} bytes, got {}",
            PAGE_TRANSFER_SIZE,
            page.len()
        );
        let mut send = Vec::with_capacity(2 + PAGE_TRANSFER_SIZE);
        send.extend_from_slice(&commands::FLASH);
        send.extend_from_slice(page);

        let resp = self.transact(&send, delays::FLASH_MS, 1)?;
        Ok(Status::from(resp[0]))
    }

    /// Write `request`, wait `delay_ms`, read back `response_len` bytes.
    fn transact(&mut self, request: &[u8], delay_ms: u32, response_len: usize) -> Result<Vec<u8>> {
        log_request(request);
        self.bus.write(SENSOR_HUB_ADDR, request)?;
        self.delay.delay_ms(delay_ms);

        let mut resp = vec![0u8; response_len];
        self.bus.read(SENSOR_HUB_ADDR, &mut resp)?;
        log::debug!("<= {}", hex::encode(&resp));
        Ok(resp)
    }

    /// Like [`Self::transact`], with an MFIO wake pulse before the write and
    /// before the read. Application-mode commands need this: the hub sleeps
    /// unless MFIO goes low 300us before the bus traffic.
    fn transact_awake(
        &mut self,
        request: &[u8],
        delay_ms: u32,
        response_len: usize,
    ) -> Result<Vec<u8>> {
        log_request(request);

        self.mfio.set(false)?;
        self.delay.delay_us(delays::WAKE_PULSE_US);
        self.bus.write(SENSOR_HUB_ADDR, request)?;
        self.mfio.set(true)?;

        self.delay.delay_ms(delay_ms);

        self.mfio.set(false)?;
        self.delay.delay_us(delays::WAKE_PULSE_US);
        let mut resp = vec![0u8; response_len];
        self.bus.read(SENSOR_HUB_ADDR, &mut resp)?;
        self.mfio.set(true)?;

        log::debug!("<= {}", hex::encode(&resp));
        Ok(resp)
    }
}

fn log_request(request: &[u8]) {
    if request.len() <= 32 {
        log::debug!("=> {}", hex::encode(request));
    } else {
        log::debug!(
            "=> {}.. ({} bytes)",
            hex::encode(&request[..8]),
            request.len()
        );
    }
}
