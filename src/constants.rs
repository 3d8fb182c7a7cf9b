//! Protocol constants for the MAX32664 sensor hub bootloader.
//!
//! Every delay below encodes hardware settling time or firmware-internal
//! processing time documented for the real device. They are part of the
//! protocol contract, not tuning knobs.

/// 8-bit I2C slave address of the sensor hub.
pub const SENSOR_HUB_ADDR: u8 = 0xAA;

/// I2C bus clock expected by the sensor hub.
pub const BUS_FREQUENCY_HZ: u32 = 400_000;

/// AES nonce (IV) length in bytes.
pub const AES_NONCE_SIZE: usize = 11;
/// AES authentication tag length in bytes.
pub const AES_AUTH_SIZE: usize = 16;
/// Firmware page payload length in bytes.
pub const MAX_PAGE_SIZE: usize = 8192;
/// Trailing integrity (CRC) bytes per page.
pub const CHECKBYTES_SIZE: usize = 16;
/// Raw bytes transferred per flash transaction: payload plus check bytes.
pub const PAGE_TRANSFER_SIZE: usize = MAX_PAGE_SIZE + CHECKBYTES_SIZE;

/// Capacity of the dispatcher's receive buffer.
pub const RX_BUFFER_CAPACITY: usize = 16384;
/// Maximum length of the `msg=` field in a response line.
pub const MAX_MSG_SIZE: usize = 256;

pub mod commands {
    //! Wire bytes (family byte, index byte, ...) for each transaction.

    pub const ENTER_BOOTLOADER: [u8; 3] = [0x01, 0x00, 0x08];
    pub const GET_OPERATING_MODE: [u8; 2] = [0x02, 0x00];
    pub const SET_IV: [u8; 2] = [0x80, 0x00];
    pub const SET_AUTH: [u8; 2] = [0x80, 0x01];
    pub const SET_PAGE_COUNT: [u8; 2] = [0x80, 0x02];
    pub const ERASE: [u8; 2] = [0x80, 0x03];
    pub const FLASH: [u8; 2] = [0x80, 0x04];
    pub const GET_BOOTLOADER_VERSION: [u8; 2] = [0x81, 0x00];
    pub const GET_PAGE_SIZE: [u8; 2] = [0x81, 0x01];
    pub const GET_FIRMWARE_VERSION: [u8; 2] = [0xFF, 0x03];
}

pub mod delays {
    //! Timing contract of the MFIO/RSTN sequences and bus transactions.

    /// Settle time after driving both lines high at power-on. The pins show a
    /// short low glitch while they initialize.
    pub const POWER_ON_SETTLE_MS: u32 = 10;
    /// RSTN held low during a reset or mode-select pulse.
    pub const RESET_HOLD_MS: u32 = 10;
    /// Wait after releasing RSTN while MFIO selects the operating mode.
    pub const MODE_SELECT_MS: u32 = 50;
    /// Application firmware self-init time after leaving bootloader mode.
    pub const APP_INIT_MS: u32 = 1500;
    /// Gap between a command write and the status read.
    pub const CMD_MS: u32 = 2;
    /// Worst-case erase time: ~100 ms/page at the 29-page maximum, rounded up
    /// from the documented 1400 ms.
    pub const ERASE_MS: u32 = 3000;
    /// Per-page flash programming time.
    pub const FLASH_MS: u32 = 680;
    /// MFIO held low before application-mode transactions to wake the hub.
    pub const WAKE_PULSE_US: u32 = 300;
}
