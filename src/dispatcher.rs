//! Line-oriented command dispatcher.
//!
//! Decodes the host's byte stream into commands for the [`Bootloader`] driver
//! and renders one `cmd=..$ret=..$err=..$msg=..` response line per command.
//!
//! Two receive modes exist. In line mode bytes accumulate in the receive
//! buffer until `\n`/`\r`, with backspace editing. The `flash` command
//! switches to page-capture mode: a firmware page is raw binary and can
//! contain bytes identical to line terminators, so the dispatcher instead
//! counts exactly one page's worth of bytes with no interpretation, then
//! returns to line mode. This sidesteps inventing a binary-safe framing
//! protocol on an otherwise newline-delimited channel.

use std::mem;

use anyhow::Result;

use crate::bootloader::Bootloader;
use crate::constants::{
    AES_AUTH_SIZE, AES_NONCE_SIZE, MAX_MSG_SIZE, PAGE_TRANSFER_SIZE, RX_BUFFER_CAPACITY,
};
use crate::hal::{Bus, ControlLine, Delay, HostPort};
use crate::protocol::Status;

/// `cmd=` field value when no catalog keyword matched.
const UNRECOGNIZED: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    EnterBootloader,
    ExitBootloader,
    Reset,
    PageSize,
    NumPages,
    SetIv,
    SetAuth,
    Erase,
    Flash,
    BootloaderVersion,
    OpMode,
    FirmwareVersion,
}

/// Keyword catalog. Matching is first-prefix-wins, so the order of this table
/// is a tie-break rule the host relies on. Do not reorder.
const CATALOG: &[(&str, Command)] = &[
    ("bootldr", Command::EnterBootloader),
    ("exit", Command::ExitBootloader),
    ("reset", Command::Reset),
    ("page_size", Command::PageSize),
    ("num_pages", Command::NumPages),
    ("set_iv", Command::SetIv),
    ("set_auth", Command::SetAuth),
    ("erase", Command::Erase),
    ("flash", Command::Flash),
    ("bootloader_version", Command::BootloaderVersion),
    ("op_mode", Command::OpMode),
    ("sh_version", Command::FirmwareVersion),
];

enum RxMode {
    Line,
    PageCapture,
}

pub struct Dispatcher<B, L, D, H> {
    bl: Bootloader<B, L, D>,
    host: H,
    buf: Vec<u8>,
    mode: RxMode,
}

impl<B, L, D, H> Dispatcher<B, L, D, H>
where
    B: Bus,
    L: ControlLine,
    D: Delay,
    H: HostPort,
{
    pub fn new(bl: Bootloader<B, L, D>, host: H) -> Self {
        Dispatcher {
            bl,
            host,
            buf: Vec::with_capacity(RX_BUFFER_CAPACITY),
            mode: RxMode::Line,
        }
    }

    /// Service the host link: consume every pending byte. Call whenever the
    /// transport reports data available.
    pub fn poll(&mut self) -> Result<()> {
        while self.host.available()? {
            let byte = self.host.read_byte()?;
            self.feed(byte)?;
        }
        Ok(())
    }

    /// Push one received byte through the receive state machine.
    pub fn feed(&mut self, byte: u8) -> Result<()> {
        match self.mode {
            RxMode::Line => match byte {
                b'\n' | b'\r' => {
                    let line = mem::take(&mut self.buf);
                    self.dispatch(&line)?;
                }
                0x08 | 0x7F => {
                    self.buf.pop();
                }
                _ if self.buf.len() < RX_BUFFER_CAPACITY => self.buf.push(byte),
                _ => {
                    // Command text past capacity is truncated, not an error;
                    // the line decodes from the retained bytes only.
                    log::warn!("receive buffer full, dropping byte 0x{:02x}", byte);
                }
            },
            RxMode::PageCapture => {
                // Raw page data: terminator and backspace byte values carry
                // no meaning here.
                self.buf.push(byte);
                if self.buf.len() == PAGE_TRANSFER_SIZE {
                    let page = mem::take(&mut self.buf);
                    self.mode = RxMode::Line;

                    let status = self.bl.flash(&page)?;
                    let msg = if status.is_success() {
                        "Successfully flashed page."
                    } else {
                        "Failed to flash page."
                    };
                    self.respond("flash", "", status, msg)?;
                }
            }
        }
        Ok(())
    }

    /// Decode one terminated line and run the matched command.
    fn dispatch(&mut self, line: &[u8]) -> Result<()> {
        let matched = CATALOG
            .iter()
            .find(|(keyword, _)| line.starts_with(keyword.as_bytes()));
        let Some(&(keyword, command)) = matched else {
            return self.respond(
                UNRECOGNIZED,
                "",
                Status::UnavailableCommand,
                "Invalid command sent to bootloader API.",
            );
        };
        let rest = &line[keyword.len()..];

        let mut ret = String::new();
        let status: Status;
        let msg: String;

        match command {
            Command::EnterBootloader => {
                status = self.bl.enter_bootloader()?;
                msg = if status.is_success() {
                    "Entered bootloader mode."
                } else {
                    "Failed to enter bootloader mode."
                }
                .to_owned();
            }

            Command::ExitBootloader => {
                status = self.bl.exit_bootloader()?;
                msg = if status.is_success() {
                    "Successfully entered application mode."
                } else {
                    "Failed to enter application mode."
                }
                .to_owned();
            }

            Command::Reset => {
                self.bl.reset()?;
                status = Status::Success;
                msg = "Reset pulse sent.".to_owned();
            }

            Command::PageSize => {
                let (s, size) = self.bl.page_size()?;
                status = s;
                match size {
                    Some(size) => {
                        ret = size.to_string();
                        msg = "Successfully retrieved page size.".to_owned();
                    }
                    None => msg = "Failed to retrieve page size.".to_owned(),
                }
            }

            Command::NumPages => match parse_page_count(rest) {
                Some(count) => {
                    status = self.bl.set_page_count(count)?;
                    msg = if status.is_success() {
                        format!("Successfully set number of pages to {}", count)
                    } else {
                        format!("Failed to set number of pages to {}", count)
                    };
                }
                None => {
                    status = Status::InputValue;
                    msg = "Invalid parameter passed to set # of pages command.".to_owned();
                }
            },

            Command::SetIv => match parse_hex_param(rest, AES_NONCE_SIZE) {
                Some(iv) => {
                    status = self.bl.set_iv(&iv)?;
                    msg = if status.is_success() {
                        "Successfully set IV bytes."
                    } else {
                        "Failed to set IV bytes. See error code."
                    }
                    .to_owned();
                }
                None => {
                    status = Status::InputValue;
                    msg = format!(
                        "Failed to parse IV bytes. Expected a space and {} hex digits.",
                        2 * AES_NONCE_SIZE
                    );
                }
            },

            Command::SetAuth => match parse_hex_param(rest, AES_AUTH_SIZE) {
                Some(auth) => {
                    status = self.bl.set_auth(&auth)?;
                    msg = if status.is_success() {
                        "Successfully set auth bytes."
                    } else {
                        "Failed to set auth bytes. See error code."
                    }
                    .to_owned();
                }
                None => {
                    status = Status::InputValue;
                    msg = format!(
                        "Failed to parse auth bytes. Expected a space and {} hex digits.",
                        2 * AES_AUTH_SIZE
                    );
                }
            },

            Command::Erase => {
                status = self.bl.erase()?;
                msg = if status.is_success() {
                    "Successfully erased existing application."
                } else {
                    "Failed to erase existing application."
                }
                .to_owned();
            }

            Command::Flash => {
                // Phase one only: respond after the raw page bytes arrive.
                self.buf.clear();
                self.mode = RxMode::PageCapture;
                return Ok(());
            }

            Command::BootloaderVersion => {
                let (s, version) = self.bl.bootloader_version()?;
                status = s;
                match version {
                    Some(version) => {
                        ret = version.to_string();
                        msg = "Successfully retrieved bootloader version.".to_owned();
                    }
                    None => {
                        msg = "Failed to get bootloader version. Is the device in bootloader mode?"
                            .to_owned();
                    }
                }
            }

            Command::OpMode => {
                let (s, mode) = self.bl.operating_mode()?;
                status = s;
                if status.is_success() {
                    if let Some(mode) = mode {
                        ret = mode.to_string();
                    }
                    msg = String::new();
                } else {
                    msg = "Failed to get operating mode".to_owned();
                }
            }

            Command::FirmwareVersion => {
                let (s, version) = self.bl.firmware_version()?;
                status = s;
                if let Some(version) = version {
                    ret = version.to_string();
                }
                msg = String::new();
            }
        }

        self.respond(keyword, &ret, status, &msg)
    }

    /// Render the four-field response line. `$` splits the fields on the host
    /// side; the shape is part of the wire contract.
    fn respond(&mut self, cmd: &str, ret: &str, status: Status, msg: &str) -> Result<()> {
        let msg = &msg[..msg.len().min(MAX_MSG_SIZE)];
        let line = format!(
            "cmd={}$ret={}$err={}$msg={}\n",
            cmd,
            ret,
            u8::from(status),
            msg
        );
        self.host.write_all(line.as_bytes())
    }
}

/// Decode a parameter of the form `" "` + exactly `2 * byte_len` hex digits.
/// Mixed case is fine; anything else is rejected before any bus traffic.
fn parse_hex_param(rest: &[u8], byte_len: usize) -> Option<Vec<u8>> {
    let rest = std::str::from_utf8(rest).ok()?;
    let digits = rest.strip_prefix(' ')?;
    if digits.len() != 2 * byte_len {
        return None;
    }
    hex::decode(digits).ok()
}

fn parse_page_count(rest: &[u8]) -> Option<u8> {
    std::str::from_utf8(rest).ok()?.trim().parse().ok()
}
