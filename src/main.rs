use std::{thread::sleep, time::Duration};

use anyhow::Result;
use clap::Parser;

use max32664_bridge::linux::{CdevLine, LinuxI2cBus, SerialHost};
use max32664_bridge::{Bootloader, Dispatcher, SysDelay};

#[derive(clap::Parser)]
#[clap(
    name = "max32664-bridge",
    about = "Bridges a host serial link to the MAX32664 sensor hub bootloader over I2C + MFIO/RSTN"
)]
struct Cli {
    /// Serial port the host application connects on
    #[clap(long, default_value = "/dev/ttyGS0")]
    port: String,

    /// Serial baud rate
    #[clap(long, default_value_t = 9600)]
    baud: u32,

    /// I2C bus device wired to the sensor hub
    #[clap(long, default_value = "/dev/i2c-1")]
    i2c: String,

    /// GPIO character device holding the control lines
    #[clap(long, default_value = "/dev/gpiochip0")]
    gpiochip: String,

    /// Line offset of the MFIO pin
    #[clap(long)]
    mfio: u32,

    /// Line offset of the RSTN pin
    #[clap(long)]
    rstn: u32,
}

fn main() -> Result<()> {
    let _ = simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let cli = Cli::parse();

    let bus = LinuxI2cBus::open(&cli.i2c)?;
    let mfio = CdevLine::open(&cli.gpiochip, cli.mfio)?;
    let rstn = CdevLine::open(&cli.gpiochip, cli.rstn)?;
    let bootloader = Bootloader::new(bus, mfio, rstn, SysDelay)?;

    let host = SerialHost::open(&cli.port, cli.baud)?;
    let mut dispatcher = Dispatcher::new(bootloader, host);

    log::info!("Bridge ready, serving host commands");
    loop {
        dispatcher.poll()?;
        sleep(Duration::from_millis(1));
    }
}
