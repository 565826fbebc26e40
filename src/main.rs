//! cp2130 - Command-line utility for the Silicon Labs CP2130
//!
//! Opens a CP2130 through the nusb transport and exposes the device wrapper
//! of `cp2130-core`: device information, clock output, GPIOs and SPI
//! transfers on any of the eleven chip-select channels.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, GpioCommands, SpiCommands};
use cp2130_core::Cp2130;
use cp2130_nusb::{UsbConfig, UsbTransport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = parse_device_options(&cli.device)?;

    match cli.command {
        Commands::List => commands::list::run(&config),
        Commands::Info => commands::info::run(&mut open(&config)?),
        Commands::Reset => {
            open(&config)?.reset()?;
            Ok(())
        }
        Commands::Clock { divider, frequency } => {
            commands::clock::run(&mut open(&config)?, divider, frequency)
        }
        Commands::Gpio(subcmd) => {
            let mut dev = open(&config)?;
            match subcmd {
                GpioCommands::Get { pin } => commands::gpio::cmd_get(&mut dev, pin),
                GpioCommands::Set { pin, level } => commands::gpio::cmd_set(&mut dev, pin, level),
                GpioCommands::Mode { pin, mode, level } => {
                    commands::gpio::cmd_mode(&mut dev, pin, mode, level)
                }
            }
        }
        Commands::Spi(subcmd) => {
            let mut dev = open(&config)?;
            match subcmd {
                SpiCommands::Read {
                    channel,
                    length,
                    rtr,
                } => commands::spi::cmd_read(&mut dev, channel, length, rtr),
                SpiCommands::Write { channel, data } => {
                    commands::spi::cmd_write(&mut dev, channel, &data)
                }
                SpiCommands::Transfer { channel, data } => {
                    commands::spi::cmd_transfer(&mut dev, channel, &data)
                }
                SpiCommands::Config {
                    channel,
                    mode,
                    clock,
                    cs_push_pull,
                    inter_byte_us,
                    post_assert_us,
                    pre_deassert_us,
                    cs_toggle,
                } => commands::spi::cmd_config(
                    &mut dev,
                    channel,
                    commands::spi::ConfigChanges {
                        mode,
                        clock,
                        cs_push_pull,
                        inter_byte_us,
                        post_assert_us,
                        pre_deassert_us,
                        cs_toggle,
                    },
                ),
            }
        }
    }
}

/// Parse `key=value,key=value` device options
fn parse_device_options(s: &str) -> Result<UsbConfig, Box<dyn std::error::Error>> {
    let mut options = Vec::new();
    for opt in s.split(',').filter(|opt| !opt.is_empty()) {
        match opt.split_once('=') {
            Some(pair) => options.push(pair),
            None => {
                return Err(
                    format!("Invalid device option: '{}' (expected key=value)", opt).into(),
                )
            }
        }
    }
    Ok(cp2130_nusb::parse_options(&options)?)
}

fn open(config: &UsbConfig) -> Result<Cp2130<UsbTransport>, Box<dyn std::error::Error>> {
    let transport = UsbTransport::open(config)?;
    Ok(Cp2130::new(transport)?)
}
