//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a frequency with an optional k/M suffix
fn parse_frequency(s: &str) -> Result<u32, String> {
    let (digits, scale) = match s.chars().last() {
        Some('k') | Some('K') => (&s[..s.len() - 1], 1_000.0),
        Some('M') => (&s[..s.len() - 1], 1_000_000.0),
        _ => (s, 1.0),
    };
    let value: f64 = digits
        .parse()
        .map_err(|_| format!("Invalid frequency: {}", s))?;
    let hz = value * scale;
    if !(0.0..=u32::MAX as f64).contains(&hz) {
        return Err(format!("Frequency out of range: {}", s));
    }
    Ok(hz as u32)
}

/// Parse a hex byte string, ignoring spaces, colons and an optional 0x
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let s = s.trim();
    let digits: String = s
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '_'))
        .collect();
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("Invalid hex digit '{}' in {}", c, s));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in {}", s));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("Invalid hex byte: {}", &digits[i..i + 2]))
        })
        .collect()
}

#[derive(Parser)]
#[command(name = "cp2130")]
#[command(author, version, about = "CP2130 USB-to-SPI bridge utility", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Device options: vid=<hex>,pid=<hex>,index=<n>,serial=<s>,timeout=<ms>
    #[arg(short, long, global = true, default_value = "")]
    pub device: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List connected CP2130 devices
    List,

    /// Show firmware version, USB configuration and pin functions
    Info,

    /// Reset the device
    Reset,

    /// Show or set the GPIO.5 clock output
    Clock {
        /// Divider of the 24 MHz base clock (1-256)
        #[arg(long, value_parser = parse_hex_u32, conflicts_with = "frequency")]
        divider: Option<u32>,

        /// Output frequency, e.g. 1M or 750k
        #[arg(long, value_parser = parse_frequency)]
        frequency: Option<u32>,
    },

    /// GPIO access
    #[command(subcommand)]
    Gpio(GpioCommands),

    /// SPI transfers and channel configuration
    #[command(subcommand)]
    Spi(SpiCommands),
}

/// Pin level on the command line
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Level {
    Low,
    High,
}

/// GPIO mode on the command line
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    Input,
    OpenDrain,
    PushPull,
}

#[derive(Subcommand)]
pub enum GpioCommands {
    /// Show function, mode and level of one pin or all pins
    Get {
        /// GPIO number (0-10)
        pin: Option<u8>,
    },

    /// Drive an output pin
    Set {
        /// GPIO number (0-10)
        pin: u8,
        level: Level,
    },

    /// Change the runtime mode of a pin
    Mode {
        /// GPIO number (0-10)
        pin: u8,
        mode: Mode,

        /// Level to drive when switching to an output
        #[arg(long, value_enum, default_value = "high")]
        level: Level,
    },
}

#[derive(Subcommand)]
pub enum SpiCommands {
    /// Clock in bytes and print them as hex
    Read {
        /// Chip-select channel (0-10)
        #[arg(short, long, default_value_t = 0)]
        channel: u8,

        /// Number of bytes to read
        #[arg(short, long)]
        length: usize,

        /// Wait for the RTR input before each packet
        #[arg(long)]
        rtr: bool,
    },

    /// Clock out hex bytes, discarding what comes back
    Write {
        /// Chip-select channel (0-10)
        #[arg(short, long, default_value_t = 0)]
        channel: u8,

        /// Data as hex, e.g. "06" or "02 00 10 00 ff"
        #[arg(required = true)]
        data: Vec<String>,
    },

    /// Full-duplex transfer: clock out hex bytes and print the bytes read
    Transfer {
        /// Chip-select channel (0-10)
        #[arg(short, long, default_value_t = 0)]
        channel: u8,

        /// Data as hex, e.g. "9f000000"
        #[arg(required = true)]
        data: Vec<String>,
    },

    /// Show or change a channel's SPI configuration
    Config {
        /// Chip-select channel (0-10)
        #[arg(short, long, default_value_t = 0)]
        channel: u8,

        /// SPI mode (0-3)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
        mode: Option<u8>,

        /// SPI clock, rounded down to a supported rate, e.g. 3M
        #[arg(long, value_parser = parse_frequency)]
        clock: Option<u32>,

        /// Drive the chip-select pin push-pull instead of open-drain
        #[arg(long)]
        cs_push_pull: Option<bool>,

        /// Delay between bytes in microseconds (0 disables)
        #[arg(long)]
        inter_byte_us: Option<u32>,

        /// Delay after asserting chip select in microseconds (0 disables)
        #[arg(long)]
        post_assert_us: Option<u32>,

        /// Delay before deasserting chip select in microseconds (0 disables)
        #[arg(long)]
        pre_deassert_us: Option<u32>,

        /// Toggle chip select between bytes
        #[arg(long)]
        cs_toggle: Option<bool>,
    },
}
