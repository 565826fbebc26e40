//! SPI command implementations

use cp2130_core::{Cp2130, OutputMode, SpiChannel, SpiMode, Transport};

use crate::cli::parse_hex_bytes;
use crate::commands::hex;

/// Requested changes to a channel's configuration
#[derive(Debug, Default)]
pub struct ConfigChanges {
    pub mode: Option<u8>,
    pub clock: Option<u32>,
    pub cs_push_pull: Option<bool>,
    pub inter_byte_us: Option<u32>,
    pub post_assert_us: Option<u32>,
    pub pre_deassert_us: Option<u32>,
    pub cs_toggle: Option<bool>,
}

fn join_hex(args: &[String]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = Vec::new();
    for arg in args {
        data.extend(parse_hex_bytes(arg)?);
    }
    Ok(data)
}

pub fn cmd_read<T: Transport>(
    dev: &mut Cp2130<T>,
    channel: u8,
    length: usize,
    rtr: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut spi = dev.spi(channel)?;
    let data = if rtr {
        spi.read_with_rtr(length, false)?
    } else {
        spi.read(length, false)?
    };
    println!("{}", hex(&data));
    Ok(())
}

pub fn cmd_write<T: Transport>(
    dev: &mut Cp2130<T>,
    channel: u8,
    data: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let data = join_hex(data)?;
    dev.spi(channel)?.write(&data, false)?;
    log::info!("Wrote {} bytes on channel {}", data.len(), channel);
    Ok(())
}

pub fn cmd_transfer<T: Transport>(
    dev: &mut Cp2130<T>,
    channel: u8,
    data: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let data = join_hex(data)?;
    let rx = dev.spi(channel)?.write_read(&data, false)?;
    println!("{}", hex(&rx));
    Ok(())
}

/// Apply `changes`, then print the channel's configuration
pub fn cmd_config<T: Transport>(
    dev: &mut Cp2130<T>,
    channel: u8,
    changes: ConfigChanges,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut spi = dev.spi(channel)?;
    apply(&mut spi, &changes)?;
    print_config(&mut spi)
}

fn apply<T: Transport>(
    spi: &mut SpiChannel<'_, T>,
    changes: &ConfigChanges,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(mode) = changes.mode {
        let mode = SpiMode::from_number(mode).ok_or("SPI mode must be 0-3")?;
        spi.set_mode(mode)?;
    }
    if let Some(hz) = changes.clock {
        spi.set_clock_frequency(hz)?;
    }
    if let Some(push_pull) = changes.cs_push_pull {
        spi.set_cs_mode(if push_pull {
            OutputMode::PushPull
        } else {
            OutputMode::OpenDrain
        })?;
    }
    if let Some(toggle) = changes.cs_toggle {
        spi.set_cs_toggle(toggle)?;
    }
    if let Some(us) = changes.inter_byte_us {
        spi.set_inter_byte_delay_us(us)?;
        spi.set_inter_byte(us > 0)?;
    }
    if let Some(us) = changes.post_assert_us {
        spi.set_post_assert_delay_us(us)?;
        spi.set_post_assert(us > 0)?;
    }
    if let Some(us) = changes.pre_deassert_us {
        spi.set_pre_deassert_delay_us(us)?;
        spi.set_pre_deassert(us > 0)?;
    }
    Ok(())
}

fn print_config<T: Transport>(
    spi: &mut SpiChannel<'_, T>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Channel {} ({:?} chip select)", spi.channel(), spi.strategy());
    println!("  SPI mode:      {}", spi.mode()?.number());
    println!("  Clock:         {} Hz", spi.clock_frequency()?);
    println!("  CS driver:     {:?}", spi.cs_mode()?);
    println!("  CS toggle:     {}", spi.cs_toggle()?);
    println!(
        "  Inter-byte:    {} ({} us)",
        spi.inter_byte()?,
        spi.inter_byte_delay_us()?
    );
    println!(
        "  Post-assert:   {} ({} us)",
        spi.post_assert()?,
        spi.post_assert_delay_us()?
    );
    println!(
        "  Pre-deassert:  {} ({} us)",
        spi.pre_deassert()?,
        spi.pre_deassert_delay_us()?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp2130_core::mock::MockTransport;

    #[test]
    fn test_apply_delay_enables_flag() {
        let mut dev = Cp2130::new(MockTransport::new()).unwrap();
        let mut spi = dev.spi(1).unwrap();
        let changes = ConfigChanges {
            post_assert_us: Some(30),
            ..Default::default()
        };
        apply(&mut spi, &changes).unwrap();

        // Mock reads back zeros, so each write starts from a blank register
        let sent = dev.chip().transport().sent(0x33);
        assert_eq!(sent[0], vec![1, 0, 0, 0, 0, 3, 0, 0]);
        assert_eq!(sent[1], vec![1, 0b0000_0010, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_join_hex() {
        let args = vec!["9f".to_string(), "00 01".to_string()];
        assert_eq!(join_hex(&args).unwrap(), vec![0x9F, 0x00, 0x01]);
        assert!(join_hex(&["x".to_string()]).is_err());
    }
}
