//! Clock output command implementation

use cp2130_core::{Cp2130, Transport};

/// Show the GPIO.5 clock output, optionally changing it first
pub fn run<T: Transport>(
    dev: &mut Cp2130<T>,
    divider: Option<u32>,
    frequency: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(divider) = divider {
        let divider = u16::try_from(divider).map_err(|_| "divider must be between 1 and 256")?;
        dev.set_clock_divider(divider)?;
    } else if let Some(hz) = frequency {
        dev.set_clock_frequency(hz)?;
    }

    let divider = dev.clock_divider()?;
    let hz = dev.clock_frequency()?;
    println!("Clock output: {} Hz (24 MHz / {})", hz, divider);
    Ok(())
}
