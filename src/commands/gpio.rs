//! GPIO command implementations

use cp2130_core::protocol::GPIO_COUNT;
use cp2130_core::{Cp2130, GpioMode, LogicLevel, Transport};

use crate::cli::{Level, Mode};

impl From<Level> for LogicLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => LogicLevel::Low,
            Level::High => LogicLevel::High,
        }
    }
}

impl From<Mode> for GpioMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Input => GpioMode::Input,
            Mode::OpenDrain => GpioMode::OpenDrain,
            Mode::PushPull => GpioMode::PushPull,
        }
    }
}

/// Show one pin, or all of them
pub fn cmd_get<T: Transport>(
    dev: &mut Cp2130<T>,
    pin: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pins = match pin {
        Some(pin) if pin < GPIO_COUNT => pin..pin + 1,
        Some(pin) => return Err(format!("no GPIO.{}", pin).into()),
        None => 0..GPIO_COUNT,
    };

    println!(
        "{:<8} {:<28} {:<10} {:<6} {}",
        "Pin", "Function", "Driver", "Level", "CS"
    );
    println!("{}", "-".repeat(64));
    for pin in pins {
        let function = dev.pin_function(pin)?;
        let (mode, level) = dev.gpio_mode_and_level(pin)?;
        let cs = if dev.cs_enabled(pin)? {
            "enabled"
        } else {
            "disabled"
        };
        println!(
            "GPIO.{:<3} {:<28} {:<10} {:<6} {}",
            pin,
            format!("{:?}", function),
            format!("{:?}", mode),
            format!("{:?}", level),
            cs
        );
    }
    Ok(())
}

/// Drive an output pin
pub fn cmd_set<T: Transport>(
    dev: &mut Cp2130<T>,
    pin: u8,
    level: Level,
) -> Result<(), Box<dyn std::error::Error>> {
    dev.set_gpio_value(pin, level.into())?;
    println!("GPIO.{} = {:?}", pin, dev.gpio_value(pin)?);
    Ok(())
}

/// Switch the runtime mode of a pin
pub fn cmd_mode<T: Transport>(
    dev: &mut Cp2130<T>,
    pin: u8,
    mode: Mode,
    level: Level,
) -> Result<(), Box<dyn std::error::Error>> {
    dev.set_gpio_mode_and_level(pin, mode.into(), level.into())?;
    let (mode, level) = dev.gpio_mode_and_level(pin)?;
    println!("GPIO.{}: {:?}, {:?}", pin, mode, level);
    Ok(())
}
