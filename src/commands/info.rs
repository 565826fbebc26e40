//! Info command implementation

use cp2130_core::protocol::GPIO_COUNT;
use cp2130_core::{Cp2130, LockState, Transport};

/// Print everything the device reports about itself
pub fn run<T: Transport>(dev: &mut Cp2130<T>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Firmware version: {}", dev.version()?);
    println!(
        "USB ID:           {:04x}:{:04x}",
        dev.vendor_id()?,
        dev.product_id()?
    );
    println!("Release:          {}", dev.release()?);
    println!("Manufacturer:     {}", dev.manufacturer_string()?);
    println!("Product:          {}", dev.product_string()?);
    println!("Serial:           {}", dev.serial_string()?);
    println!("Max power:        {} mA", dev.max_power_ma()?);
    println!("Power mode:       {:?}", dev.power_mode()?);
    println!("Transfer priority: {:?}", dev.transfer_priority()?);
    println!(
        "Clock output:     {} Hz (divider {})",
        dev.clock_frequency()?,
        dev.clock_divider()?
    );
    println!("FIFO threshold:   {} bytes", dev.full_threshold()?);
    println!();

    println!("Pin functions:");
    for pin in 0..GPIO_COUNT {
        let function = dev.pin_function(pin)?;
        let strategy = dev.spi(pin)?.strategy();
        println!(
            "  GPIO.{:<2} {:<28} CS: {:?}",
            pin,
            format!("{:?}", function),
            strategy
        );
    }
    println!();

    let lock = dev.lock()?;
    let mut locked = Vec::new();
    for field in lock.def().fields() {
        if lock.get::<LockState>(field.name)? == LockState::Locked {
            locked.push(field.name);
        }
    }
    if locked.is_empty() {
        println!("OTP: nothing locked");
    } else {
        println!("OTP locked: {}", locked.join(", "));
    }
    Ok(())
}
