//! List command implementation

use cp2130_nusb::UsbConfig;

/// List connected devices matching the VID/PID filter
pub fn run(config: &UsbConfig) -> Result<(), Box<dyn std::error::Error>> {
    let devices = cp2130_nusb::list_devices(config)?;
    if devices.is_empty() {
        println!(
            "No CP2130 devices found (VID:{:04x} PID:{:04x})",
            config.vid, config.pid
        );
        return Ok(());
    }

    for (index, device) in devices.iter().enumerate() {
        println!("{:>3}: {}", index, device);
    }
    Ok(())
}
