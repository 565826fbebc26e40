//! cp2130-nusb - USB transport for the CP2130
//!
//! Implements [`cp2130_core::Transport`] on top of [`nusb`], using blocking
//! vendor control transfers on the default pipe and the chip's bulk
//! endpoint pair for SPI data.
//!
//! # Example
//!
//! ```no_run
//! use cp2130_core::Cp2130;
//! use cp2130_nusb::{UsbConfig, UsbTransport};
//!
//! let transport = UsbTransport::open(&UsbConfig::default())?;
//! let mut dev = Cp2130::new(transport)?;
//! println!("firmware {}", dev.version()?);
//!
//! // Read a JEDEC ID through channel 0
//! let id = dev.spi(0)?.write_read(&[0x9F, 0, 0, 0], false)?;
//! println!("JEDEC ID: {:02X?}", &id[1..]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;

pub use device::{list_devices, parse_options, DeviceInfo, UsbConfig, UsbTransport};
pub use error::{Result, UsbError};
