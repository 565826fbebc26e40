//! cp2130-core - Register codec, command model and SPI protocol for the CP2130
//!
//! The Silicon Labs CP2130 is a USB-to-SPI bridge with eleven GPIOs, each of
//! which can act as an SPI chip select. It is configured through vendor
//! control transfers that carry small packed registers, and moves SPI data
//! through a pair of bulk endpoints.
//!
//! This crate is transport-agnostic. It is layered bottom-up:
//!
//! - [`field`] and [`register`]: bit-level codec between domain values and
//!   raw register bytes
//! - [`registers`] and [`command`]: static tables describing every register
//!   and every control request of the chip
//! - [`chip`]: dispatcher that executes commands and frames bulk transfers
//!   over a [`Transport`]
//! - [`chip_select`] and [`spi`]: per-channel chip-select state machine and
//!   SPI transfers
//! - [`device`]: high-level [`Cp2130`] with unit conversions
//!
//! USB access lives in `cp2130-nusb`; [`mock::MockTransport`] stands in for
//! it in tests.
//!
//! # Example
//!
//! ```
//! use cp2130_core::mock::MockTransport;
//! use cp2130_core::{Cp2130, SpiMode};
//!
//! let mut transport = MockTransport::new();
//! transport.set_loopback(true);
//!
//! let mut dev = Cp2130::new(transport)?;
//! let mut spi = dev.spi(0)?;
//! spi.set_mode(SpiMode::Mode0)?;
//! let rx = spi.write_read(&[0x9F, 0x00, 0x00], false)?;
//! assert_eq!(rx, vec![0x9F, 0x00, 0x00]);
//! # Ok::<(), cp2130_core::Error>(())
//! ```

#![warn(rust_2018_idioms)]

pub mod chip;
pub mod chip_select;
pub mod command;
pub mod data;
pub mod device;
pub mod error;
pub mod field;
pub mod mock;
pub mod protocol;
pub mod register;
pub mod registers;
pub mod spi;
pub mod transport;

pub use chip::Chip;
pub use chip_select::{ChipSelect, CsState, Strategy};
pub use data::*;
pub use device::Cp2130;
pub use error::{Error, Result, TransportError};
pub use field::Value;
pub use register::{Register, RegisterDef};
pub use spi::SpiChannel;
pub use transport::{ControlRequest, Transport};
