//! Command dispatcher and bulk framer
//!
//! [`Chip`] binds the command table to a [`Transport`]. Every call is a
//! single round trip: encode, transfer, decode. Nothing is cached and
//! nothing is retried.

use crate::command::{self, Command, CommandKind, Direction};
use crate::error::{Error, Result, TransportError};
use crate::protocol::{bulk_command, BulkOp, READ_EP, WRITE_EP};
use crate::register::Register;
use crate::transport::Transport;

/// Raw access to a CP2130 over a transport
pub struct Chip<T: Transport> {
    transport: T,
}

/// Generates one method per table entry
macro_rules! dispatch {
    ($($kind:ident $method:ident => $cmd:ident;)*) => {
        $(dispatch!(@$kind $method, $cmd);)*
    };
    (@get $method:ident, $cmd:ident) => {
        pub fn $method(&mut self) -> Result<Register> {
            self.read(&command::$cmd)
        }
    };
    (@get_at $method:ident, $cmd:ident) => {
        pub fn $method(&mut self, index: u16) -> Result<Register> {
            self.read_at(&command::$cmd, index)
        }
    };
    (@set $method:ident, $cmd:ident) => {
        pub fn $method(&mut self, register: &Register) -> Result<()> {
            self.write(&command::$cmd, register)
        }
    };
    (@set_at $method:ident, $cmd:ident) => {
        pub fn $method(&mut self, index: u16, register: &Register) -> Result<()> {
            self.write_at(&command::$cmd, index, register)
        }
    };
    (@unit $method:ident, $cmd:ident) => {
        pub fn $method(&mut self) -> Result<()> {
            self.run(&command::$cmd)
        }
    };
}

impl<T: Transport> Chip<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Execute an IN command and decode its register
    pub fn read(&mut self, cmd: &Command) -> Result<Register> {
        if cmd.direction != Direction::In {
            return Err(Error::Direction {
                command: cmd.name,
                attempted: "read",
            });
        }
        if cmd.needs_index() {
            return Err(Error::MissingIndex(cmd.name));
        }

        let req = cmd.control_request();
        log::debug!(
            "{}: IN req 0x{:02X} wValue 0x{:04X} wIndex {} wLength {}",
            cmd.name,
            req.request,
            req.value,
            req.index,
            cmd.length
        );
        let data = self.transport.control_in(req, cmd.length)?;
        cmd.decode(&data)
    }

    /// Execute an array or indexed IN command for one entry
    pub fn read_at(&mut self, cmd: &Command, index: u16) -> Result<Register> {
        self.read(&cmd.at(index)?)
    }

    /// Encode a register and execute an OUT command
    pub fn write(&mut self, cmd: &Command, register: &Register) -> Result<()> {
        self.out(cmd, Some(register))
    }

    /// Execute an array or indexed OUT command for one entry
    pub fn write_at(&mut self, cmd: &Command, index: u16, register: &Register) -> Result<()> {
        self.write(&cmd.at(index)?, register)
    }

    /// Execute a command without a data stage
    pub fn run(&mut self, cmd: &Command) -> Result<()> {
        if cmd.kind != CommandKind::Unit {
            return Err(Error::InvalidArgument(format!(
                "{} requires a register",
                cmd.name
            )));
        }
        self.out(cmd, None)
    }

    fn out(&mut self, cmd: &Command, register: Option<&Register>) -> Result<()> {
        if cmd.direction != Direction::Out {
            return Err(Error::Direction {
                command: cmd.name,
                attempted: "write",
            });
        }

        let data = cmd.encode(register)?;
        let req = cmd.control_request();
        log::debug!(
            "{}: OUT req 0x{:02X} wValue 0x{:04X} wIndex {} data {:02X?}",
            cmd.name,
            req.request,
            req.value,
            req.index,
            data
        );
        self.transport.control_out(req, &data)?;
        Ok(())
    }

    /// Read a command by name
    pub fn read_named(&mut self, name: &str, index: Option<u16>) -> Result<Register> {
        let cmd = lookup(name)?;
        match index {
            Some(i) => self.read_at(cmd, i),
            None => self.read(cmd),
        }
    }

    /// Write a command by name
    pub fn write_named(&mut self, name: &str, index: Option<u16>, register: &Register) -> Result<()> {
        let cmd = lookup(name)?;
        match index {
            Some(i) => self.write_at(cmd, i, register),
            None => self.write(cmd, register),
        }
    }

    dispatch! {
        get get_clock_divider => GET_CLOCK_DIVIDER;
        get get_event_counter => GET_EVENT_COUNTER;
        get get_full_threshold => GET_FULL_THRESHOLD;
        get get_gpio_chip_select => GET_GPIO_CHIP_SELECT;
        get get_gpio_mode_and_level => GET_GPIO_MODE_AND_LEVEL;
        get get_gpio_values => GET_GPIO_VALUES;
        get get_rtr_state => GET_RTR_STATE;
        get_at get_spi_word => GET_SPI_WORD;
        get_at get_spi_delay => GET_SPI_DELAY;
        get get_readonly_version => GET_READONLY_VERSION;
        unit reset_device => RESET_DEVICE;
        set set_clock_divider => SET_CLOCK_DIVIDER;
        set set_event_counter => SET_EVENT_COUNTER;
        set set_full_threshold => SET_FULL_THRESHOLD;
        set_at set_gpio_chip_select => SET_GPIO_CHIP_SELECT;
        set_at set_gpio_mode_and_level => SET_GPIO_MODE_AND_LEVEL;
        set set_gpio_values => SET_GPIO_VALUES;
        set set_rtr_stop => SET_RTR_STOP;
        set_at set_spi_word => SET_SPI_WORD;
        set_at set_spi_delay => SET_SPI_DELAY;
        get get_lock_byte => GET_LOCK_BYTE;
        get get_manufacturing_string1 => GET_MANUFACTURING_STRING1;
        get get_manufacturing_string2 => GET_MANUFACTURING_STRING2;
        get get_pin_config => GET_PIN_CONFIG;
        get get_product_string1 => GET_PRODUCT_STRING1;
        get get_product_string2 => GET_PRODUCT_STRING2;
        get get_serial_string => GET_SERIAL_STRING;
        get get_usb_config => GET_USB_CONFIG;
        set set_lock_byte => SET_LOCK_BYTE;
        set set_manufacturing_string1 => SET_MANUFACTURING_STRING1;
        set set_manufacturing_string2 => SET_MANUFACTURING_STRING2;
        set set_pin_config => SET_PIN_CONFIG;
        set set_product_string1 => SET_PRODUCT_STRING1;
        set set_product_string2 => SET_PRODUCT_STRING2;
        set set_serial_string => SET_SERIAL_STRING;
        set set_usb_config => SET_USB_CONFIG;
    }

    // Bulk SPI transfers

    /// Clock in `len` bytes
    pub fn spi_read(&mut self, len: usize) -> Result<Vec<u8>> {
        self.bulk(BulkOp::Read, len, &[])
    }

    /// Clock out `data`, discarding MISO
    pub fn spi_write(&mut self, data: &[u8]) -> Result<()> {
        self.bulk(BulkOp::Write, data.len(), data)?;
        Ok(())
    }

    /// Clock out `data` and return the bytes clocked in alongside it
    pub fn spi_write_read(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.bulk(BulkOp::WriteRead, data.len(), data)
    }

    /// Clock in `len` bytes, paced by the RTR input
    pub fn spi_read_with_rtr(&mut self, len: usize) -> Result<Vec<u8>> {
        self.bulk(BulkOp::ReadWithRtr, len, &[])
    }

    /// Send one bulk command and collect its answer, if the opcode has one
    fn bulk(&mut self, op: BulkOp, len: usize, payload: &[u8]) -> Result<Vec<u8>> {
        debug_assert!(op.has_payload() || payload.is_empty());
        let len32 = frame_len(len)?;
        log::trace!("bulk {:?}: {} bytes", op, len);
        self.transport
            .bulk_write(WRITE_EP, &bulk_command(op, len32, payload))?;
        if op.has_response() {
            self.collect(len)
        } else {
            Ok(Vec::new())
        }
    }

    /// Read exactly `len` bytes from the bulk IN endpoint
    fn collect(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len);
        while data.len() < len {
            let chunk = self.transport.bulk_read(READ_EP, len - data.len())?;
            if chunk.is_empty() {
                return Err(TransportError::Incomplete {
                    expected: len,
                    actual: data.len(),
                }
                .into());
            }
            data.extend_from_slice(&chunk);
        }
        data.truncate(len);
        Ok(data)
    }
}

fn lookup(name: &str) -> Result<&'static Command> {
    command::find(name).ok_or_else(|| Error::InvalidArgument(format!("unknown command {}", name)))
}

fn frame_len(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::InvalidArgument(format!("transfer of {} bytes is too long", len)))
}
