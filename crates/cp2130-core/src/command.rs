//! Command model and the CP2130 command table
//!
//! A [`Command`] carries the control-transfer parameters of one vendor
//! request together with the register type it transfers. Array commands
//! address one of several entries through a 1-byte payload header (or a
//! slice of the IN response); indexed commands put the entry number in
//! wIndex instead. Either kind must be bound with [`Command::at`] before it
//! can be executed.

use crate::error::{Error, Result};
use crate::protocol::{GPIO_COUNT, OTP_WRITE_KEY, REQUEST_TYPE_IN, REQUEST_TYPE_OUT};
use crate::register::{Register, RegisterDef};
use crate::registers;
use crate::transport::ControlRequest;

/// Data stage direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to host
    In,
    /// Host to device
    Out,
}

/// How a command addresses its register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// One register per transfer
    Simple,
    /// One of `entries` registers, selected by a payload index byte (OUT)
    /// or by slicing the response (IN)
    Array { entries: u16, entry: Option<u16> },
    /// One of `entries` registers, selected through wIndex
    Indexed { entries: u16 },
    /// No data stage
    Unit,
}

/// One vendor request
#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub direction: Direction,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    /// wLength
    pub length: u16,
    pub register: Option<&'static RegisterDef>,
    pub kind: CommandKind,
    /// Drop the first byte of the IN payload (an index echo) before decoding
    pub strip_header: bool,
}

const fn get(name: &'static str, request: u8, length: u16, register: &'static RegisterDef) -> Command {
    Command {
        name,
        direction: Direction::In,
        request,
        value: 0,
        index: 0,
        length,
        register: Some(register),
        kind: CommandKind::Simple,
        strip_header: false,
    }
}

const fn set(name: &'static str, request: u8, length: u16, register: &'static RegisterDef) -> Command {
    Command {
        direction: Direction::Out,
        ..get(name, request, length, register)
    }
}

/// OTP ROM write, unlocked by the write key in wValue
const fn otp(name: &'static str, request: u8, length: u16, register: &'static RegisterDef) -> Command {
    Command {
        value: OTP_WRITE_KEY,
        ..set(name, request, length, register)
    }
}

impl Command {
    const fn array(self) -> Self {
        Self {
            kind: CommandKind::Array {
                entries: GPIO_COUNT as u16,
                entry: None,
            },
            ..self
        }
    }

    const fn indexed(self) -> Self {
        Self {
            kind: CommandKind::Indexed {
                entries: GPIO_COUNT as u16,
            },
            ..self
        }
    }

    const fn stripped(self) -> Self {
        Self {
            strip_header: true,
            ..self
        }
    }

    /// bmRequestType for this command's direction
    pub fn request_type(&self) -> u8 {
        match self.direction {
            Direction::In => REQUEST_TYPE_IN,
            Direction::Out => REQUEST_TYPE_OUT,
        }
    }

    /// Setup packet parameters
    pub fn control_request(&self) -> ControlRequest {
        ControlRequest {
            request_type: self.request_type(),
            request: self.request,
            value: self.value,
            index: self.index,
        }
    }

    /// Whether [`Command::at`] must be called before executing
    pub fn needs_index(&self) -> bool {
        matches!(
            self.kind,
            CommandKind::Array { entry: None, .. } | CommandKind::Indexed { .. }
        )
    }

    /// Bind an entry index
    ///
    /// Array commands remember the entry; indexed commands become a simple
    /// command with `index` in wIndex.
    pub fn at(&self, index: u16) -> Result<Command> {
        let entries = match self.kind {
            CommandKind::Array { entries, .. } | CommandKind::Indexed { entries } => entries,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "{} does not take an index",
                    self.name
                )))
            }
        };
        if index >= entries {
            return Err(Error::IndexOutOfRange {
                command: self.name,
                index,
                count: entries,
            });
        }

        Ok(match self.kind {
            CommandKind::Array { entries, .. } => Command {
                kind: CommandKind::Array {
                    entries,
                    entry: Some(index),
                },
                ..*self
            },
            _ => Command {
                index,
                kind: CommandKind::Simple,
                ..*self
            },
        })
    }

    fn register_def(&self) -> Result<&'static RegisterDef> {
        self.register
            .ok_or(Error::Unsupported("command carries no register"))
    }

    /// Decode the data stage of an IN transfer
    pub fn decode(&self, data: &[u8]) -> Result<Register> {
        let def = self.register_def()?;
        let payload = match self.kind {
            CommandKind::Array { entry: None, .. } => return Err(Error::MissingIndex(self.name)),
            CommandKind::Indexed { .. } => return Err(Error::MissingIndex(self.name)),
            CommandKind::Array {
                entry: Some(entry), ..
            } => {
                // Entry length is the register plus any echoed header byte
                let entry_len = def.len + self.strip_header as usize;
                let start = (entry as usize * entry_len).min(data.len());
                let end = (start + entry_len).min(data.len());
                &data[start..end]
            }
            _ => data,
        };

        let payload = if self.strip_header && !payload.is_empty() {
            &payload[1..]
        } else {
            payload
        };
        def.unpack(payload)
    }

    /// Build the data stage of an OUT transfer
    pub fn encode(&self, register: Option<&Register>) -> Result<Vec<u8>> {
        if let CommandKind::Unit = self.kind {
            return Ok(Vec::new());
        }

        let def = self.register_def()?;
        let register = register.ok_or_else(|| {
            Error::InvalidArgument(format!("{} requires a {} register", self.name, def.name))
        })?;
        if register.name() != def.name {
            return Err(Error::InvalidArgument(format!(
                "{} requires a {} register, got {}",
                self.name,
                def.name,
                register.name()
            )));
        }

        match self.kind {
            CommandKind::Array {
                entry: Some(entry), ..
            } => {
                let mut data = Vec::with_capacity(1 + def.len);
                data.push(entry as u8);
                data.extend_from_slice(&register.pack());
                Ok(data)
            }
            CommandKind::Array { entry: None, .. } | CommandKind::Indexed { .. } => {
                Err(Error::MissingIndex(self.name))
            }
            _ => Ok(register.pack()),
        }
    }
}

// Configuration and control commands

pub static GET_CLOCK_DIVIDER: Command = get("get_clock_divider", 0x46, 1, &registers::CLOCK_DIVIDER);
pub static GET_EVENT_COUNTER: Command = get("get_event_counter", 0x44, 3, &registers::EVENT_COUNTER);
pub static GET_FULL_THRESHOLD: Command =
    get("get_full_threshold", 0x34, 1, &registers::FULL_THRESHOLD);
pub static GET_GPIO_CHIP_SELECT: Command =
    get("get_gpio_chip_select", 0x24, 4, &registers::ALL_GPIO_CHIP_SELECT);
pub static GET_GPIO_MODE_AND_LEVEL: Command =
    get("get_gpio_mode_and_level", 0x22, 4, &registers::ALL_GPIO_MODE_AND_LEVEL);
pub static GET_GPIO_VALUES: Command = get("get_gpio_values", 0x20, 2, &registers::GPIO_VALUES);
pub static GET_RTR_STATE: Command = get("get_rtr_state", 0x36, 1, &registers::RTR_STATE);
pub static GET_SPI_WORD: Command = get("get_spi_word", 0x30, 11, &registers::SPI_WORD).array();
pub static GET_SPI_DELAY: Command = get("get_spi_delay", 0x32, 8, &registers::SPI_DELAY)
    .indexed()
    .stripped();
pub static GET_READONLY_VERSION: Command =
    get("get_readonly_version", 0x11, 2, &registers::READONLY_VERSION);

pub static RESET_DEVICE: Command = Command {
    name: "reset_device",
    direction: Direction::Out,
    request: 0x10,
    value: 0,
    index: 0,
    length: 0,
    register: None,
    kind: CommandKind::Unit,
    strip_header: false,
};

pub static SET_CLOCK_DIVIDER: Command = set("set_clock_divider", 0x47, 1, &registers::CLOCK_DIVIDER);
pub static SET_EVENT_COUNTER: Command = set("set_event_counter", 0x45, 3, &registers::EVENT_COUNTER);
pub static SET_FULL_THRESHOLD: Command =
    set("set_full_threshold", 0x35, 1, &registers::FULL_THRESHOLD);
pub static SET_GPIO_CHIP_SELECT: Command =
    set("set_gpio_chip_select", 0x25, 2, &registers::ONE_GPIO_CHIP_SELECT).array();
pub static SET_GPIO_MODE_AND_LEVEL: Command =
    set("set_gpio_mode_and_level", 0x23, 3, &registers::ONE_GPIO_MODE_AND_LEVEL).array();
pub static SET_GPIO_VALUES: Command =
    set("set_gpio_values", 0x21, 4, &registers::GPIO_VALUES_SETTER);
pub static SET_RTR_STOP: Command = set("set_rtr_stop", 0x37, 1, &registers::RTR_STOP);
pub static SET_SPI_WORD: Command = set("set_spi_word", 0x31, 2, &registers::SPI_WORD).array();
pub static SET_SPI_DELAY: Command = set("set_spi_delay", 0x33, 8, &registers::SPI_DELAY).array();

// OTP ROM configuration commands

pub static GET_LOCK_BYTE: Command = get("get_lock_byte", 0x6E, 2, &registers::LOCK);
pub static GET_MANUFACTURING_STRING1: Command =
    get("get_manufacturing_string1", 0x62, 0x40, &registers::MANUFACTURING_STRING1);
pub static GET_MANUFACTURING_STRING2: Command =
    get("get_manufacturing_string2", 0x64, 0x40, &registers::MANUFACTURING_STRING2);
pub static GET_PIN_CONFIG: Command = get("get_pin_config", 0x6C, 0x14, &registers::PIN_CONFIG);
pub static GET_PRODUCT_STRING1: Command =
    get("get_product_string1", 0x66, 0x40, &registers::PRODUCT_STRING1);
pub static GET_PRODUCT_STRING2: Command =
    get("get_product_string2", 0x68, 0x40, &registers::PRODUCT_STRING2);
pub static GET_SERIAL_STRING: Command =
    get("get_serial_string", 0x6A, 0x40, &registers::SERIAL_STRING);
pub static GET_USB_CONFIG: Command = get("get_usb_config", 0x60, 9, &registers::USB_CONFIG);

pub static SET_LOCK_BYTE: Command = otp("set_lock_byte", 0x6F, 2, &registers::LOCK);
pub static SET_MANUFACTURING_STRING1: Command =
    otp("set_manufacturing_string1", 0x63, 0x40, &registers::MANUFACTURING_STRING1);
pub static SET_MANUFACTURING_STRING2: Command =
    otp("set_manufacturing_string2", 0x65, 0x40, &registers::MANUFACTURING_STRING2);
pub static SET_PIN_CONFIG: Command = otp("set_pin_config", 0x6D, 0x14, &registers::PIN_CONFIG);
pub static SET_PRODUCT_STRING1: Command =
    otp("set_product_string1", 0x67, 0x40, &registers::PRODUCT_STRING1);
pub static SET_PRODUCT_STRING2: Command =
    otp("set_product_string2", 0x69, 0x40, &registers::PRODUCT_STRING2);
pub static SET_SERIAL_STRING: Command =
    otp("set_serial_string", 0x6B, 0x40, &registers::SERIAL_STRING);
pub static SET_USB_CONFIG: Command =
    otp("set_usb_config", 0x61, 0x0A, &registers::USB_CONFIG_SETTER);

/// Every command, in datasheet order
pub static COMMANDS: &[&Command] = &[
    &GET_CLOCK_DIVIDER,
    &GET_EVENT_COUNTER,
    &GET_FULL_THRESHOLD,
    &GET_GPIO_CHIP_SELECT,
    &GET_GPIO_MODE_AND_LEVEL,
    &GET_GPIO_VALUES,
    &GET_RTR_STATE,
    &GET_SPI_WORD,
    &GET_SPI_DELAY,
    &GET_READONLY_VERSION,
    &RESET_DEVICE,
    &SET_CLOCK_DIVIDER,
    &SET_EVENT_COUNTER,
    &SET_FULL_THRESHOLD,
    &SET_GPIO_CHIP_SELECT,
    &SET_GPIO_MODE_AND_LEVEL,
    &SET_GPIO_VALUES,
    &SET_RTR_STOP,
    &SET_SPI_WORD,
    &SET_SPI_DELAY,
    &GET_LOCK_BYTE,
    &GET_MANUFACTURING_STRING1,
    &GET_MANUFACTURING_STRING2,
    &GET_PIN_CONFIG,
    &GET_PRODUCT_STRING1,
    &GET_PRODUCT_STRING2,
    &GET_SERIAL_STRING,
    &GET_USB_CONFIG,
    &SET_LOCK_BYTE,
    &SET_MANUFACTURING_STRING1,
    &SET_MANUFACTURING_STRING2,
    &SET_PIN_CONFIG,
    &SET_PRODUCT_STRING1,
    &SET_PRODUCT_STRING2,
    &SET_SERIAL_STRING,
    &SET_USB_CONFIG,
];

/// Look up a command by name
pub fn find(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().copied().find(|cmd| cmd.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ChipSelectControl, ClockPhase};
    use crate::field::Value;

    #[test]
    fn test_table_lengths_match_registers() {
        for cmd in COMMANDS {
            let Some(def) = cmd.register else {
                assert_eq!(cmd.length, 0, "{}", cmd.name);
                continue;
            };
            let expected = match (cmd.kind, cmd.direction) {
                (CommandKind::Array { entries, .. }, Direction::In) => entries as usize * def.len,
                (CommandKind::Array { .. }, Direction::Out) => 1 + def.len,
                _ => def.len + cmd.strip_header as usize,
            };
            assert_eq!(cmd.length as usize, expected, "{}", cmd.name);
        }
    }

    #[test]
    fn test_table_names_unique() {
        for (i, cmd) in COMMANDS.iter().enumerate() {
            assert!(
                COMMANDS[i + 1..].iter().all(|other| other.name != cmd.name),
                "{}",
                cmd.name
            );
        }
    }

    #[test]
    fn test_request_types() {
        assert_eq!(GET_USB_CONFIG.request_type(), 0xC0);
        assert_eq!(SET_USB_CONFIG.request_type(), 0x40);
        assert_eq!(SET_USB_CONFIG.value, 0xA5F1);
        assert_eq!(SET_CLOCK_DIVIDER.value, 0);
    }

    #[test]
    fn test_find() {
        assert_eq!(find("get_spi_delay").map(|c| c.request), Some(0x32));
        assert!(find("get_nothing").is_none());
    }

    #[test]
    fn test_array_write_prepends_index() {
        let reg = registers::ONE_GPIO_CHIP_SELECT
            .make(&[(
                "control",
                Value::Symbol(ChipSelectControl::EnabledExclusive.into()),
            )])
            .unwrap();
        let cmd = SET_GPIO_CHIP_SELECT.at(3).unwrap();
        assert_eq!(cmd.encode(Some(&reg)).unwrap(), vec![0x03, 0x02]);
    }

    #[test]
    fn test_array_read_slices_entry() {
        let mut data = vec![0u8; 11];
        data[3] = 0b0010_0000;
        let reg = GET_SPI_WORD.at(3).unwrap().decode(&data).unwrap();
        assert_eq!(
            reg.get::<ClockPhase>("clock_phase").unwrap(),
            ClockPhase::TrailingEdge
        );
        let reg = GET_SPI_WORD.at(2).unwrap().decode(&data).unwrap();
        assert_eq!(
            reg.get::<ClockPhase>("clock_phase").unwrap(),
            ClockPhase::LeadingEdge
        );
    }

    #[test]
    fn test_indexed_substitutes_windex() {
        let cmd = GET_SPI_DELAY.at(7).unwrap();
        assert_eq!(cmd.index, 7);
        assert_eq!(cmd.kind, CommandKind::Simple);
        assert_eq!(cmd.control_request().index, 7);

        // First byte echoes the channel and is dropped
        let reg = cmd
            .decode(&[0x07, 0x0F, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03])
            .unwrap();
        assert!(reg.get::<bool>("cs_toggle").unwrap());
        assert_eq!(reg.get::<u16>("pre_deassert_delay_10us").unwrap(), 3);
    }

    #[test]
    fn test_index_required_and_bounded() {
        assert!(matches!(
            GET_SPI_WORD.decode(&[0; 11]),
            Err(Error::MissingIndex("get_spi_word"))
        ));
        assert!(matches!(
            SET_SPI_DELAY.at(11),
            Err(Error::IndexOutOfRange {
                index: 11,
                count: 11,
                ..
            })
        ));
        assert!(GET_CLOCK_DIVIDER.at(0).is_err());
    }

    #[test]
    fn test_unit_command_empty_payload() {
        assert_eq!(RESET_DEVICE.encode(None).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_checks_register_type() {
        let reg = registers::FULL_THRESHOLD.defaults();
        assert!(matches!(
            SET_CLOCK_DIVIDER.encode(Some(&reg)),
            Err(Error::InvalidArgument(_))
        ));
    }
}
