//! High-level CP2130 device
//!
//! [`Cp2130`] wraps a [`Chip`] with unit conversions (clock divider and
//! frequency, milliamps, UTF-16 strings) and owns the chip-select state of
//! the eleven SPI channels, so a held select line survives between calls to
//! [`Cp2130::spi`].

use crate::chip::Chip;
use crate::chip_select::{ChipSelect, Strategy};
use crate::data::{
    ChipSelectControl, EventCounterMode, GpioMode, LockState, LogicLevel, OutputMode, PinFunction,
    PowerMode, TransferPriority, Version,
};
use crate::error::{Error, Result};
use crate::field::Value;
use crate::protocol::{BASE_CLOCK_HZ, GPIO_COUNT};
use crate::register::{Register, RegisterDef};
use crate::registers::{self, channel_enable_field, gpio_field};
use crate::spi::SpiChannel;
use crate::transport::Transport;

/// Slowest clock output: 24 MHz / 256
pub const MIN_CLOCK_HZ: u32 = BASE_CLOCK_HZ / 256;

/// Largest bus current that can be requested
pub const MAX_POWER_MA: u32 = 500;

/// UTF-16LE bytes available for the manufacturer and product strings
const LONG_STRING_BYTES: usize = 124;
/// UTF-16LE bytes available for the serial string
const SERIAL_STRING_BYTES: usize = 60;
/// Bytes of a long string carried by the first register
const STRING1_BYTES: usize = 61;

/// A CP2130 behind a transport
pub struct Cp2130<T: Transport> {
    chip: Chip<T>,
    channels: Vec<ChipSelect>,
}

impl<T: Transport> Cp2130<T> {
    /// Take over a device
    ///
    /// Reads the pin configuration to pick each channel's chip-select
    /// strategy: pins configured as GPIO outputs are driven by the host,
    /// everything else uses the chip's own CS output. Every channel's chip
    /// select is disabled.
    pub fn new(transport: T) -> Result<Self> {
        let mut chip = Chip::new(transport);
        let pin_config = chip.get_pin_config()?;

        let mut channels = Vec::with_capacity(GPIO_COUNT as usize);
        let disabled = registers::ONE_GPIO_CHIP_SELECT
            .make(&[("control", Value::Symbol(ChipSelectControl::Disabled.into()))])?;
        for channel in 0..GPIO_COUNT {
            let function: PinFunction = pin_config.get(&format!("gpio{}", channel))?;
            let strategy = if function.is_output() {
                Strategy::Manual
            } else {
                Strategy::Native
            };
            log::debug!("channel {}: {:?} ({:?})", channel, strategy, function);

            chip.set_gpio_chip_select(channel as u16, &disabled)?;
            channels.push(ChipSelect::new(channel, strategy));
        }

        let manual = channels
            .iter()
            .filter(|cs| cs.strategy() == Strategy::Manual)
            .count();
        log::info!(
            "CP2130 ready: {} native and {} GPIO-driven chip selects",
            channels.len() - manual,
            manual
        );
        Ok(Self { chip, channels })
    }

    /// Raw register access
    pub fn chip(&mut self) -> &mut Chip<T> {
        &mut self.chip
    }

    pub fn into_inner(self) -> T {
        self.chip.into_inner()
    }

    /// SPI channel `channel` (0-10)
    pub fn spi(&mut self, channel: u8) -> Result<SpiChannel<'_, T>> {
        let cs = self
            .channels
            .get_mut(channel as usize)
            .ok_or_else(|| Error::InvalidArgument(format!("no SPI channel {}", channel)))?;
        Ok(SpiChannel::new(&mut self.chip, cs))
    }

    // Clock output

    /// Clock output divider, 1-256
    pub fn clock_divider(&mut self) -> Result<u16> {
        let divider: u16 = self.chip.get_clock_divider()?.get("clock_divider")?;
        Ok(if divider == 0 { 256 } else { divider })
    }

    pub fn set_clock_divider(&mut self, divider: u16) -> Result<()> {
        if !(1..=256).contains(&divider) {
            return Err(Error::InvalidArgument(format!(
                "clock divider {} not in 1..=256",
                divider
            )));
        }
        let raw = if divider == 256 { 0 } else { divider as u32 };
        let reg = registers::CLOCK_DIVIDER.make(&[("clock_divider", Value::Int(raw))])?;
        self.chip.set_clock_divider(&reg)
    }

    /// Clock output frequency in Hz
    pub fn clock_frequency(&mut self) -> Result<u32> {
        Ok(BASE_CLOCK_HZ / self.clock_divider()? as u32)
    }

    /// Set the clock output, rounding the divider down
    pub fn set_clock_frequency(&mut self, hz: u32) -> Result<()> {
        if !(MIN_CLOCK_HZ..=BASE_CLOCK_HZ).contains(&hz) {
            return Err(Error::InvalidArgument(format!(
                "clock frequency {} Hz not in {}..={} Hz",
                hz, MIN_CLOCK_HZ, BASE_CLOCK_HZ
            )));
        }
        self.set_clock_divider((BASE_CLOCK_HZ / hz) as u16)
    }

    // Device

    /// Bulk IN FIFO full threshold in bytes
    pub fn full_threshold(&mut self) -> Result<u8> {
        self.chip.get_full_threshold()?.get("threshold")
    }

    pub fn set_full_threshold(&mut self, threshold: u8) -> Result<()> {
        if threshold == 0 {
            return Err(Error::InvalidArgument(
                "full threshold must be between 1 and 255".into(),
            ));
        }
        let reg = registers::FULL_THRESHOLD.make(&[("threshold", Value::Int(threshold as u32))])?;
        self.chip.set_full_threshold(&reg)
    }

    pub fn version(&mut self) -> Result<Version> {
        let reg = self.chip.get_readonly_version()?;
        Ok(Version::new(reg.get("major")?, reg.get("minor")?))
    }

    /// Reset the device; it re-enumerates about a millisecond later
    pub fn reset(&mut self) -> Result<()> {
        log::info!("Resetting CP2130");
        self.chip.reset_device()
    }

    /// Whether the RTR input currently allows reads
    pub fn rtr_active(&mut self) -> Result<bool> {
        self.chip.get_rtr_state()?.get("active")
    }

    /// Abort a pending read-with-RTR
    pub fn stop_rtr(&mut self) -> Result<()> {
        let reg = registers::RTR_STOP.make(&[("stop", Value::Bool(true))])?;
        self.chip.set_rtr_stop(&reg)
    }

    // Event counter (GPIO.4)

    pub fn event_counter_mode(&mut self) -> Result<EventCounterMode> {
        self.chip.get_event_counter()?.get("mode")
    }

    /// Select the counted edge or pulse; the count restarts from zero
    pub fn set_event_counter_mode(&mut self, mode: EventCounterMode) -> Result<()> {
        self.write_event_counter(mode, 0)
    }

    pub fn event_count(&mut self) -> Result<u16> {
        self.chip.get_event_counter()?.get("count")
    }

    /// Preset the count, keeping the mode
    pub fn set_event_count(&mut self, count: u16) -> Result<()> {
        let mode = self.event_counter_mode()?;
        self.write_event_counter(mode, count)
    }

    /// Count and overflow flag
    pub fn event_count_with_overflow(&mut self) -> Result<(u16, bool)> {
        let reg = self.chip.get_event_counter()?;
        Ok((reg.get("count")?, reg.get("overflow")?))
    }

    fn write_event_counter(&mut self, mode: EventCounterMode, count: u16) -> Result<()> {
        let mut reg = registers::EVENT_COUNTER.defaults();
        reg.set("mode", mode)?;
        reg.set("count", count)?;
        self.chip.set_event_counter(&reg)
    }

    // GPIO

    fn check_pin(pin: u8) -> Result<()> {
        if pin >= GPIO_COUNT {
            return Err(Error::InvalidArgument(format!("no GPIO{}", pin)));
        }
        Ok(())
    }

    /// Power-on function of a pin, from the OTP pin configuration
    pub fn pin_function(&mut self, pin: u8) -> Result<PinFunction> {
        Self::check_pin(pin)?;
        self.chip.get_pin_config()?.get(&format!("gpio{}", pin))
    }

    /// Current output driver and level of a pin
    pub fn gpio_mode_and_level(&mut self, pin: u8) -> Result<(OutputMode, LogicLevel)> {
        Self::check_pin(pin)?;
        let reg = self.chip.get_gpio_mode_and_level()?;
        Ok((
            reg.get(&gpio_field(pin, "mode"))?,
            reg.get(&gpio_field(pin, "level"))?,
        ))
    }

    pub fn set_gpio_mode_and_level(
        &mut self,
        pin: u8,
        mode: GpioMode,
        level: LogicLevel,
    ) -> Result<()> {
        Self::check_pin(pin)?;
        let mut reg = registers::ONE_GPIO_MODE_AND_LEVEL.defaults();
        reg.set("mode", mode)?;
        reg.set("level", level)?;
        self.chip.set_gpio_mode_and_level(pin as u16, &reg)
    }

    /// Level currently read on a pin
    pub fn gpio_value(&mut self, pin: u8) -> Result<LogicLevel> {
        Self::check_pin(pin)?;
        self.chip.get_gpio_values()?.get(&gpio_field(pin, "level"))
    }

    /// Drive one output pin, leaving the others untouched
    pub fn set_gpio_value(&mut self, pin: u8, level: LogicLevel) -> Result<()> {
        Self::check_pin(pin)?;
        let mut reg = registers::GPIO_VALUES_SETTER.defaults();
        reg.set(&gpio_field(pin, "level"), level)?;
        self.chip.set_gpio_values(&reg)
    }

    /// Whether the pin's chip select is enabled
    pub fn cs_enabled(&mut self, pin: u8) -> Result<bool> {
        Self::check_pin(pin)?;
        self.chip
            .get_gpio_chip_select()?
            .get(&channel_enable_field(pin))
    }

    pub fn set_cs_enable(&mut self, pin: u8, control: ChipSelectControl) -> Result<()> {
        Self::check_pin(pin)?;
        let mut reg = registers::ONE_GPIO_CHIP_SELECT.defaults();
        reg.set("control", control)?;
        self.chip.set_gpio_chip_select(pin as u16, &reg)
    }

    // OTP ROM

    /// Lock byte: which OTP fields can still be programmed
    pub fn lock(&mut self) -> Result<Register> {
        self.chip.get_lock_byte()
    }

    /// Permanently lock the named OTP fields
    pub fn lock_fields(&mut self, fields: &[&str]) -> Result<()> {
        let mut reg = self.chip.get_lock_byte()?;
        for field in fields {
            reg.set(field, LockState::Locked)?;
        }
        self.chip.set_lock_byte(&reg)
    }

    pub fn pin_config(&mut self) -> Result<Register> {
        self.chip.get_pin_config()
    }

    /// Program the power-on pin configuration (one-time)
    pub fn set_pin_config(&mut self, pin_config: &Register) -> Result<()> {
        self.chip.set_pin_config(pin_config)
    }

    pub fn vendor_id(&mut self) -> Result<u16> {
        self.chip.get_usb_config()?.get("vid")
    }

    pub fn set_vendor_id(&mut self, vid: u16) -> Result<()> {
        self.write_usb_config(&[("vid", Value::Int(vid as u32))])
    }

    pub fn product_id(&mut self) -> Result<u16> {
        self.chip.get_usb_config()?.get("pid")
    }

    pub fn set_product_id(&mut self, pid: u16) -> Result<()> {
        self.write_usb_config(&[("pid", Value::Int(pid as u32))])
    }

    /// Requested bus current in mA
    pub fn max_power_ma(&mut self) -> Result<u32> {
        Ok(self.chip.get_usb_config()?.get::<u32>("max_power_2mA")? * 2)
    }

    pub fn set_max_power_ma(&mut self, ma: u32) -> Result<()> {
        if ma > MAX_POWER_MA {
            return Err(Error::InvalidArgument(format!(
                "max power {} mA exceeds {} mA",
                ma, MAX_POWER_MA
            )));
        }
        self.write_usb_config(&[("max_power_2mA", Value::Int(ma / 2))])
    }

    pub fn power_mode(&mut self) -> Result<PowerMode> {
        self.chip.get_usb_config()?.get("power_mode")
    }

    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<()> {
        let mut reg = registers::USB_CONFIG_SETTER.defaults();
        reg.set("power_mode", mode)?;
        self.chip.set_usb_config(&reg)
    }

    /// Device release number (bcdDevice)
    pub fn release(&mut self) -> Result<Version> {
        let reg = self.chip.get_usb_config()?;
        Ok(Version::new(reg.get("major_release")?, reg.get("minor_release")?))
    }

    pub fn set_release(&mut self, release: Version) -> Result<()> {
        self.write_usb_config(&[
            ("major_release", Value::Int(release.major)),
            ("minor_release", Value::Int(release.minor)),
        ])
    }

    pub fn transfer_priority(&mut self) -> Result<TransferPriority> {
        self.chip.get_usb_config()?.get("transfer_priority")
    }

    pub fn set_transfer_priority(&mut self, priority: TransferPriority) -> Result<()> {
        let mut reg = registers::USB_CONFIG_SETTER.defaults();
        reg.set("transfer_priority", priority)?;
        self.chip.set_usb_config(&reg)
    }

    /// Program only the given USB config fields
    fn write_usb_config(&mut self, values: &[(&str, Value)]) -> Result<()> {
        let reg = registers::USB_CONFIG_SETTER.make(values)?;
        self.chip.set_usb_config(&reg)
    }

    pub fn manufacturer_string(&mut self) -> Result<String> {
        let first = self.chip.get_manufacturing_string1()?;
        let second = self.chip.get_manufacturing_string2()?;
        decode_long_string(&first, &second)
    }

    pub fn set_manufacturer_string(&mut self, s: &str) -> Result<()> {
        let (first, second) = encode_long_string(
            s,
            &registers::MANUFACTURING_STRING1,
            &registers::MANUFACTURING_STRING2,
        )?;
        self.chip.set_manufacturing_string1(&first)?;
        self.chip.set_manufacturing_string2(&second)
    }

    pub fn product_string(&mut self) -> Result<String> {
        let first = self.chip.get_product_string1()?;
        let second = self.chip.get_product_string2()?;
        decode_long_string(&first, &second)
    }

    pub fn set_product_string(&mut self, s: &str) -> Result<()> {
        let (first, second) =
            encode_long_string(s, &registers::PRODUCT_STRING1, &registers::PRODUCT_STRING2)?;
        self.chip.set_product_string1(&first)?;
        self.chip.set_product_string2(&second)
    }

    pub fn serial_string(&mut self) -> Result<String> {
        let reg = self.chip.get_serial_string()?;
        let bytes: Vec<u8> = reg.get("string")?;
        let len = descriptor_payload_len(&reg, bytes.len())?;
        utf16_decode(&bytes[..len])
    }

    pub fn set_serial_string(&mut self, s: &str) -> Result<()> {
        let mut bytes = utf16_encode(s);
        if bytes.len() > SERIAL_STRING_BYTES {
            return Err(Error::InvalidArgument(format!(
                "serial string is limited to {} characters",
                SERIAL_STRING_BYTES / 2
            )));
        }
        let length = bytes.len() as u32 + 2;
        bytes.resize(SERIAL_STRING_BYTES, 0);

        let mut reg = registers::SERIAL_STRING.defaults();
        reg.set("length", length)?;
        reg.set("string", bytes)?;
        self.chip.set_serial_string(&reg)
    }
}

/// Bytes of string payload announced by a descriptor's length field
fn descriptor_payload_len(reg: &Register, available: usize) -> Result<usize> {
    let length: u32 = reg.get("length")?;
    Ok((length as usize).saturating_sub(2).min(available))
}

fn decode_long_string(first: &Register, second: &Register) -> Result<String> {
    let mut bytes: Vec<u8> = first.get("string")?;
    bytes.extend(second.get::<Vec<u8>>("string")?);
    let len = descriptor_payload_len(first, bytes.len())?;
    utf16_decode(&bytes[..len])
}

fn encode_long_string(
    s: &str,
    first_def: &'static RegisterDef,
    second_def: &'static RegisterDef,
) -> Result<(Register, Register)> {
    let mut bytes = utf16_encode(s);
    if bytes.len() > LONG_STRING_BYTES {
        return Err(Error::InvalidArgument(format!(
            "string is limited to {} characters",
            LONG_STRING_BYTES / 2
        )));
    }
    let length = bytes.len() as u32 + 2;
    bytes.resize(LONG_STRING_BYTES, 0);
    let tail = bytes.split_off(STRING1_BYTES);

    let mut first = first_def.defaults();
    first.set("length", length)?;
    first.set("string", bytes)?;
    let mut second = second_def.defaults();
    second.set("string", tail)?;
    Ok((first, second))
}

fn utf16_encode(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

fn utf16_decode(bytes: &[u8]) -> Result<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|_| Error::InvalidArgument("string descriptor is not valid UTF-16".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    const GET_PIN_CONFIG: u8 = 0x6C;
    const SET_GPIO_CHIP_SELECT: u8 = 0x25;
    const SET_CLOCK_DIVIDER: u8 = 0x47;
    const SET_USB_CONFIG: u8 = 0x61;

    fn device(transport: MockTransport) -> Cp2130<MockTransport> {
        let mut dev = Cp2130::new(transport).unwrap();
        dev.chip().transport_mut().clear_calls();
        dev
    }

    #[test]
    fn test_new_picks_strategy_and_disables_cs() {
        let mut pin_config = [0u8; 20];
        pin_config[0] = 0x02; // gpio0 push-pull
        pin_config[1] = 0x03; // gpio1 CS1_n
        let mut transport = MockTransport::new();
        transport.respond(GET_PIN_CONFIG, &pin_config);

        let mut dev = Cp2130::new(transport).unwrap();
        assert_eq!(dev.spi(0).unwrap().strategy(), Strategy::Manual);
        assert_eq!(dev.spi(1).unwrap().strategy(), Strategy::Native);
        assert_eq!(dev.spi(10).unwrap().strategy(), Strategy::Native);
        assert!(dev.spi(11).is_err());

        let sent = dev.chip().transport().sent(SET_GPIO_CHIP_SELECT);
        assert_eq!(sent.len(), 11);
        assert_eq!(sent[10], vec![10, 0]);
    }

    #[test]
    fn test_clock_divider_256_stored_as_zero() {
        let mut dev = device(MockTransport::new());
        dev.set_clock_divider(256).unwrap();
        dev.set_clock_divider(1).unwrap();
        assert!(dev.set_clock_divider(0).is_err());
        assert!(dev.set_clock_divider(257).is_err());
        assert_eq!(
            dev.chip().transport().sent(SET_CLOCK_DIVIDER),
            vec![vec![0x00], vec![0x01]]
        );
        // Mock reads back zero
        assert_eq!(dev.clock_divider().unwrap(), 256);
        assert_eq!(dev.clock_frequency().unwrap(), 93_750);
    }

    #[test]
    fn test_clock_frequency_rounds_divider_down() {
        let mut dev = device(MockTransport::new());
        dev.set_clock_frequency(5_000_000).unwrap();
        assert!(dev.set_clock_frequency(90_000).is_err());
        assert_eq!(
            dev.chip().transport().sent(SET_CLOCK_DIVIDER),
            vec![vec![0x04]]
        );
    }

    #[test]
    fn test_usb_config_writes_only_selected_fields() {
        let mut dev = device(MockTransport::new());
        dev.set_max_power_ma(500).unwrap();
        assert!(dev.set_max_power_ma(502).is_err());
        dev.set_release(Version::new(1, 23)).unwrap();
        let sent = dev.chip().transport().sent(SET_USB_CONFIG);
        assert_eq!(sent[0], vec![0, 0, 0, 0, 250, 0, 0, 0, 0, 0b0000_0100]);
        assert_eq!(sent[1], vec![0, 0, 0, 0, 0, 0, 0x01, 0x23, 0, 0b0001_0000]);
    }

    #[test]
    fn test_manufacturer_string_split() {
        let (first, second) = encode_long_string(
            "CP2130",
            &registers::MANUFACTURING_STRING1,
            &registers::MANUFACTURING_STRING2,
        )
        .unwrap();
        let raw = first.pack();
        assert_eq!(raw[0], 14);
        assert_eq!(raw[1], 0x03);
        assert_eq!(&raw[2..6], &[b'C', 0, b'P', 0]);
        assert_eq!(decode_long_string(&first, &second).unwrap(), "CP2130");

        let long: String = std::iter::repeat('x').take(63).collect();
        assert!(encode_long_string(
            &long,
            &registers::PRODUCT_STRING1,
            &registers::PRODUCT_STRING2
        )
        .is_err());
    }

    #[test]
    fn test_long_string_spans_both_registers() {
        let s: String = std::iter::repeat('a').take(62).collect();
        let (first, second) = encode_long_string(
            &s,
            &registers::PRODUCT_STRING1,
            &registers::PRODUCT_STRING2,
        )
        .unwrap();
        assert_eq!(first.get::<u32>("length").unwrap(), 126);
        // 61 bytes in the first register leave the last 'a' split in half
        assert_eq!(second.get::<Vec<u8>>("string").unwrap()[0], 0);
        assert_eq!(decode_long_string(&first, &second).unwrap(), s);
    }

    #[test]
    fn test_serial_string() {
        let mut raw = vec![0u8; 64];
        raw[0] = 8;
        raw[1] = 0x03;
        raw[2..8].copy_from_slice(&[b'4', 0, b'2', 0, b'!', 0]);
        let mut transport = MockTransport::new();
        transport.respond(0x6A, &raw);

        let mut dev = device(transport);
        assert_eq!(dev.serial_string().unwrap(), "42!");
        let long: String = std::iter::repeat('9').take(31).collect();
        assert!(dev.set_serial_string(&long).is_err());
    }

    #[test]
    fn test_set_gpio_value_masks_one_pin() {
        let mut dev = device(MockTransport::new());
        dev.set_gpio_value(10, LogicLevel::High).unwrap();
        assert!(dev.set_gpio_value(11, LogicLevel::High).is_err());
        assert_eq!(
            dev.chip().transport().sent(0x21),
            vec![vec![0x40, 0x00, 0x40, 0x00]]
        );
    }

    #[test]
    fn test_full_threshold_range() {
        let mut dev = device(MockTransport::new());
        assert!(dev.set_full_threshold(0).is_err());
        dev.set_full_threshold(255).unwrap();
        assert_eq!(dev.chip().transport().sent(0x35), vec![vec![0xFF]]);
    }
}
