//! CP2130 register table
//!
//! Every configuration and status item of the chip, as a static bit
//! pattern. Widths are checked at compile time; the enumeration tables are
//! checked by `test_all_registers_consistent`.

use crate::data::{
    ChipSelectControl, ClockPhase, ClockPolarity, EventCounterMode, GpioMode, LockState,
    LogicLevel, OutputMode, PinFunction, PowerMode, TransferPriority,
};
use crate::field::{Field, Symbol, Threshold};
use crate::register::{layout_bits, RegisterDef, Segment};

/// Defines a register static and asserts its layout width at compile time
macro_rules! register {
    (
        $(#[$meta:meta])*
        $ident:ident = $name:literal, $len:literal, $layout:expr
        $(, write_flags: [$($flag:expr),* $(,)?])?
    ) => {
        $(#[$meta])*
        pub static $ident: RegisterDef = {
            const LAYOUT: &[Segment] = &$layout;
            const _: () = assert!(
                layout_bits(LAYOUT) == $len * 8,
                concat!($name, ": layout width does not match register length")
            );
            RegisterDef {
                name: $name,
                len: $len,
                layout: LAYOUT,
                write_flags: &[$($($flag),*)?],
            }
        };
    };
}

// Enumeration tables

const LEVEL: &[(Symbol, u32)] = &[
    (Symbol::Level(LogicLevel::Low), 0),
    (Symbol::Level(LogicLevel::High), 1),
];

const OUTPUT_MODE: &[(Symbol, u32)] = &[
    (Symbol::OutputMode(OutputMode::OpenDrain), 0),
    (Symbol::OutputMode(OutputMode::PushPull), 1),
];

const GPIO_MODE: &[(Symbol, u32)] = &[
    (Symbol::GpioMode(GpioMode::Input), 0),
    (Symbol::GpioMode(GpioMode::OpenDrain), 1),
    (Symbol::GpioMode(GpioMode::PushPull), 2),
];

const EVENT_COUNTER_MODE: &[(Symbol, u32)] = &[
    (Symbol::EventCounter(EventCounterMode::RisingEdge), 4),
    (Symbol::EventCounter(EventCounterMode::FallingEdge), 5),
    (Symbol::EventCounter(EventCounterMode::NegativePulse), 6),
    (Symbol::EventCounter(EventCounterMode::PositivePulse), 7),
];

const CHIP_SELECT_CONTROL: &[(Symbol, u32)] = &[
    (Symbol::ChipSelect(ChipSelectControl::Disabled), 0),
    (Symbol::ChipSelect(ChipSelectControl::Enabled), 1),
    (Symbol::ChipSelect(ChipSelectControl::EnabledExclusive), 2),
];

const CLOCK_PHASE: &[(Symbol, u32)] = &[
    (Symbol::ClockPhase(ClockPhase::LeadingEdge), 0),
    (Symbol::ClockPhase(ClockPhase::TrailingEdge), 1),
];

const CLOCK_POLARITY: &[(Symbol, u32)] = &[
    (Symbol::ClockPolarity(ClockPolarity::IdleLow), 0),
    (Symbol::ClockPolarity(ClockPolarity::IdleHigh), 1),
];

const LOCK_STATE: &[(Symbol, u32)] = &[
    (Symbol::Lock(LockState::Locked), 0),
    (Symbol::Lock(LockState::Unlocked), 1),
];

const POWER_MODE: &[(Symbol, u32)] = &[
    (Symbol::PowerMode(PowerMode::BusAndRegulatorOn), 0),
    (Symbol::PowerMode(PowerMode::SelfAndRegulatorOff), 1),
    (Symbol::PowerMode(PowerMode::SelfAndRegulatorOn), 2),
];

const TRANSFER_PRIORITY: &[(Symbol, u32)] = &[
    (Symbol::TransferPriority(TransferPriority::HighPriorityRead), 0),
    (Symbol::TransferPriority(TransferPriority::HighPriorityWrite), 1),
];

/// Power-on function tables, one per pin
macro_rules! pin_functions {
    ($($extra:expr => $code:literal),* $(,)?) => {
        &[
            (Symbol::PinFunction(PinFunction::Input), 0),
            (Symbol::PinFunction(PinFunction::OpenDrain), 1),
            (Symbol::PinFunction(PinFunction::PushPull), 2),
            (Symbol::PinFunction(PinFunction::ChipSelect), 3),
            $((Symbol::PinFunction($extra), $code),)*
        ]
    };
}

const PIN_PLAIN: &[(Symbol, u32)] = pin_functions![];
const PIN_GPIO3: &[(Symbol, u32)] = pin_functions![
    PinFunction::RtrActiveLow => 4,
    PinFunction::RtrActiveHigh => 5,
];
const PIN_GPIO4: &[(Symbol, u32)] = pin_functions![
    PinFunction::EventCounter(EventCounterMode::RisingEdge) => 4,
    PinFunction::EventCounter(EventCounterMode::FallingEdge) => 5,
    PinFunction::EventCounter(EventCounterMode::NegativePulse) => 6,
    PinFunction::EventCounter(EventCounterMode::PositivePulse) => 7,
];
const PIN_GPIO5: &[(Symbol, u32)] = pin_functions![PinFunction::ClockOut => 4];
const PIN_GPIO8: &[(Symbol, u32)] = pin_functions![PinFunction::SpiActivity => 4];
const PIN_GPIO9: &[(Symbol, u32)] = pin_functions![PinFunction::Suspend => 4];
const PIN_GPIO10: &[(Symbol, u32)] = pin_functions![PinFunction::SuspendActiveLow => 4];

/// Nominal SPI clock rates selected by the 3-bit `clock_frequency` code
pub const SPI_CLOCK_RATES: &[u32] = &[
    12_000_000, 6_000_000, 3_000_000, 1_500_000, 750_000, 375_000, 187_500, 93_800,
];

fn at_least(requested: u32, candidate: u32) -> bool {
    requested >= candidate
}

const SPI_CLOCK: &Threshold = &Threshold {
    values: SPI_CLOCK_RATES,
    matches: at_least,
};

// Layout shorthands

const fn pad(bits: u32) -> Segment {
    Segment::Pad(bits)
}

const fn int(name: &'static str, bits: u32) -> Segment {
    Segment::Field(Field::int(name, bits))
}

const fn int_le(name: &'static str, bits: u32) -> Segment {
    Segment::Field(Field::int_le(name, bits))
}

const fn boolean(name: &'static str) -> Segment {
    Segment::Field(Field::boolean(name))
}

const fn enumeration(name: &'static str, bits: u32, table: &'static [(Symbol, u32)]) -> Segment {
    Segment::Field(Field::enumeration(name, bits, table))
}

const fn level(name: &'static str) -> Segment {
    enumeration(name, 1, LEVEL)
}

const fn output_mode(name: &'static str) -> Segment {
    enumeration(name, 1, OUTPUT_MODE)
}

const fn lock_state(name: &'static str) -> Segment {
    enumeration(name, 1, LOCK_STATE)
}

/// Eleven GPIO bits in the order the GPIO value words use:
/// `x 10 9 8 7 6 x 5 | 4 3 2 1 0 x x x`
macro_rules! gpio_word {
    ($make:ident, $suffix:literal) => {
        [
            pad(1),
            $make(concat!("gpio10_", $suffix)),
            $make(concat!("gpio9_", $suffix)),
            $make(concat!("gpio8_", $suffix)),
            $make(concat!("gpio7_", $suffix)),
            $make(concat!("gpio6_", $suffix)),
            pad(1),
            $make(concat!("gpio5_", $suffix)),
            $make(concat!("gpio4_", $suffix)),
            $make(concat!("gpio3_", $suffix)),
            $make(concat!("gpio2_", $suffix)),
            $make(concat!("gpio1_", $suffix)),
            $make(concat!("gpio0_", $suffix)),
            pad(3),
        ]
    };
}

/// Pin config layout: 11 function bytes, four 16-bit pin masks and the
/// power-on clock divider
macro_rules! pin_config_layout {
    ($($make:ident($suffix:literal)),* $(,)?) => {
        [
            enumeration("gpio0", 8, PIN_PLAIN),
            enumeration("gpio1", 8, PIN_PLAIN),
            enumeration("gpio2", 8, PIN_PLAIN),
            enumeration("gpio3", 8, PIN_GPIO3),
            enumeration("gpio4", 8, PIN_GPIO4),
            enumeration("gpio5", 8, PIN_GPIO5),
            enumeration("gpio6", 8, PIN_PLAIN),
            enumeration("gpio7", 8, PIN_PLAIN),
            enumeration("gpio8", 8, PIN_GPIO8),
            enumeration("gpio9", 8, PIN_GPIO9),
            enumeration("gpio10", 8, PIN_GPIO10),
            $(
                pad(1),
                $make(concat!("gpio10_", $suffix)),
                $make(concat!("gpio9_", $suffix)),
                $make(concat!("gpio8_", $suffix)),
                $make(concat!("gpio7_", $suffix)),
                $make(concat!("gpio6_", $suffix)),
                $make(concat!("vpp_", $suffix)),
                $make(concat!("gpio5_", $suffix)),
                $make(concat!("gpio4_", $suffix)),
                $make(concat!("gpio3_", $suffix)),
                $make(concat!("gpio2_", $suffix)),
                $make(concat!("gpio1_", $suffix)),
                $make(concat!("gpio0_", $suffix)),
                $make(concat!("mosi_", $suffix)),
                $make(concat!("miso_", $suffix)),
                $make(concat!("sck_", $suffix)),
            )*
            int("clock_divider", 8),
        ]
    };
}

// Volatile registers

register!(
    /// SPI/clock-out divider (0 means 256)
    CLOCK_DIVIDER = "clock_divider", 1, [int("clock_divider", 8)]
);

register!(
    EVENT_COUNTER = "event_counter", 3,
    [
        boolean("overflow"),
        pad(4),
        enumeration("mode", 3, EVENT_COUNTER_MODE),
        int("count", 16),
    ]
);

register!(
    /// Bulk IN FIFO threshold
    FULL_THRESHOLD = "full_threshold", 1, [int("threshold", 8)]
);

register!(
    ALL_GPIO_CHIP_SELECT = "all_gpio_chip_select", 4,
    [
        pad(8),
        pad(8),
        pad(1),
        boolean("channel10_enable"),
        boolean("channel9_enable"),
        boolean("channel8_enable"),
        boolean("channel7_enable"),
        boolean("channel6_enable"),
        pad(1),
        boolean("channel5_enable"),
        boolean("channel4_enable"),
        boolean("channel3_enable"),
        boolean("channel2_enable"),
        boolean("channel1_enable"),
        boolean("channel0_enable"),
        pad(3),
    ]
);

register!(
    ONE_GPIO_CHIP_SELECT = "one_gpio_chip_select", 1,
    [enumeration("control", 8, CHIP_SELECT_CONTROL)]
);

register!(
    ALL_GPIO_MODE_AND_LEVEL = "all_gpio_mode_and_level", 4,
    [
        level("gpio4_level"),
        level("gpio3_level"),
        level("gpio2_level"),
        level("gpio1_level"),
        level("gpio0_level"),
        pad(3),
        pad(1),
        level("gpio10_level"),
        level("gpio9_level"),
        level("gpio8_level"),
        level("gpio7_level"),
        level("gpio6_level"),
        pad(1),
        level("gpio5_level"),
        output_mode("gpio4_mode"),
        output_mode("gpio3_mode"),
        output_mode("gpio2_mode"),
        output_mode("gpio1_mode"),
        output_mode("gpio0_mode"),
        pad(3),
        pad(1),
        output_mode("gpio10_mode"),
        output_mode("gpio9_mode"),
        output_mode("gpio8_mode"),
        output_mode("gpio7_mode"),
        output_mode("gpio6_mode"),
        pad(1),
        output_mode("gpio5_mode"),
    ]
);

register!(
    ONE_GPIO_MODE_AND_LEVEL = "one_gpio_mode_and_level", 2,
    [
        enumeration("mode", 8, GPIO_MODE),
        enumeration("level", 8, LEVEL),
    ]
);

register!(
    GPIO_VALUES = "gpio_values", 2, gpio_word!(level, "level")
);

register!(
    /// Levels and write mask for `set_gpio_values`; setting a level selects it
    GPIO_VALUES_SETTER = "gpio_values_setter", 4,
    {
        const LEVELS: [Segment; 14] = gpio_word!(level, "level");
        const MASK: [Segment; 14] = gpio_word!(boolean, "mask");
        let mut all = [pad(0); 28];
        let mut i = 0;
        while i < 14 {
            all[i] = LEVELS[i];
            all[i + 14] = MASK[i];
            i += 1;
        }
        all
    },
    write_flags: [
        ("gpio0_level", "gpio0_mask"),
        ("gpio1_level", "gpio1_mask"),
        ("gpio2_level", "gpio2_mask"),
        ("gpio3_level", "gpio3_mask"),
        ("gpio4_level", "gpio4_mask"),
        ("gpio5_level", "gpio5_mask"),
        ("gpio6_level", "gpio6_mask"),
        ("gpio7_level", "gpio7_mask"),
        ("gpio8_level", "gpio8_mask"),
        ("gpio9_level", "gpio9_mask"),
        ("gpio10_level", "gpio10_mask"),
    ]
);

register!(
    RTR_STATE = "rtr_state", 1, [Segment::Field(Field::flag("active", 8))]
);

register!(
    RTR_STOP = "rtr_stop", 1, [Segment::Field(Field::flag("stop", 8))]
);

register!(
    SPI_WORD = "spi_word", 1,
    [
        pad(2),
        enumeration("clock_phase", 1, CLOCK_PHASE),
        enumeration("clock_polarity", 1, CLOCK_POLARITY),
        output_mode("chip_select_mode"),
        Segment::Field(Field::range("clock_frequency", 3, SPI_CLOCK)),
    ]
);

register!(
    SPI_DELAY = "spi_delay", 7,
    [
        pad(4),
        boolean("cs_toggle"),
        boolean("pre_deassert"),
        boolean("post_assert"),
        boolean("inter_byte"),
        int("inter_byte_delay_10us", 16),
        int("post_assert_delay_10us", 16),
        int("pre_deassert_delay_10us", 16),
    ]
);

register!(
    READONLY_VERSION = "readonly_version", 2, [int("major", 8), int("minor", 8)]
);

// OTP ROM configuration

register!(
    LOCK = "lock", 2,
    [
        lock_state("transfer_priority"),
        lock_state("manufacturing_string1"),
        lock_state("manufacturing_string2"),
        lock_state("release_version"),
        lock_state("power_mode"),
        lock_state("max_power"),
        lock_state("pid"),
        lock_state("vid"),
        pad(4),
        lock_state("pin_config"),
        lock_state("serial_string"),
        lock_state("product_string2"),
        lock_state("product_string1"),
    ]
);

register!(
    MANUFACTURING_STRING1 = "manufacturing_string1", 64,
    [
        int("length", 8),
        Segment::Field(Field::constant("descriptor_type", 8, 0x03)),
        Segment::Field(Field::bytes("string", 61)),
        pad(8),
    ]
);

register!(
    MANUFACTURING_STRING2 = "manufacturing_string2", 64,
    [Segment::Field(Field::bytes("string", 63)), pad(8)]
);

register!(
    PRODUCT_STRING1 = "product_string1", 64,
    [
        int("length", 8),
        Segment::Field(Field::constant("descriptor_type", 8, 0x03)),
        Segment::Field(Field::bytes("string", 61)),
        pad(8),
    ]
);

register!(
    PRODUCT_STRING2 = "product_string2", 64,
    [Segment::Field(Field::bytes("string", 63)), pad(8)]
);

register!(
    SERIAL_STRING = "serial_string", 64,
    [
        int("length", 8),
        Segment::Field(Field::constant("descriptor_type", 8, 0x03)),
        Segment::Field(Field::bytes("string", 60)),
        pad(16),
    ]
);

register!(
    PIN_CONFIG = "pin_config", 20,
    pin_config_layout![
        level("suspend_level"),
        output_mode("suspend_mode"),
        boolean("wakeup_mask"),
        level("wakeup_match"),
    ]
);

register!(
    USB_CONFIG = "usb_config", 9,
    [
        int_le("vid", 16),
        int_le("pid", 16),
        int("max_power_2mA", 8),
        enumeration("power_mode", 8, POWER_MODE),
        Segment::Field(Field::bcd("major_release")),
        Segment::Field(Field::bcd("minor_release")),
        enumeration("transfer_priority", 8, TRANSFER_PRIORITY),
    ]
);

register!(
    /// USB config with the write mask consumed by `set_usb_config`
    USB_CONFIG_SETTER = "usb_config_setter", 10,
    [
        int_le("vid", 16),
        int_le("pid", 16),
        int("max_power_2mA", 8),
        enumeration("power_mode", 8, POWER_MODE),
        Segment::Field(Field::bcd("major_release")),
        Segment::Field(Field::bcd("minor_release")),
        enumeration("transfer_priority", 8, TRANSFER_PRIORITY),
        boolean("write_transfer_priority"),
        pad(2),
        boolean("write_release_version"),
        boolean("write_power_mode"),
        boolean("write_max_power_2mA"),
        boolean("write_pid"),
        boolean("write_vid"),
    ],
    write_flags: [
        ("vid", "write_vid"),
        ("pid", "write_pid"),
        ("max_power_2mA", "write_max_power_2mA"),
        ("power_mode", "write_power_mode"),
        ("major_release", "write_release_version"),
        ("minor_release", "write_release_version"),
        ("transfer_priority", "write_transfer_priority"),
    ]
);

/// Every register definition
pub static ALL: &[&RegisterDef] = &[
    &CLOCK_DIVIDER,
    &EVENT_COUNTER,
    &FULL_THRESHOLD,
    &ALL_GPIO_CHIP_SELECT,
    &ONE_GPIO_CHIP_SELECT,
    &ALL_GPIO_MODE_AND_LEVEL,
    &ONE_GPIO_MODE_AND_LEVEL,
    &GPIO_VALUES,
    &GPIO_VALUES_SETTER,
    &RTR_STATE,
    &RTR_STOP,
    &SPI_WORD,
    &SPI_DELAY,
    &READONLY_VERSION,
    &LOCK,
    &MANUFACTURING_STRING1,
    &MANUFACTURING_STRING2,
    &PRODUCT_STRING1,
    &PRODUCT_STRING2,
    &SERIAL_STRING,
    &PIN_CONFIG,
    &USB_CONFIG,
    &USB_CONFIG_SETTER,
];

/// Name of the per-pin field `gpio{pin}_{suffix}`
pub fn gpio_field(pin: u8, suffix: &str) -> String {
    format!("gpio{}_{}", pin, suffix)
}

/// Name of the chip-select enable bit of `channel`
pub fn channel_enable_field(channel: u8) -> String {
    format!("channel{}_enable", channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::field::Value;

    #[test]
    fn test_all_registers_consistent() {
        for def in ALL {
            if let Err(e) = def.check() {
                panic!("{}", e);
            }
        }
        let mut names: Vec<_> = ALL.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_defaults_pack_to_declared_length() {
        for def in ALL {
            assert_eq!(def.defaults().pack().len(), def.len, "{}", def.name);
        }
    }

    #[test]
    fn test_clock_divider() {
        let reg = CLOCK_DIVIDER
            .make(&[("clock_divider", Value::Int(1))])
            .unwrap();
        assert_eq!(reg.pack(), vec![0x01]);
        assert_eq!(CLOCK_DIVIDER.unpack(&[0x01]).unwrap(), reg);
        assert!(CLOCK_DIVIDER
            .make(&[("clock_divider", Value::Int(256))])
            .is_err());
    }

    #[test]
    fn test_event_counter_layout() {
        let reg = EVENT_COUNTER.unpack(&[0x86, 0x12, 0x34]).unwrap();
        assert!(reg.get::<bool>("overflow").unwrap());
        assert_eq!(
            reg.get::<EventCounterMode>("mode").unwrap(),
            EventCounterMode::NegativePulse
        );
        assert_eq!(reg.get::<u16>("count").unwrap(), 0x1234);

        // Mode code 0 is not an event counter mode
        assert!(EVENT_COUNTER.unpack(&[0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_gpio_values_bit_positions() {
        let reg = GPIO_VALUES.unpack(&[0x01, 0x08]).unwrap();
        assert_eq!(reg.get::<LogicLevel>("gpio5_level").unwrap(), LogicLevel::High);
        assert_eq!(reg.get::<LogicLevel>("gpio0_level").unwrap(), LogicLevel::High);
        assert_eq!(reg.get::<LogicLevel>("gpio1_level").unwrap(), LogicLevel::Low);

        let reg = GPIO_VALUES.unpack(&[0x40, 0x80]).unwrap();
        assert_eq!(reg.get::<LogicLevel>("gpio10_level").unwrap(), LogicLevel::High);
        assert_eq!(reg.get::<LogicLevel>("gpio4_level").unwrap(), LogicLevel::High);
    }

    #[test]
    fn test_gpio_values_setter_masks_written_levels() {
        let mut reg = GPIO_VALUES_SETTER.defaults();
        reg.set("gpio0_level", LogicLevel::Low).unwrap();
        reg.set("gpio5_level", LogicLevel::High).unwrap();
        // levels: gpio5 high; mask: gpio5 and gpio0
        assert_eq!(reg.pack(), vec![0x01, 0x00, 0x01, 0x08]);
    }

    #[test]
    fn test_spi_word() {
        let mut reg = SPI_WORD.defaults();
        reg.set("clock_phase", ClockPhase::TrailingEdge).unwrap();
        reg.set("chip_select_mode", OutputMode::PushPull).unwrap();
        reg.set("clock_frequency", 5_000_000u32).unwrap();
        assert_eq!(reg.pack(), vec![0b0010_1010]);
        let back = SPI_WORD.unpack(&[0b0010_1010]).unwrap();
        assert_eq!(back.get::<u32>("clock_frequency").unwrap(), 3_000_000);
    }

    #[test]
    fn test_string_descriptor_type_checked() {
        let mut raw = vec![0u8; 64];
        raw[0] = 4;
        raw[1] = 0x03;
        assert!(MANUFACTURING_STRING1.unpack(&raw).is_ok());

        raw[1] = 0x02;
        assert!(matches!(
            MANUFACTURING_STRING1.unpack(&raw),
            Err(Error::ProtocolViolation {
                field: "descriptor_type",
                expected: 0x03,
                actual: 0x02,
                ..
            })
        ));
    }

    #[test]
    fn test_pin_config_per_pin_tables() {
        let mut reg = PIN_CONFIG.defaults();
        reg.set("gpio5", PinFunction::ClockOut).unwrap();
        reg.set(
            "gpio4",
            PinFunction::EventCounter(EventCounterMode::PositivePulse),
        )
        .unwrap();
        assert!(reg.set("gpio0", PinFunction::ClockOut).is_err());
        reg.set("vpp_wakeup_mask", true).unwrap();
        reg.set("clock_divider", 4u32).unwrap();

        let raw = reg.pack();
        assert_eq!(raw.len(), 20);
        assert_eq!(raw[4], 0x07);
        assert_eq!(raw[5], 0x04);
        // wakeup mask word starts at byte 15; vpp is bit 1 of the first byte
        assert_eq!(raw[15], 0x02);
        assert_eq!(raw[19], 4);
        assert_eq!(PIN_CONFIG.unpack(&raw).unwrap(), reg);
    }

    #[test]
    fn test_usb_config_setter_flags() {
        let mut reg = USB_CONFIG_SETTER.defaults();
        reg.set("vid", 0x10C4u32).unwrap();
        reg.set("minor_release", 12u32).unwrap();
        let raw = reg.pack();
        assert_eq!(&raw[..2], &[0xC4, 0x10]);
        assert_eq!(raw[7], 0x12);
        // write_release_version | write_vid
        assert_eq!(raw[9], 0b0001_0001);
    }

    #[test]
    fn test_usb_config_bcd_rejected() {
        let mut raw = vec![0u8; 9];
        raw[6] = 0x1A;
        assert!(matches!(
            USB_CONFIG.unpack(&raw),
            Err(Error::FieldValue {
                field: "major_release",
                ..
            })
        ));
    }

    #[test]
    fn test_lock_layout() {
        let reg = LOCK.unpack(&[0x80, 0x01]).unwrap();
        assert_eq!(
            reg.get::<LockState>("transfer_priority").unwrap(),
            LockState::Unlocked
        );
        assert_eq!(
            reg.get::<LockState>("product_string1").unwrap(),
            LockState::Unlocked
        );
        assert_eq!(reg.get::<LockState>("vid").unwrap(), LockState::Locked);
    }
}
