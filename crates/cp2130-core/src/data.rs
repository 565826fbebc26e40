//! Domain types carried by register fields
//!
//! These are the values callers read and write; the raw codes they map to
//! live in the enumeration tables in [`crate::registers`].

use std::fmt;

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicLevel {
    #[default]
    Low,
    High,
}

impl LogicLevel {
    pub fn is_high(self) -> bool {
        self == LogicLevel::High
    }
}

impl From<bool> for LogicLevel {
    fn from(high: bool) -> Self {
        if high {
            LogicLevel::High
        } else {
            LogicLevel::Low
        }
    }
}

/// Output driver of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    OpenDrain,
    PushPull,
}

/// Runtime mode of a GPIO pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpioMode {
    #[default]
    Input,
    OpenDrain,
    PushPull,
}

impl From<OutputMode> for GpioMode {
    fn from(mode: OutputMode) -> Self {
        match mode {
            OutputMode::OpenDrain => GpioMode::OpenDrain,
            OutputMode::PushPull => GpioMode::PushPull,
        }
    }
}

/// Event counter edge/pulse selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventCounterMode {
    #[default]
    RisingEdge,
    FallingEdge,
    NegativePulse,
    PositivePulse,
}

/// Power-on function of a GPIO pin, as stored in the OTP pin configuration
///
/// Not every function is available on every pin; the per-pin tables reject
/// the ones that are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinFunction {
    #[default]
    Input,
    OpenDrain,
    PushPull,
    /// Native active-low chip select (CSn_n)
    ChipSelect,
    /// Ready-to-receive input, active low (GPIO.3)
    RtrActiveLow,
    /// Ready-to-receive input, active high (GPIO.3)
    RtrActiveHigh,
    /// Event counter input (GPIO.4)
    EventCounter(EventCounterMode),
    /// Clock output (GPIO.5)
    ClockOut,
    /// SPI activity indicator (GPIO.8)
    SpiActivity,
    /// Suspend indicator, active high (GPIO.9)
    Suspend,
    /// Suspend indicator, active low (GPIO.10)
    SuspendActiveLow,
}

impl PinFunction {
    /// Whether the pin is a host-driven output
    pub fn is_output(self) -> bool {
        matches!(self, PinFunction::OpenDrain | PinFunction::PushPull)
    }
}

/// Chip select enable state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipSelectControl {
    #[default]
    Disabled,
    Enabled,
    /// Enabled, with every other channel disabled
    EnabledExclusive,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockPhase {
    #[default]
    LeadingEdge,
    TrailingEdge,
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockPolarity {
    #[default]
    IdleLow,
    IdleHigh,
}

/// SPI mode (clock polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    pub fn of(polarity: ClockPolarity, phase: ClockPhase) -> Self {
        match (polarity, phase) {
            (ClockPolarity::IdleLow, ClockPhase::LeadingEdge) => SpiMode::Mode0,
            (ClockPolarity::IdleLow, ClockPhase::TrailingEdge) => SpiMode::Mode1,
            (ClockPolarity::IdleHigh, ClockPhase::LeadingEdge) => SpiMode::Mode2,
            (ClockPolarity::IdleHigh, ClockPhase::TrailingEdge) => SpiMode::Mode3,
        }
    }

    pub fn polarity(self) -> ClockPolarity {
        match self {
            SpiMode::Mode0 | SpiMode::Mode1 => ClockPolarity::IdleLow,
            SpiMode::Mode2 | SpiMode::Mode3 => ClockPolarity::IdleHigh,
        }
    }

    pub fn phase(self) -> ClockPhase {
        match self {
            SpiMode::Mode0 | SpiMode::Mode2 => ClockPhase::LeadingEdge,
            SpiMode::Mode1 | SpiMode::Mode3 => ClockPhase::TrailingEdge,
        }
    }

    /// Look up a mode by its number (0-3)
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(SpiMode::Mode0),
            1 => Some(SpiMode::Mode1),
            2 => Some(SpiMode::Mode2),
            3 => Some(SpiMode::Mode3),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => 1,
            SpiMode::Mode2 => 2,
            SpiMode::Mode3 => 3,
        }
    }
}

/// OTP field lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Locked,
    Unlocked,
}

/// USB power configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerMode {
    #[default]
    BusAndRegulatorOn,
    SelfAndRegulatorOff,
    SelfAndRegulatorOn,
}

/// USB data transfer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPriority {
    #[default]
    HighPriorityRead,
    HighPriorityWrite,
}

/// Major/minor version pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spi_mode_round_trip() {
        for n in 0..4 {
            let mode = SpiMode::from_number(n).unwrap();
            assert_eq!(SpiMode::of(mode.polarity(), mode.phase()), mode);
            assert_eq!(mode.number(), n);
        }
        assert_eq!(SpiMode::from_number(4), None);
    }

    #[test]
    fn test_spi_mode_bits() {
        assert_eq!(SpiMode::Mode1.polarity(), ClockPolarity::IdleLow);
        assert_eq!(SpiMode::Mode1.phase(), ClockPhase::TrailingEdge);
        assert_eq!(SpiMode::Mode2.polarity(), ClockPolarity::IdleHigh);
        assert_eq!(SpiMode::Mode2.phase(), ClockPhase::LeadingEdge);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new(1, 7).to_string(), "1.7");
    }
}
