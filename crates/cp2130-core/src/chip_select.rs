//! Chip-select state machine
//!
//! Every SPI transfer on a channel runs between an assert and a release of
//! the channel's select line:
//!
//! ```text
//! Idle -> Asserting -> Active -> Deasserting -> Idle
//!                          \------ (hold) -----> Idle
//! ```
//!
//! With [`Strategy::Native`] the chip drives the line itself; the channel
//! is enabled exclusively around the transfer and disabled afterwards.
//! With [`Strategy::Manual`] the channel's GPIO is driven low and high by
//! the host, and a transfer may ask to keep the line low for the next one.
//!
//! Release runs on the error path exactly as on success. A release failure
//! never hides the error of the transfer itself.

use crate::chip::Chip;
use crate::data::{ChipSelectControl, LogicLevel};
use crate::error::{Error, Result};
use crate::registers;
use crate::transport::Transport;

/// How the select line of a channel is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Chip-driven CS output
    Native,
    /// Host-driven GPIO output
    Manual,
}

/// Position in the assert/release cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsState {
    #[default]
    Idle,
    Asserting,
    Active,
    Deasserting,
}

/// Select line of one SPI channel
#[derive(Debug, Clone)]
pub struct ChipSelect {
    channel: u8,
    strategy: Strategy,
    state: CsState,
    /// Line left asserted by a previous transfer
    held: bool,
}

impl ChipSelect {
    pub fn new(channel: u8, strategy: Strategy) -> Self {
        Self {
            channel,
            strategy,
            state: CsState::Idle,
            held: false,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn state(&self) -> CsState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Run `op` with the select line asserted
    ///
    /// With `hold` the line stays asserted when `op` returns, and the next
    /// call starts from the asserted line. Only manual chip selects can
    /// hold; native ones fail with [`Error::Unsupported`] before anything
    /// is sent.
    pub fn run<T, R, F>(&mut self, chip: &mut Chip<T>, hold: bool, op: F) -> Result<R>
    where
        T: Transport,
        F: FnOnce(&mut Chip<T>) -> Result<R>,
    {
        if hold && self.strategy == Strategy::Native {
            return Err(Error::Unsupported(
                "holding chip select requires a GPIO-driven chip select",
            ));
        }

        self.state = CsState::Asserting;
        if let Err(e) = self.assert(chip) {
            // The line never went low, so there is nothing to hold
            return Err(self.release_after(chip, false, e));
        }

        self.state = CsState::Active;
        match op(chip) {
            Ok(value) => {
                self.release(chip, hold)?;
                Ok(value)
            }
            Err(e) => Err(self.release_after(chip, hold, e)),
        }
    }

    /// Deassert a line left asserted by a held transfer
    pub fn release_hold<T: Transport>(&mut self, chip: &mut Chip<T>) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.release(chip, false)
    }

    fn assert<T: Transport>(&mut self, chip: &mut Chip<T>) -> Result<()> {
        match self.strategy {
            Strategy::Native => self.set_enable(chip, ChipSelectControl::EnabledExclusive),
            Strategy::Manual if self.held => {
                log::trace!("CS{}: already asserted", self.channel);
                Ok(())
            }
            Strategy::Manual => self.drive(chip, LogicLevel::Low),
        }
    }

    fn release<T: Transport>(&mut self, chip: &mut Chip<T>, hold: bool) -> Result<()> {
        if hold {
            self.held = true;
            self.state = CsState::Idle;
            log::trace!("CS{}: held", self.channel);
            return Ok(());
        }

        self.state = CsState::Deasserting;
        let result = match self.strategy {
            Strategy::Native => self.set_enable(chip, ChipSelectControl::Disabled),
            Strategy::Manual => self.drive(chip, LogicLevel::High),
        };
        self.held = false;
        self.state = CsState::Idle;
        result
    }

    /// Release after a failure, keeping the original error
    fn release_after<T: Transport>(&mut self, chip: &mut Chip<T>, hold: bool, error: Error) -> Error {
        if let Err(e) = self.release(chip, hold) {
            log::warn!("CS{}: release failed after error: {}", self.channel, e);
        }
        error
    }

    fn set_enable<T: Transport>(&self, chip: &mut Chip<T>, control: ChipSelectControl) -> Result<()> {
        let mut reg = registers::ONE_GPIO_CHIP_SELECT.defaults();
        reg.set("control", control)?;
        chip.set_gpio_chip_select(self.channel as u16, &reg)
    }

    fn drive<T: Transport>(&self, chip: &mut Chip<T>, level: LogicLevel) -> Result<()> {
        let mut reg = registers::GPIO_VALUES_SETTER.defaults();
        reg.set(&registers::gpio_field(self.channel, "level"), level)?;
        chip.set_gpio_values(&reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::mock::MockTransport;

    const SET_GPIO_CHIP_SELECT: u8 = 0x25;
    const SET_GPIO_VALUES: u8 = 0x21;

    #[test]
    fn test_native_enables_exclusive_then_disables() {
        let mut chip = Chip::new(MockTransport::new());
        let mut cs = ChipSelect::new(2, Strategy::Native);

        let out = cs.run(&mut chip, false, |_| Ok(42)).unwrap();
        assert_eq!(out, 42);
        assert_eq!(cs.state(), CsState::Idle);
        assert_eq!(
            chip.transport().sent(SET_GPIO_CHIP_SELECT),
            vec![vec![0x02, 0x02], vec![0x02, 0x00]]
        );
    }

    #[test]
    fn test_native_hold_rejected_before_transfer() {
        let mut chip = Chip::new(MockTransport::new());
        let mut cs = ChipSelect::new(0, Strategy::Native);

        let result = cs.run(&mut chip, true, |_| Ok(()));
        assert!(matches!(result, Err(Error::Unsupported(_))));
        assert!(chip.transport().calls().is_empty());
    }

    #[test]
    fn test_native_release_on_error() {
        let mut chip = Chip::new(MockTransport::new());
        let mut cs = ChipSelect::new(1, Strategy::Native);

        let result: Result<()> = cs.run(&mut chip, false, |_| {
            Err(Error::Transport(TransportError::Timeout))
        });
        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::Timeout))
        ));
        let sent = chip.transport().sent(SET_GPIO_CHIP_SELECT);
        assert_eq!(sent.last(), Some(&vec![0x01, 0x00]));
    }

    #[test]
    fn test_manual_drives_low_then_high() {
        let mut chip = Chip::new(MockTransport::new());
        let mut cs = ChipSelect::new(0, Strategy::Manual);

        cs.run(&mut chip, false, |_| Ok(())).unwrap();
        // gpio0 is bit 3 of the second byte, in both levels and mask
        assert_eq!(
            chip.transport().sent(SET_GPIO_VALUES),
            vec![vec![0x00, 0x00, 0x00, 0x08], vec![0x00, 0x08, 0x00, 0x08]]
        );
        assert!(!cs.is_held());
    }

    #[test]
    fn test_manual_hold_skips_reassert() {
        let mut chip = Chip::new(MockTransport::new());
        let mut cs = ChipSelect::new(0, Strategy::Manual);

        cs.run(&mut chip, true, |_| Ok(())).unwrap();
        assert!(cs.is_held());
        assert_eq!(cs.state(), CsState::Idle);
        assert_eq!(chip.transport().sent(SET_GPIO_VALUES).len(), 1);

        chip.transport_mut().clear_calls();
        cs.run(&mut chip, false, |_| Ok(())).unwrap();
        // Only the final release is sent
        assert_eq!(
            chip.transport().sent(SET_GPIO_VALUES),
            vec![vec![0x00, 0x08, 0x00, 0x08]]
        );
        assert!(!cs.is_held());
    }

    #[test]
    fn test_original_error_survives_failed_release() {
        let mut transport = MockTransport::new();
        transport.fail_request(SET_GPIO_VALUES, TransportError::Disconnected);
        let mut chip = Chip::new(transport);
        let mut cs = ChipSelect::new(3, Strategy::Manual);

        // Assert fails; the assert error is returned, not the release error
        let result = cs.run(&mut chip, false, |_| Ok(()));
        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::Disconnected))
        ));
        assert_eq!(cs.state(), CsState::Idle);
    }

    #[test]
    fn test_failed_assert_does_not_hold() {
        let mut transport = MockTransport::new();
        transport.fail_request(SET_GPIO_VALUES, TransportError::Disconnected);
        let mut chip = Chip::new(transport);
        let mut cs = ChipSelect::new(0, Strategy::Manual);

        let mut ran = false;
        let result = cs.run(&mut chip, true, |_| {
            ran = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!ran);
        assert!(!cs.is_held());

        // The next transfer drives the line low again before running
        chip.transport_mut().clear_failures();
        chip.transport_mut().clear_calls();
        cs.run(&mut chip, false, |_| Ok(())).unwrap();
        assert_eq!(
            chip.transport().sent(SET_GPIO_VALUES),
            vec![vec![0x00, 0x00, 0x00, 0x08], vec![0x00, 0x08, 0x00, 0x08]]
        );
    }

    #[test]
    fn test_release_hold() {
        let mut chip = Chip::new(MockTransport::new());
        let mut cs = ChipSelect::new(5, Strategy::Manual);

        cs.release_hold(&mut chip).unwrap();
        assert!(chip.transport().calls().is_empty());

        cs.run(&mut chip, true, |_| Ok(())).unwrap();
        cs.release_hold(&mut chip).unwrap();
        assert!(!cs.is_held());
        // gpio5 is bit 0 of the first byte
        assert_eq!(
            chip.transport().sent(SET_GPIO_VALUES).last(),
            Some(&vec![0x01, 0x00, 0x01, 0x00])
        );
    }
}
