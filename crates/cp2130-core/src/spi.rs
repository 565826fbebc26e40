//! SPI channels
//!
//! A [`SpiChannel`] is a borrowed view of one of the eleven chip-select
//! channels. Transfers go through the channel's [`ChipSelect`]; the
//! configuration accessors read-modify-write the channel's `spi_word` and
//! `spi_delay` registers.

use crate::chip::Chip;
use crate::chip_select::{ChipSelect, Strategy};
use crate::data::{ClockPhase, ClockPolarity, OutputMode, SpiMode};
use crate::error::{Error, Result};
use crate::register::Register;
use crate::transport::Transport;

/// Largest delay the 16-bit, 10 µs delay fields can hold
pub const MAX_DELAY_US: u32 = u16::MAX as u32 * 10;

/// One SPI slave
pub struct SpiChannel<'a, T: Transport> {
    chip: &'a mut Chip<T>,
    cs: &'a mut ChipSelect,
}

impl<'a, T: Transport> SpiChannel<'a, T> {
    pub fn new(chip: &'a mut Chip<T>, cs: &'a mut ChipSelect) -> Self {
        Self { chip, cs }
    }

    pub fn channel(&self) -> u8 {
        self.cs.channel()
    }

    pub fn strategy(&self) -> Strategy {
        self.cs.strategy()
    }

    /// Whether a held transfer left the select line asserted
    pub fn is_held(&self) -> bool {
        self.cs.is_held()
    }

    pub fn read(&mut self, len: usize, hold: bool) -> Result<Vec<u8>> {
        self.cs.run(self.chip, hold, |chip| chip.spi_read(len))
    }

    pub fn write(&mut self, data: &[u8], hold: bool) -> Result<()> {
        self.cs.run(self.chip, hold, |chip| chip.spi_write(data))
    }

    pub fn write_read(&mut self, data: &[u8], hold: bool) -> Result<Vec<u8>> {
        self.cs.run(self.chip, hold, |chip| chip.spi_write_read(data))
    }

    /// Read paced by the RTR input (GPIO.3)
    pub fn read_with_rtr(&mut self, len: usize, hold: bool) -> Result<Vec<u8>> {
        self.cs.run(self.chip, hold, |chip| chip.spi_read_with_rtr(len))
    }

    /// Deassert a line left asserted with `hold`
    pub fn release(&mut self) -> Result<()> {
        self.cs.release_hold(self.chip)
    }

    // Configuration

    pub fn spi_word(&mut self) -> Result<Register> {
        self.chip.get_spi_word(self.channel() as u16)
    }

    fn update_word(&mut self, f: impl FnOnce(&mut Register) -> Result<()>) -> Result<()> {
        let mut reg = self.spi_word()?;
        f(&mut reg)?;
        self.chip.set_spi_word(self.channel() as u16, &reg)
    }

    pub fn spi_delay(&mut self) -> Result<Register> {
        self.chip.get_spi_delay(self.channel() as u16)
    }

    fn update_delay(&mut self, f: impl FnOnce(&mut Register) -> Result<()>) -> Result<()> {
        let mut reg = self.spi_delay()?;
        f(&mut reg)?;
        self.chip.set_spi_delay(self.channel() as u16, &reg)
    }

    pub fn mode(&mut self) -> Result<SpiMode> {
        let reg = self.spi_word()?;
        Ok(SpiMode::of(reg.get("clock_polarity")?, reg.get("clock_phase")?))
    }

    pub fn set_mode(&mut self, mode: SpiMode) -> Result<()> {
        self.update_word(|reg| {
            reg.set("clock_polarity", mode.polarity())?;
            reg.set("clock_phase", mode.phase())
        })
    }

    pub fn clock_phase(&mut self) -> Result<ClockPhase> {
        self.spi_word()?.get("clock_phase")
    }

    pub fn set_clock_phase(&mut self, phase: ClockPhase) -> Result<()> {
        self.update_word(|reg| reg.set("clock_phase", phase))
    }

    pub fn clock_polarity(&mut self) -> Result<ClockPolarity> {
        self.spi_word()?.get("clock_polarity")
    }

    pub fn set_clock_polarity(&mut self, polarity: ClockPolarity) -> Result<()> {
        self.update_word(|reg| reg.set("clock_polarity", polarity))
    }

    /// Output driver of the chip-select pin
    pub fn cs_mode(&mut self) -> Result<OutputMode> {
        self.spi_word()?.get("chip_select_mode")
    }

    pub fn set_cs_mode(&mut self, mode: OutputMode) -> Result<()> {
        self.update_word(|reg| reg.set("chip_select_mode", mode))
    }

    /// SPI clock in Hz, one of the eight supported rates
    pub fn clock_frequency(&mut self) -> Result<u32> {
        self.spi_word()?.get("clock_frequency")
    }

    /// Select the fastest supported rate not above `hz`
    pub fn set_clock_frequency(&mut self, hz: u32) -> Result<()> {
        self.update_word(|reg| reg.set("clock_frequency", hz))
    }

    pub fn cs_toggle(&mut self) -> Result<bool> {
        self.spi_delay()?.get("cs_toggle")
    }

    pub fn set_cs_toggle(&mut self, enable: bool) -> Result<()> {
        self.update_delay(|reg| reg.set("cs_toggle", enable))
    }

    pub fn pre_deassert(&mut self) -> Result<bool> {
        self.spi_delay()?.get("pre_deassert")
    }

    pub fn set_pre_deassert(&mut self, enable: bool) -> Result<()> {
        self.update_delay(|reg| reg.set("pre_deassert", enable))
    }

    pub fn post_assert(&mut self) -> Result<bool> {
        self.spi_delay()?.get("post_assert")
    }

    pub fn set_post_assert(&mut self, enable: bool) -> Result<()> {
        self.update_delay(|reg| reg.set("post_assert", enable))
    }

    pub fn inter_byte(&mut self) -> Result<bool> {
        self.spi_delay()?.get("inter_byte")
    }

    pub fn set_inter_byte(&mut self, enable: bool) -> Result<()> {
        self.update_delay(|reg| reg.set("inter_byte", enable))
    }

    /// Delays are stored in 10 µs units; values round down
    pub fn pre_deassert_delay_us(&mut self) -> Result<u32> {
        delay_us(&self.spi_delay()?, "pre_deassert_delay_10us")
    }

    pub fn set_pre_deassert_delay_us(&mut self, us: u32) -> Result<()> {
        self.update_delay(|reg| set_delay_us(reg, "pre_deassert_delay_10us", us))
    }

    pub fn post_assert_delay_us(&mut self) -> Result<u32> {
        delay_us(&self.spi_delay()?, "post_assert_delay_10us")
    }

    pub fn set_post_assert_delay_us(&mut self, us: u32) -> Result<()> {
        self.update_delay(|reg| set_delay_us(reg, "post_assert_delay_10us", us))
    }

    pub fn inter_byte_delay_us(&mut self) -> Result<u32> {
        delay_us(&self.spi_delay()?, "inter_byte_delay_10us")
    }

    pub fn set_inter_byte_delay_us(&mut self, us: u32) -> Result<()> {
        self.update_delay(|reg| set_delay_us(reg, "inter_byte_delay_10us", us))
    }
}

fn delay_us(reg: &Register, field: &str) -> Result<u32> {
    Ok(reg.get::<u32>(field)? * 10)
}

fn set_delay_us(reg: &mut Register, field: &str, us: u32) -> Result<()> {
    if us > MAX_DELAY_US {
        return Err(Error::InvalidArgument(format!(
            "delay of {} us exceeds {} us",
            us, MAX_DELAY_US
        )));
    }
    reg.set(field, us / 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockTransport};
    use crate::protocol::{REQUEST_TYPE_IN, WRITE_EP};
    use crate::transport::ControlRequest;

    #[test]
    fn test_set_mode_rewrites_word() {
        let mut transport = MockTransport::new();
        let mut word = [0u8; 11];
        word[4] = 0b0000_1010;
        transport.respond(0x30, &word);
        let mut chip = Chip::new(transport);
        let mut cs = ChipSelect::new(4, Strategy::Native);

        let mut spi = SpiChannel::new(&mut chip, &mut cs);
        spi.set_mode(SpiMode::Mode3).unwrap();
        // CPHA and CPOL set, CS mode and clock code kept
        assert_eq!(chip.transport().sent(0x31), vec![vec![0x04, 0b0011_1010]]);
    }

    #[test]
    fn test_delay_units() {
        let mut transport = MockTransport::new();
        transport.respond_at(0x32, 1, &[0x01, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00]);
        let mut chip = Chip::new(transport);
        let mut cs = ChipSelect::new(1, Strategy::Native);

        let mut spi = SpiChannel::new(&mut chip, &mut cs);
        assert_eq!(spi.inter_byte_delay_us().unwrap(), 50);
        spi.set_post_assert_delay_us(125).unwrap();
        assert!(matches!(
            spi.set_post_assert_delay_us(MAX_DELAY_US + 1),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(
            chip.transport().sent(0x33),
            vec![vec![0x01, 0x00, 0x00, 0x05, 0x00, 0x0C, 0x00, 0x00]]
        );
        assert!(chip.transport().calls().contains(&Call::ControlIn {
            req: ControlRequest {
                request_type: REQUEST_TYPE_IN,
                request: 0x32,
                value: 0,
                index: 1,
            },
            length: 8,
        }));
    }

    #[test]
    fn test_write_brackets_transfer() {
        let mut chip = Chip::new(MockTransport::new());
        let mut cs = ChipSelect::new(0, Strategy::Native);

        SpiChannel::new(&mut chip, &mut cs)
            .write(&[0x9F], false)
            .unwrap();
        let calls = chip.transport().calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(&calls[0], Call::ControlOut { req, .. } if req.request == 0x25));
        assert_eq!(
            calls[1],
            Call::BulkWrite {
                endpoint: WRITE_EP,
                data: vec![0, 0, 0x01, 0, 1, 0, 0, 0, 0x9F],
            }
        );
        assert!(matches!(&calls[2], Call::ControlOut { req, .. } if req.request == 0x25));
    }
}
