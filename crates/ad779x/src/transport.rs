//! The bus seam the driver talks through.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal::spi::SpiBus;

/// Byte-level access to the converter's serial interface.
///
/// The driver brackets every multi-byte exchange in `begin_transaction`/`end_transaction`.
/// Brackets nest: a conversion read contains a configuration write, which opens its own bracket.
/// An implementation holding a shared bus should only release it when the outermost bracket ends.
pub trait Transport {
    type Error: Debug;

    /// Claim the bus for the caller.
    fn begin_transaction(&mut self) -> Result<(), Self::Error>;

    /// Release the claim taken by the matching [`Self::begin_transaction`].
    fn end_transaction(&mut self) -> Result<(), Self::Error>;

    /// Full-duplex exchange of one byte, MSB first.
    fn transfer_byte(&mut self, out: u8) -> Result<u8, Self::Error>;

    /// Drive the chip-select line. The line is active low.
    fn set_chip_select(&mut self, level: PinState) -> Result<(), Self::Error>;

    fn sleep_ms(&mut self, ms: u32);

    fn select(&mut self) -> Result<(), Self::Error> {
        self.set_chip_select(PinState::Low)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.set_chip_select(PinState::High)
    }
}

/// Failure of one of the `embedded-hal` peripherals behind a [`HalTransport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HalError<S, P> {
    #[error("SPI bus error: {0:?}")]
    Spi(S),
    #[error("chip-select pin error: {0:?}")]
    ChipSelect(P),
}

/// [`Transport`] over an `embedded-hal` SPI bus, a GPIO chip-select and a delay provider.
///
/// The chip-select is driven by hand because the converter needs it held low across a whole
/// conversion. Please ensure the bus is in SPI mode 3, MSB first.
pub struct HalTransport<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
    depth: u8,
}

impl<SPI, CS, D> HalTransport<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    /// Creates the transport and parks the chip-select high.
    pub fn new(spi: SPI, mut cs: CS, delay: D) -> Result<Self, HalError<SPI::Error, CS::Error>> {
        cs.set_high().map_err(HalError::ChipSelect)?;

        Ok(Self {
            spi,
            cs,
            delay,
            depth: 0,
        })
    }

    /// Give back the peripherals.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }
}

impl<SPI, CS, D> Transport for HalTransport<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    type Error = HalError<SPI::Error, CS::Error>;

    fn begin_transaction(&mut self) -> Result<(), Self::Error> {
        self.depth = self.depth.saturating_add(1);
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), Self::Error> {
        self.depth = self.depth.saturating_sub(1);

        if self.depth == 0 {
            self.spi.flush().map_err(HalError::Spi)?;
        }

        Ok(())
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, Self::Error> {
        let mut word = [out];
        self.spi.transfer_in_place(&mut word).map_err(HalError::Spi)?;
        Ok(word[0])
    }

    fn set_chip_select(&mut self, level: PinState) -> Result<(), Self::Error> {
        // Clocking may still be in progress when a bus call returns.
        if level == PinState::High {
            self.spi.flush().map_err(HalError::Spi)?;
        }

        self.cs.set_state(level).map_err(HalError::ChipSelect)
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
