//! Strategies for waiting out a conversion between starting it and reading the result.

use embedded_hal::digital::InputPin;

use crate::error::Error;
use crate::registers::{mode, UpdateRate};
use crate::transport::Transport;

/// Blocks until the conversion started with the given mode register is complete.
///
/// The chip-select is held low for the whole wait.
pub trait SettleWait {
    fn wait<T: Transport>(&mut self, transport: &mut T, mode_register: u16) -> Result<(), Error<T::Error>>;
}

/// Sleeps the datasheet settling time for the update rate in the mode register.
/// Unknown rate codes get the slowest settling time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateDelay;

impl SettleWait for RateDelay {
    fn wait<T: Transport>(&mut self, transport: &mut T, mode_register: u16) -> Result<(), Error<T::Error>> {
        let rate = UpdateRate::from_code(mode::rate_code(mode_register)).unwrap_or(UpdateRate::SLOWEST);
        transport.sleep_ms(rate.settle_ms());
        Ok(())
    }
}

/// Sleeps a fixed number of milliseconds regardless of the update rate.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub u32);

impl SettleWait for FixedDelay {
    fn wait<T: Transport>(&mut self, transport: &mut T, _mode_register: u16) -> Result<(), Error<T::Error>> {
        transport.sleep_ms(self.0);
        Ok(())
    }
}

/// Polls a GPIO wired to DOUT/RDY. The converter pulls the line low once the result is ready.
pub struct ReadyPin<P> {
    pin: P,
    timeout_ms: u32,
}

impl<P: InputPin> ReadyPin<P> {
    pub fn new(pin: P, timeout_ms: u32) -> Self {
        Self { pin, timeout_ms }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin> SettleWait for ReadyPin<P> {
    fn wait<T: Transport>(&mut self, transport: &mut T, _mode_register: u16) -> Result<(), Error<T::Error>> {
        let mut waited_ms = 0;

        loop {
            match self.pin.is_low() {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = ?e, "reading data-ready pin failed");
                    return Err(Error::ReadyPin);
                }
            }

            if waited_ms >= self.timeout_ms {
                return Err(Error::NotReady { waited_ms });
            }

            transport.sleep_ms(1);
            waited_ms += 1;
        }
    }
}
