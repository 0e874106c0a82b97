use ad779x::{Ad779x, HalTransport, ReadyPin, UpdateRate};
use rppal::gpio::Gpio;
use rppal::hal::Delay;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::info;

use crate::config::{Cli, ReaderConfig};
use crate::reader;

/// Runs the reader against a converter on SPI0, with chip-select on a GPIO.
pub fn run(cli: &Cli, config: &ReaderConfig) -> Result<(), anyhow::Error> {
    let gpio = Gpio::new()?;

    // The converter idles SCLK high and samples on the rising edge.
    let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, cli.spi_hz, Mode::Mode3)?;

    let cs = gpio.get(cli.cs_pin)?.into_output_high();

    let transport = HalTransport::new(spi, cs, Delay::new())?;

    info!(spi_hz = cli.spi_hz, cs_pin = cli.cs_pin, "SPI0 open");

    match cli.ready_pin {
        Some(pin) => {
            let ready = gpio.get(pin)?.into_input();
            let timeout_ms = 2 * UpdateRate::SLOWEST.settle_ms();

            info!(ready_pin = pin, timeout_ms, "polling data-ready");

            let mut adc = Ad779x::with_wait(transport, config.profile, ReadyPin::new(ready, timeout_ms));
            reader::run(&mut adc, config)
        }
        None => {
            let mut adc = Ad779x::new(transport, config.profile);
            reader::run(&mut adc, config)
        }
    }
}
