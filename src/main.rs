//! Reads voltages from an AD7794/AD7799 and prints them.
//!
//! ```bash
//! # Simulated converter, channels 0 and 1
//! reader --simulate -c 0,1 --sim-volts 0.5,-0.2
//!
//! # Hardware, AD7799 at 16.7 Hz, unipolar, gain 64
//! reader --device ad7799 -r 10 --unipolar -g 64
//! ```

use ad779x::Ad779x;
use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Cli, ReaderConfig};
use crate::simulator::SimulatedAd779x;

mod config;
mod reader;
mod simulator;

#[cfg(feature = "raspberry_pi")]
mod raspberry_pi;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("ad779x reader v{}", env!("CARGO_PKG_VERSION"));

    let config = ReaderConfig::try_from(&cli)?;

    info!(
        device = config.profile.name,
        vref = config.profile.reference_voltage,
        mode = ?config.conversion_mode,
        "configuration loaded"
    );

    #[cfg(feature = "raspberry_pi")]
    if !cli.simulate {
        return raspberry_pi::run(&cli, &config);
    }

    #[cfg(not(feature = "raspberry_pi"))]
    if !cli.simulate {
        tracing::warn!("built without the raspberry_pi feature, using the simulator");
    }

    let sim = SimulatedAd779x::new(config.profile.reference_voltage).with_inputs(&cli.sim_volts);
    let mut adc = Ad779x::new(sim, config.profile);

    reader::run(&mut adc, &config)?;

    let sim = adc.release();
    debug!(
        mode = format_args!("{:#06x}", sim.mode_register()),
        config = format_args!("{:#06x}", sim.config_register()),
        resets = sim.resets(),
        conversions = sim.conversions(),
        slept_ms = sim.slept_ms(),
        selected = sim.is_selected(),
        "simulator state"
    );

    Ok(())
}
