use std::fmt;

use ad779x::{conversion, Ad779x, ChannelId, SettleWait, Transport};
use anyhow::Context;
use tracing::{debug, info};

use crate::config::ReaderConfig;

/// One conversion result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub channel: ChannelId,
    pub raw: u32,
    pub volts: f32,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} raw=0x{:06X} volts={:+.6}", self.channel, self.raw, self.volts)
    }
}

/// Brings the converter up and applies the run settings to every channel that will be read.
pub fn configure<T, W>(adc: &mut Ad779x<T, W>, config: &ReaderConfig) -> anyhow::Result<()>
where
    T: Transport,
    T::Error: Send + Sync + 'static,
    W: SettleWait,
{
    adc.initialize().context("initializing the converter")?;
    adc.set_update_rate(config.rate.code()).context("setting the update rate")?;
    adc.set_conversion_mode(config.conversion_mode)
        .context("setting the conversion mode")?;

    for &channel in &config.channels {
        adc.configure_channel(channel, config.settings)
            .with_context(|| format!("configuring {channel}"))?;
    }

    debug!(
        mode = format_args!("{:#06x}", adc.mode_register()),
        config = format_args!("{:#06x}", adc.config_register()),
        "converter configured"
    );

    Ok(())
}

/// Reads each channel once, in order.
pub fn sweep<T, W>(adc: &mut Ad779x<T, W>, channels: &[ChannelId]) -> anyhow::Result<Vec<Reading>>
where
    T: Transport,
    T::Error: Send + Sync + 'static,
    W: SettleWait,
{
    let reference_voltage = adc.profile().reference_voltage;

    channels
        .iter()
        .map(|&channel| {
            let raw = adc.read_raw(channel).with_context(|| format!("reading {channel}"))?;
            let settings = adc.channel(channel).copied().unwrap_or_default();
            let volts = conversion::to_volts(raw, &settings, reference_voltage);

            Ok(Reading { channel, raw, volts })
        })
        .collect()
}

/// Configures the converter, then prints `config.sweeps` sweeps (or runs forever).
pub fn run<T, W>(adc: &mut Ad779x<T, W>, config: &ReaderConfig) -> anyhow::Result<()>
where
    T: Transport,
    T::Error: Send + Sync + 'static,
    W: SettleWait,
{
    configure(adc, config)?;

    info!(
        device = adc.profile().name,
        rate_hz = config.rate.hz(),
        channels = config.channels.len(),
        "reading"
    );

    let mut done = 0u32;
    let swept = sweep_all(adc, config, &mut done);

    // Continuous reads leave chip-select low, also when a sweep failed.
    let released = adc.release_chip_select().context("releasing chip-select");
    swept?;
    released?;

    info!(sweeps = done, "finished");

    Ok(())
}

fn sweep_all<T, W>(adc: &mut Ad779x<T, W>, config: &ReaderConfig, done: &mut u32) -> anyhow::Result<()>
where
    T: Transport,
    T::Error: Send + Sync + 'static,
    W: SettleWait,
{
    while config.sweeps.map_or(true, |sweeps| *done < sweeps) {
        for reading in sweep(adc, &config.channels)? {
            println!("{reading}");
        }

        *done += 1;

        if !config.interval.is_zero() {
            std::thread::sleep(config.interval);
        }
    }

    Ok(())
}
