use std::time::Duration;

use ad779x::{ChannelConfig, ChannelId, ConversionMode, DeviceProfile, UpdateRate};
use anyhow::{bail, ensure};
use clap::{Parser, ValueEnum};

/// Read voltages from an AD7794/AD7799 delta-sigma ADC
#[derive(Parser, Debug)]
#[command(name = "reader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Converter variant
    #[arg(short, long, value_enum, default_value_t = Device::Ad7794)]
    pub device: Device,

    /// Reference voltage in volts (defaults to the variant's nominal reference)
    #[arg(long)]
    pub vref: Option<f32>,

    /// Channels to read, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "0")]
    pub channels: Vec<u8>,

    /// Programmable gain for every read channel (1, 2, 4, ..., 128)
    #[arg(short, long, default_value_t = 1)]
    pub gain: u8,

    /// Unipolar coding instead of bipolar
    #[arg(long)]
    pub unipolar: bool,

    /// Bypass the analog input buffer
    #[arg(long)]
    pub unbuffered: bool,

    /// Filter-select code, 1 (470 Hz) to 15 (4.17 Hz)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=15))]
    pub rate: u8,

    /// Let the converter free-run instead of one conversion per read
    #[arg(long)]
    pub continuous: bool,

    /// Number of sweeps over the channels, 0 runs until interrupted
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: u32,

    /// Pause between sweeps in milliseconds
    #[arg(short, long, default_value_t = 500)]
    pub interval_ms: u64,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Talk to a simulated converter instead of hardware
    #[arg(long)]
    pub simulate: bool,

    /// Input voltages of the simulated converter, one per channel starting at channel 0
    #[arg(long, value_delimiter = ',', default_value = "0.5")]
    pub sim_volts: Vec<f32>,

    /// SPI clock frequency in Hz (hardware only)
    #[arg(long, default_value_t = 1_000_000)]
    pub spi_hz: u32,

    /// BCM GPIO driving the converter's chip-select (hardware only)
    #[arg(long, default_value_t = 24)]
    pub cs_pin: u8,

    /// BCM GPIO wired to DOUT/RDY; polls it instead of waiting a fixed settling time (hardware only)
    #[arg(long)]
    pub ready_pin: Option<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Device {
    Ad7794,
    Ad7799,
}

impl Device {
    pub fn profile(self) -> DeviceProfile {
        match self {
            Device::Ad7794 => DeviceProfile::AD7794,
            Device::Ad7799 => DeviceProfile::AD7799,
        }
    }
}

/// Validated run settings derived from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub profile: DeviceProfile,
    pub channels: Vec<ChannelId>,
    pub settings: ChannelConfig,
    pub rate: UpdateRate,
    pub conversion_mode: ConversionMode,
    /// Sweeps to run, `None` for no limit.
    pub sweeps: Option<u32>,
    pub interval: Duration,
}

impl TryFrom<&Cli> for ReaderConfig {
    type Error = anyhow::Error;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let mut profile = cli.device.profile();
        if let Some(vref) = cli.vref {
            ensure!(vref > 0.0, "reference voltage must be positive, got {vref}");
            profile = profile.with_reference_voltage(vref);
        }

        ensure!(!cli.channels.is_empty(), "no channels to read");
        for &channel in &cli.channels {
            ensure!(
                channel < profile.channel_count,
                "channel {channel} does not exist on the {}, which has {} channels",
                profile.name,
                profile.channel_count
            );
        }

        let settings = ChannelConfig::new(cli.gain, !cli.unbuffered, cli.unipolar);
        if settings.effective_gain() != cli.gain {
            tracing::warn!(gain = cli.gain, "unsupported gain, the converter will run at gain 1");
        }

        let Some(rate) = UpdateRate::from_code(cli.rate) else {
            bail!("unknown filter-select code {}", cli.rate);
        };

        let conversion_mode = if cli.continuous {
            ConversionMode::Continuous
        } else {
            ConversionMode::Single
        };

        Ok(Self {
            profile,
            channels: cli.channels.iter().copied().map(ChannelId::new).collect(),
            settings,
            rate,
            conversion_mode,
            sweeps: (cli.count > 0).then_some(cli.count),
            interval: Duration::from_millis(cli.interval_ms),
        })
    }
}
