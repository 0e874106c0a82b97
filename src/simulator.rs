//! A software model of the converter's serial interface, for running without hardware.

use ad779x::channel::MAX_CHANNELS;
use ad779x::registers::{command, config, mode};
use ad779x::Transport;
use embedded_hal::digital::PinState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("transaction ended without a matching begin")]
    UnbalancedTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Register {
    Mode,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// The next byte goes to the communications register.
    Command,
    /// Shifting a register value in, high byte first.
    Write { register: Register, value: u16, left: u8 },
    /// Shifting a conversion result out, MSB first.
    Read { value: u32, left: u8 },
}

/// Decodes the command framing of an AD7794/AD7799 and answers data reads from per-channel
/// input voltages, using the gain and polarity currently in the configuration register.
#[derive(Debug, Clone)]
pub struct SimulatedAd779x {
    inputs: [f32; MAX_CHANNELS],
    reference_voltage: f32,
    mode: u16,
    config: u16,
    selected: bool,
    phase: Phase,
    ones: u8,
    depth: u32,
    resets: u32,
    conversions: u32,
    slept_ms: u64,
}

impl SimulatedAd779x {
    pub fn new(reference_voltage: f32) -> Self {
        Self {
            inputs: [0.0; MAX_CHANNELS],
            reference_voltage,
            mode: mode::POWER_ON,
            config: config::POWER_ON,
            selected: false,
            phase: Phase::Command,
            ones: 0,
            depth: 0,
            resets: 0,
            conversions: 0,
            slept_ms: 0,
        }
    }

    /// Sets the differential input voltage seen on consecutive channels starting at 0.
    pub fn with_inputs(mut self, volts: &[f32]) -> Self {
        for (input, v) in self.inputs.iter_mut().zip(volts) {
            *input = *v;
        }
        self
    }

    pub fn mode_register(&self) -> u16 {
        self.mode
    }

    pub fn config_register(&self) -> u16 {
        self.config
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Conversions started by a mode register write.
    pub fn conversions(&self) -> u32 {
        self.conversions
    }

    pub fn slept_ms(&self) -> u64 {
        self.slept_ms
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    fn reset(&mut self) {
        tracing::debug!("simulated converter reset");
        self.mode = mode::POWER_ON;
        self.config = config::POWER_ON;
        self.phase = Phase::Command;
        self.resets += 1;
    }

    /// Output code for the selected channel under the current configuration.
    fn sample(&self) -> u32 {
        let channel = usize::from((self.config & config::CHANNEL_MASK) as u8);
        let gain = f64::from(1u32 << ((self.config & config::GAIN_MASK) >> config::GAIN_SHIFT));
        let unipolar = self.config & config::UNIPOLAR_BIT != 0;

        let input = f64::from(self.inputs.get(channel).copied().unwrap_or(0.0));
        let scaled = input * gain / f64::from(self.reference_voltage);
        let full_scale = f64::from(1u32 << 24);

        let code = if unipolar {
            scaled * full_scale
        } else {
            (scaled + 1.0) * full_scale / 2.0
        };

        code.round().clamp(0.0, full_scale - 1.0) as u32
    }

    fn on_command(&mut self, byte: u8) {
        self.phase = match byte {
            command::WRITE_MODE => Phase::Write {
                register: Register::Mode,
                value: 0,
                left: 2,
            },
            command::WRITE_CONFIG => Phase::Write {
                register: Register::Config,
                value: 0,
                left: 2,
            },
            command::READ_DATA => Phase::Read {
                value: self.sample(),
                left: 3,
            },
            command::DUMMY => Phase::Command,
            other => {
                tracing::debug!("simulated converter ignoring command {:#04x}", other);
                Phase::Command
            }
        };
    }

    fn commit(&mut self, register: Register, value: u16) {
        match register {
            Register::Mode => {
                self.mode = value;
                let md = value & mode::MD_MASK;
                if md == 0 || md == mode::SINGLE_CONVERSION {
                    self.conversions += 1;
                }
            }
            Register::Config => self.config = value,
        }
    }
}

impl Transport for SimulatedAd779x {
    type Error = SimError;

    fn begin_transaction(&mut self) -> Result<(), Self::Error> {
        self.depth += 1;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), Self::Error> {
        self.depth = self.depth.checked_sub(1).ok_or(SimError::UnbalancedTransaction)?;
        Ok(())
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, Self::Error> {
        // DOUT floats while the part is not selected.
        if !self.selected {
            return Ok(0xFF);
        }

        if out == command::DUMMY {
            self.ones = self.ones.saturating_add(1);
        } else {
            self.ones = 0;
        }

        let mut reply = 0xFF;

        match self.phase {
            Phase::Command => self.on_command(out),
            Phase::Write { register, value, left } => {
                let value = (value << 8) | u16::from(out);
                if left == 1 {
                    self.commit(register, value);
                    self.phase = Phase::Command;
                } else {
                    self.phase = Phase::Write {
                        register,
                        value,
                        left: left - 1,
                    };
                }
            }
            Phase::Read { value, left } => {
                reply = (value >> (8 * u32::from(left - 1))) as u8;
                self.phase = if left == 1 {
                    Phase::Command
                } else {
                    Phase::Read { value, left: left - 1 }
                };
            }
        }

        // 32 consecutive ones reset the interface whatever it was doing.
        if self.ones == 4 {
            self.reset();
        }

        Ok(reply)
    }

    fn set_chip_select(&mut self, level: PinState) -> Result<(), Self::Error> {
        self.selected = level == PinState::Low;

        if !self.selected {
            self.phase = Phase::Command;
            self.ones = 0;
        }

        Ok(())
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.slept_ms += u64::from(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ad779x::{Ad779x, ChannelConfig, ChannelId, ConversionMode, DeviceProfile};

    #[test]
    fn register_writes_are_decoded() {
        let mut sim = SimulatedAd779x::new(2.5);
        sim.select().unwrap();
        for byte in [0x10, 0x13, 0x05] {
            sim.transfer_byte(byte).unwrap();
        }
        sim.deselect().unwrap();

        assert_eq!(sim.config_register(), 0x1305);
        assert_eq!(sim.mode_register(), mode::POWER_ON);
    }

    #[test]
    fn bytes_are_ignored_while_deselected() {
        let mut sim = SimulatedAd779x::new(2.5);
        for byte in [0x10, 0x13, 0x05] {
            assert_eq!(sim.transfer_byte(byte), Ok(0xFF));
        }
        assert_eq!(sim.config_register(), config::POWER_ON);
    }

    #[test]
    fn thirty_two_ones_reset_the_registers() {
        let mut sim = SimulatedAd779x::new(2.5);
        sim.select().unwrap();
        for byte in [0x10, 0x00, 0x11] {
            sim.transfer_byte(byte).unwrap();
        }
        for _ in 0..4 {
            sim.transfer_byte(0xFF).unwrap();
        }
        sim.deselect().unwrap();

        assert_eq!(sim.resets(), 1);
        assert_eq!(sim.config_register(), config::POWER_ON);
    }

    #[test]
    fn unbalanced_transactions_are_reported() {
        let mut sim = SimulatedAd779x::new(2.5);
        assert_eq!(sim.end_transaction(), Err(SimError::UnbalancedTransaction));
    }

    #[test]
    fn driver_keeps_device_and_shadow_in_step() {
        let mut adc = Ad779x::new(SimulatedAd779x::new(2.5), DeviceProfile::AD7794);
        adc.initialize().unwrap();
        adc.set_active_channel(ChannelId::new(3)).unwrap();
        adc.set_gain(8).unwrap();
        adc.set_update_rate(0x0C).unwrap();

        let config_register = adc.config_register();
        let mode_register = adc.mode_register();
        let sim = adc.release();

        assert_eq!(sim.resets(), 1);
        assert_eq!(sim.config_register(), config_register);
        assert_eq!(sim.mode_register(), mode_register);
        assert!(!sim.is_selected());
    }

    #[test]
    fn reset_leaves_shadow_matching_the_device() {
        let mut adc = Ad779x::new(SimulatedAd779x::new(2.5), DeviceProfile::AD7794);
        adc.initialize().unwrap();
        adc.set_active_channel(ChannelId::new(3)).unwrap();
        adc.set_gain(128).unwrap();
        adc.set_update_rate(0x0C).unwrap();

        adc.reset().unwrap();

        assert_eq!(adc.active_channel(), ChannelId::new(0));
        assert_eq!(adc.conversion_mode(), ConversionMode::Continuous);
        let (config_register, mode_register) = (adc.config_register(), adc.mode_register());
        let sim = adc.release();
        assert_eq!(sim.resets(), 2);
        assert_eq!(sim.config_register(), config_register);
        assert_eq!(sim.mode_register(), mode_register);
    }

    #[test]
    fn bipolar_and_unipolar_readings_track_the_inputs() {
        let sim = SimulatedAd779x::new(2.5).with_inputs(&[1.0, -0.3, 0.6]);
        let mut adc = Ad779x::new(sim, DeviceProfile::AD7794);
        adc.initialize().unwrap();
        adc.configure_channel(ChannelId::new(2), ChannelConfig::new(2, true, true))
            .unwrap();

        let v0 = adc.read_volts(ChannelId::new(0)).unwrap();
        let v1 = adc.read_volts(ChannelId::new(1)).unwrap();
        let v2 = adc.read_volts(ChannelId::new(2)).unwrap();

        assert!((v0 - 1.0).abs() < 1e-5, "{v0}");
        assert!((v1 + 0.3).abs() < 1e-5, "{v1}");
        assert!((v2 - 0.6).abs() < 1e-5, "{v2}");

        let sim = adc.release();
        assert_eq!(sim.conversions(), 3 + 6);
        // 4 ms settling per conversion at the default 470 Hz, plus the reset pause.
        assert_eq!(sim.slept_ms(), 3 * 4 + 2);
    }

    #[test]
    fn over_range_inputs_saturate() {
        let sim = SimulatedAd779x::new(2.5).with_inputs(&[5.0, -5.0]);
        let mut adc = Ad779x::new(sim, DeviceProfile::AD7799);
        adc.initialize().unwrap();

        assert_eq!(adc.read_raw(ChannelId::new(0)), Ok((1 << 24) - 1));
        assert_eq!(adc.read_raw(ChannelId::new(1)), Ok(0));
    }

    #[test]
    fn continuous_reads_hold_the_part_selected() {
        let sim = SimulatedAd779x::new(2.5).with_inputs(&[0.25]);
        let mut adc = Ad779x::new(sim, DeviceProfile::AD7799);
        adc.initialize().unwrap();
        adc.set_conversion_mode(ConversionMode::Continuous).unwrap();

        adc.read_raw(ChannelId::new(0)).unwrap();
        assert!(adc.chip_select_held());

        adc.release_chip_select().unwrap();
        let sim = adc.release();
        assert!(!sim.is_selected());
        assert_eq!(sim.mode_register() & mode::MD_MASK, 0);
    }
}
