//! The converter driver: register shadows, channel selection and the conversion sequence.

use crate::channel::{ChannelBank, ChannelConfig, ChannelId};
use crate::conversion;
use crate::error::Error;
use crate::profile::DeviceProfile;
use crate::registers::{self, command, config, mode};
use crate::transport::Transport;
use crate::wait::{RateDelay, SettleWait};

/// Time the serial interface needs after a reset, with margin (datasheet minimum is 500 µs).
const RESET_SETTLE_MS: u32 = 2;

/// Minimum run of 1-bits that resets the serial interface, in bytes.
const MIN_RESET_BYTES: u8 = 4;

/// Channel settings encoded by [`config::POWER_ON`].
const POWER_ON_SETTINGS: ChannelConfig = ChannelConfig::new(128, true, false);

/// Conversion mode selected by the MD bits of the mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    /// One conversion per start, then the converter idles. Chip-select is released after each read.
    Single,
    /// The converter free-runs. Chip-select stays asserted after a read until
    /// [`Ad779x::release_chip_select`] or the next register write.
    Continuous,
}

/// Evidence that a conversion was started and the chip-select is still asserted.
///
/// Only [`Ad779x::start_conversion`] creates one and only the result read consumes it,
/// so the data register can't be read outside a conversion.
#[must_use]
#[derive(Debug)]
struct ConversionGuard {
    _private: (),
}

/// AD7794/AD7799 driver.
///
/// Holds shadow copies of the mode and configuration registers. The configuration register is
/// rebuilt from the active channel's [`ChannelConfig`] and written to the device by every call that
/// changes the channel or its settings. Shadow state is only updated after the device accepted the
/// write, so after a transport error the shadows still describe what the device last received.
///
/// Every bus operation blocks until it is finished, including the settle wait of a conversion.
pub struct Ad779x<T, W = RateDelay> {
    transport: T,
    wait: W,
    profile: DeviceProfile,
    channels: ChannelBank,
    active: ChannelId,
    mode_register: u16,
    config_register: u16,
    conversion_mode: ConversionMode,
    held_select: Option<ConversionGuard>,
}

impl<T: Transport> Ad779x<T, RateDelay> {
    /// Creates a driver that waits the datasheet settling time of the configured update rate.
    /// Nothing is sent to the device until [`Self::initialize`].
    pub fn new(transport: T, profile: DeviceProfile) -> Self {
        Self::with_wait(transport, profile, RateDelay)
    }
}

impl<T: Transport, W: SettleWait> Ad779x<T, W> {
    /// Like [`Ad779x::new`] but waits out each conversion with `wait`.
    pub fn with_wait(transport: T, profile: DeviceProfile, wait: W) -> Self {
        Self {
            transport,
            wait,
            profile,
            channels: ChannelBank::new(profile.channel_count),
            active: ChannelId::new(0),
            mode_register: mode::DEFAULT,
            config_register: config::DEFAULT,
            conversion_mode: ConversionMode::Single,
            held_select: None,
        }
    }

    /// The device constants this driver was built with.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// The channel whose configuration the device currently holds.
    pub fn active_channel(&self) -> ChannelId {
        self.active
    }

    /// Last value written to (or reset into) the mode register.
    pub fn mode_register(&self) -> u16 {
        self.mode_register
    }

    /// Last value written to (or reset into) the configuration register.
    pub fn config_register(&self) -> u16 {
        self.config_register
    }

    /// Conversion mode matching the MD bits of [`Self::mode_register`].
    pub fn conversion_mode(&self) -> ConversionMode {
        self.conversion_mode
    }

    /// Stored settings of `id`, or `None` outside the device's channel range.
    pub fn channel(&self, id: ChannelId) -> Option<&ChannelConfig> {
        self.channels.get(id)
    }

    /// Stored settings of every channel.
    pub fn channels(&self) -> &ChannelBank {
        &self.channels
    }

    /// Whether a continuous-mode read left the chip-select asserted.
    pub fn chip_select_held(&self) -> bool {
        self.held_select.is_some()
    }

    /// Give back the transport.
    pub fn release(self) -> T {
        self.transport
    }

    /// Resets the device, then writes the default mode register and the default configuration of
    /// every analog channel, then selects channel 0.
    ///
    /// Settings stored before the call are discarded.
    pub fn initialize(&mut self) -> Result<(), Error<T::Error>> {
        self.reset()?;
        self.transport.sleep_ms(RESET_SETTLE_MS);

        // Channels beyond the bank would alias onto channel 0 in the register's 3-bit field.
        let analog = self.profile.analog_channels().min(self.channels.len());

        for index in 0..analog {
            self.write_mode_register(mode::DEFAULT)?;
            self.conversion_mode = ConversionMode::Single;
            self.apply(ChannelId::new(index), ChannelConfig::default())?;
        }

        self.set_active_channel(ChannelId::new(0))
    }

    /// Clocks out at least 32 1-bits with chip-select asserted, returning the serial interface
    /// and registers to their power-on state.
    ///
    /// On success the shadows follow the device: the mode and configuration registers hold their
    /// power-on values, channel 0 is active with gain 128 and the converter free-runs. Every other
    /// channel goes back to [`ChannelConfig::default`].
    pub fn reset(&mut self) -> Result<(), Error<T::Error>> {
        let count = usize::from(self.profile.reset_bytes.max(MIN_RESET_BYTES));

        tracing::debug!(device = self.profile.name, "reset");
        self.framed(core::iter::repeat(command::DUMMY).take(count))?;

        self.mode_register = mode::POWER_ON;
        self.config_register = config::POWER_ON;
        self.conversion_mode = ConversionMode::Continuous;
        self.active = ChannelId::new(0);
        self.channels = ChannelBank::new(self.profile.channel_count);
        if let Some(slot) = self.channels.get_mut(self.active) {
            *slot = POWER_ON_SETTINGS;
        }

        Ok(())
    }

    /// Selects `id` and writes its configuration.
    /// An id outside the device's channel range is ignored; see [`Self::try_set_active_channel`].
    pub fn set_active_channel(&mut self, id: ChannelId) -> Result<(), Error<T::Error>> {
        if !self.channels.contains(id) {
            tracing::warn!(channel = id.index(), count = self.channels.len(), "ignoring out of range channel");
            return Ok(());
        }

        self.apply(id, self.settings(id))
    }

    /// Like [`Self::set_active_channel`] but an out of range id is an error.
    pub fn try_set_active_channel(&mut self, id: ChannelId) -> Result<(), Error<T::Error>> {
        self.check_channel(id)?;
        self.apply(id, self.settings(id))
    }

    /// Sets the gain of the active channel. Values other than 1, 2, 4, ..., 128 program gain 1.
    pub fn set_gain(&mut self, gain: u8) -> Result<(), Error<T::Error>> {
        let mut settings = self.settings(self.active);
        settings.set_gain(gain);
        self.apply(self.active, settings)
    }

    /// Sets the active channel to bipolar (`true`) or unipolar (`false`) coding.
    ///
    /// Earlier versions of this driver forced bipolar coding whatever the argument was.
    /// The argument is now honoured.
    pub fn set_bipolar(&mut self, is_bipolar: bool) -> Result<(), Error<T::Error>> {
        self.set_unipolar(!is_bipolar)
    }

    /// Sets the active channel to unipolar (`true`) or bipolar (`false`) coding.
    pub fn set_unipolar(&mut self, is_unipolar: bool) -> Result<(), Error<T::Error>> {
        let mut settings = self.settings(self.active);
        settings.set_unipolar(is_unipolar);
        self.apply(self.active, settings)
    }

    /// Enables or bypasses the analog input buffer of the active channel.
    pub fn set_input_buffer(&mut self, enabled: bool) -> Result<(), Error<T::Error>> {
        let mut settings = self.settings(self.active);
        settings.set_buffered(enabled);
        self.apply(self.active, settings)
    }

    /// Replaces the settings of `id`. The device is only written when `id` is the active channel;
    /// otherwise the settings are sent when the channel is next selected.
    pub fn configure_channel(&mut self, id: ChannelId, settings: ChannelConfig) -> Result<(), Error<T::Error>> {
        self.check_channel(id)?;

        if id == self.active {
            return self.apply(id, settings);
        }

        if let Some(slot) = self.channels.get_mut(id) {
            *slot = settings;
        }

        Ok(())
    }

    /// Replaces the low byte of the mode register with `code` (FS3..FS0, see
    /// [`UpdateRate`](crate::UpdateRate)). The code is not validated.
    pub fn set_update_rate(&mut self, code: u8) -> Result<(), Error<T::Error>> {
        self.write_mode_register(mode::with_rate(self.mode_register, code))
    }

    /// Rewrites the MD bits of the mode register. Switching to continuous clears the whole high
    /// byte; switching to single keeps the rate byte.
    pub fn set_conversion_mode(&mut self, conversion_mode: ConversionMode) -> Result<(), Error<T::Error>> {
        let single = conversion_mode == ConversionMode::Single;
        self.write_mode_register(mode::with_single_conversion(self.mode_register, single))?;
        self.conversion_mode = conversion_mode;
        Ok(())
    }

    /// Selects `id`, runs one conversion and returns the 24-bit result.
    ///
    /// The whole sequence runs inside one bus transaction and blocks for the settle wait.
    pub fn read_raw(&mut self, id: ChannelId) -> Result<u32, Error<T::Error>> {
        self.check_channel(id)?;

        self.exclusive(|dev| {
            dev.apply(id, dev.settings(id))?;

            let result = dev.convert();
            if result.is_err() {
                dev.release_after_fault();
            }

            result
        })
    }

    /// Reads `id` and converts the result to volts with the channel's gain and polarity.
    pub fn read_volts(&mut self, id: ChannelId) -> Result<f32, Error<T::Error>> {
        let raw = self.read_raw(id)?;
        let volts = conversion::to_volts(raw, &self.settings(id), self.profile.reference_voltage);
        Ok(volts)
    }

    /// De-asserts the chip-select left low by a continuous-mode read.
    pub fn release_chip_select(&mut self) -> Result<(), Error<T::Error>> {
        if self.held_select.take().is_some() {
            self.transport.deselect().map_err(Error::Transport)?;
        }

        Ok(())
    }

    fn convert(&mut self) -> Result<u32, Error<T::Error>> {
        let guard = self.start_conversion()?;
        self.wait.wait(&mut self.transport, self.mode_register)?;
        self.read_conversion_result(guard)
    }

    /// Writes the mode register to start a conversion, leaving chip-select asserted.
    fn start_conversion(&mut self) -> Result<ConversionGuard, Error<T::Error>> {
        let [high, low] = self.mode_register.to_be_bytes();

        self.transport.select().map_err(Error::Transport)?;
        for byte in [command::WRITE_MODE, high, low] {
            self.transport.transfer_byte(byte).map_err(Error::Transport)?;
        }

        Ok(ConversionGuard { _private: () })
    }

    fn read_conversion_result(&mut self, guard: ConversionGuard) -> Result<u32, Error<T::Error>> {
        self.transport.transfer_byte(command::READ_DATA).map_err(Error::Transport)?;

        let mut result = 0u32;
        for _ in 0..3 {
            let byte = self.transport.transfer_byte(command::DUMMY).map_err(Error::Transport)?;
            result = (result << 8) | u32::from(byte);
        }

        match self.conversion_mode {
            ConversionMode::Single => self.transport.deselect().map_err(Error::Transport)?,
            ConversionMode::Continuous => self.held_select = Some(guard),
        }

        tracing::trace!(channel = self.active.index(), raw = result, "conversion result");
        Ok(result)
    }

    fn write_config_register(&mut self, value: u16) -> Result<(), Error<T::Error>> {
        let [high, low] = value.to_be_bytes();
        self.framed([command::WRITE_CONFIG, high, low])?;

        tracing::debug!("config register <- {:#06x}", value);
        self.config_register = value;
        Ok(())
    }

    fn write_mode_register(&mut self, value: u16) -> Result<(), Error<T::Error>> {
        let [high, low] = value.to_be_bytes();
        self.framed([command::WRITE_MODE, high, low])?;

        tracing::debug!("mode register <- {:#06x}", value);
        self.mode_register = value;
        Ok(())
    }

    /// Writes the configuration for `id` with `settings`, then commits both to the shadow state.
    fn apply(&mut self, id: ChannelId, settings: ChannelConfig) -> Result<(), Error<T::Error>> {
        self.write_config_register(registers::build_config(id, &settings))?;

        if let Some(slot) = self.channels.get_mut(id) {
            *slot = settings;
        }
        self.active = id;

        Ok(())
    }

    /// Sends `bytes` between one chip-select assertion and de-assertion, inside one transaction.
    fn framed(&mut self, bytes: impl IntoIterator<Item = u8>) -> Result<(), Error<T::Error>> {
        self.exclusive(|dev| {
            dev.transport.select().map_err(Error::Transport)?;

            let sent = bytes
                .into_iter()
                .try_for_each(|byte| dev.transport.transfer_byte(byte).map(drop));

            match sent {
                Ok(()) => dev.transport.deselect().map_err(Error::Transport),
                Err(e) => {
                    dev.release_after_fault();
                    Err(Error::Transport(e))
                }
            }
        })?;

        // Any frame ends with chip-select high.
        self.held_select = None;
        Ok(())
    }

    /// Runs `body` with the bus claimed. The claim is released on every exit path.
    fn exclusive<R>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<R, Error<T::Error>>,
    ) -> Result<R, Error<T::Error>> {
        self.transport.begin_transaction().map_err(Error::Transport)?;

        let result = body(self);
        let end = self.transport.end_transaction().map_err(Error::Transport);

        let value = result?;
        end?;
        Ok(value)
    }

    fn release_after_fault(&mut self) {
        self.held_select = None;

        if let Err(e) = self.transport.deselect() {
            tracing::warn!(error = ?e, "releasing chip-select after a failed exchange");
        }
    }

    fn check_channel(&self, id: ChannelId) -> Result<(), Error<T::Error>> {
        if self.channels.contains(id) {
            Ok(())
        } else {
            Err(Error::InvalidChannel {
                channel: id.index(),
                count: self.channels.len(),
            })
        }
    }

    fn settings(&self, id: ChannelId) -> ChannelConfig {
        self.channels.get(id).copied().unwrap_or_default()
    }
}
