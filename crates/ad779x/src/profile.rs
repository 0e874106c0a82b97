//! Constants that differ between members of the family.

/// Device constants for one chip variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub name: &'static str,
    /// Reference voltage in volts.
    pub reference_voltage: f32,
    pub channel_count: u8,
    /// Internal channels at the top of the channel range (temperature sensor, supply monitor).
    /// They are skipped when bootstrapping channels.
    pub monitor_channels: u8,
    /// Number of 0xFF bytes clocked to reset the serial interface. At least 4 (32 bits).
    pub reset_bytes: u8,
}

impl DeviceProfile {
    /// AD7794: six differential inputs plus the temperature sensor and AVDD monitor.
    #[cfg(feature = "ad7794")]
    pub const AD7794: Self = Self {
        name: "AD7794",
        reference_voltage: 2.50,
        channel_count: 8,
        monitor_channels: 2,
        reset_bytes: 4,
    };

    /// AD7799: three differential inputs.
    #[cfg(feature = "ad7799")]
    pub const AD7799: Self = Self {
        name: "AD7799",
        reference_voltage: 2.44,
        channel_count: 3,
        monitor_channels: 0,
        reset_bytes: 4,
    };

    pub const fn with_reference_voltage(self, reference_voltage: f32) -> Self {
        Self {
            reference_voltage,
            ..self
        }
    }

    /// Channels that carry an analog input and get configured on start-up.
    pub const fn analog_channels(&self) -> u8 {
        self.channel_count.saturating_sub(self.monitor_channels)
    }
}
