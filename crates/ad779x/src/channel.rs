//! Per-channel acquisition settings.

use core::fmt;

/// Largest channel count of any supported part (AD7794: 6 analog inputs, temperature, AVDD monitor).
pub const MAX_CHANNELS: usize = 8;

/// Index of a physical input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Wraps a raw channel index. Whether it exists is up to the device; see [`ChannelBank::contains`].
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// The raw index, as written to the channel field of the configuration register.
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl From<u8> for ChannelId {
    fn from(index: u8) -> Self {
        Self(index)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

/// Gain, buffering and polarity of one input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    gain: u8,
    is_buffered: bool,
    is_unipolar: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            gain: 1,
            is_buffered: true,
            is_unipolar: false,
        }
    }
}

impl ChannelConfig {
    /// Creates a channel configuration.
    /// A gain outside {1, 2, 4, ..., 128} is accepted and encoded as gain 1.
    pub const fn new(gain: u8, is_buffered: bool, is_unipolar: bool) -> Self {
        Self {
            gain,
            is_buffered,
            is_unipolar,
        }
    }

    pub const fn gain(&self) -> u8 {
        self.gain
    }

    pub const fn is_buffered(&self) -> bool {
        self.is_buffered
    }

    pub const fn is_unipolar(&self) -> bool {
        self.is_unipolar
    }

    /// 3-bit G2..G0 code for the configuration register.
    pub const fn gain_bits(&self) -> u8 {
        match self.gain {
            1 => 0b000,
            2 => 0b001,
            4 => 0b010,
            8 => 0b011,
            16 => 0b100,
            32 => 0b101,
            64 => 0b110,
            128 => 0b111,
            _ => 0b000,
        }
    }

    /// Amplification the device applies for [`Self::gain_bits`].
    pub const fn effective_gain(&self) -> u8 {
        1 << self.gain_bits()
    }

    pub(crate) fn set_gain(&mut self, gain: u8) {
        self.gain = gain;
    }

    pub(crate) fn set_buffered(&mut self, is_buffered: bool) {
        self.is_buffered = is_buffered;
    }

    pub(crate) fn set_unipolar(&mut self, is_unipolar: bool) {
        self.is_unipolar = is_unipolar;
    }
}

/// Fixed-capacity set of channel configurations, indexed by [`ChannelId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBank {
    channels: [ChannelConfig; MAX_CHANNELS],
    len: u8,
}

impl ChannelBank {
    /// Creates `count` channels with default settings. `count` is capped at [`MAX_CHANNELS`].
    pub fn new(count: u8) -> Self {
        Self {
            channels: [ChannelConfig::default(); MAX_CHANNELS],
            len: count.min(MAX_CHANNELS as u8),
        }
    }

    /// Number of channels on the device.
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Whether the device has no channels at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `id` names a channel on the device.
    pub fn contains(&self, id: ChannelId) -> bool {
        id.index() < self.len
    }

    /// Settings of `id`, or `None` when it is out of range.
    pub fn get(&self, id: ChannelId) -> Option<&ChannelConfig> {
        self.as_slice().get(usize::from(id.index()))
    }

    pub(crate) fn get_mut(&mut self, id: ChannelId) -> Option<&mut ChannelConfig> {
        let len = usize::from(self.len);
        self.channels[..len].get_mut(usize::from(id.index()))
    }

    /// Settings of every channel, indexed by channel number.
    pub fn as_slice(&self) -> &[ChannelConfig] {
        &self.channels[..usize::from(self.len)]
    }

    /// Iterate over the ids of every channel in the bank.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> {
        (0..self.len).map(ChannelId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_bits_follow_datasheet_table() {
        let table = [(1, 0), (2, 1), (4, 2), (8, 3), (16, 4), (32, 5), (64, 6), (128, 7)];

        for (gain, bits) in table {
            let config = ChannelConfig::new(gain, true, false);
            assert_eq!(config.gain_bits(), bits, "gain {gain}");
            assert_eq!(config.effective_gain(), gain);
        }
    }

    #[test]
    fn unknown_gain_encodes_as_unity() {
        for gain in [0, 3, 5, 100, 127, 129, 255] {
            let config = ChannelConfig::new(gain, false, true);
            assert_eq!(config.gain_bits(), 0, "gain {gain}");
            assert_eq!(config.effective_gain(), 1);
        }
    }

    #[test]
    fn defaults_are_unity_gain_buffered_bipolar() {
        let config = ChannelConfig::default();
        assert_eq!(config.gain(), 1);
        assert!(config.is_buffered());
        assert!(!config.is_unipolar());
    }

    #[test]
    fn bank_bounds() {
        let bank = ChannelBank::new(3);
        assert_eq!(bank.len(), 3);
        assert!(bank.contains(ChannelId::new(2)));
        assert!(!bank.contains(ChannelId::new(3)));
        assert!(bank.get(ChannelId::new(3)).is_none());
        assert_eq!(bank.ids().count(), 3);

        let capped = ChannelBank::new(200);
        assert_eq!(usize::from(capped.len()), MAX_CHANNELS);
    }
}
