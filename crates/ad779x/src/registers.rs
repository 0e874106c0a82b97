//! Communications commands and the bit layout of the mode and configuration registers.

use crate::channel::{ChannelConfig, ChannelId};

/// Communications register values. Each selects a register and a direction for the bytes that follow.
pub mod command {
    /// Write the mode register, two bytes high first.
    pub const WRITE_MODE: u8 = 0x08;
    /// Write the configuration register, two bytes high first.
    pub const WRITE_CONFIG: u8 = 0x10;
    /// Read the data register, three bytes MSB first.
    pub const READ_DATA: u8 = 0x58;
    /// Clocked while reading, and in runs of 32+ bits to reset the serial interface.
    pub const DUMMY: u8 = 0xFF;
}

pub mod mode {
    pub const MD_SHIFT: u16 = 13;
    pub const MD_MASK: u16 = 0b111 << MD_SHIFT;

    /// MD2..MD0 = 001
    pub const SINGLE_CONVERSION: u16 = 0b001 << MD_SHIFT;

    /// FS3..FS0 live in the low nibble; the whole low byte is replaced on a rate change.
    pub const RATE_MASK: u16 = 0x00FF;
    pub const FS_MASK: u16 = 0x000F;

    /// Single conversion, FS = 0001 (470 Hz).
    pub const DEFAULT: u16 = SINGLE_CONVERSION | 0x0001;

    /// Held by the device after power-on or a serial reset: continuous conversion, FS = 1010 (16.7 Hz).
    pub const POWER_ON: u16 = 0x000A;

    /// Replace the update-rate byte, keeping the mode bits.
    pub const fn with_rate(register: u16, code: u8) -> u16 {
        (register & !RATE_MASK) | code as u16
    }

    /// Single conversion keeps the rate byte and sets MD = 001.
    /// Continuous conversion clears the whole high byte (MD = 000).
    pub const fn with_single_conversion(register: u16, single: bool) -> u16 {
        let register = register & RATE_MASK;
        if single {
            register | SINGLE_CONVERSION
        } else {
            register
        }
    }

    pub const fn is_single_conversion(register: u16) -> bool {
        register & MD_MASK == SINGLE_CONVERSION
    }

    pub const fn rate_code(register: u16) -> u8 {
        (register & FS_MASK) as u8
    }
}

pub mod config {
    pub const CHANNEL_MASK: u16 = 0b111;
    pub const BUFFER_BIT: u16 = 1 << 4;
    pub const GAIN_SHIFT: u16 = 8;
    pub const GAIN_MASK: u16 = 0b111 << GAIN_SHIFT;
    pub const UNIPOLAR_BIT: u16 = 1 << 12;

    /// Channel 0, bipolar, gain 1, input buffer enabled.
    pub const DEFAULT: u16 = BUFFER_BIT;

    /// Held by the device after power-on or a serial reset: channel 0, bipolar, gain 128, buffered.
    pub const POWER_ON: u16 = (0b111 << GAIN_SHIFT) | BUFFER_BIT;
}

/// Builds the configuration register for `channel` from its settings.
pub fn build_config(channel: ChannelId, settings: &ChannelConfig) -> u16 {
    let mut register = ((settings.gain_bits() as u16) << config::GAIN_SHIFT) & config::GAIN_MASK;
    register |= channel.index() as u16 & config::CHANNEL_MASK;

    if settings.is_unipolar() {
        register |= config::UNIPOLAR_BIT;
    }

    if settings.is_buffered() {
        register |= config::BUFFER_BIT;
    }

    register
}

/// Filter-select (FS3..FS0) codes of the mode register.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateRate {
    Hz470 = 0x1,
    Hz242 = 0x2,
    Hz123 = 0x3,
    Hz62 = 0x4,
    Hz50 = 0x5,
    Hz39 = 0x6,
    Hz33_2 = 0x7,
    Hz19_6 = 0x8,
    /// 16.7 Hz, 80 dB rejection at 60 Hz only.
    Hz16_7Rej60 = 0x9,
    /// 16.7 Hz, 65 dB simultaneous 50/60 Hz rejection.
    Hz16_7 = 0xA,
    Hz12_5 = 0xB,
    Hz10 = 0xC,
    Hz8_33 = 0xD,
    Hz6_25 = 0xE,
    Hz4_17 = 0xF,
}

impl UpdateRate {
    /// Slowest, quietest setting.
    pub const SLOWEST: Self = Self::Hz4_17;

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x1 => Self::Hz470,
            0x2 => Self::Hz242,
            0x3 => Self::Hz123,
            0x4 => Self::Hz62,
            0x5 => Self::Hz50,
            0x6 => Self::Hz39,
            0x7 => Self::Hz33_2,
            0x8 => Self::Hz19_6,
            0x9 => Self::Hz16_7Rej60,
            0xA => Self::Hz16_7,
            0xB => Self::Hz12_5,
            0xC => Self::Hz10,
            0xD => Self::Hz8_33,
            0xE => Self::Hz6_25,
            0xF => Self::Hz4_17,
            _ => return None,
        })
    }

    /// Output data rate in Hz.
    pub const fn hz(self) -> f32 {
        match self {
            Self::Hz470 => 470.0,
            Self::Hz242 => 242.0,
            Self::Hz123 => 123.0,
            Self::Hz62 => 62.0,
            Self::Hz50 => 50.0,
            Self::Hz39 => 39.0,
            Self::Hz33_2 => 33.2,
            Self::Hz19_6 => 19.6,
            Self::Hz16_7Rej60 | Self::Hz16_7 => 16.7,
            Self::Hz12_5 => 12.5,
            Self::Hz10 => 10.0,
            Self::Hz8_33 => 8.33,
            Self::Hz6_25 => 6.25,
            Self::Hz4_17 => 4.17,
        }
    }

    /// Settling time of a single conversion (2 / f_ADC), rounded up to whole milliseconds.
    pub const fn settle_ms(self) -> u32 {
        match self {
            Self::Hz470 => 4,
            Self::Hz242 => 8,
            Self::Hz123 => 16,
            Self::Hz62 => 32,
            Self::Hz50 => 40,
            Self::Hz39 => 48,
            Self::Hz33_2 => 60,
            Self::Hz19_6 => 101,
            Self::Hz16_7Rej60 | Self::Hz16_7 => 120,
            Self::Hz12_5 => 160,
            Self::Hz10 => 200,
            Self::Hz8_33 => 240,
            Self::Hz6_25 => 320,
            Self::Hz4_17 => 480,
        }
    }
}

impl From<UpdateRate> for u8 {
    fn from(rate: UpdateRate) -> Self {
        rate.code()
    }
}
