//! Transfer functions from 24-bit output codes to volts.

use crate::channel::ChannelConfig;

/// Unipolar full scale, 2^24.
pub const FULL_SCALE_UNIPOLAR: u32 = 1 << 24;
/// Bipolar mid scale (0 V), 2^23.
pub const FULL_SCALE_BIPOLAR: u32 = 1 << 23;

/// Unipolar coding: 0 is 0 V, full scale approaches +vref/gain.
pub fn unipolar_volts(raw: u32, reference_voltage: f32, gain: u8) -> f32 {
    (raw as f32 * reference_voltage) / (FULL_SCALE_UNIPOLAR as f32 * f32::from(gain))
}

/// Offset-binary coding: 0 is -vref/gain, 2^23 is 0 V, full scale approaches +vref/gain.
pub fn bipolar_volts(raw: u32, reference_voltage: f32, gain: u8) -> f32 {
    (raw as f32 / FULL_SCALE_BIPOLAR as f32 - 1.0) * reference_voltage / f32::from(gain)
}

/// Converts a code read from a channel with the given settings.
pub fn to_volts(raw: u32, settings: &ChannelConfig, reference_voltage: f32) -> f32 {
    let gain = settings.effective_gain();

    if settings.is_unipolar() {
        unipolar_volts(raw, reference_voltage, gain)
    } else {
        bipolar_volts(raw, reference_voltage, gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unipolar_full_scale_is_reference() {
        assert_eq!(unipolar_volts(FULL_SCALE_UNIPOLAR, 2.50, 1), 2.50);
        assert_eq!(unipolar_volts(0, 2.50, 1), 0.0);
        assert_eq!(unipolar_volts(FULL_SCALE_UNIPOLAR / 2, 2.50, 1), 1.25);
        assert_eq!(unipolar_volts(FULL_SCALE_UNIPOLAR, 2.50, 128), 2.50 / 128.0);
    }

    #[test]
    fn bipolar_mid_scale_is_zero() {
        for (vref, gain) in [(2.50, 1), (2.44, 8), (1.17, 128)] {
            assert_eq!(bipolar_volts(FULL_SCALE_BIPOLAR, vref, gain), 0.0);
        }
    }

    #[test]
    fn bipolar_extremes() {
        assert_eq!(bipolar_volts(0, 2.50, 1), -2.50);
        assert_eq!(bipolar_volts(0, 2.50, 4), -0.625);

        let top = bipolar_volts(FULL_SCALE_UNIPOLAR - 1, 2.50, 1);
        assert!(top < 2.50);
        assert!((top - 2.50).abs() < 1e-5, "{top}");
    }

    #[test]
    fn settings_select_polarity_and_gain() {
        let unipolar = ChannelConfig::new(2, true, true);
        assert_eq!(to_volts(FULL_SCALE_UNIPOLAR, &unipolar, 2.50), 1.25);

        let bipolar = ChannelConfig::new(1, true, false);
        assert_eq!(to_volts(0, &bipolar, 2.44), -2.44);

        // An unencodable gain runs the device at unity, so the reading is scaled by 1.
        let odd = ChannelConfig::new(3, true, true);
        assert_eq!(to_volts(FULL_SCALE_UNIPOLAR, &odd, 2.50), 2.50);
    }
}
