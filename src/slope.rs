//! Slope compensation / waveform generator attached to each DAC channel.
//!
//! In slope, hysteretic and triangle modes the DAC output moves between the low limit
//! (`DACxDATL`) and the high limit (`DACxDATH`) on its own. The driver leaves the generator
//! disabled by default, so `DACxDATH` is used directly as the comparator threshold.

use crate::regs::{Field, slpconh, slpconl};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Ramp direction. Sets `PSE`.
pub enum SlopeDirection {
    /// Decreasing
    #[default]
    Negative = 0,
    /// Increasing
    Positive = 1,
}

/// Waveform generator mode. Hysteretic mode requires the slope function to be off, and
/// triangle mode requires it on; this enum only allows the valid combinations of `SLOPEN`,
/// `HME` and `TWME`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlopeMode {
    /// Generator off. The DAC outputs the high limit.
    #[default]
    Disabled,
    /// The selected hysteretic input switches between the low and high limits.
    Hysteretic,
    /// Ramp from one limit at the rate set by `ramp_rate`.
    Slope(SlopeDirection),
    /// Ramp back and forth between the limits.
    Triangle(SlopeDirection),
}

impl SlopeMode {
    /// Value for `SLPxCONH`.
    pub const fn bits(self) -> u16 {
        match self {
            Self::Disabled => 0,
            Self::Hysteretic => slpconh::HME.mask(),
            Self::Slope(dir) => slpconh::SLOPEN.mask() | slpconh::PSE.insert(0, dir as u16),
            Self::Triangle(dir) => {
                slpconh::SLOPEN.mask() | slpconh::TWME.mask() | slpconh::PSE.insert(0, dir as u16)
            }
        }
    }
}

/// Initial configuration data for the waveform generator. The default is fully disabled, with
/// every select and the ramp rate at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlopeConfig {
    pub mode: SlopeMode,
    /// `HCFSEL`: input that switches between the high and low limits in hysteretic mode.
    pub hysteretic_input: u8,
    /// `SLPSTOPA`: first slope stop signal. ORed with `stop_b`.
    pub stop_a: u8,
    /// `SLPSTOPB`: second slope stop signal. ORed with `stop_a`.
    pub stop_b: u8,
    /// `SLPSTRT`: slope start signal.
    pub start: u8,
    /// `SLPDAT`: ramp rate.
    pub ramp_rate: u16,
}

impl SlopeConfig {
    /// Value for `SLPxCONL`.
    pub const fn conl_bits(&self) -> u16 {
        let mut v = slpconl::HCFSEL.insert(0, self.hysteretic_input as u16);
        v = slpconl::SLPSTOPA.insert(v, self.stop_a as u16);
        v = slpconl::SLPSTOPB.insert(v, self.stop_b as u16);
        slpconl::SLPSTRT.insert(v, self.start as u16)
    }

    /// Value for `SLPxCONH`.
    pub const fn conh_bits(&self) -> u16 {
        self.mode.bits()
    }

    /// The first signal select that doesn't fit in its 4-bit field, if any.
    pub(crate) fn overflowing_select(&self) -> Option<&'static str> {
        let selects: [(&'static str, u8, Field); 4] = [
            ("HCFSEL", self.hysteretic_input, slpconl::HCFSEL),
            ("SLPSTOPA", self.stop_a, slpconl::SLPSTOPA),
            ("SLPSTOPB", self.stop_b, slpconl::SLPSTOPB),
            ("SLPSTRT", self.start, slpconl::SLPSTRT),
        ];

        selects
            .iter()
            .find(|(_, val, field)| *val as u16 > field.max())
            .map(|(name, _, _)| *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zeroed() {
        let cfg = SlopeConfig::default();
        assert_eq!(cfg.conl_bits(), 0);
        assert_eq!(cfg.conh_bits(), 0);
        assert_eq!(cfg.ramp_rate, 0);
    }

    #[test]
    fn mode_flags() {
        assert_eq!(SlopeMode::Hysteretic.bits(), 1 << 11);
        assert_eq!(SlopeMode::Slope(SlopeDirection::Negative).bits(), 1 << 15);
        assert_eq!(
            SlopeMode::Slope(SlopeDirection::Positive).bits(),
            (1 << 15) | (1 << 9)
        );
        assert_eq!(
            SlopeMode::Triangle(SlopeDirection::Positive).bits(),
            (1 << 15) | (1 << 10) | (1 << 9)
        );
    }

    #[test]
    fn direction_is_pse_bit() {
        assert_eq!(SlopeDirection::Negative as u8, 0);
        assert_eq!(SlopeDirection::Positive as u8, 1);
        assert_eq!(core::mem::size_of::<SlopeDirection>(), 1);
    }

    #[test]
    fn hysteretic_never_has_slope_enabled() {
        let bits = SlopeMode::Hysteretic.bits();
        assert_eq!(bits & slpconh::SLOPEN.mask(), 0);
        assert_eq!(bits & slpconh::TWME.mask(), 0);
    }

    #[test]
    fn selects_pack_into_conl() {
        let cfg = SlopeConfig {
            hysteretic_input: 0x1,
            stop_a: 0x2,
            stop_b: 0x3,
            start: 0x4,
            ..Default::default()
        };
        assert_eq!(cfg.conl_bits(), 0x1234);
        assert_eq!(cfg.overflowing_select(), None);

        let cfg = SlopeConfig {
            stop_b: 0x10,
            ..Default::default()
        };
        assert_eq!(cfg.overflowing_select(), Some("SLPSTOPB"));
    }
}
