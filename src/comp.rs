//! High-speed analog comparator with its reference DAC.
//!
//! The DAC supplies the comparator's inverting input; its high data register (`DACxDATH`) is the
//! live threshold. [Comp::new] programs the shared control registers and one channel to a known,
//! disabled state. After that, the control loop calls [Comp::set_reference] to move the
//! threshold and [Comp::set_channel_enabled] during start/stop sequencing.
//!
//! Not reentrant: all calls for a block must come from one context, or go through
//! [SharedComp](crate::shared::SharedComp).

use cfg_if::cfg_if;

use crate::{
    error::{Error, Result},
    regs::{
        Channel, Reg, RegisterBlock, dacconh, dacconl, dacctrl1l, dacctrl2h, dacctrl2l, dacdat,
        slpdat,
    },
    slope::SlopeConfig,
};

/// Full-scale gain applied to the signed reference.
const REF_GAIN: i32 = 2_047;
/// DAC code for a reference of 0; mid-scale of the 12-bit DAC.
const REF_OFFSET: i32 = 2_048;

// Config enums
/// DAC clock source. Sets `CLKSEL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClockSource {
    /// AFVCO / APLLDIV.VCODIV
    Afvco = 0b00,
    /// FVCO / PLLDIV.VCODIV
    Fvco = 0b01,
    Afpll = 0b10,
    Fpll = 0b11,
}

/// DAC clock divider. Sets `CLKDIV`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClockDiv {
    Div1 = 0b00,
    Div2 = 0b01,
    Div3 = 0b10,
    Div4 = 0b11,
}

/// Comparator filter clock divider. Sets `FCLKDIV`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FilterClockDiv {
    Div1 = 0b000,
    Div2 = 0b001,
    Div3 = 0b010,
    Div4 = 0b011,
    Div5 = 0b100,
    Div6 = 0b101,
    Div7 = 0b110,
    Div8 = 0b111,
}

/// Which comparator output edges generate an interrupt. Sets `IRQM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InterruptMode {
    Disabled = 0b00,
    RisingEdge = 0b01,
    FallingEdge = 0b10,
    EitherEdge = 0b11,
}

/// Comparator output polarity. Sets `CMPPOL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputPolarity {
    NotInverted = 0b0,
    Inverted = 0b1,
}

/// Comparator non-inverting input. Sets `INSEL`. Which pin each input maps to depends on the
/// channel; see the device datasheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InputSource {
    CmpA = 0b000,
    CmpB = 0b001,
    CmpC = 0b010,
    CmpD = 0b011,
    Spga1 = 0b100,
    Spga2 = 0b101,
    Spga3 = 0b110,
}

/// Output edge the hysteresis applies to. Sets `HYSPOL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HysteresisPolarity {
    RisingEdge = 0b0,
    FallingEdge = 0b1,
}

/// Comparator hysteresis. Sets `HYSSEL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Hysteresis {
    None = 0b00,
    FifteenMilliVolt = 0b01,
    ThirtyMilliVolt = 0b10,
    FortyFiveMilliVolt = 0b11,
}

// Structs
/// Configuration for the control registers shared by all channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacCtrlConfig {
    pub clock_source: ClockSource,
    pub clock_div: ClockDiv,
    pub filter_clock_div: FilterClockDiv,
    /// Stop the block when the device enters Idle mode. (`DACSIDL`)
    pub stop_in_idle: bool,
    /// Transition mode duration, in DAC clocks. (`TMODTIME`) Must be less than `steady_state_time`
    /// when either is non-zero.
    pub transition_time: u16,
    /// Time from the start of transition mode until the steady-state filter is enabled.
    /// (`SSTIME`)
    pub steady_state_time: u16,
}

impl Default for DacCtrlConfig {
    fn default() -> Self {
        Self {
            clock_source: ClockSource::Fpll,
            clock_div: ClockDiv::Div2,
            filter_clock_div: FilterClockDiv::Div8,
            stop_in_idle: false,
            transition_time: 0,
            steady_state_time: 0,
        }
    }
}

impl DacCtrlConfig {
    /// `DACCTRL1L`, with the module disabled.
    fn ctrl1l_bits(&self) -> u16 {
        let mut v = dacctrl1l::DACSIDL.insert(0, self.stop_in_idle as u16);
        v = dacctrl1l::CLKSEL.insert(v, self.clock_source as u16);
        v = dacctrl1l::CLKDIV.insert(v, self.clock_div as u16);
        dacctrl1l::FCLKDIV.insert(v, self.filter_clock_div as u16)
    }
}

/// Configuration for a single comparator channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub interrupt_mode: InterruptMode,
    /// Allow the comparator output to be blanked. (`CBE`)
    pub blanking: bool,
    /// Comparator digital filter. (`FLTREN`)
    pub digital_filter: bool,
    pub polarity: OutputPolarity,
    pub input: InputSource,
    pub hysteresis_polarity: HysteresisPolarity,
    pub hysteresis: Hysteresis,
    /// Leading-edge blanking period following a DAC change of state. (`TMCB`)
    pub leading_edge_blanking: u16,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            interrupt_mode: InterruptMode::Disabled,
            blanking: false,
            digital_filter: true,
            polarity: OutputPolarity::NotInverted,
            input: InputSource::CmpC,
            hysteresis_polarity: HysteresisPolarity::RisingEdge,
            hysteresis: Hysteresis::FortyFiveMilliVolt,
            leading_edge_blanking: 0,
        }
    }
}

impl ChannelConfig {
    /// `DACxCONL`, with the channel and its output buffer disabled.
    fn conl_bits(&self) -> u16 {
        let mut v = dacconl::IRQM.insert(0, self.interrupt_mode as u16);
        v = dacconl::CBE.insert(v, self.blanking as u16);
        v = dacconl::FLTREN.insert(v, self.digital_filter as u16);
        v = dacconl::CMPPOL.insert(v, self.polarity as u16);
        v = dacconl::INSEL.insert(v, self.input as u16);
        v = dacconl::HYSPOL.insert(v, self.hysteresis_polarity as u16);
        dacconl::HYSSEL.insert(v, self.hysteresis as u16)
    }
}

/// Initial configuration data for the comparator peripheral. The default is the motor-control
/// setup: FPLL / 2 DAC clock, filter clock / 8, digital filter on, input C, 45 mV hysteresis on the
/// rising edge, no blanking, waveform generator off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompConfig {
    pub dac: DacCtrlConfig,
    pub channel: ChannelConfig,
    pub slope: SlopeConfig,
}

impl CompConfig {
    /// Check that every value fits its register field, and that the transition mode window ends
    /// before the steady-state time. A window of 0 / 0 means transition mode isn't used.
    pub fn validate(&self) -> Result<()> {
        let timings = [
            ("TMODTIME", self.dac.transition_time, dacctrl2l::TMODTIME.max()),
            ("SSTIME", self.dac.steady_state_time, dacctrl2h::SSTIME.max()),
            ("TMCB", self.channel.leading_edge_blanking, dacconh::TMCB.max()),
        ];

        for (field, val, max) in timings {
            if val > max {
                return Err(Error::FieldOverflow { field });
            }
        }

        let (transition, steady_state) = (self.dac.transition_time, self.dac.steady_state_time);
        if (transition != 0 || steady_state != 0) && transition >= steady_state {
            return Err(Error::TimingOrder {
                transition,
                steady_state,
            });
        }

        if let Some(field) = self.slope.overflowing_select() {
            return Err(Error::FieldOverflow { field });
        }

        Ok(())
    }
}

/// Convert a signed reference, a fraction of full scale in Q15, to a DAC code centered at
/// mid-scale: `round(value * 2047 / 2^15) + 2048`, rounding halves away from zero so the mapping
/// is symmetric about mid-scale. 0 maps to 2048, `i16::MAX` to 4095 and
/// `i16::MIN` to 1. The input isn't range-checked; every `i16` maps inside the 12-bit DAC range.
pub const fn reference_code(value: i16) -> u16 {
    let product = value as i32 * REF_GAIN;
    let magnitude = (product.abs() + (1 << 14)) >> 15;
    let scaled = if product < 0 { -magnitude } else { magnitude };
    (scaled + REF_OFFSET) as u16
}

/// Represents one channel of the analog comparator / DAC block.
pub struct Comp<R: RegisterBlock> {
    regs: R,
    channel: Channel,
}

impl<R: RegisterBlock> Comp<R> {
    /// Initialize the shared control registers and `channel` with the default configuration,
    /// leaving the module, the channel and its output buffer disabled. Call once at startup,
    /// before any other operation on the block.
    pub fn new(regs: R, channel: Channel) -> Self {
        let mut result = Self { regs, channel };
        result.init_block(&CompConfig::default());
        result
    }

    /// Like [Comp::new], with a custom configuration. Nothing is written if `cfg` doesn't
    /// validate.
    pub fn new_with_config(regs: R, channel: Channel, cfg: CompConfig) -> Result<Self> {
        cfg.validate()?;

        let mut result = Self { regs, channel };
        result.init_block(&cfg);
        Ok(result)
    }

    /// Program every register the channel uses. The shared clock configuration must be valid
    /// before the channel's filter and timing settings, so the shared registers go first.
    fn init_block(&mut self, cfg: &CompConfig) {
        let ch = self.channel;

        self.regs.write(Reg::DacCtrl1L, cfg.dac.ctrl1l_bits());
        self.regs.write(
            Reg::DacCtrl2L,
            dacctrl2l::TMODTIME.insert(0, cfg.dac.transition_time),
        );
        self.regs.write(
            Reg::DacCtrl2H,
            dacctrl2h::SSTIME.insert(0, cfg.dac.steady_state_time),
        );

        self.regs.write(Reg::DacConL(ch), cfg.channel.conl_bits());
        self.regs.write(
            Reg::DacConH(ch),
            dacconh::TMCB.insert(0, cfg.channel.leading_edge_blanking),
        );
        self.regs.write(Reg::DacDatL(ch), 0);
        self.regs.write(Reg::DacDatH(ch), 0);

        self.regs.write(Reg::SlpConL(ch), cfg.slope.conl_bits());
        self.regs.write(Reg::SlpConH(ch), cfg.slope.conh_bits());
        self.regs.write(
            Reg::SlpDat(ch),
            slpdat::SLPDAT.insert(0, cfg.slope.ramp_rate),
        );

        cfg_if! {
            if #[cfg(feature = "defmt")] {
                defmt::debug!("Comparator {} initialized: {}", ch, cfg);
            }
        }
    }

    /// Set the comparator threshold. `value` is a signed fraction of full scale (Q15); see
    /// [reference_code]. Writes `DACxDATH` only.
    pub fn set_reference(&mut self, value: i16) {
        self.regs
            .write(Reg::DacDatH(self.channel), reference_code(value));
    }

    /// Enable or disable the channel along with the shared module.
    ///
    /// Enabling sets the channel enable, then the common enable; it doesn't connect the DAC to the
    /// `DACOUT` pin. Disabling first disconnects the output buffer, then clears the channel
    /// enable, then the common enable, so the pin never sees the DAC while it's switching.
    pub fn set_channel_enabled(&mut self, enable: bool) {
        let conl = Reg::DacConL(self.channel);

        if enable {
            self.regs.set_bit(conl, dacconl::DACEN);
            self.regs.set_bit(Reg::DacCtrl1L, dacctrl1l::DACON);
        } else {
            self.regs.clear_bit(conl, dacconl::DACOEN);
            self.regs.clear_bit(conl, dacconl::DACEN);
            self.regs.clear_bit(Reg::DacCtrl1L, dacctrl1l::DACON);
        }

        cfg_if! {
            if #[cfg(feature = "defmt")] {
                defmt::debug!("Comparator {} enabled: {}", self.channel, enable);
            }
        }
    }

    /// Connect the DAC output to the `DACOUT` pin.
    ///
    /// All channels share the pin: make sure every other channel has its output buffer off
    /// before calling this. [Comp::set_channel_enabled] disconnects it again when disabling.
    pub fn enable_output_buffer(&mut self) {
        self.regs
            .set_bit(Reg::DacConL(self.channel), dacconl::DACOEN);
    }

    /// Gets the output level of the comparator, after the polarity setting.
    pub fn output_level(&self) -> bool {
        self.regs
            .is_set(Reg::DacConL(self.channel), dacconl::CMPSTAT)
    }

    /// True if both the channel and the shared module are enabled.
    pub fn is_enabled(&self) -> bool {
        self.regs.is_set(Reg::DacConL(self.channel), dacconl::DACEN)
            && self.regs.is_set(Reg::DacCtrl1L, dacctrl1l::DACON)
    }

    /// Read back the current threshold code from `DACxDATH`.
    pub fn reference(&self) -> u16 {
        self.regs
            .field(Reg::DacDatH(self.channel), dacdat::DACDAT)
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Release the register block.
    pub fn free(self) -> R {
        self.regs
    }
}
