//! Register map for the high-speed comparator / DAC block.
//!
//! The driver never touches memory directly; it goes through [RegisterBlock], so the same
//! code can run against the real peripheral ([Mmio]) or an in-memory register file
//! ([sim::SimRegisters]).
//!
//! See the dsPIC33CK256MP508 datasheet, section "High-Speed Analog Comparator with Slope
//! Compensation DAC".

use core::ptr;

use paste::paste;

/// Base address of the DAC/comparator register block on the dsPIC33CK256MP508.
pub const DSPIC33CK_DAC_BASE: usize = 0x0F80;

/// Distance between the register groups of consecutive channels, in bytes.
const CHANNEL_STRIDE: usize = 0x10;

/// Offset of the first channel's `DACxCONL`, in bytes.
const CHANNEL_BASE: usize = 0x0C;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Select the comparator channel. All channels share `DACCTRL1L`, `DACCTRL2L` and `DACCTRL2H`.
pub enum Channel {
    /// Channel 1. (DAC1, CMP1)
    One,
    /// Channel 2. (DAC2, CMP2)
    Two,
    /// Channel 3. (DAC3, CMP3)
    Three,
}

impl Channel {
    /// Zero-based index of the channel's register group.
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A 16-bit register in the block.
pub enum Reg {
    /// Common control: module enable, clocking, filter clock.
    DacCtrl1L,
    /// Transition mode duration.
    DacCtrl2L,
    /// Steady-state time.
    DacCtrl2H,
    /// Channel control: enable, interrupts, output buffer, filter, input, hysteresis.
    DacConL(Channel),
    /// Leading-edge blanking.
    DacConH(Channel),
    /// Low data value / limit.
    DacDatL(Channel),
    /// High data value / limit. This is the live comparator threshold.
    DacDatH(Channel),
    /// Slope generator signal selects.
    SlpConL(Channel),
    /// Slope generator mode flags.
    SlpConH(Channel),
    /// Slope ramp rate.
    SlpDat(Channel),
}

impl Reg {
    /// Byte offset from the start of the block.
    pub const fn offset(self) -> usize {
        match self {
            Self::DacCtrl1L => 0x00,
            Self::DacCtrl2L => 0x04,
            Self::DacCtrl2H => 0x06,
            Self::DacConL(ch) => channel_offset(ch),
            Self::DacConH(ch) => channel_offset(ch) + 0x02,
            Self::DacDatL(ch) => channel_offset(ch) + 0x04,
            Self::DacDatH(ch) => channel_offset(ch) + 0x06,
            Self::SlpConL(ch) => channel_offset(ch) + 0x08,
            Self::SlpConH(ch) => channel_offset(ch) + 0x0A,
            Self::SlpDat(ch) => channel_offset(ch) + 0x0C,
        }
    }

    /// Number of 16-bit words spanned by the block, up to the last channel's `SLPxDAT`.
    pub const BLOCK_WORDS: usize = (Self::SlpDat(Channel::Three).offset() / 2) + 1;
}

const fn channel_offset(ch: Channel) -> usize {
    CHANNEL_BASE + CHANNEL_STRIDE * ch.index()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A contiguous bit field within a 16-bit register.
pub struct Field {
    pub shift: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    /// Mask of the field's bits, in register position.
    pub const fn mask(self) -> u16 {
        (((1u32 << self.width) - 1) << self.shift) as u16
    }

    /// Largest value the field can hold.
    pub const fn max(self) -> u16 {
        ((1u32 << self.width) - 1) as u16
    }

    /// Replace this field in `reg`. Bits of `val` above the field width are dropped.
    pub const fn insert(self, reg: u16, val: u16) -> u16 {
        (reg & !self.mask()) | ((val << self.shift) & self.mask())
    }

    /// Read this field out of `reg`.
    pub const fn extract(self, reg: u16) -> u16 {
        (reg & self.mask()) >> self.shift
    }
}

// Generates one module per register, holding a `Field` constant per bit field.
// `NAME: shift, width;`
macro_rules! fields {
    ($($reg:ident { $($field:ident: $shift:expr, $width:expr;)+ })+) => {
        $(
            paste! {
                #[allow(missing_docs)]
                pub mod [<$reg:lower>] {
                    use super::Field;

                    $(
                        pub const $field: Field = Field::new($shift, $width);
                    )+
                }
            }
        )+
    };
}

fields! {
    DACCTRL1L {
        DACON: 15, 1;
        DACSIDL: 13, 1;
        CLKSEL: 6, 2;
        CLKDIV: 4, 2;
        FCLKDIV: 0, 3;
    }
    DACCTRL2L {
        TMODTIME: 0, 10;
    }
    DACCTRL2H {
        SSTIME: 0, 10;
    }
    DACCONL {
        DACEN: 15, 1;
        IRQM: 13, 2;
        CBE: 10, 1;
        DACOEN: 9, 1;
        FLTREN: 8, 1;
        // Read-only
        CMPSTAT: 7, 1;
        CMPPOL: 6, 1;
        INSEL: 3, 3;
        HYSPOL: 2, 1;
        HYSSEL: 0, 2;
    }
    DACCONH {
        TMCB: 0, 10;
    }
    DACDAT {
        DACDAT: 0, 12;
    }
    SLPCONL {
        HCFSEL: 12, 4;
        SLPSTOPA: 8, 4;
        SLPSTOPB: 4, 4;
        SLPSTRT: 0, 4;
    }
    SLPCONH {
        SLOPEN: 15, 1;
        HME: 11, 1;
        TWME: 10, 1;
        PSE: 9, 1;
    }
    SLPDAT {
        SLPDAT: 0, 16;
    }
}

/// Access to the block's registers. Implement `read` and `write`; the field helpers are built on
/// them. Each helper that changes a register performs exactly one `read` followed by one `write`.
pub trait RegisterBlock {
    /// Read a whole register.
    fn read(&self, reg: Reg) -> u16;

    /// Write a whole register.
    fn write(&mut self, reg: Reg, val: u16);

    /// Read-modify-write a register.
    fn modify<F: FnOnce(u16) -> u16>(&mut self, reg: Reg, f: F) {
        let val = self.read(reg);
        self.write(reg, f(val));
    }

    /// Read a single field.
    fn field(&self, reg: Reg, field: Field) -> u16 {
        field.extract(self.read(reg))
    }

    /// Write a single field, leaving the rest of the register unchanged.
    fn set_field(&mut self, reg: Reg, field: Field, val: u16) {
        self.modify(reg, |r| field.insert(r, val));
    }

    fn set_bit(&mut self, reg: Reg, field: Field) {
        self.modify(reg, |r| r | field.mask());
    }

    fn clear_bit(&mut self, reg: Reg, field: Field) {
        self.modify(reg, |r| r & !field.mask());
    }

    fn is_set(&self, reg: Reg, field: Field) -> bool {
        self.read(reg) & field.mask() != 0
    }
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &mut T {
    fn read(&self, reg: Reg) -> u16 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, val: u16) {
        (**self).write(reg, val)
    }
}

/// Memory-mapped register block. Every access is a single volatile 16-bit load or store.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Create an accessor for the block at `base`.
    ///
    /// # Safety
    /// `base` must be the address of the DAC/comparator register block (eg
    /// [DSPIC33CK_DAC_BASE]), and nothing else may write to the block while this accessor
    /// exists.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn ptr(&self, reg: Reg) -> *mut u16 {
        (self.base + reg.offset()) as *mut u16
    }
}

impl RegisterBlock for Mmio {
    fn read(&self, reg: Reg) -> u16 {
        // NOTE(read_volatile) aligned 16-bit peripheral register, guaranteed by `Mmio::new`.
        unsafe { ptr::read_volatile(self.ptr(reg)) }
    }

    fn write(&mut self, reg: Reg, val: u16) {
        // NOTE(write_volatile) aligned 16-bit peripheral register, guaranteed by `Mmio::new`.
        unsafe { ptr::write_volatile(self.ptr(reg), val) }
    }
}

#[cfg(any(test, feature = "sim"))]
pub mod sim {
    //! An in-memory register file for testing control code off-target.

    use heapless::Vec;

    use super::{Reg, RegisterBlock};

    /// Number of writes kept in the log.
    pub const LOG_CAPACITY: usize = 128;

    /// Simulated register file. All registers reset to 0. Every `write` is applied and also
    /// appended to a log, so tests can check the order of writes. Writes past
    /// [LOG_CAPACITY] are applied but not logged.
    pub struct SimRegisters {
        words: [u16; Reg::BLOCK_WORDS],
        log: Vec<(Reg, u16), LOG_CAPACITY>,
    }

    impl SimRegisters {
        pub const fn new() -> Self {
            Self {
                words: [0; Reg::BLOCK_WORDS],
                log: Vec::new(),
            }
        }

        /// Every write so far, oldest first, with the value written.
        pub fn write_log(&self) -> &[(Reg, u16)] {
            &self.log
        }

        pub fn clear_log(&mut self) {
            self.log.clear();
        }

        /// Read a register without going through the driver.
        pub fn peek(&self, reg: Reg) -> u16 {
            self.words[reg.offset() / 2]
        }

        /// Set a register from the hardware side, eg to simulate the comparator output
        /// changing. Not logged.
        pub fn poke(&mut self, reg: Reg, val: u16) {
            self.words[reg.offset() / 2] = val;
        }
    }

    impl Default for SimRegisters {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RegisterBlock for SimRegisters {
        fn read(&self, reg: Reg) -> u16 {
            self.peek(reg)
        }

        fn write(&mut self, reg: Reg, val: u16) {
            self.poke(reg, val);
            let _ = self.log.push((reg, val));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{sim::SimRegisters, *};

    #[test]
    fn channel_registers_dont_overlap() {
        let chans = [Channel::One, Channel::Two, Channel::Three];
        let mut seen = [false; Reg::BLOCK_WORDS];

        for reg in [Reg::DacCtrl1L, Reg::DacCtrl2L, Reg::DacCtrl2H] {
            seen[reg.offset() / 2] = true;
        }

        for ch in chans {
            for reg in [
                Reg::DacConL(ch),
                Reg::DacConH(ch),
                Reg::DacDatL(ch),
                Reg::DacDatH(ch),
                Reg::SlpConL(ch),
                Reg::SlpConH(ch),
                Reg::SlpDat(ch),
            ] {
                assert_eq!(reg.offset() % 2, 0);
                assert!(!seen[reg.offset() / 2], "{:?} overlaps", reg);
                seen[reg.offset() / 2] = true;
            }
        }
    }

    #[test]
    fn dac1_layout() {
        assert_eq!(Reg::DacConL(Channel::One).offset(), 0x0C);
        assert_eq!(Reg::DacDatH(Channel::One).offset(), 0x12);
        assert_eq!(Reg::SlpDat(Channel::One).offset(), 0x18);
        assert_eq!(Reg::DacConL(Channel::Two).offset(), 0x1C);
    }

    #[test]
    fn field_insert_extract() {
        let f = dacconl::INSEL;
        assert_eq!(f.mask(), 0b0011_1000);
        assert_eq!(f.max(), 7);

        let reg = f.insert(0xFFFF, 0b010);
        assert_eq!(reg, 0xFFFF & !0b0011_1000 | (0b010 << 3));
        assert_eq!(f.extract(reg), 0b010);

        // Wider than the field: truncated
        assert_eq!(dacdat::DACDAT.insert(0, 0x1FFF), 0x0FFF);
        assert_eq!(slpdat::SLPDAT.mask(), 0xFFFF);
    }

    #[test]
    fn field_helpers_read_then_write_once() {
        let mut regs = SimRegisters::new();
        let reg = Reg::DacConL(Channel::One);

        regs.set_bit(reg, dacconl::DACEN);
        regs.set_field(reg, dacconl::HYSSEL, 0b11);
        regs.clear_bit(reg, dacconl::DACEN);

        assert_eq!(
            regs.write_log(),
            &[(reg, 0x8000), (reg, 0x8003), (reg, 0x0003)]
        );
        assert!(!regs.is_set(reg, dacconl::DACEN));
        assert_eq!(regs.field(reg, dacconl::HYSSEL), 0b11);
    }

    #[test]
    fn poke_isnt_logged() {
        let mut regs = SimRegisters::new();
        regs.poke(Reg::DacCtrl1L, 0x8000);
        assert!(regs.write_log().is_empty());
        assert_eq!(regs.read(Reg::DacCtrl1L), 0x8000);
    }
}
