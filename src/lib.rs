//! Driver for the high-speed analog comparator and reference DAC on dsPIC33CK devices, as used
//! for current and voltage threshold detection in motor control.
//!
//! ```ignore
//! use dspic_cmp::{comp::Comp, regs::{Channel, Mmio, DSPIC33CK_DAC_BASE}};
//!
//! let regs = unsafe { Mmio::new(DSPIC33CK_DAC_BASE) };
//! let mut comp = Comp::new(regs, Channel::One);
//!
//! comp.set_reference(0x2000); // +0.25 of full scale
//! comp.set_channel_enabled(true);
//! ```
//!
//! Registers are accessed through the [regs::RegisterBlock] trait. Enable the `sim` feature for
//! an in-memory implementation that records writes, to test control code off-target.

#![cfg_attr(not(test), no_std)]

pub mod comp;
pub mod error;
pub mod regs;
pub mod shared;
pub mod slope;

pub use comp::{Comp, CompConfig, reference_code};
pub use error::{Error, Result};
pub use regs::{Channel, RegisterBlock};
pub use shared::SharedComp;
