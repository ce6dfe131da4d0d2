//! Access to a comparator from more than one context, eg a timer interrupt running the
//! control loop and the main loop handling start/stop.
//!
//! Example:
//! ```ignore
//! static COMP: SharedComp<Mmio> = SharedComp::new();
//!
//! // At startup
//! let regs = unsafe { Mmio::new(DSPIC33CK_DAC_BASE) };
//! let mut comp = Comp::new(regs, Channel::One);
//! comp.enable_output_buffer();
//! COMP.init(comp);
//!
//! // In the control ISR
//! COMP.set_reference(threshold).ok();
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::{
    comp::Comp,
    error::{Error, Result},
    regs::RegisterBlock,
};

/// A comparator behind a critical-section mutex. Every call runs with interrupts masked, so
/// operations from different contexts can't interleave their register writes. Only the runtime
/// operations are reachable through it; connecting the output pin stays with whoever holds the
/// [Comp] before `init`, or after `take`.
pub struct SharedComp<R: RegisterBlock> {
    inner: Mutex<RefCell<Option<Comp<R>>>>,
}

impl<R: RegisterBlock> SharedComp<R> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store an initialized comparator. Returns the one it replaces, if any.
    pub fn init(&self, comp: Comp<R>) -> Option<Comp<R>> {
        critical_section::with(|cs| self.inner.borrow(cs).replace(Some(comp)))
    }

    /// Run `f` on the comparator inside a critical section. Returns `None` if `init`
    /// hasn't been called.
    pub(crate) fn with<T, F: FnOnce(&mut Comp<R>) -> T>(&self, f: F) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// See [Comp::set_reference].
    pub fn set_reference(&self, value: i16) -> Result<()> {
        self.with(|comp| comp.set_reference(value))
            .ok_or(Error::Uninitialized)
    }

    /// See [Comp::set_channel_enabled].
    pub fn set_channel_enabled(&self, enable: bool) -> Result<()> {
        self.with(|comp| comp.set_channel_enabled(enable))
            .ok_or(Error::Uninitialized)
    }

    /// Take the comparator back out, leaving this uninitialized.
    pub fn take(&self) -> Option<Comp<R>> {
        critical_section::with(|cs| self.inner.borrow(cs).take())
    }
}

impl<R: RegisterBlock> Default for SharedComp<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::{Channel, Reg, sim::SimRegisters};

    #[test]
    fn uninitialized() {
        let shared: SharedComp<SimRegisters> = SharedComp::new();
        assert_eq!(shared.set_reference(0), Err(Error::Uninitialized));
        assert_eq!(shared.set_channel_enabled(true), Err(Error::Uninitialized));
        assert!(shared.take().is_none());
    }

    #[test]
    fn forwards_to_comparator() {
        let shared = SharedComp::new();
        shared.init(Comp::new(SimRegisters::new(), Channel::One));

        shared.set_reference(i16::MAX).unwrap();
        shared.set_channel_enabled(true).unwrap();
        assert_eq!(shared.with(|comp| comp.is_enabled()), Some(true));

        let regs = shared.take().unwrap().free();
        assert_eq!(regs.peek(Reg::DacDatH(Channel::One)), 4095);
    }

    #[test]
    fn init_hands_back_previous() {
        let shared = SharedComp::new();
        assert!(shared.init(Comp::new(SimRegisters::new(), Channel::One)).is_none());

        let previous = shared
            .init(Comp::new(SimRegisters::new(), Channel::Two))
            .unwrap();
        assert_eq!(previous.channel(), Channel::One);
        assert_eq!(shared.with(|comp| comp.channel()), Some(Channel::Two));
    }
}
