//! Common error definitions.
//!
//! None of the runtime operations on an initialized comparator can fail; errors only come
//! from validating a custom [CompConfig](crate::comp::CompConfig), or from using a
//! [SharedComp](crate::shared::SharedComp) before it's initialized.

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// Collection of all errors that can occur.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The transition mode duration (`TMODTIME`) must be less than the steady-state
    /// time (`SSTIME`).
    TimingOrder { transition: u16, steady_state: u16 },
    /// A configuration value doesn't fit in its register field.
    FieldOverflow { field: &'static str },
    /// A shared comparator was used before `SharedComp::init`.
    Uninitialized,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TimingOrder {
                transition,
                steady_state,
            } => write!(
                f,
                "transition mode time {} is not less than steady-state time {}",
                transition, steady_state
            ),
            Self::FieldOverflow { field } => write!(f, "value too large for {}", field),
            Self::Uninitialized => f.write_str("comparator not initialized"),
        }
    }
}

impl core::error::Error for Error {}
