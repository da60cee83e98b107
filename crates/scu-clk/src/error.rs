//! Error types.
//!
//! Two layers:
//!
//! - [`TopologyError`]: build-time failures (duplicate names, unresolved
//!   parents, capacity). These abort topology construction.
//! - [`ClockError`]: runtime failures of a consumer operation. Generic over
//!   the register backend's error type so a bus failure reaches the caller
//!   verbatim, without retry.

use core::fmt;

/// Invalid [`ScuConfig`](crate::ScuConfig) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Crystal reference rate is zero.
    ZeroCrystal,
    /// Reset-assert settle delay is below the documented 100 µs minimum.
    ResetSettleTooShort,
    /// Clock-start settle delay is below the documented 10 ms minimum.
    ClockSettleTooShort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCrystal => write!(f, "crystal reference rate must be non-zero"),
            Self::ResetSettleTooShort => {
                write!(f, "reset settle delay is below the 100 us hardware minimum")
            }
            Self::ClockSettleTooShort => {
                write!(f, "clock-start settle delay is below the 10 ms hardware minimum")
            }
        }
    }
}

/// Build-time topology error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopologyError {
    /// A node with this name is already registered.
    DuplicateName(&'static str),
    /// `finalize()` found a node whose parent was never registered.
    ParentUnresolved {
        /// Node declaring the parent.
        clock: &'static str,
        /// Parent name that never appeared.
        parent: &'static str,
    },
    /// Linking a late parent would close a cycle.
    Cycle {
        /// Node whose pending parent was being linked.
        clock: &'static str,
        /// Parent that already depends on `clock`.
        parent: &'static str,
    },
    /// No clock with the requested name.
    UnknownClock,
    /// No clock with the requested id.
    UnknownId(u16),
    /// Node table is full.
    CapacityExceeded,
    /// A mux declared more parents than a node can hold.
    TooManyParents(&'static str),
    /// `register()` after `finalize()`.
    Finalized,
    /// A controller was handed a registry that was never finalized.
    NotFinalized,
    /// A gate descriptor carries an out-of-range clock or reset index.
    InvalidGate {
        /// Gate name.
        clock: &'static str,
        /// Offending index.
        index: u8,
    },
    /// Configuration rejected by [`ScuConfig::validate`](crate::ScuConfig::validate).
    Config(ConfigError),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "clock '{name}' registered twice"),
            Self::ParentUnresolved { clock, parent } => {
                write!(f, "clock '{clock}' names parent '{parent}' which was never registered")
            }
            Self::Cycle { clock, parent } => {
                write!(f, "linking '{clock}' to parent '{parent}' would create a cycle")
            }
            Self::UnknownClock => write!(f, "no clock with that name"),
            Self::UnknownId(id) => write!(f, "no clock with id {id}"),
            Self::CapacityExceeded => write!(f, "clock table is full"),
            Self::TooManyParents(name) => write!(f, "mux '{name}' has too many parents"),
            Self::Finalized => write!(f, "topology already finalized"),
            Self::NotFinalized => write!(f, "topology not finalized"),
            Self::InvalidGate { clock, index } => {
                write!(f, "gate '{clock}' has out-of-range index {index}")
            }
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl From<ConfigError> for TopologyError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Runtime clock/reset operation error.
///
/// `E` is the [`RegisterMap`](crate::RegisterMap) backend's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError<E> {
    /// Topology lookup or construction failure.
    Topology(TopologyError),
    /// Register access failed; the backend's error is passed through as-is.
    Register(E),
    /// The node (or an ancestor) still has an unlinked parent.
    NotReady(&'static str),
    /// Refused to disable a clock flagged critical.
    Critical(&'static str),
    /// The node has no gate to disable.
    NotGateable(&'static str),
    /// A divider or mux field holds an encoding its table does not define.
    InvalidEncoding {
        /// Node whose field was decoded.
        clock: &'static str,
        /// Raw field value.
        encoding: u32,
    },
    /// A fixed-factor node resolved to a zero divisor.
    ZeroDivisor(&'static str),
    /// Enabling a selection-mode gate is not implemented; no register was written.
    SelectionEnableUnimplemented(&'static str),
    /// Selection-mode gate index matches no known clock-selection bit.
    UnsupportedSelectionMode {
        /// Gate name.
        clock: &'static str,
        /// Selection index.
        index: u8,
    },
    /// Reset line id outside 0–63.
    InvalidResetLine(u8),
}

impl<E> From<TopologyError> for ClockError<E> {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl<E: fmt::Debug> fmt::Display for ClockError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topology(e) => write!(f, "{e}"),
            Self::Register(e) => write!(f, "register access failed: {e:?}"),
            Self::NotReady(name) => write!(f, "clock '{name}' is not ready (unlinked parent)"),
            Self::Critical(name) => write!(f, "clock '{name}' is critical and cannot be disabled"),
            Self::NotGateable(name) => write!(f, "clock '{name}' has no gate"),
            Self::InvalidEncoding { clock, encoding } => {
                write!(f, "clock '{clock}' field encoding {encoding:#x} is not in its table")
            }
            Self::ZeroDivisor(name) => write!(f, "clock '{name}' has a zero divisor"),
            Self::SelectionEnableUnimplemented(name) => {
                write!(f, "enable of selection-mode gate '{name}' is not implemented")
            }
            Self::UnsupportedSelectionMode { clock, index } => {
                write!(f, "gate '{clock}' selection index {index} is not supported")
            }
            Self::InvalidResetLine(id) => write!(f, "reset line {id} is out of range (0-63)"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for TopologyError {}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for ClockError<E> {}
