//! Clock node model.
//!
//! A node is one logical clock: a fixed source, a ratio of its parent, a
//! table-driven divider, a mux, or a gate. Kinds are a closed sum type and
//! every consumer dispatches with an exhaustive `match`.

use core::fmt;

use heapless::Vec;

use crate::error::TopologyError;
use crate::gate::GateSpec;
use crate::regs::Field;
use crate::tables::DividerTable;

/// Maximum inputs of a single mux node.
pub const MAX_MUX_PARENTS: usize = 8;

/// Clock frequency in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hertz(pub u32);

impl Hertz {
    /// Build from a whole number of MHz.
    pub const fn mhz(mhz: u32) -> Self {
        Self(mhz.saturating_mul(1_000_000))
    }

    /// Raw value in Hz.
    pub const fn to_hz(self) -> u32 {
        self.0
    }

    /// `self * mult / div` with a 64-bit intermediate, saturating at `u32::MAX`.
    ///
    /// Returns `None` when `div` is zero.
    #[allow(clippy::arithmetic_side_effects)] // u32 × u32 fits in u64; `div` checked non-zero
    pub fn scale(self, mult: u32, div: u32) -> Option<Self> {
        if div == 0 {
            return None;
        }
        let scaled = u64::from(self.0) * u64::from(mult) / u64::from(div);
        Some(Self(u32::try_from(scaled).unwrap_or(u32::MAX)))
    }
}

impl fmt::Display for Hertz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// Stable node identifier: the registration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockId(u16);

impl ClockId {
    pub(crate) const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Registration index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw id value.
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Node flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockFlags(u8);

impl ClockFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Never disabled: the sequencer refuses.
    pub const CRITICAL: Self = Self(1 << 0);

    /// `true` if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` if [`CRITICAL`](Self::CRITICAL) is set.
    pub const fn is_critical(self) -> bool {
        self.contains(Self::CRITICAL)
    }
}

impl core::ops::BitOr for ClockFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Reference from a node to one of its parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Link {
    /// Named parent not yet linked; the node is not ready.
    Pending(&'static str),
    /// Linked parent.
    Resolved(ClockId),
}

impl Link {
    /// Parent reference by name, resolved at registration.
    pub const fn to(name: &'static str) -> Self {
        Self::Pending(name)
    }

    /// Linked parent id, if resolved.
    pub const fn id(self) -> Option<ClockId> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Pending(_) => None,
        }
    }
}

/// What a node computes and how it is controlled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockKind {
    /// Source with a constant rate.
    FixedRate {
        /// Output rate.
        rate: Hertz,
    },
    /// `parent * mult / div`.
    FixedFactor {
        /// Input clock.
        parent: Link,
        /// Multiplier.
        mult: u32,
        /// Divisor.
        div: u32,
    },
    /// `parent / table[field]`, decoded on every query.
    DividerTable {
        /// Input clock.
        parent: Link,
        /// Divider select field.
        field: Field,
        /// Encoding → divisor table.
        table: &'static DividerTable,
    },
    /// `parents[field]`, decoded on every query.
    Mux {
        /// Inputs indexed by field encoding.
        parents: Vec<Link, MAX_MUX_PARENTS>,
        /// Input select field.
        field: Field,
    },
    /// Sequenced peripheral gate (clock-stop bit, optional reset line).
    Gate {
        /// Input clock; a gate without one reports 0 Hz.
        parent: Option<Link>,
        /// Control bits and polarity.
        spec: GateSpec,
    },
    /// Plain register bit gate: set = running, no reset coupling.
    BitGate {
        /// Input clock.
        parent: Link,
        /// Register offset.
        offset: u32,
        /// Bit position.
        bit: u8,
    },
}

impl ClockKind {
    /// Fixed-rate source.
    pub const fn fixed(rate: Hertz) -> Self {
        Self::FixedRate { rate }
    }

    /// Fixed ratio of `parent`.
    pub const fn factor(parent: &'static str, mult: u32, div: u32) -> Self {
        Self::FixedFactor {
            parent: Link::to(parent),
            mult,
            div,
        }
    }

    /// Table-driven divider of `parent`.
    pub const fn divider(parent: &'static str, field: Field, table: &'static DividerTable) -> Self {
        Self::DividerTable {
            parent: Link::to(parent),
            field,
            table,
        }
    }

    /// Mux over `parents`, selected by `field`.
    pub fn mux(name: &'static str, parents: &[&'static str], field: Field) -> Result<Self, TopologyError> {
        let mut links = Vec::new();
        for parent in parents {
            links
                .push(Link::to(*parent))
                .map_err(|_| TopologyError::TooManyParents(name))?;
        }
        Ok(Self::Mux {
            parents: links,
            field,
        })
    }

    /// Sequenced gate.
    pub const fn gate(parent: Option<&'static str>, spec: GateSpec) -> Self {
        Self::Gate {
            parent: match parent {
                Some(name) => Some(Link::to(name)),
                None => None,
            },
            spec,
        }
    }

    /// Plain bit gate.
    pub const fn bit_gate(parent: &'static str, offset: u32, bit: u8) -> Self {
        Self::BitGate {
            parent: Link::to(parent),
            offset,
            bit,
        }
    }

    /// All parent links, in mux-encoding order for muxes.
    pub fn parents(&self) -> &[Link] {
        match self {
            Self::FixedRate { .. } | Self::Gate { parent: None, .. } => &[],
            Self::FixedFactor { parent, .. }
            | Self::DividerTable { parent, .. }
            | Self::BitGate { parent, .. }
            | Self::Gate {
                parent: Some(parent),
                ..
            } => core::slice::from_ref(parent),
            Self::Mux { parents, .. } => parents.as_slice(),
        }
    }

    pub(crate) fn parents_mut(&mut self) -> &mut [Link] {
        match self {
            Self::FixedRate { .. } | Self::Gate { parent: None, .. } => &mut [],
            Self::FixedFactor { parent, .. }
            | Self::DividerTable { parent, .. }
            | Self::BitGate { parent, .. }
            | Self::Gate {
                parent: Some(parent),
                ..
            } => core::slice::from_mut(parent),
            Self::Mux { parents, .. } => parents.as_mut_slice(),
        }
    }

    /// Short kind name for diagnostics.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FixedRate { .. } => "fixed-rate",
            Self::FixedFactor { .. } => "fixed-factor",
            Self::DividerTable { .. } => "divider",
            Self::Mux { .. } => "mux",
            Self::Gate { .. } => "gate",
            Self::BitGate { .. } => "bit-gate",
        }
    }
}

/// One registered clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockNode {
    /// Registration index.
    pub id: ClockId,
    /// Unique name.
    pub name: &'static str,
    /// Kind and parameters.
    pub kind: ClockKind,
    /// Flags.
    pub flags: ClockFlags,
}

impl ClockNode {
    /// `true` once every parent link is resolved.
    pub fn is_ready(&self) -> bool {
        self.kind.parents().iter().all(|link| link.id().is_some())
    }

    /// First parent still pending, if any.
    pub fn pending_parent(&self) -> Option<&'static str> {
        self.kind.parents().iter().find_map(|link| match link {
            Link::Pending(name) => Some(*name),
            Link::Resolved(_) => None,
        })
    }

    /// `true` for kinds that can be enabled and disabled.
    pub const fn is_gateable(&self) -> bool {
        matches!(self.kind, ClockKind::Gate { .. } | ClockKind::BitGate { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::regs::CLK_SELECTION1;

    #[test]
    fn scale_uses_wide_intermediate() {
        // 1.2 GHz * 4 would overflow u32 before the divide
        let hpll = Hertz(1_200_000_000);
        assert_eq!(hpll.scale(4, 16), Some(Hertz(300_000_000)));
    }

    #[test]
    fn scale_rejects_zero_divisor() {
        assert_eq!(Hertz::mhz(25).scale(1, 0), None);
    }

    #[test]
    fn scale_saturates() {
        assert_eq!(Hertz(u32::MAX).scale(2, 1), Some(Hertz(u32::MAX)));
    }

    #[test]
    fn critical_flag_is_detected() {
        assert!(ClockFlags::CRITICAL.is_critical());
        assert!(!ClockFlags::NONE.is_critical());
        assert!((ClockFlags::NONE | ClockFlags::CRITICAL).is_critical());
    }

    #[test]
    fn mux_keeps_parent_order() {
        let kind = ClockKind::mux("d1clk", &["dpll", "epll", "usb-phy-40m"], Field::new(CLK_SELECTION1, 8, 3))
            .unwrap();
        let names: std::vec::Vec<_> = kind
            .parents()
            .iter()
            .map(|link| match link {
                Link::Pending(name) => *name,
                Link::Resolved(_) => "",
            })
            .collect();
        assert_eq!(names, ["dpll", "epll", "usb-phy-40m"]);
    }

    #[test]
    fn mux_with_too_many_parents_is_rejected() {
        let parents = ["a"; MAX_MUX_PARENTS + 1];
        assert_eq!(
            ClockKind::mux("wide", &parents, Field::new(CLK_SELECTION1, 0, 4)),
            Err(TopologyError::TooManyParents("wide"))
        );
    }

    #[test]
    fn node_with_pending_parent_is_not_ready() {
        let node = ClockNode {
            id: ClockId::new(0),
            name: "ahb",
            kind: ClockKind::factor("hpll", 1, 4),
            flags: ClockFlags::NONE,
        };
        assert!(!node.is_ready());
        assert_eq!(node.pending_parent(), Some("hpll"));

        let fixed = ClockNode {
            id: ClockId::new(1),
            name: "clkin",
            kind: ClockKind::fixed(Hertz::mhz(25)),
            flags: ClockFlags::NONE,
        };
        assert!(fixed.is_ready());
        assert!(!fixed.is_gateable());
    }
}
