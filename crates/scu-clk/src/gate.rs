//! Peripheral gate descriptors.
//!
//! [`GATES`] is the static gate table: clock-stop bit, coupled reset line,
//! name, parent, and flags for every sequenced peripheral clock. Clock index
//! 0–63 addresses the clock-stop banks (SCU080 / SCU090); indices with bit 6
//! set are selection-mode gates that live in a clock-selection register.

use crate::error::TopologyError;
use crate::node::ClockFlags;
use crate::regs::BankBit;
use crate::reset::ResetLine;

/// Clock-stop bit whose hardware runs the clock when the bit is *set*.
pub const USB_PORT1_CLOCK_BIT: u8 = 14;

/// Selection-mode index of the eMMC external clock (SCU300 bit 15).
pub const EMMC_EXTCLK_SELECTION: u8 = 64;
/// Selection-mode index of the SD external clock (SCU310 bit 31).
pub const SD_EXTCLK_SELECTION: u8 = 65;

const SELECTION_FLAG: u8 = 0x40;

/// How the gate bit encodes "running".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Set = stopped. Enable writes the clear register.
    #[default]
    StopWhenSet,
    /// Set = running. Enable writes the set register.
    RunWhenSet,
}

impl Polarity {
    /// Polarity of clock-stop bit `index`.
    pub const fn for_clock_bit(index: u8) -> Self {
        if index == USB_PORT1_CLOCK_BIT {
            Self::RunWhenSet
        } else {
            Self::StopWhenSet
        }
    }
}

/// Register that gates the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GateControl {
    /// Bit in the clock-stop banks.
    ClockStop(BankBit),
    /// Clock-selection gate, by selection index (64, 65, ...).
    Selection(u8),
}

/// Control bits of one sequenced gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GateSpec {
    /// Gate register bit.
    pub control: GateControl,
    /// Reset line held across the enable sequence.
    pub reset: Option<ResetLine>,
    /// Running encoding of the gate bit.
    pub polarity: Polarity,
}

/// One row of the gate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDescriptor {
    /// Clock-stop bit 0–63, or a selection index (bit 6 set).
    pub clock: u8,
    /// Coupled reset line.
    pub reset: Option<u8>,
    /// Node name.
    pub name: &'static str,
    /// Parent node name.
    pub parent: Option<&'static str>,
    /// Node flags.
    pub flags: ClockFlags,
}

impl GateDescriptor {
    const fn new(clock: u8, reset: Option<u8>, name: &'static str, parent: Option<&'static str>) -> Self {
        Self {
            clock,
            reset,
            name,
            parent,
            flags: ClockFlags::NONE,
        }
    }

    const fn critical(self) -> Self {
        Self {
            flags: ClockFlags::CRITICAL,
            ..self
        }
    }

    /// Selection-mode gate row.
    pub const fn selection(index: u8, name: &'static str, parent: &'static str) -> Self {
        Self::new(index, None, name, Some(parent))
    }

    /// Same row with a different parent.
    pub const fn with_parent(self, parent: &'static str) -> Self {
        Self {
            parent: Some(parent),
            ..self
        }
    }

    /// Validate the indices and derive the runtime gate spec.
    pub fn spec(&self) -> Result<GateSpec, TopologyError> {
        let control = match BankBit::new(self.clock) {
            Some(bit) => GateControl::ClockStop(bit),
            None if self.clock & SELECTION_FLAG != 0 && self.clock < 0x80 => GateControl::Selection(self.clock),
            None => {
                return Err(TopologyError::InvalidGate {
                    clock: self.name,
                    index: self.clock,
                })
            }
        };
        let reset = match self.reset {
            Some(id) => Some(ResetLine::new(id).ok_or(TopologyError::InvalidGate {
                clock: self.name,
                index: id,
            })?),
            None => None,
        };
        Ok(GateSpec {
            control,
            reset,
            polarity: Polarity::for_clock_bit(self.clock),
        })
    }
}

/// Reset line ids.
#[allow(missing_docs)]
pub mod resets {
    pub const EHCI_P2: u8 = 3;
    pub const HACE: u8 = 4;
    pub const VIDEO: u8 = 6;
    pub const GFX_2D: u8 = 7;
    pub const PCI_VGA: u8 = 8;
    pub const RVAS: u8 = 9;
    pub const UHCI: u8 = 10;
    pub const MAC1: u8 = 11;
    pub const MAC2: u8 = 12;
    pub const CRT: u8 = 13;
    pub const EHCI_P1: u8 = 14;
    pub const EMMC: u8 = 16;
    pub const LPC_ESPI: u8 = 32;
    pub const I3C_DMA: u8 = 39;
    pub const I3C0: u8 = 40;
    pub const I3C1: u8 = 41;
    pub const I3C2: u8 = 42;
    pub const I3C3: u8 = 43;
    pub const I3C4: u8 = 44;
    pub const I3C5: u8 = 45;
    pub const I3C6: u8 = 46;
    pub const MAC3: u8 = 52;
    pub const MAC4: u8 = 53;
    pub const SD: u8 = 56;
    pub const FSI: u8 = 59;
}

use resets as rst;

const fn g(clock: u8, reset: Option<u8>, name: &'static str, parent: Option<&'static str>) -> GateDescriptor {
    GateDescriptor::new(clock, reset, name, parent)
}

/// Clock-stop gate table, in registration order.
///
/// UART1–4 and UART6–13 list `uxclk` here; topology construction swaps in
/// `huxclk` for ports whose selection bit is set.
pub static GATES: &[GateDescriptor] = &[
    g(0, None, "mclk-gate", Some("mpll")).critical(), // SDRAM
    g(1, None, "eclk-gate", Some("eclk")),            // video engine
    g(2, Some(rst::GFX_2D), "gclk-gate", None),
    g(3, Some(rst::VIDEO), "vclk-gate", Some("vclk")), // video capture
    g(4, Some(rst::PCI_VGA), "bclk-gate", Some("bclk")).critical(),
    g(5, None, "dclk-gate", Some("dpll")).critical(), // DAC
    g(6, None, "ref0clk-gate", Some("clkin")).critical(),
    g(7, Some(rst::EHCI_P2), "usb-port2-gate", None),
    g(9, Some(rst::UHCI), "usb-uhci-gate", None), // needs port 2 running
    g(10, Some(rst::CRT), "d1clk-gate", Some("d1clk")),
    g(13, Some(rst::HACE), "yclk-gate", None),
    g(14, Some(rst::EHCI_P1), "usb-port1-gate", None),
    g(15, None, "uart5clk-gate", Some("uart")),
    g(20, Some(rst::MAC1), "mac1clk-gate", Some("mac12")),
    g(21, Some(rst::MAC2), "mac2clk-gate", Some("mac12")),
    g(24, Some(rst::HACE), "rsaclk-gate", None),
    g(25, Some(rst::RVAS), "rvasclk-gate", None),
    g(27, Some(rst::EMMC), "emmcclk-gate", None),
    g(32, Some(rst::LPC_ESPI), "lclk-gate", None).critical(),
    g(33, None, "espiclk-gate", None).critical(),
    g(34, None, "ref1clk-gate", Some("clkin")).critical(),
    g(36, Some(rst::SD), "sdclk-gate", None),
    g(37, None, "lhclk-gate", Some("lhclk")),
    g(39, Some(rst::I3C_DMA), "i3cclk-gate", None),
    g(40, Some(rst::I3C0), "i3c0clk-gate", Some("i3cclk")),
    g(41, Some(rst::I3C1), "i3c1clk-gate", Some("i3cclk")),
    g(42, Some(rst::I3C2), "i3c2clk-gate", Some("i3cclk")),
    g(43, Some(rst::I3C3), "i3c3clk-gate", Some("i3cclk")),
    g(44, Some(rst::I3C4), "i3c4clk-gate", Some("i3cclk")),
    g(45, Some(rst::I3C5), "i3c5clk-gate", Some("i3cclk")),
    g(46, Some(rst::I3C6), "i3c6clk-gate", Some("i3cclk")),
    g(48, None, "uart1clk-gate", Some("uxclk")),
    g(49, None, "uart2clk-gate", Some("uxclk")),
    g(50, None, "uart3clk-gate", Some("uxclk")),
    g(51, None, "uart4clk-gate", Some("uxclk")),
    g(52, Some(rst::MAC3), "mac3clk-gate", Some("mac34")),
    g(53, Some(rst::MAC4), "mac4clk-gate", Some("mac34")),
    g(54, None, "uart6clk-gate", Some("uxclk")),
    g(55, None, "uart7clk-gate", Some("uxclk")),
    g(56, None, "uart8clk-gate", Some("uxclk")),
    g(57, None, "uart9clk-gate", Some("uxclk")),
    g(58, None, "uart10clk-gate", Some("uxclk")),
    g(59, None, "uart11clk-gate", Some("uxclk")),
    g(60, None, "uart12clk-gate", Some("uxclk")),
    g(61, None, "uart13clk-gate", Some("uxclk")),
    g(62, Some(rst::FSI), "fsiclk-gate", None),
];

/// UART port number (1–13, never 5) driven by clock-stop bit `clock`.
#[allow(clippy::arithmetic_side_effects)] // arms bound `clock` above 47
pub const fn uart_port(clock: u8) -> Option<u8> {
    match clock {
        48..=51 => Some(clock - 47),
        54..=61 => Some(clock - 48),
        _ => None,
    }
}
