//! AST2600 clock topology.
//!
//! [`build`] registers every clock in one forward pass, leaf first:
//!
//! ```text
//! clkin, usb-phy-40m, board inputs
//!   └─ hpll, mpll, dpll, epll, apll          (PLL parameter words)
//!        └─ uart, ahb, hclk, uartx, apb1, apb2, i3cclk, uxclk, huxclk,
//!           emmc/sd ext clocks, mac12/mac34, lhclk, bclk, d1clk, mclk,
//!           vclk, eclk                        (bus dividers and muxes)
//!             └─ peripheral gates              (gate table)
//! ```
//!
//! Ratios that the hardware fixes at boot (PLLs, AHB, APB, UART sources) are
//! read once here and registered as fixed factors. Dividers and muxes that
//! software may reprogram are registered with their register field and
//! decoded on every rate query.

#![allow(clippy::arithmetic_side_effects)] // register fields are masked before use

use crate::config::ScuConfig;
use crate::error::ClockError;
use crate::gate::{self, GateDescriptor, EMMC_EXTCLK_SELECTION, GATES, SD_EXTCLK_SELECTION};
use crate::node::{ClockFlags, ClockKind, Hertz};
use crate::pll::{compute_ratio, PLLS};
use crate::registry::ClockRegistry;
use crate::regs::{
    bit, genmask, Field, RegisterMap, CLK_SELECTION1, CLK_SELECTION2, CLK_SELECTION4, CLK_SELECTION5,
    HUXCLK_CTRL, HW_STRAP1, MAC12_CLK_CTRL0, MAC34_CLK_CTRL0, MISC_CTRL, SILICON_REV, UXCLK_CTRL,
};
use crate::tables;

/// UART5 runs at 192 MHz instead of 24 MHz (SCU304).
const UART5_HIGH_SPEED: u32 = bit(14);
/// UART5 input divided by 13 (SCU0C0).
const UART_DIV13_EN: u32 = bit(12);
/// SD external clock sourced from APLL instead of HCLK (SCU310).
const SD_FROM_APLL: u32 = bit(8);
/// I3C clock sourced from APLL instead of AHB (SCU314).
const I3C_FROM_APLL: u32 = bit(31);

/// RMII reference clock rate.
const RMII_RCLK: Hertz = Hertz::mhz(50);

/// Decoded SCU004 silicon revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SiliconRevision(u32);

impl SiliconRevision {
    /// Wrap a raw SCU004 word.
    pub const fn from_word(word: u32) -> Self {
        Self(word)
    }

    /// Read SCU004.
    pub fn read<M: RegisterMap + ?Sized>(regs: &M) -> Result<Self, M::Error> {
        regs.read(SILICON_REV).map(Self)
    }

    /// A1 or later: SCU004\[23:16\] non-zero.
    pub const fn is_a1_or_later(self) -> bool {
        self.0 & genmask(23, 16) != 0
    }

    /// AXI/AHB ratio follows the A1 strap tables (SCU004 bit 16).
    pub const fn uses_a1_bus_straps(self) -> bool {
        self.0 & bit(16) != 0
    }
}

/// UART5 rate from the SCU304 / SCU0C0 selection bits.
pub const fn uart5_rate(selection2: u32, misc: u32) -> Hertz {
    let base = if selection2 & UART5_HIGH_SPEED != 0 {
        192_000_000
    } else {
        24_000_000
    };
    if misc & UART_DIV13_EN != 0 {
        Hertz(base / 13)
    } else {
        Hertz(base)
    }
}

/// APB1 divisor: `4 × (SCU300[25:23] + 1)`.
pub const fn apb1_divisor(selection1: u32) -> u32 {
    4 * (((selection1 >> 23) & 0x7) + 1)
}

/// APB2 divisor: `2 × (SCU310[11:9] + 1)`.
pub const fn apb2_divisor(selection4: u32) -> u32 {
    2 * (((selection4 >> 9) & 0x7) + 1)
}

/// I3C source and divisor from SCU314.
pub const fn i3c_source(selection5: u32) -> (&'static str, u32) {
    if selection5 & I3C_FROM_APLL == 0 {
        return ("ahb", 1);
    }
    let field = (selection5 >> 28) & 0x7;
    // encoding 0 divides by 2, like encoding 1
    ("apll", if field == 0 { 2 } else { field + 1 })
}

/// `(mult, div)` of a UART-X fractional divider word (SCU338 / SCU33C).
pub const fn fractional_ratio(word: u32) -> (u32, u32) {
    (word & 0xff, ((word >> 8) & 0x3ff) * 2)
}

/// Parent of a UART1–13 gate: `huxclk` when the port's selection bit is set.
///
/// UART1–6 select in SCU310\[5:0\], UART7–13 in SCU314\[12:6\]; bit `n - 1`
/// belongs to UARTn.
pub const fn uart_gate_parent(port: u8, selection4: u32, selection5: u32) -> &'static str {
    let word = if port <= 6 { selection4 } else { selection5 };
    if word & bit(port - 1) != 0 {
        "huxclk"
    } else {
        "uxclk"
    }
}

/// Register the full topology from current register contents.
///
/// The returned registry is not finalized.
pub fn build<M: RegisterMap + ?Sized>(regs: &M, config: &ScuConfig) -> Result<ClockRegistry, ClockError<M::Error>> {
    let read = |offset| regs.read(offset).map_err(ClockError::Register);
    let none = ClockFlags::NONE;
    let mut reg = ClockRegistry::new();

    // ── sources ──
    reg.register("clkin", ClockKind::fixed(Hertz(config.crystal)), none)?;
    reg.register("usb-phy-40m", ClockKind::fixed(Hertz(config.usb_phy)), none)?;
    reg.register("d1pll", ClockKind::fixed(Hertz(config.external.d1pll)), none)?;
    reg.register("gpioc6-clkin", ClockKind::fixed(Hertz(config.external.gpioc6_clkin)), none)?;
    reg.register("dp-phy-pll", ClockKind::fixed(Hertz(config.external.dp_phy_pll)), none)?;

    // ── PLLs ──
    let strap = read(HW_STRAP1)?;
    for pll in PLLS {
        let ratio = compute_ratio(pll.flavor, read(pll.param)?, strap);
        trace!("{}: x{} / {}", pll.name, ratio.multiplier, ratio.divisor);
        reg.register(pll.name, ClockKind::factor("clkin", ratio.multiplier, ratio.divisor), none)?;
    }

    // ── bus clocks ──
    let revision = SiliconRevision::read(regs).map_err(ClockError::Register)?;
    let sel1 = read(CLK_SELECTION1)?;
    let sel2 = read(CLK_SELECTION2)?;
    let sel4 = read(CLK_SELECTION4)?;
    let sel5 = read(CLK_SELECTION5)?;

    reg.register("uart", ClockKind::fixed(uart5_rate(sel2, read(MISC_CTRL)?)), none)?;

    let ahb_div = tables::ahb_divisor(revision.uses_a1_bus_straps(), strap);
    reg.register("ahb", ClockKind::factor("hpll", 1, ahb_div), none)?;
    reg.register("hclk", ClockKind::factor("ahb", 1, 1), none)?;

    let uartx = match sel5 & 0x3 {
        0 | 1 => ClockKind::divider("apll", Field::new(CLK_SELECTION5, 0, 2), &tables::UART),
        2 => ClockKind::factor("apll", 1, 1),
        _ => ClockKind::factor("ahb", 1, 1),
    };
    reg.register("uartx", uartx, none)?;

    reg.register("apb1", ClockKind::factor("hpll", 1, apb1_divisor(sel1)), none)?;
    reg.register("apb2", ClockKind::factor("ahb", 1, apb2_divisor(sel4)), none)?;

    let (i3c_parent, i3c_div) = i3c_source(sel5);
    reg.register("i3cclk", ClockKind::factor(i3c_parent, 1, i3c_div), none)?;

    let (mult, div) = fractional_ratio(read(UXCLK_CTRL)?);
    reg.register("uxclk", ClockKind::factor("uartx", mult, div), none)?;
    let (mult, div) = fractional_ratio(read(HUXCLK_CTRL)?);
    reg.register("huxclk", ClockKind::factor("uartx", mult, div), none)?;

    // eMMC: A1 feeds MPLL through the SD table to stay under 200 MHz.
    let (emmc_parent, emmc_table) = if revision.is_a1_or_later() {
        ("mpll", &tables::SD)
    } else {
        ("hpll", &tables::GENERIC)
    };
    register_gate(
        &mut reg,
        &GateDescriptor::selection(EMMC_EXTCLK_SELECTION, "emmc-extclk-gate", emmc_parent),
    )?;
    reg.register(
        "emmc-extclk",
        ClockKind::divider("emmc-extclk-gate", Field::new(CLK_SELECTION1, 12, 3), emmc_table),
        none,
    )?;

    let sd_parent = if sel4 & SD_FROM_APLL != 0 { "apll" } else { "hclk" };
    register_gate(
        &mut reg,
        &GateDescriptor::selection(SD_EXTCLK_SELECTION, "sd-extclk-gate", sd_parent),
    )?;
    reg.register(
        "sd-extclk",
        ClockKind::divider("sd-extclk-gate", Field::new(CLK_SELECTION4, 28, 3), &tables::SD),
        none,
    )?;

    reg.register("mac12rclk", ClockKind::fixed(RMII_RCLK), none)?;
    reg.register(
        "mac12",
        ClockKind::divider("hpll", Field::new(CLK_SELECTION1, 16, 3), &tables::MAC),
        none,
    )?;
    reg.register("mac1rclk", ClockKind::bit_gate("mac12rclk", MAC12_CLK_CTRL0, 29), none)?;
    reg.register("mac2rclk", ClockKind::bit_gate("mac12rclk", MAC12_CLK_CTRL0, 30), none)?;

    reg.register("mac34rclk", ClockKind::fixed(RMII_RCLK), none)?;
    reg.register(
        "mac34",
        ClockKind::divider("hpll", Field::new(CLK_SELECTION4, 24, 3), &tables::MAC),
        none,
    )?;
    reg.register("mac3rclk", ClockKind::bit_gate("mac34rclk", MAC34_CLK_CTRL0, 29), none)?;
    reg.register("mac4rclk", ClockKind::bit_gate("mac34rclk", MAC34_CLK_CTRL0, 30), none)?;

    // LPC host and P-bus share SCU300[22:20].
    reg.register(
        "lhclk",
        ClockKind::divider("hpll", Field::new(CLK_SELECTION1, 20, 3), &tables::GENERIC),
        none,
    )?;
    reg.register(
        "bclk",
        ClockKind::divider("hpll", Field::new(CLK_SELECTION1, 20, 3), &tables::GENERIC),
        none,
    )?;

    reg.register(
        "d1clk",
        ClockKind::mux(
            "d1clk",
            &["dpll", "epll", "usb-phy-40m", "gpioc6-clkin", "dp-phy-pll"],
            Field::new(CLK_SELECTION1, 8, 3),
        )?,
        none,
    )?;
    reg.register("mclk", ClockKind::factor("mpll", 1, 1), none)?;
    reg.register(
        "vclk",
        ClockKind::mux(
            "vclk",
            &["dpll", "d1pll", "hclk", "mclk"],
            Field::new(CLK_SELECTION2, 12, 3),
        )?,
        none,
    )?;
    reg.register(
        "eclk",
        ClockKind::divider("mpll", Field::new(CLK_SELECTION1, 28, 3), &tables::ECLK),
        none,
    )?;

    // ── peripheral gates ──
    for desc in GATES {
        let desc = match gate::uart_port(desc.clock) {
            Some(port) => desc.with_parent(uart_gate_parent(port, sel4, sel5)),
            None => *desc,
        };
        register_gate(&mut reg, &desc)?;
    }

    debug!("clock topology: {} clocks registered", reg.len());
    Ok(reg)
}

fn register_gate<E>(reg: &mut ClockRegistry, desc: &GateDescriptor) -> Result<(), ClockError<E>> {
    let spec = desc.spec()?;
    reg.register(desc.name, ClockKind::gate(desc.parent, spec), desc.flags)?;
    Ok(())
}
