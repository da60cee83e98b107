//! One-time SCU programming performed before the topology is built.
//!
//! Sets the fixed clock-generator choices the board depends on: UART source
//! overrides, RGMII/RMII reference sources and delays, the RSA clock, the eMMC
//! source on A1 silicon, and the display and video engine dividers.

#![allow(clippy::arithmetic_side_effects)] // shifts of constant field values

use crate::config::ScuConfig;
use crate::regs::{
    bit, genmask, RegisterMap, CLK_SELECTION1, CLK_SELECTION2, CLK_SELECTION3, CLK_SELECTION4, CLK_SELECTION5,
    MAC12_CLK_CTRL0, MAC12_CLK_CTRL1, MAC12_CLK_CTRL2, MAC34_CLK_CTRL0, MAC34_CLK_CTRL1, MAC34_CLK_CTRL2,
    MAC34_DRIVING_CTRL,
};
use crate::topology::SiliconRevision;

/// MAC1/2 RGMII 125 MHz source = internal PLL (SCU340 bit 31).
const MAC12_RGMII_INTERNAL: u32 = bit(31);
/// RGMIICK pad driven as output (SCU340 bit 28).
const MAC12_RGMIICK_OUTPUT: u32 = bit(28);

/// Display divider word for SCU308: D1 ÷ (2 × 3).
const D1CLK_DIVIDER: u32 = 0xA000;

/// Register programming applied once at probe.
#[derive(Debug, Clone, Copy)]
pub struct ScuInit<'a> {
    config: &'a ScuConfig,
}

impl<'a> ScuInit<'a> {
    /// Program according to `config`.
    pub const fn new(config: &'a ScuConfig) -> Self {
        Self { config }
    }

    /// Write every setting. Stops at the first register failure.
    pub fn apply<M: RegisterMap + ?Sized>(&self, regs: &M) -> Result<(), M::Error> {
        let cfg = self.config;

        let uart_src = cfg.uart_clock_source;
        if uart_src & genmask(5, 0) != 0 {
            regs.update_bits(CLK_SELECTION4, genmask(5, 0), uart_src)?;
        }
        if uart_src & genmask(12, 6) != 0 {
            regs.update_bits(CLK_SELECTION5, genmask(12, 6), uart_src)?;
        }

        // MAC1/2 RGMII 125 MHz = EPLL / 8
        regs.update_bits(CLK_SELECTION2, genmask(23, 20), 0x7 << 20)?;
        // MAC3/4 RMII 50 MHz = HCLK / 4
        regs.update_bits(CLK_SELECTION4, genmask(18, 16), 0x3 << 16)?;

        regs.write(
            MAC12_CLK_CTRL0,
            MAC12_RGMII_INTERNAL | MAC12_RGMIICK_OUTPUT | cfg.mac12.gbit,
        )?;
        regs.write(MAC12_CLK_CTRL1, cfg.mac12.fast)?;
        regs.write(MAC12_CLK_CTRL2, cfg.mac12.ten)?;
        regs.write(MAC34_CLK_CTRL0, cfg.mac34.gbit)?;
        regs.write(MAC34_CLK_CTRL1, cfg.mac34.fast)?;
        regs.write(MAC34_CLK_CTRL2, cfg.mac34.ten)?;
        regs.write(MAC34_DRIVING_CTRL, cfg.mac34_driving)?;

        // RSA = HPLL / 3
        regs.update_bits(CLK_SELECTION1, bit(19), bit(19))?;
        regs.update_bits(CLK_SELECTION1, genmask(27, 26), 2 << 26)?;

        if SiliconRevision::read(regs)?.is_a1_or_later() {
            // eMMC from MPLL so the card clock fits under 200 MHz
            regs.update_bits(CLK_SELECTION1, genmask(14, 11), bit(11))?;
        }

        // d1clk from the DP PHY PLL
        regs.update_bits(CLK_SELECTION1, genmask(10, 8), bit(10))?;
        regs.write(CLK_SELECTION3, D1CLK_DIVIDER)?;

        // video engine: eclk select and divider to 0
        regs.update_bits(CLK_SELECTION1, genmask(31, 28), 0)?;

        debug!("scu init applied");
        Ok(())
    }
}
