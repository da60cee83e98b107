//! PLL frequency model.
//!
//! Every PLL is a fixed-factor child of the 25 MHz crystal (`clkin`):
//! `F = clkin * multiplier / divisor`. The parameter word layout differs
//! between PLL flavors.
//!
//! ## Standard layout (MPLL, DPLL, EPLL; HPLL with strap override)
//! ```text
//!  24      22..19   18..13   12..0
//! [BYP]   [  P  ]  [  N  ]  [  M  ]
//! ```
//! `multiplier = (M + 1) / (N + 1)`, **truncating** integer division (the
//! fraction is dropped before the crystal is multiplied). `divisor = P + 1`.
//!
//! ## APLL layout
//! ```text
//!  20      10..5   4     3..0
//! [BYP]   [ M ]   [OD]  [ N ]
//! ```
//! `multiplier = (2 - OD) * (M + 2)`, `divisor = N + 1`.

#![allow(clippy::arithmetic_side_effects)] // parameter fields are masked before use

use crate::regs::{self, bit};

/// Standard-layout pass-through (bypass) bit.
pub const PLL_BYPASS: u32 = bit(24);
/// APLL pass-through (bypass) bit.
pub const APLL_BYPASS: u32 = bit(20);

/// HPLL strap (SCU500) bit forcing M = 0x5F.
pub const HPLL_STRAP_M_5F: u32 = bit(10);
/// HPLL strap (SCU500) bit forcing M = 0xBF when bit 10 is clear.
pub const HPLL_STRAP_M_BF: u32 = bit(8);

/// PLL parameter-word flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllFlavor {
    /// MPLL / DPLL / EPLL.
    Standard,
    /// HPLL: standard layout, M overridden by hardware strap.
    Hpll,
    /// APLL: 6-bit M, output-divide flag, 4-bit N.
    Apll,
}

/// Decoded PLL ratio relative to the crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllRatio {
    /// Multiplier applied to the crystal rate.
    pub multiplier: u32,
    /// Divisor applied after the multiplier.
    pub divisor: u32,
}

impl PllRatio {
    /// Pass-through: the PLL output equals the crystal.
    pub const BYPASS: Self = Self {
        multiplier: 1,
        divisor: 1,
    };
}

/// A PLL instance: node name, flavor, and parameter-word offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pll {
    /// Clock node name.
    pub name: &'static str,
    /// Parameter layout.
    pub flavor: PllFlavor,
    /// Parameter register offset.
    pub param: u32,
}

/// All PLLs in registration order. HPLL comes first: it is the CPU clock and
/// the parent of every bus divider.
pub const PLLS: &[Pll] = &[
    Pll {
        name: "hpll",
        flavor: PllFlavor::Hpll,
        param: regs::HPLL_PARAM,
    },
    Pll {
        name: "mpll",
        flavor: PllFlavor::Standard,
        param: regs::MPLL_PARAM,
    },
    Pll {
        name: "dpll",
        flavor: PllFlavor::Standard,
        param: regs::DPLL_PARAM,
    },
    Pll {
        name: "epll",
        flavor: PllFlavor::Standard,
        param: regs::EPLL_PARAM,
    },
    Pll {
        name: "apll",
        flavor: PllFlavor::Apll,
        param: regs::APLL_PARAM,
    },
];

/// Decode a PLL parameter word.
///
/// `strap` is the SCU500 hardware strap word; only the HPLL flavor looks at it.
pub fn compute_ratio(flavor: PllFlavor, raw: u32, strap: u32) -> PllRatio {
    match flavor {
        PllFlavor::Standard => decode_standard(raw, None),
        PllFlavor::Hpll => decode_standard(raw, hpll_strap_multiplier(strap)),
        PllFlavor::Apll => decode_apll(raw),
    }
}

/// Fixed HPLL numerator selected by the strap, if any.
fn hpll_strap_multiplier(strap: u32) -> Option<u32> {
    if strap & HPLL_STRAP_M_5F != 0 {
        Some(0x5F)
    } else if strap & HPLL_STRAP_M_BF != 0 {
        Some(0xBF)
    } else {
        None
    }
}

fn decode_standard(raw: u32, m_override: Option<u32>) -> PllRatio {
    if raw & PLL_BYPASS != 0 {
        return PllRatio::BYPASS;
    }
    let m = m_override.unwrap_or(raw & 0x1fff);
    let n = (raw >> 13) & 0x3f;
    let p = (raw >> 19) & 0xf;
    // m <= 0x1fff, n <= 0x3f, p <= 0xf: none of the +1s can overflow and the
    // divisor is never zero.
    PllRatio {
        multiplier: (m + 1) / (n + 1),
        divisor: p + 1,
    }
}

fn decode_apll(raw: u32) -> PllRatio {
    if raw & APLL_BYPASS != 0 {
        return PllRatio::BYPASS;
    }
    let m = (raw >> 5) & 0x3f;
    let od = (raw >> 4) & 0x1;
    let n = raw & 0xf;
    PllRatio {
        multiplier: (2 - od) * (m + 2),
        divisor: n + 1,
    }
}
