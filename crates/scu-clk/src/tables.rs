//! Static divider tables.
//!
//! Each table maps a register field encoding to a divisor. Encodings past the
//! end of a table are invalid and rate queries fail closed on them.

/// Encoding → divisor lookup.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DividerTable {
    name: &'static str,
    divisors: &'static [u32],
}

impl DividerTable {
    /// Table named `name` with `divisors[encoding]`.
    pub const fn new(name: &'static str, divisors: &'static [u32]) -> Self {
        Self { name, divisors }
    }

    /// Table name, for diagnostics.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Divisor for `encoding`, or `None` if the table does not define it.
    pub fn divisor(&self, encoding: u32) -> Option<u32> {
        usize::try_from(encoding)
            .ok()
            .and_then(|i| self.divisors.get(i))
            .copied()
    }

    /// Number of defined encodings.
    pub const fn len(&self) -> usize {
        self.divisors.len()
    }

    /// `true` if no encoding is defined.
    pub const fn is_empty(&self) -> bool {
        self.divisors.is_empty()
    }
}

/// Generic bus divider: LHCLK, BCLK, eMMC on A0 silicon.
pub static GENERIC: DividerTable = DividerTable::new("generic", &[4, 8, 12, 16, 20, 24, 28, 32]);

/// MAC bus divider. Encodings 0 and 1 both divide by 4.
pub static MAC: DividerTable = DividerTable::new("mac", &[4, 4, 6, 8, 10, 12, 14, 16]);

/// SD / eMMC card clock divider.
pub static SD: DividerTable = DividerTable::new("sd", &[2, 4, 6, 8, 10, 12, 14, 16]);

/// UART base divider.
pub static UART: DividerTable = DividerTable::new("uart", &[4, 2]);

/// Video engine (ECLK) divider.
pub static ECLK: DividerTable = DividerTable::new("eclk", &[2, 2, 3, 4, 5, 6, 7, 8]);

// ── AXI / AHB ratio ──────────────────────────────────────────────────────────

const A0_AXI_AHB: [u32; 4] = [2, 2, 3, 4];
const A1_AXI_AHB_DIV0: [u32; 4] = [3, 2, 3, 4];
const A1_AXI_AHB_DIV1: [u32; 4] = [3, 4, 6, 8];
const A1_AXI_AHB_DEFAULT: [u32; 8] = [3, 4, 3, 4, 2, 2, 2, 2];

/// Strap bit selecting AXI = HPLL (÷1) on A1 silicon.
const STRAP_AXI_DIV1: u32 = 1 << 16;

/// Total HPLL → AHB divisor (`axi_div * ahb_div`).
///
/// `a1` selects the A1 strap tables. On A1, encoding 0 of the AHB table is
/// itself chosen by strap bits \[9:8\]; the AHB encoding comes from strap bits
/// \[12:11\]. A0 silicon always runs AXI at HPLL/2.
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // selectors are masked to 2 bits
pub fn ahb_divisor(a1: bool, strap: u32) -> u32 {
    let ahb_sel = ((strap >> 11) & 0x3) as usize;
    if !a1 {
        return 2 * A0_AXI_AHB[ahb_sel];
    }

    let (axi_div, mut table) = if strap & STRAP_AXI_DIV1 != 0 {
        (1, A1_AXI_AHB_DIV1)
    } else {
        (2, A1_AXI_AHB_DIV0)
    };
    table[0] = A1_AXI_AHB_DEFAULT[((strap >> 8) & 0x3) as usize];
    axi_div * table[ahb_sel]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn every_table_has_eight_encodings_except_uart() {
        for table in [&GENERIC, &MAC, &SD, &ECLK] {
            assert_eq!(table.len(), 8, "{}", table.name());
        }
        assert_eq!(UART.len(), 2);
    }

    #[test]
    fn out_of_range_encoding_has_no_divisor() {
        assert_eq!(UART.divisor(1), Some(2));
        assert_eq!(UART.divisor(2), None);
        assert_eq!(GENERIC.divisor(8), None);
        assert_eq!(SD.divisor(u32::MAX), None);
    }

    #[test]
    fn mac_encoding_zero_and_one_both_divide_by_four() {
        assert_eq!(MAC.divisor(0), Some(4));
        assert_eq!(MAC.divisor(1), Some(4));
        assert_eq!(MAC.divisor(7), Some(16));
    }

    #[test]
    fn a0_axi_is_fixed_at_two() {
        assert_eq!(ahb_divisor(false, 0), 4);
        assert_eq!(ahb_divisor(false, 3 << 11), 8);
        // A1-only straps are ignored on A0
        assert_eq!(ahb_divisor(false, STRAP_AXI_DIV1 | (3 << 8)), 4);
    }

    #[test]
    fn a1_encoding_zero_follows_default_table() {
        // div0 table, ahb_sel 0 → default[(strap >> 8) & 3]
        assert_eq!(ahb_divisor(true, 0), 2 * 3);
        assert_eq!(ahb_divisor(true, 1 << 8), 2 * 4);
        // div1 table with AXI = HPLL
        assert_eq!(ahb_divisor(true, STRAP_AXI_DIV1 | (2 << 8)), 3);
    }

    #[test]
    fn a1_other_encodings_use_selected_table() {
        assert_eq!(ahb_divisor(true, 1 << 11), 2 * 2);
        assert_eq!(ahb_divisor(true, STRAP_AXI_DIV1 | (3 << 11)), 8);
    }
}
