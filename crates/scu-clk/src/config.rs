//! Board-level configuration for SCU bring-up.
//!
//! Defaults mirror the AST2600 datasheet and reference board; override only
//! what differs on your board.

use crate::error::ConfigError;

/// Rates of clock inputs that come from outside the SoC.
///
/// An input that is not wired on the board stays at 0 Hz; anything selecting
/// it then reports a rate of 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExternalInputs {
    /// Secondary display PLL (`d1pll`), a `vclk` mux input.
    pub d1pll: u32,
    /// GPIOC6 clock input (`gpioc6-clkin`), a `d1clk` mux input.
    pub gpioc6_clkin: u32,
    /// DisplayPort PHY PLL (`dp-phy-pll`), a `d1clk` mux input.
    pub dp_phy_pll: u32,
}

/// RGMII delay words for one MAC pair (1 Gbit / 100 Mbit / 10 Mbit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacDelays {
    /// 1 Gbit delay word.
    pub gbit: u32,
    /// 100 Mbit delay word.
    pub fast: u32,
    /// 10 Mbit delay word.
    pub ten: u32,
}

impl MacDelays {
    /// MAC1/2 reference board defaults.
    pub const MAC12_DEFAULT: Self = Self {
        gbit: 0x0041_B410,
        fast: 0x0041_7410,
        ten: 0x0041_7410,
    };

    /// MAC3/4 reference board defaults.
    pub const MAC34_DEFAULT: Self = Self {
        gbit: 0x0010_4208,
        fast: 0x0010_4208,
        ten: 0x0010_4208,
    };
}

/// Settle delays used while sequencing a gate with a reset line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettleTiming {
    /// Wait after asserting reset, before touching the clock-stop bit.
    pub reset_assert_us: u32,
    /// Wait after starting the clock, before releasing reset.
    pub clock_start_ms: u32,
}

impl SettleTiming {
    /// Hardware minimum for [`reset_assert_us`](Self::reset_assert_us).
    pub const MIN_RESET_ASSERT_US: u32 = 100;
    /// Hardware minimum for [`clock_start_ms`](Self::clock_start_ms).
    pub const MIN_CLOCK_START_MS: u32 = 10;
}

impl Default for SettleTiming {
    fn default() -> Self {
        Self {
            reset_assert_us: Self::MIN_RESET_ASSERT_US,
            clock_start_ms: Self::MIN_CLOCK_START_MS,
        }
    }
}

/// SCU configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScuConfig {
    /// Crystal reference (`clkin`) in Hz.
    pub crystal: u32,
    /// USB2 port 1 PHY reference (`usb-phy-40m`) in Hz.
    pub usb_phy: u32,
    /// Off-chip clock inputs.
    pub external: ExternalInputs,
    /// UART clock source override.
    ///
    /// Bits \[5:0\] go to SCU310\[5:0\] (UART1–6), bits \[12:6\] to
    /// SCU314\[12:6\] (UART7–13). A set bit routes that UART to `huxclk`.
    /// Zero leaves the hardware reset value untouched.
    pub uart_clock_source: u32,
    /// MAC1/2 delay words.
    pub mac12: MacDelays,
    /// MAC3/4 delay words.
    pub mac34: MacDelays,
    /// MAC3/4 pad driving strength (SCU458).
    pub mac34_driving: u32,
    /// Gate sequencing delays.
    pub settle: SettleTiming,
}

impl Default for ScuConfig {
    fn default() -> Self {
        Self {
            crystal: 25_000_000,
            usb_phy: 40_000_000,
            external: ExternalInputs::default(),
            uart_clock_source: 0,
            mac12: MacDelays::MAC12_DEFAULT,
            mac34: MacDelays::MAC34_DEFAULT,
            mac34_driving: 0x0A,
            settle: SettleTiming::default(),
        }
    }
}

impl ScuConfig {
    /// Reject values the hardware cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crystal == 0 {
            return Err(ConfigError::ZeroCrystal);
        }
        if self.settle.reset_assert_us < SettleTiming::MIN_RESET_ASSERT_US {
            return Err(ConfigError::ResetSettleTooShort);
        }
        if self.settle.clock_start_ms < SettleTiming::MIN_CLOCK_START_MS {
            return Err(ConfigError::ClockSettleTooShort);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ScuConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_crystal_is_rejected() {
        let cfg = ScuConfig {
            crystal: 0,
            ..ScuConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCrystal));
    }

    #[test]
    fn settle_times_below_minimum_are_rejected() {
        let mut cfg = ScuConfig::default();
        cfg.settle.reset_assert_us = 99;
        assert_eq!(cfg.validate(), Err(ConfigError::ResetSettleTooShort));

        let mut cfg = ScuConfig::default();
        cfg.settle.clock_start_ms = 9;
        assert_eq!(cfg.validate(), Err(ConfigError::ClockSettleTooShort));
    }

    #[test]
    fn longer_settle_times_are_allowed() {
        let mut cfg = ScuConfig::default();
        cfg.settle = SettleTiming {
            reset_assert_us: 250,
            clock_start_ms: 20,
        };
        assert!(cfg.validate().is_ok());
    }
}
