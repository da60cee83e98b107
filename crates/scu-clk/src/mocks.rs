//! In-memory SCU register file for host tests and tooling.
//!
//! [`MockScu`] models the write-one-to-set / write-one-to-clear register pairs
//! and records every access in order. [`MockDelay`] records its waits into the
//! same log, so a test can check that a reset was asserted, the clock started,
//! and the reset released with the right waits in between.
//!
//! Clones share state: hand one clone to the controller and keep one to
//! inspect the log.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects)] // host-only test double

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;

use crate::regs::{self, RegisterMap};

/// Base offsets of the set/clear register pairs.
const SET_CLEAR_PAIRS: [u32; 4] = [
    regs::RESET_CTRL,
    regs::RESET_CTRL2,
    regs::CLK_STOP_CTRL,
    regs::CLK_STOP_CTRL2,
];

/// One recorded bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Register read.
    Read {
        /// Byte offset.
        offset: u32,
    },
    /// Register write (value as written, before set/clear modelling).
    Write {
        /// Byte offset.
        offset: u32,
        /// Written word.
        value: u32,
    },
    /// Busy-wait through [`MockDelay`].
    Delay {
        /// Requested wait in nanoseconds.
        ns: u64,
    },
}

/// Injected register failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError {
    /// Offset whose access failed.
    pub offset: u32,
}

#[derive(Debug, Default)]
struct State {
    regs: BTreeMap<u32, u32>,
    log: Vec<Access>,
    failing: BTreeSet<u32>,
}

/// Shared in-memory SCU.
#[derive(Debug, Clone, Default)]
pub struct MockScu {
    state: Arc<Mutex<State>>,
}

impl MockScu {
    /// All registers zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register file seeded from `(offset, value)` pairs.
    pub fn from_registers(values: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let scu = Self::new();
        scu.lock().regs.extend(values);
        scu
    }

    /// AST2600 A1 after cold reset on the reference board.
    ///
    /// HPLL 1.2 GHz, MPLL 800 MHz, EPLL 1 GHz, DPLL 400 MHz, APLL 800 MHz, AHB
    /// 200 MHz. Critical clocks run; every other gate is stopped and held in
    /// reset where it has a reset line.
    pub fn ast2600_a1() -> Self {
        Self::from_registers([
            (regs::SILICON_REV, 0x0501_0303),
            (regs::HW_STRAP1, 0x0000_0000),
            // M=0x8F N=2 P=0 → ×48
            (regs::HPLL_PARAM, 0x0000_408F),
            // M=0x5F N=2 → ×32
            (regs::MPLL_PARAM, 0x0000_405F),
            // M=0x77 N=2 → ×40
            (regs::EPLL_PARAM, 0x0000_4077),
            // M=0x2F N=2 → ×16
            (regs::DPLL_PARAM, 0x0000_402F),
            // M=14 OD=0 N=0 → ×32
            (regs::APLL_PARAM, 14 << 5),
            (regs::UXCLK_CTRL, 0x0001_4506),
            (regs::HUXCLK_CTRL, 0x0001_45C0),
            // running: mclk, bclk, dclk, ref0clk; usb-port1 stopped (bit clear)
            (regs::CLK_STOP_CTRL, !0x0000_4071),
            // running: lclk, espiclk, ref1clk
            (regs::CLK_STOP_CTRL2, !0x0000_0007),
            (regs::RESET_CTRL, 0x0001_7ED8),
            (regs::RESET_CTRL2, 0x0930_7F80),
        ])
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite a register without logging or set/clear modelling.
    pub fn set(&self, offset: u32, value: u32) {
        self.lock().regs.insert(offset, value);
    }

    /// Read a register without logging.
    pub fn peek(&self, offset: u32) -> u32 {
        self.lock().regs.get(&offset).copied().unwrap_or(0)
    }

    /// Every later access to `offset` fails with [`MockError`].
    pub fn fail_on(&self, offset: u32) {
        self.lock().failing.insert(offset);
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Accesses recorded so far.
    pub fn log(&self) -> Vec<Access> {
        self.lock().log.clone()
    }

    /// Only the writes, in order.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.lock()
            .log
            .iter()
            .filter_map(|access| match *access {
                Access::Write { offset, value } => Some((offset, value)),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded accesses.
    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// All non-zero registers.
    pub fn registers(&self) -> BTreeMap<u32, u32> {
        self.lock()
            .regs
            .iter()
            .filter(|(_, value)| **value != 0)
            .map(|(offset, value)| (*offset, *value))
            .collect()
    }

    /// A delay source that records into this register file's log.
    pub fn delay(&self) -> MockDelay {
        MockDelay { scu: self.clone() }
    }
}

impl RegisterMap for MockScu {
    type Error = MockError;

    fn read(&self, offset: u32) -> Result<u32, Self::Error> {
        let mut state = self.lock();
        if state.failing.contains(&offset) {
            return Err(MockError { offset });
        }
        state.log.push(Access::Read { offset });
        // A clear register reads back the state of its set partner.
        let backing = match offset.checked_sub(regs::CLEAR_OFFSET) {
            Some(base) if SET_CLEAR_PAIRS.contains(&base) => base,
            _ => offset,
        };
        Ok(state.regs.get(&backing).copied().unwrap_or(0))
    }

    fn write(&self, offset: u32, value: u32) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.failing.contains(&offset) {
            return Err(MockError { offset });
        }
        state.log.push(Access::Write { offset, value });
        if SET_CLEAR_PAIRS.contains(&offset) {
            *state.regs.entry(offset).or_insert(0) |= value;
        } else if let Some(base) = offset
            .checked_sub(regs::CLEAR_OFFSET)
            .filter(|base| SET_CLEAR_PAIRS.contains(base))
        {
            *state.regs.entry(base).or_insert(0) &= !value;
        } else {
            state.regs.insert(offset, value);
        }
        Ok(())
    }
}

/// Delay that records instead of sleeping.
///
/// Yields the thread on every wait so concurrent tests interleave.
#[derive(Debug, Clone)]
pub struct MockDelay {
    scu: MockScu,
}

impl MockDelay {
    fn record(&self, ns: u64) {
        self.scu.lock().log.push(Access::Delay { ns });
        std::thread::yield_now();
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_registers_update_the_pair() {
        let scu = MockScu::new();
        scu.write(regs::CLK_STOP_CTRL, 0b1010).unwrap();
        scu.write(regs::CLK_STOP_CTRL, 0b0001).unwrap();
        assert_eq!(scu.peek(regs::CLK_STOP_CTRL), 0b1011);

        scu.write(regs::CLK_STOP_CTRL + regs::CLEAR_OFFSET, 0b0010).unwrap();
        assert_eq!(scu.peek(regs::CLK_STOP_CTRL), 0b1001);
        assert_eq!(scu.read(regs::CLK_STOP_CTRL + regs::CLEAR_OFFSET).unwrap(), 0b1001);
    }

    #[test]
    fn plain_registers_are_overwritten() {
        let scu = MockScu::new();
        scu.write(regs::CLK_SELECTION1, 0xF0).unwrap();
        scu.write(regs::CLK_SELECTION1, 0x0F).unwrap();
        assert_eq!(scu.peek(regs::CLK_SELECTION1), 0x0F);
    }

    #[test]
    fn delays_land_in_the_shared_log() {
        let scu = MockScu::new();
        let mut delay = scu.delay();
        scu.write(regs::RESET_CTRL, 1).unwrap();
        delay.delay_us(100);
        delay.delay_ms(10);
        assert_eq!(
            scu.log(),
            [
                Access::Write {
                    offset: regs::RESET_CTRL,
                    value: 1
                },
                Access::Delay { ns: 100_000 },
                Access::Delay { ns: 10_000_000 },
            ]
        );
    }

    #[test]
    fn injected_failure_is_not_logged() {
        let scu = MockScu::new();
        scu.fail_on(regs::CLK_STOP_CTRL2);
        assert_eq!(
            scu.read(regs::CLK_STOP_CTRL2),
            Err(MockError {
                offset: regs::CLK_STOP_CTRL2
            })
        );
        assert!(scu.log().is_empty());
        scu.clear_failures();
        assert!(scu.read(regs::CLK_STOP_CTRL2).is_ok());
    }
}
