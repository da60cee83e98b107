//! Gate & reset sequencing.
//!
//! A gate has no stored state; every answer is re-derived from the clock-stop
//! and reset registers. The observed states are:
//!
//! ```text
//!                 enable()                     disable()
//! DisabledInReset ───────► Enabled ◄───────► DisabledOutOfReset
//!        │   assert reset, wait,      stop bit only,
//!        │   start clock, wait,       reset untouched
//!        │   release reset
//! ```
//!
//! A reset line that is asserted dominates: the gate reads as disabled even
//! if its clock-stop bit says running.
//!
//! The sequencer itself does not lock. [`ClockController`](crate::ClockController)
//! builds one per operation inside its critical section, so the
//! `is_enabled` check and the whole enable sequence are a single unit.

use embedded_hal::delay::DelayNs;

use crate::config::SettleTiming;
use crate::error::ClockError;
use crate::gate::{GateControl, GateSpec, Polarity, EMMC_EXTCLK_SELECTION, SD_EXTCLK_SELECTION};
use crate::regs::{bit, BankBit, RegisterMap, CLK_SELECTION1, CLK_SELECTION4, CLK_STOP_CTRL, CLK_STOP_CTRL2};
use crate::reset::{ResetController, ResetLine};

/// Observed gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GateState {
    /// Reset line asserted; the clock bit is irrelevant.
    DisabledInReset,
    /// Out of reset (or no reset line) with the clock stopped.
    DisabledOutOfReset,
    /// Out of reset with the clock running.
    Enabled,
}

/// Register and bit of a selection-mode gate.
const fn selection_bit(index: u8) -> Option<(u32, u32)> {
    match index {
        EMMC_EXTCLK_SELECTION => Some((CLK_SELECTION1, bit(15))),
        SD_EXTCLK_SELECTION => Some((CLK_SELECTION4, bit(31))),
        _ => None,
    }
}

/// One sequencing pass over borrowed registers and delay.
pub struct GateSequencer<'a, M, D> {
    regs: &'a M,
    delay: &'a mut D,
    timing: SettleTiming,
}

impl<'a, M: RegisterMap, D: DelayNs> GateSequencer<'a, M, D> {
    /// Borrow the register block and delay for one operation.
    pub fn new(regs: &'a M, delay: &'a mut D, timing: SettleTiming) -> Self {
        Self { regs, delay, timing }
    }

    fn resets(&self) -> ResetController<&'a M> {
        ResetController::new(self.regs)
    }

    fn read(&self, offset: u32) -> Result<u32, ClockError<M::Error>> {
        self.regs.read(offset).map_err(ClockError::Register)
    }

    fn write(&self, offset: u32, value: u32) -> Result<(), ClockError<M::Error>> {
        self.regs.write(offset, value).map_err(ClockError::Register)
    }

    fn clock_running(&self, stop: BankBit, polarity: Polarity) -> Result<bool, ClockError<M::Error>> {
        let value = self.read(stop.set_register(CLK_STOP_CTRL, CLK_STOP_CTRL2))?;
        let set = value & stop.mask() != 0;
        Ok(match polarity {
            Polarity::StopWhenSet => !set,
            Polarity::RunWhenSet => set,
        })
    }

    fn in_reset(&self, reset: Option<ResetLine>) -> Result<bool, ClockError<M::Error>> {
        match reset {
            Some(line) => self.resets().status(line),
            None => Ok(false),
        }
    }

    /// Observed state of gate `name`.
    pub fn state(&self, name: &'static str, spec: &GateSpec) -> Result<GateState, ClockError<M::Error>> {
        let running = match spec.control {
            GateControl::ClockStop(stop) => {
                if self.in_reset(spec.reset)? {
                    return Ok(GateState::DisabledInReset);
                }
                self.clock_running(stop, spec.polarity)?
            }
            GateControl::Selection(index) => match selection_bit(index) {
                Some((offset, mask)) => self.read(offset)? & mask != 0,
                None => {
                    warn!("gate {}: unknown selection index {}", name, index);
                    false
                }
            },
        };
        Ok(if running {
            GateState::Enabled
        } else {
            GateState::DisabledOutOfReset
        })
    }

    /// `true` when out of reset and the gate bit holds its running encoding.
    pub fn is_enabled(&self, name: &'static str, spec: &GateSpec) -> Result<bool, ClockError<M::Error>> {
        Ok(self.state(name, spec)? == GateState::Enabled)
    }

    /// Start the clock, sequencing the reset line around it.
    ///
    /// No-op if already enabled.
    pub fn enable(&mut self, name: &'static str, spec: &GateSpec) -> Result<(), ClockError<M::Error>> {
        if self.is_enabled(name, spec)? {
            trace!("gate {} already enabled", name);
            return Ok(());
        }

        let stop = match spec.control {
            GateControl::ClockStop(stop) => stop,
            GateControl::Selection(index) => {
                return Err(if selection_bit(index).is_some() {
                    warn!("gate {}: enabling a selection-mode gate is not implemented", name);
                    ClockError::SelectionEnableUnimplemented(name)
                } else {
                    warn!("gate {}: unknown selection index {}", name, index);
                    ClockError::UnsupportedSelectionMode { clock: name, index }
                });
            }
        };

        if let Some(line) = spec.reset {
            self.resets().assert(line)?;
            self.delay.delay_us(self.timing.reset_assert_us);
        }

        let running_register = match spec.polarity {
            Polarity::StopWhenSet => stop.clear_register(CLK_STOP_CTRL, CLK_STOP_CTRL2),
            Polarity::RunWhenSet => stop.set_register(CLK_STOP_CTRL, CLK_STOP_CTRL2),
        };
        self.write(running_register, stop.mask())?;

        if let Some(line) = spec.reset {
            self.delay.delay_ms(self.timing.clock_start_ms);
            self.resets().deassert(line)?;
        }

        debug!("gate {} enabled", name);
        Ok(())
    }

    /// Stop the clock. The reset line is left alone.
    pub fn disable(&mut self, name: &'static str, spec: &GateSpec) -> Result<(), ClockError<M::Error>> {
        match spec.control {
            GateControl::ClockStop(stop) => {
                let stopped_register = match spec.polarity {
                    Polarity::StopWhenSet => stop.set_register(CLK_STOP_CTRL, CLK_STOP_CTRL2),
                    Polarity::RunWhenSet => stop.clear_register(CLK_STOP_CTRL, CLK_STOP_CTRL2),
                };
                self.write(stopped_register, stop.mask())?;
            }
            GateControl::Selection(index) => match selection_bit(index) {
                Some((offset, mask)) => {
                    self.regs
                        .update_bits(offset, mask, 0)
                        .map_err(ClockError::Register)?;
                }
                None => {
                    warn!("gate {}: unknown selection index {}, disable ignored", name, index);
                    return Ok(());
                }
            },
        }
        debug!("gate {} disabled", name);
        Ok(())
    }

    /// `true` if the plain gate bit is set.
    pub fn bit_is_set(&self, offset: u32, bit_index: u8) -> Result<bool, ClockError<M::Error>> {
        Ok(self.read(offset)? & bit(bit_index) != 0)
    }

    /// Set or clear a plain gate bit.
    pub fn set_bit(&mut self, name: &'static str, offset: u32, bit_index: u8, on: bool) -> Result<(), ClockError<M::Error>> {
        let mask = bit(bit_index);
        self.regs
            .update_bits(offset, mask, if on { mask } else { 0 })
            .map_err(ClockError::Register)?;
        trace!("bit gate {} -> {}", name, on);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::gate::GateDescriptor;
    use crate::mocks::{Access, MockScu};
    use crate::node::ClockFlags;

    fn spec(clock: u8, reset: Option<u8>) -> GateSpec {
        GateDescriptor {
            clock,
            reset,
            name: "test-gate",
            parent: None,
            flags: ClockFlags::NONE,
        }
        .spec()
        .unwrap()
    }

    #[test]
    fn enable_with_reset_follows_the_documented_order() {
        let scu = MockScu::new();
        // MAC1: clock bit 20 stopped, reset 11 asserted
        scu.set(CLK_STOP_CTRL, 1 << 20);
        scu.set(crate::regs::RESET_CTRL, 1 << 11);
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());

        scu.clear_log();
        seq.enable("mac1clk-gate", &spec(20, Some(11))).unwrap();

        let events: Vec<_> = scu
            .log()
            .into_iter()
            .filter(|a| !matches!(a, Access::Read { .. }))
            .collect();
        assert_eq!(
            events,
            [
                Access::Write { offset: 0x40, value: 1 << 11 },
                Access::Delay { ns: 100_000 },
                Access::Write { offset: 0x84, value: 1 << 20 },
                Access::Delay { ns: 10_000_000 },
                Access::Write { offset: 0x44, value: 1 << 11 },
            ]
        );
        assert!(seq.is_enabled("mac1clk-gate", &spec(20, Some(11))).unwrap());
    }

    #[test]
    fn enable_without_reset_only_touches_the_stop_bit() {
        let scu = MockScu::new();
        scu.set(CLK_STOP_CTRL2, 1 << 16);
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        scu.clear_log();

        seq.enable("uart1clk-gate", &spec(48, None)).unwrap();
        assert_eq!(scu.writes(), [(0x94, 1 << 16)]);
        assert!(!scu.log().iter().any(|a| matches!(a, Access::Delay { .. })));
    }

    #[test]
    fn enable_is_idempotent() {
        let scu = MockScu::new();
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        // bit clear, reset clear: already running
        scu.clear_log();
        seq.enable("mac1clk-gate", &spec(20, Some(11))).unwrap();
        assert!(scu.writes().is_empty());
    }

    #[test]
    fn asserted_reset_dominates_the_stop_bit() {
        let scu = MockScu::new();
        scu.set(crate::regs::RESET_CTRL2, 1 << 20);
        let mut delay = scu.delay();
        let seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        let mac3 = spec(52, Some(52));

        assert_eq!(seq.state("mac3clk-gate", &mac3).unwrap(), GateState::DisabledInReset);
        assert!(!seq.is_enabled("mac3clk-gate", &mac3).unwrap());
    }

    #[test]
    fn disable_never_touches_reset() {
        let scu = MockScu::new();
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        seq.disable("mac1clk-gate", &spec(20, Some(11))).unwrap();

        assert_eq!(scu.writes(), [(0x80, 1 << 20)]);
        assert_eq!(
            seq.state("mac1clk-gate", &spec(20, Some(11))).unwrap(),
            GateState::DisabledOutOfReset
        );
    }

    #[test]
    fn usb_port1_runs_when_set() {
        let scu = MockScu::new();
        scu.set(crate::regs::RESET_CTRL, 1 << 14);
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        let port1 = spec(14, Some(14));

        seq.enable("usb-port1-gate", &port1).unwrap();
        assert_eq!(scu.peek(CLK_STOP_CTRL) & (1 << 14), 1 << 14);
        assert!(seq.is_enabled("usb-port1-gate", &port1).unwrap());

        seq.disable("usb-port1-gate", &port1).unwrap();
        assert_eq!(scu.peek(CLK_STOP_CTRL) & (1 << 14), 0);
        assert_eq!(scu.writes().last(), Some(&(0x84, 1 << 14)));
    }

    #[test]
    fn selection_gate_reads_and_clears_its_bit() {
        let scu = MockScu::new();
        scu.set(CLK_SELECTION1, 1 << 15 | 0x7);
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        let emmc = spec(64, None);

        assert!(seq.is_enabled("emmc-extclk-gate", &emmc).unwrap());
        seq.enable("emmc-extclk-gate", &emmc).unwrap();
        seq.disable("emmc-extclk-gate", &emmc).unwrap();
        assert_eq!(scu.peek(CLK_SELECTION1), 0x7);
        assert!(!seq.is_enabled("emmc-extclk-gate", &emmc).unwrap());
    }

    #[test]
    fn selection_enable_is_refused_without_writing() {
        let scu = MockScu::new();
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        scu.clear_log();

        assert_eq!(
            seq.enable("sd-extclk-gate", &spec(65, None)),
            Err(ClockError::SelectionEnableUnimplemented("sd-extclk-gate"))
        );
        assert!(scu.writes().is_empty());
    }

    #[test]
    fn unknown_selection_index_is_a_logged_no_op() {
        let scu = MockScu::new();
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());
        let odd = spec(0x42, None);

        assert!(!seq.is_enabled("odd", &odd).unwrap());
        assert_eq!(seq.disable("odd", &odd), Ok(()));
        assert_eq!(
            seq.enable("odd", &odd),
            Err(ClockError::UnsupportedSelectionMode { clock: "odd", index: 0x42 })
        );
        assert!(scu.writes().is_empty());
    }

    #[test]
    fn register_failure_aborts_the_sequence() {
        let scu = MockScu::new();
        scu.set(CLK_STOP_CTRL, 1 << 20);
        scu.fail_on(CLK_STOP_CTRL + 4);
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());

        let result = seq.enable("mac1clk-gate", &spec(20, Some(11)));
        assert!(matches!(result, Err(ClockError::Register(e)) if e.offset == 0x84));
        // reset was asserted and is left asserted for the caller to retry
        assert_eq!(scu.peek(crate::regs::RESET_CTRL), 1 << 11);
    }

    #[test]
    fn bit_gate_sets_and_clears() {
        let scu = MockScu::new();
        let mut delay = scu.delay();
        let mut seq = GateSequencer::new(&scu, &mut delay, SettleTiming::default());

        seq.set_bit("mac1rclk", 0x340, 29, true).unwrap();
        assert!(seq.bit_is_set(0x340, 29).unwrap());
        seq.set_bit("mac1rclk", 0x340, 29, false).unwrap();
        assert!(!seq.bit_is_set(0x340, 29).unwrap());
    }
}
