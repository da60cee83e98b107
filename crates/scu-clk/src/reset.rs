//! Reset controller.
//!
//! 64 reset lines across two banks of 32. Line `n` is bit `n % 32` of
//! SCU040 (n < 32) or SCU050 (n ≥ 32). Writing the bit to the bank register
//! asserts the line, writing it to the register 4 bytes above deasserts it.

use crate::error::ClockError;
use crate::regs::{BankBit, RegisterMap, RESET_CTRL, RESET_CTRL2};

/// Reset line id 0–63.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetLine(BankBit);

impl ResetLine {
    /// Line `id`, or `None` if `id >= 64`.
    pub const fn new(id: u8) -> Option<Self> {
        match BankBit::new(id) {
            Some(bit) => Some(Self(bit)),
            None => None,
        }
    }

    /// Line id.
    pub const fn id(self) -> u8 {
        self.0.index()
    }

    /// Assert register of this line's bank.
    pub const fn assert_register(self) -> u32 {
        self.0.set_register(RESET_CTRL, RESET_CTRL2)
    }

    /// Deassert (write-one-to-clear) register of this line's bank.
    pub const fn deassert_register(self) -> u32 {
        self.0.clear_register(RESET_CTRL, RESET_CTRL2)
    }

    /// Bit mask within the bank.
    pub const fn mask(self) -> u32 {
        self.0.mask()
    }
}

/// Assert / deassert / status over the two reset banks.
///
/// Holds no state: every answer comes from the registers. Callers that share
/// the register block with the gate sequencer go through
/// [`ClockController`](crate::ClockController), which serializes both.
pub struct ResetController<M> {
    regs: M,
}

impl<M: RegisterMap> ResetController<M> {
    /// Wrap a register handle.
    pub const fn new(regs: M) -> Self {
        Self { regs }
    }

    /// Put the line into reset.
    pub fn assert(&self, line: ResetLine) -> Result<(), ClockError<M::Error>> {
        trace!("reset {} assert", line.id());
        self.regs
            .write(line.assert_register(), line.mask())
            .map_err(ClockError::Register)
    }

    /// Take the line out of reset.
    pub fn deassert(&self, line: ResetLine) -> Result<(), ClockError<M::Error>> {
        trace!("reset {} deassert", line.id());
        self.regs
            .write(line.deassert_register(), line.mask())
            .map_err(ClockError::Register)
    }

    /// `true` while the line is held in reset.
    pub fn status(&self, line: ResetLine) -> Result<bool, ClockError<M::Error>> {
        let value = self
            .regs
            .read(line.assert_register())
            .map_err(ClockError::Register)?;
        Ok(value & line.mask() != 0)
    }

    /// Release the register handle.
    pub fn into_inner(self) -> M {
        self.regs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::mocks::{Access, MockScu};

    fn line(id: u8) -> ResetLine {
        ResetLine::new(id).unwrap()
    }

    #[test]
    fn ids_above_63_are_rejected() {
        assert!(ResetLine::new(63).is_some());
        assert!(ResetLine::new(64).is_none());
    }

    #[test]
    fn bank_one_lines_use_the_second_register_pair() {
        assert_eq!(line(52).assert_register(), 0x50);
        assert_eq!(line(52).deassert_register(), 0x54);
        assert_eq!(line(52).mask(), 1 << 20);
        assert_eq!(line(11).assert_register(), 0x40);
        assert_eq!(line(11).deassert_register(), 0x44);
    }

    #[test]
    fn assert_then_deassert_round_trips_status() {
        let scu = MockScu::new();
        let resets = ResetController::new(&scu);

        resets.assert(line(40)).unwrap();
        assert!(resets.status(line(40)).unwrap());
        assert!(!resets.status(line(41)).unwrap());

        resets.deassert(line(40)).unwrap();
        assert!(!resets.status(line(40)).unwrap());
    }

    #[test]
    fn deassert_writes_only_the_clear_register() {
        let scu = MockScu::new();
        let resets = ResetController::new(&scu);
        resets.deassert(line(3)).unwrap();
        assert_eq!(
            scu.log(),
            [Access::Write {
                offset: 0x44,
                value: 1 << 3
            }]
        );
    }

    #[test]
    fn register_failure_is_passed_through() {
        let scu = MockScu::new();
        scu.fail_on(0x50);
        let resets = ResetController::new(&scu);
        assert!(matches!(
            resets.status(line(32)),
            Err(ClockError::Register(e)) if e.offset == 0x50
        ));
    }
}
