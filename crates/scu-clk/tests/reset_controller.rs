//! Reset lines through the controller: bank selection, set/clear encoding,
//! range checks and error pass-through.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use scu_clk::mocks::{MockDelay, MockError, MockScu};
use scu_clk::regs::{RESET_CTRL, RESET_CTRL2};
use scu_clk::{ClockController, ClockError, ResetController, ResetLine, ScuConfig};

type Controller = ClockController<MockScu, MockDelay, CriticalSectionRawMutex>;

fn probe() -> (MockScu, Controller) {
    let scu = MockScu::ast2600_a1();
    let clocks = Controller::probe(scu.clone(), scu.delay(), &ScuConfig::default()).unwrap();
    scu.clear_log();
    (scu, clocks)
}

/// Lines 0-31 use SCU040/044, lines 32-63 use SCU050/054.
#[test]
fn lines_map_to_their_bank() {
    for id in 0..64u8 {
        let scu = MockScu::new();
        let resets = ResetController::new(scu.clone());
        let line = ResetLine::new(id).unwrap();
        resets.assert(line).unwrap();
        resets.deassert(line).unwrap();

        let bank = if id < 32 { RESET_CTRL } else { RESET_CTRL2 };
        let mask = 1u32 << (id % 32);
        assert_eq!(scu.writes(), [(bank, mask), (bank + 4, mask)], "line {id}");
    }
}

/// Assert then status reads true; deassert then status reads false.
#[test]
fn status_follows_assert_and_deassert() {
    let (_, clocks) = probe();
    for id in [0u8, 11, 31, 32, 40, 63] {
        clocks.assert_reset(id).unwrap();
        assert!(clocks.reset_status(id).unwrap(), "line {id}");
        clocks.deassert_reset(id).unwrap();
        assert!(!clocks.reset_status(id).unwrap(), "line {id}");
    }
}

/// Reset operations never disturb neighbouring lines.
#[test]
fn neighbours_are_untouched() {
    let (scu, clocks) = probe();
    let before = (scu.peek(RESET_CTRL), scu.peek(RESET_CTRL2));
    clocks.deassert_reset(11).unwrap();
    clocks.assert_reset(11).unwrap();
    clocks.deassert_reset(52).unwrap();
    clocks.assert_reset(52).unwrap();
    assert_eq!((scu.peek(RESET_CTRL), scu.peek(RESET_CTRL2)), before);
}

/// Ids past 63 are rejected before any register access.
#[test]
fn out_of_range_ids_are_rejected() {
    let (scu, clocks) = probe();
    for id in [64u8, 100, u8::MAX] {
        assert_eq!(clocks.assert_reset(id), Err(ClockError::InvalidResetLine(id)));
        assert_eq!(clocks.deassert_reset(id), Err(ClockError::InvalidResetLine(id)));
        assert_eq!(clocks.reset_status(id), Err(ClockError::InvalidResetLine(id)));
    }
    assert!(scu.log().is_empty());
}

/// The backend's error comes back unchanged.
#[test]
fn register_errors_pass_through() {
    let (scu, clocks) = probe();
    scu.fail_on(RESET_CTRL2 + 4);
    assert_eq!(
        clocks.deassert_reset(40),
        Err(ClockError::Register(MockError {
            offset: RESET_CTRL2 + 4
        }))
    );
    // the other direction and the other bank still work
    clocks.assert_reset(40).unwrap();
    clocks.deassert_reset(8).unwrap();
}

/// Reset state is shared with the gate view: asserting a gate's line makes
/// the gate read disabled without touching its clock bit.
#[test]
fn reset_is_visible_to_gates() {
    let (scu, clocks) = probe();
    clocks.enable("sdclk-gate").unwrap();
    scu.clear_log();

    clocks.assert_reset(56).unwrap();
    assert!(!clocks.is_enabled("sdclk-gate").unwrap());
    assert_eq!(scu.writes(), [(RESET_CTRL2, 1 << 24)]);
}
