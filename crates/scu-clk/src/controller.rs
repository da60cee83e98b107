//! Clock controller: the one object peripheral drivers talk to.
//!
//! Owns the register handle, the finalized node table, and the lock. Every
//! operation (gate sequencing, reset control, rate queries) runs inside one
//! critical section, so read-modify-write sequences on control words shared by
//! several gates never interleave.
//!
//! Dropping the controller drops the table and the lock together.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;

use crate::config::{ScuConfig, SettleTiming};
use crate::error::{ClockError, TopologyError};
use crate::init::ScuInit;
use crate::node::{ClockId, ClockKind, ClockNode, Hertz};
use crate::registry::ClockRegistry;
use crate::regs::RegisterMap;
use crate::reset::{ResetController, ResetLine};
use crate::sequencer::{GateSequencer, GateState};
use crate::topology;

/// Clock and reset controller.
///
/// - `M`: register backend
/// - `D`: settle delay, busy-waited inside the lock
/// - `R`: raw mutex guarding register sequences
pub struct ClockController<M, D = embassy_time::Delay, R: RawMutex = CriticalSectionRawMutex> {
    scu: M,
    registry: ClockRegistry,
    timing: SettleTiming,
    lock: Mutex<R, RefCell<D>>,
}

impl<M, D, R> ClockController<M, D, R>
where
    M: RegisterMap,
    D: DelayNs,
    R: RawMutex,
{
    /// Assemble a controller from an already finalized registry.
    pub fn new(scu: M, delay: D, registry: ClockRegistry, timing: SettleTiming) -> Result<Self, TopologyError> {
        if !registry.is_finalized() {
            return Err(TopologyError::NotFinalized);
        }
        Ok(Self {
            scu,
            registry,
            timing,
            lock: Mutex::new(RefCell::new(delay)),
        })
    }

    /// Validate `config`, program the SCU defaults, build and finalize the
    /// topology.
    pub fn probe(scu: M, delay: D, config: &ScuConfig) -> Result<Self, ClockError<M::Error>> {
        config.validate().map_err(TopologyError::from)?;
        let lock = Mutex::new(RefCell::new(delay));
        let registry = lock.lock(|_| {
            ScuInit::new(config).apply(&scu).map_err(ClockError::Register)?;
            let mut registry = topology::build(&scu, config)?;
            registry.finalize()?;
            Ok::<_, ClockError<M::Error>>(registry)
        });
        let registry = match registry {
            Ok(registry) => registry,
            Err(e) => {
                error!("clock probe failed");
                return Err(e);
            }
        };
        Ok(Self {
            scu,
            registry,
            timing: config.settle,
            lock,
        })
    }

    /// The node table.
    pub fn registry(&self) -> &ClockRegistry {
        &self.registry
    }

    /// Id of clock `name`.
    pub fn lookup(&self, name: &str) -> Result<ClockId, TopologyError> {
        self.registry.lookup(name)
    }

    /// Release the register handle, delay, and node table.
    pub fn into_parts(self) -> (M, D, ClockRegistry) {
        (self.scu, self.lock.into_inner().into_inner(), self.registry)
    }

    fn locked<T>(
        &self,
        f: impl FnOnce(&mut GateSequencer<'_, M, D>) -> Result<T, ClockError<M::Error>>,
    ) -> Result<T, ClockError<M::Error>> {
        self.lock.lock(|cell| {
            let mut delay = cell.borrow_mut();
            let mut seq = GateSequencer::new(&self.scu, &mut *delay, self.timing);
            f(&mut seq)
        })
    }

    fn ready_node(&self, id: ClockId) -> Result<&ClockNode, ClockError<M::Error>> {
        let node = self.registry.node(id)?;
        if node.is_ready() {
            Ok(node)
        } else {
            Err(ClockError::NotReady(node.name))
        }
    }

    /// Enable clock `name`. Ungated clocks are always running and succeed.
    pub fn enable(&self, name: &str) -> Result<(), ClockError<M::Error>> {
        self.enable_id(self.lookup(name)?)
    }

    /// [`enable`](Self::enable) by id.
    pub fn enable_id(&self, id: ClockId) -> Result<(), ClockError<M::Error>> {
        let node = self.ready_node(id)?;
        match &node.kind {
            ClockKind::Gate { spec, .. } => self.locked(|seq| seq.enable(node.name, spec)),
            ClockKind::BitGate { offset, bit, .. } => self.locked(|seq| seq.set_bit(node.name, *offset, *bit, true)),
            ClockKind::FixedRate { .. }
            | ClockKind::FixedFactor { .. }
            | ClockKind::DividerTable { .. }
            | ClockKind::Mux { .. } => Ok(()),
        }
    }

    /// Disable clock `name`.
    ///
    /// Refuses critical clocks and clocks without a gate.
    pub fn disable(&self, name: &str) -> Result<(), ClockError<M::Error>> {
        self.disable_id(self.lookup(name)?)
    }

    /// [`disable`](Self::disable) by id.
    pub fn disable_id(&self, id: ClockId) -> Result<(), ClockError<M::Error>> {
        let node = self.ready_node(id)?;
        if node.flags.is_critical() {
            warn!("refusing to disable critical clock {}", node.name);
            return Err(ClockError::Critical(node.name));
        }
        match &node.kind {
            ClockKind::Gate { spec, .. } => self.locked(|seq| seq.disable(node.name, spec)),
            ClockKind::BitGate { offset, bit, .. } => self.locked(|seq| seq.set_bit(node.name, *offset, *bit, false)),
            ClockKind::FixedRate { .. }
            | ClockKind::FixedFactor { .. }
            | ClockKind::DividerTable { .. }
            | ClockKind::Mux { .. } => Err(ClockError::NotGateable(node.name)),
        }
    }

    /// `true` if clock `name` is running.
    pub fn is_enabled(&self, name: &str) -> Result<bool, ClockError<M::Error>> {
        self.is_enabled_id(self.lookup(name)?)
    }

    /// [`is_enabled`](Self::is_enabled) by id.
    pub fn is_enabled_id(&self, id: ClockId) -> Result<bool, ClockError<M::Error>> {
        Ok(self.gate_state_id(id)? == GateState::Enabled)
    }

    /// Observed state of clock `name`.
    pub fn gate_state(&self, name: &str) -> Result<GateState, ClockError<M::Error>> {
        self.gate_state_id(self.lookup(name)?)
    }

    /// [`gate_state`](Self::gate_state) by id.
    pub fn gate_state_id(&self, id: ClockId) -> Result<GateState, ClockError<M::Error>> {
        let node = self.ready_node(id)?;
        match &node.kind {
            ClockKind::Gate { spec, .. } => self.locked(|seq| seq.state(node.name, spec)),
            ClockKind::BitGate { offset, bit, .. } => self.locked(|seq| {
                Ok(if seq.bit_is_set(*offset, *bit)? {
                    GateState::Enabled
                } else {
                    GateState::DisabledOutOfReset
                })
            }),
            ClockKind::FixedRate { .. }
            | ClockKind::FixedFactor { .. }
            | ClockKind::DividerTable { .. }
            | ClockKind::Mux { .. } => Ok(GateState::Enabled),
        }
    }

    /// Current rate of clock `name`, re-derived from the registers.
    pub fn rate(&self, name: &str) -> Result<Hertz, ClockError<M::Error>> {
        self.rate_id(self.lookup(name)?)
    }

    /// [`rate`](Self::rate) by id.
    pub fn rate_id(&self, id: ClockId) -> Result<Hertz, ClockError<M::Error>> {
        self.lock.lock(|_| self.registry.rate(&self.scu, id))
    }

    fn reset_line(id: u8) -> Result<ResetLine, ClockError<M::Error>> {
        ResetLine::new(id).ok_or(ClockError::InvalidResetLine(id))
    }

    /// Put reset line `id` (0–63) into reset.
    pub fn assert_reset(&self, id: u8) -> Result<(), ClockError<M::Error>> {
        let line = Self::reset_line(id)?;
        self.lock.lock(|_| ResetController::new(&self.scu).assert(line))
    }

    /// Take reset line `id` (0–63) out of reset.
    pub fn deassert_reset(&self, id: u8) -> Result<(), ClockError<M::Error>> {
        let line = Self::reset_line(id)?;
        self.lock.lock(|_| ResetController::new(&self.scu).deassert(line))
    }

    /// `true` while reset line `id` (0–63) is asserted.
    pub fn reset_status(&self, id: u8) -> Result<bool, ClockError<M::Error>> {
        let line = Self::reset_line(id)?;
        self.lock.lock(|_| ResetController::new(&self.scu).status(line))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::mocks::{MockDelay, MockScu};
    use crate::node::{ClockFlags, Link};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Controller = ClockController<MockScu, MockDelay, NoopRawMutex>;

    fn probe() -> (MockScu, Controller) {
        let scu = MockScu::ast2600_a1();
        let clocks = Controller::probe(scu.clone(), scu.delay(), &ScuConfig::default()).unwrap();
        (scu, clocks)
    }

    #[test]
    fn unfinalized_registry_is_refused() {
        let scu = MockScu::new();
        let registry = ClockRegistry::new();
        assert!(matches!(
            Controller::new(scu.clone(), scu.delay(), registry, SettleTiming::default()),
            Err(TopologyError::NotFinalized)
        ));
    }

    #[test]
    fn invalid_config_fails_probe_before_touching_registers() {
        let scu = MockScu::ast2600_a1();
        let mut cfg = ScuConfig::default();
        cfg.settle.clock_start_ms = 1;
        let result = Controller::probe(scu.clone(), scu.delay(), &cfg);
        assert!(matches!(
            result,
            Err(ClockError::Topology(TopologyError::Config(_)))
        ));
        assert!(scu.log().is_empty());
    }

    #[test]
    fn probe_rates_match_the_reference_board() {
        let (_, clocks) = probe();
        assert_eq!(clocks.rate("clkin").unwrap(), Hertz::mhz(25));
        assert_eq!(clocks.rate("hpll").unwrap(), Hertz::mhz(1200));
        assert_eq!(clocks.rate("mpll").unwrap(), Hertz::mhz(800));
        assert_eq!(clocks.rate("ahb").unwrap(), Hertz::mhz(200));
        assert_eq!(clocks.rate("hclk").unwrap(), Hertz::mhz(200));
        assert_eq!(clocks.rate("apb1").unwrap(), Hertz::mhz(300));
        assert_eq!(clocks.rate("apb2").unwrap(), Hertz::mhz(100));
        // d1clk comes from dp-phy-pll after init; not wired on this board
        assert_eq!(clocks.rate("d1clk").unwrap(), Hertz(0));
        // eMMC: MPLL through the SD table, encoding 0
        assert_eq!(clocks.rate("emmc-extclk").unwrap(), Hertz::mhz(400));
        // gates without a parent report 0 Hz
        assert_eq!(clocks.rate("gclk-gate").unwrap(), Hertz(0));
        assert_eq!(clocks.rate("mac1clk-gate").unwrap(), clocks.rate("mac12").unwrap());
    }

    #[test]
    fn ungated_clocks_are_always_enabled_and_cannot_be_disabled() {
        let (_, clocks) = probe();
        assert_eq!(clocks.enable("ahb"), Ok(()));
        assert!(clocks.is_enabled("ahb").unwrap());
        assert_eq!(clocks.disable("ahb"), Err(ClockError::NotGateable("ahb")));
    }

    #[test]
    fn critical_clock_disable_is_refused_without_writes() {
        let (scu, clocks) = probe();
        scu.clear_log();
        assert_eq!(clocks.disable("mclk-gate"), Err(ClockError::Critical("mclk-gate")));
        assert!(scu.writes().is_empty());
        assert!(clocks.is_enabled("mclk-gate").unwrap());
    }

    #[test]
    fn unknown_clock_name() {
        let (_, clocks) = probe();
        assert_eq!(
            clocks.enable("no-such-clock"),
            Err(ClockError::Topology(TopologyError::UnknownClock))
        );
    }

    #[test]
    fn bit_gates_follow_their_register_bit() {
        let (scu, clocks) = probe();
        clocks.enable("mac2rclk").unwrap();
        assert_ne!(scu.peek(crate::regs::MAC12_CLK_CTRL0) & (1 << 30), 0);
        assert!(clocks.is_enabled("mac2rclk").unwrap());
        clocks.disable("mac2rclk").unwrap();
        assert!(!clocks.is_enabled("mac2rclk").unwrap());
        assert_eq!(clocks.rate("mac2rclk").unwrap(), Hertz::mhz(50));
    }

    #[test]
    fn reset_operations_validate_the_line() {
        let (_, clocks) = probe();
        assert_eq!(clocks.assert_reset(64), Err(ClockError::InvalidResetLine(64)));
        clocks.deassert_reset(53).unwrap();
        assert!(!clocks.reset_status(53).unwrap());
        clocks.assert_reset(53).unwrap();
        assert!(clocks.reset_status(53).unwrap());
        assert_eq!(clocks.gate_state("mac4clk-gate").unwrap(), GateState::DisabledInReset);
    }

    #[test]
    fn selection_gate_enable_is_explicitly_unimplemented() {
        let (_, clocks) = probe();
        assert_eq!(
            clocks.enable("sd-extclk-gate"),
            Err(ClockError::SelectionEnableUnimplemented("sd-extclk-gate"))
        );
    }

    #[test]
    fn into_parts_returns_the_registry() {
        let (_, clocks) = probe();
        let (_, _, registry) = clocks.into_parts();
        assert!(registry.is_finalized());
        let ahb = registry.get("ahb").unwrap();
        assert_eq!(ahb.flags, ClockFlags::NONE);
        assert!(matches!(ahb.kind.parents(), [Link::Resolved(_)]));
    }
}
