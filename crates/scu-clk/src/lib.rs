//! Clock and reset controller for the AST2600 System Control Unit (SCU)
//!
//! This crate models the SoC's derived-clock tree (crystal, PLLs, bus
//! dividers and muxes, gated peripheral clocks) and the reset lines coupled
//! to those gates. Everything is reachable through the SCU's register-mapped
//! control words, which are shared between many logical clocks.
//!
//! # Architecture Layers
//!
//! ```text
//! Peripheral drivers  (enable/disable/is_enabled/rate by name, reset by id)
//!         ↓
//! ClockController     (owns register handle + lock + node table)
//!         ↓
//! Gate sequencer / Reset controller / rate evaluation
//!         ↓
//! RegisterMap         (MMIO on hardware, MockScu on the host)
//! ```
//!
//! # Construction order
//!
//! Nodes are registered once, leaf first:
//! crystal → PLLs → bus dividers/muxes → peripheral gates.
//! Later nodes name earlier ones as parents, so the order is a hard
//! precondition of [`topology::build`].
//!
//! # Features
//!
//! - `std` (default): `std::error::Error` impls and the `mocks` register file
//! - `defmt`: defmt logging and `defmt::Format` derives (firmware builds)
//! - `tracing`: tracing logging (host tooling)
//!
//! # Example
//!
//! ```
//! use scu_clk::mocks::{MockDelay, MockScu};
//! use scu_clk::{ClockController, ScuConfig};
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!
//! let scu = MockScu::ast2600_a1();
//! let delay = scu.delay();
//! let clocks: ClockController<MockScu, MockDelay, CriticalSectionRawMutex> =
//!     ClockController::probe(scu, delay, &ScuConfig::default()).unwrap();
//!
//! clocks.enable("mac1clk-gate").unwrap();
//! assert!(clocks.is_enabled("mac1clk-gate").unwrap());
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this register-level driver crate:
#![allow(clippy::doc_markdown)] // register names (SCU300, HPLL) in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
mod log;

pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod init;
pub mod mocks;
pub mod node;
pub mod pll;
pub mod regs;
pub mod registry;
pub mod reset;
pub mod sequencer;
pub mod tables;
pub mod topology;

pub use config::{ExternalInputs, MacDelays, ScuConfig, SettleTiming};
pub use controller::ClockController;
pub use error::{ClockError, ConfigError, TopologyError};
pub use gate::{GateControl, GateDescriptor, GateSpec, Polarity};
pub use node::{ClockFlags, ClockId, ClockKind, ClockNode, Hertz, Link};
pub use pll::{compute_ratio, PllFlavor, PllRatio};
pub use regs::{BankBit, Field, MmioError, MmioScu, RegisterMap};
pub use registry::ClockRegistry;
pub use reset::{ResetController, ResetLine};
pub use sequencer::GateState;
pub use tables::DividerTable;
