//! `cargo xtask dump-tree`: probe a register snapshot and print the clock tree.
//!
//! The snapshot is a JSON object with a `registers` map of SCU offset to
//! value. Offsets and values may be integers or `"0x..."` strings, so a dump
//! taken with `devmem` can be pasted in directly:
//!
//! ```json
//! { "registers": { "0x004": "0x05010303", "0x200": "0x408F" } }
//! ```
//!
//! Without a snapshot the built-in AST2600 A1 reference board is used.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use scu_clk::mocks::{MockDelay, MockScu};
use scu_clk::{ClockController, ClockKind, ExternalInputs, GateState, ScuConfig};
use serde::{Deserialize, Serialize};

type Controller = ClockController<MockScu, MockDelay, NoopRawMutex>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Word {
    Int(u32),
    Hex(String),
}

impl Word {
    fn value(&self) -> Result<u32> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Hex(s) => parse_word(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Snapshot {
    registers: BTreeMap<String, Word>,
    crystal_hz: Option<u32>,
    d1pll_hz: Option<u32>,
    gpioc6_clkin_hz: Option<u32>,
    dp_phy_pll_hz: Option<u32>,
}

impl Snapshot {
    fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn scu(&self) -> Result<MockScu> {
        let mut words = Vec::with_capacity(self.registers.len());
        for (offset, value) in &self.registers {
            let offset = parse_word(offset)?;
            let value = value
                .value()
                .with_context(|| format!("Bad value for register {offset:#05x}"))?;
            words.push((offset, value));
        }
        Ok(MockScu::from_registers(words))
    }

    fn config(&self) -> ScuConfig {
        let defaults = ScuConfig::default();
        ScuConfig {
            crystal: self.crystal_hz.unwrap_or(defaults.crystal),
            external: ExternalInputs {
                d1pll: self.d1pll_hz.unwrap_or_default(),
                gpioc6_clkin: self.gpioc6_clkin_hz.unwrap_or_default(),
                dp_phy_pll: self.dp_phy_pll_hz.unwrap_or_default(),
            },
            ..defaults
        }
    }
}

fn parse_word(s: &str) -> Result<u32> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("'{s}' is not a 32-bit register word"))
}

/// One line of output.
#[derive(Debug, Serialize)]
struct Row {
    name: &'static str,
    kind: &'static str,
    parents: Vec<&'static str>,
    rate_hz: Option<u32>,
    state: &'static str,
    critical: bool,
    error: Option<String>,
}

fn state_label(state: GateState) -> &'static str {
    match state {
        GateState::Enabled => "on",
        GateState::DisabledOutOfReset => "off",
        GateState::DisabledInReset => "reset",
    }
}

fn collect(clocks: &Controller) -> Vec<Row> {
    let registry = clocks.registry();
    registry
        .iter()
        .map(|node| {
            let parents = node
                .kind
                .parents()
                .iter()
                .filter_map(|link| link.id())
                .filter_map(|id| registry.node(id).ok())
                .map(|parent| parent.name)
                .collect();
            let (rate_hz, error) = match clocks.rate_id(node.id) {
                Ok(rate) => (Some(rate.to_hz()), None),
                Err(e) => (None, Some(e.to_string())),
            };
            let state = match (&node.kind, clocks.gate_state_id(node.id)) {
                (ClockKind::Gate { .. } | ClockKind::BitGate { .. }, Ok(state)) => state_label(state),
                (ClockKind::Gate { .. } | ClockKind::BitGate { .. }, Err(_)) => "?",
                _ => "-",
            };
            Row {
                name: node.name,
                kind: node.kind.label(),
                parents,
                rate_hz,
                state,
                critical: node.flags.is_critical(),
                error,
            }
        })
        .collect()
}

fn format_rate(hz: u32) -> String {
    if hz >= 1_000_000 {
        format!("{:.3} MHz", f64::from(hz) / 1e6)
    } else if hz >= 1_000 {
        format!("{:.3} kHz", f64::from(hz) / 1e3)
    } else {
        format!("{hz} Hz")
    }
}

fn print_table(rows: &[Row]) {
    println!(
        "{}",
        format!(
            "{:<18} {:<13} {:<16} {:>16}  {}",
            "clock", "kind", "parent", "rate", "state"
        )
        .bold()
    );
    for row in rows {
        let parent = row.parents.first().copied().unwrap_or("");
        let rate = match (row.rate_hz, &row.error) {
            (Some(hz), _) => format_rate(hz),
            (None, Some(e)) => e.clone(),
            (None, None) => String::new(),
        };
        let state = match row.state {
            "on" => row.state.green(),
            "off" => row.state.yellow(),
            "reset" => row.state.red(),
            other => other.dimmed(),
        };
        let name = if row.critical {
            format!("{}*", row.name)
        } else {
            row.name.to_string()
        };
        println!("{name:<18} {:<13} {parent:<16} {rate:>16}  {state}", row.kind);
    }
    println!();
    println!("{}", "  * critical: never gated off".dimmed());
}

pub fn run(snapshot: Option<&Path>, json: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (scu, config) = match snapshot {
        Some(path) => {
            let snapshot = Snapshot::load(path)?;
            (snapshot.scu()?, snapshot.config())
        }
        None => (MockScu::ast2600_a1(), ScuConfig::default()),
    };

    let delay = scu.delay();
    let clocks =
        Controller::probe(scu, delay, &config).map_err(|e| anyhow::anyhow!("clock probe failed: {e}"))?;
    let rows = collect(&clocks);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!();
        println!(
            "{}",
            format!("🕓 {} clocks", rows.len()).cyan().bold()
        );
        println!();
        print_table(&rows);
    }
    Ok(())
}
