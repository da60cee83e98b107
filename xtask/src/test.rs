use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// Integration test targets under `crates/scu-clk/tests/`.
const INTEGRATION_TARGETS: &[&str] = &[
    "topology",
    "sequencing",
    "reset_controller",
    "concurrency",
    "pll_proptest",
];

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running scu-clk tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        let start = Instant::now();
        println!("{}", "  Running unit tests...".cyan());
        let output = cargo_test(&["--lib"]).context("Failed to run unit tests")?;
        report("Unit tests", &output, start)?;
    }

    if !unit_only {
        for target in INTEGRATION_TARGETS {
            let start = Instant::now();
            println!("{}", format!("  Running {target}...").cyan());
            let output = cargo_test(&["--test", target])
                .with_context(|| format!("Failed to run {target}"))?;
            report(target, &output, start)?;
        }
    }

    // Doc tests cover the crate-level controller example.
    println!("{}", "  Running doc tests...".cyan());
    let doc_start = Instant::now();
    let doc_output = cargo_test(&["--doc"]).context("Failed to run doc tests")?;
    if !doc_output.status.success() {
        eprintln!("{}", "  ⚠ Doc tests failed".yellow().bold());
    } else {
        println!(
            "{}",
            format!(
                "  ✓ Doc tests passed {} in {:.2}s",
                extract_test_summary(&String::from_utf8_lossy(&doc_output.stdout)),
                doc_start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn cargo_test(extra: &[&str]) -> std::io::Result<Output> {
    Command::new("cargo")
        .args(["test", "-p", "scu-clk"])
        .args(extra)
        .output()
}

fn report(label: &str, output: &Output, start: Instant) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {}", line);
        }
        anyhow::bail!("{label} failed");
    }
    println!(
        "{}",
        format!(
            "  ✓ {label} passed {} in {:.2}s",
            extract_test_summary(&stdout),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

fn extract_test_summary(output: &str) -> String {
    // "test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out"
    for line in output.lines() {
        if let Some(summary) = line.split("test result:").nth(1) {
            return summary.trim().to_string();
        }
    }
    "(summary not available)".to_string()
}
