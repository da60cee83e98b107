use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Firmware target the driver must keep building for.
pub const NO_STD_TARGET: &str = "thumbv7em-none-eabihf";

/// One `cargo` invocation that must succeed.
struct Build {
    label: &'static str,
    args: &'static [&'static str],
}

const BUILDS: &[Build] = &[
    Build {
        label: "host build (std, mocks)",
        args: &["check", "-p", "scu-clk", "--all-targets"],
    },
    Build {
        label: "host build (tracing)",
        args: &["check", "-p", "scu-clk", "--features", "tracing"],
    },
    Build {
        label: "firmware build (no_std)",
        args: &[
            "check",
            "-p",
            "scu-clk",
            "--target",
            NO_STD_TARGET,
            "--no-default-features",
        ],
    },
    Build {
        label: "firmware build (no_std + defmt)",
        args: &[
            "check",
            "-p",
            "scu-clk",
            "--target",
            NO_STD_TARGET,
            "--no-default-features",
            "--features",
            "defmt",
        ],
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking scu-clk builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for build in BUILDS {
        println!("{}", format!("  Checking {}...", build.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(build.args)
            .output()
            .with_context(|| format!("Failed to run cargo for {}", build.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} failed", build.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} failed", build.label);
        }

        println!(
            "{}",
            format!(
                "  ✓ {} passed in {:.2}s",
                build.label,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
    }

    // Clippy runs with the workspace lint table (no unwrap, no unchecked
    // indexing or arithmetic outside audited sites).
    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();

    let clippy_output = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .output()
        .context("Failed to run clippy")?;

    if !clippy_output.status.success() {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
    } else {
        println!(
            "{}",
            format!(
                "  ✓ Clippy passed in {:.2}s",
                clippy_start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    println!("{}", "  Checking code formatting...".cyan());

    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if !fmt_output.status.success() {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    } else {
        println!("{}", "  ✓ Formatting check passed".green());
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
