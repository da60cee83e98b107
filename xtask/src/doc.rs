//! `cargo xtask doc`: build the scu-clk API docs for each log backend.
//!
//! The public surface differs by feature: `tracing` is a host build, `defmt`
//! adds `defmt::Format` derives and only builds for the firmware target. Both
//! are documented so a broken link behind either `cfg` is caught.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::check::NO_STD_TARGET;

/// Lints that fail the doc build.
const RUSTDOCFLAGS: &str = "-D rustdoc::broken_intra_doc_links \
                            -D rustdoc::private_intra_doc_links \
                            -D rustdoc::invalid_codeblock_attributes \
                            -D rustdoc::bare_urls";

/// One rustdoc pass over the driver.
struct DocBuild {
    label: &'static str,
    features: &'static str,
    /// `None` builds for the host with default features.
    target: Option<&'static str>,
}

const DOC_BUILDS: &[DocBuild] = &[
    DocBuild {
        label: "host (std + tracing)",
        features: "tracing",
        target: None,
    },
    DocBuild {
        label: "firmware (no_std + defmt)",
        features: "defmt",
        target: Some(NO_STD_TARGET),
    },
];

impl DocBuild {
    fn args(&self, open: bool) -> Vec<&'static str> {
        let mut args = vec!["doc", "-p", "scu-clk", "--no-deps", "--features", self.features];
        if let Some(target) = self.target {
            args.extend(["--target", target, "--no-default-features"]);
        }
        // Only the host pages are opened; the firmware pass is a link check.
        if open && self.target.is_none() {
            args.push("--open");
        }
        args
    }

    fn index(&self) -> String {
        match self.target {
            Some(target) => format!("target/{target}/doc/scu_clk/index.html"),
            None => "target/doc/scu_clk/index.html".to_string(),
        }
    }
}

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building scu-clk documentation...".cyan().bold());
    println!();

    for build in DOC_BUILDS {
        println!("{}", format!("  Documenting {}...", build.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(build.args(open))
            .env("RUSTDOCFLAGS", RUSTDOCFLAGS)
            .output()
            .with_context(|| format!("Failed to run cargo doc for {}", build.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} docs failed", build.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("Documentation build failed for {}", build.label);
        }

        println!(
            "{}",
            format!(
                "  ✓ {} in {:.2}s → {}",
                build.label,
                start.elapsed().as_secs_f64(),
                build.index()
            )
            .green()
        );
    }

    if !open {
        println!();
        println!("   {}", "Or run 'cargo xtask doc --open'".dimmed());
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_pass_targets_no_std_with_defmt() {
        let firmware = &DOC_BUILDS[1];
        let args = firmware.args(true);
        assert!(args.windows(2).any(|w| w == ["--features", "defmt"]));
        assert!(args.windows(2).any(|w| w == ["--target", NO_STD_TARGET]));
        assert!(args.contains(&"--no-default-features"));
        assert!(!args.contains(&"--open"));
    }

    #[test]
    fn host_pass_opens_when_asked() {
        let host = &DOC_BUILDS[0];
        assert!(host.args(true).contains(&"--open"));
        assert!(!host.args(false).contains(&"--open"));
        assert!(!host.args(false).contains(&"--target"));
        assert_eq!(host.index(), "target/doc/scu_clk/index.html");
    }

    #[test]
    fn both_log_backends_are_documented() {
        let features: Vec<_> = DOC_BUILDS.iter().map(|b| b.features).collect();
        assert_eq!(features, ["tracing", "defmt"]);
    }
}
