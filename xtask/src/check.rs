use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const TARGET: &str = "thumbv7em-none-eabihf";

/// A `cargo check` invocation whose failure stops the run.
struct BuildCheck {
    label: &'static str,
    args: &'static [&'static str],
}

const BUILD_CHECKS: &[BuildCheck] = &[
    BuildCheck {
        label: "firmware (nRF52832 + S132)",
        args: &["check", "-p", "firmware", "--target", TARGET, "--features", "hardware"],
    },
    BuildCheck {
        label: "firmware emulator (host)",
        args: &["check", "-p", "firmware", "--features", "emulator"],
    },
    BuildCheck {
        label: "platform (no_std)",
        args: &["check", "-p", "platform", "--target", TARGET, "--no-default-features"],
    },
    BuildCheck {
        label: "capture (no_std)",
        args: &["check", "-p", "capture", "--target", TARGET, "--no-default-features"],
    },
    BuildCheck {
        label: "bluetooth (no_std)",
        args: &["check", "-p", "bluetooth", "--target", TARGET, "--no-default-features"],
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking probe builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for check in BUILD_CHECKS {
        println!("{}", format!("  Checking {}...", check.label).cyan());
        let start = Instant::now();
        let output = Command::new("cargo")
            .args(check.args)
            .output()
            .with_context(|| format!("Failed to check {}", check.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} check failed", check.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} check failed", check.label);
        }
        println!(
            "{}",
            format!("  ✓ passed in {:.2}s", start.elapsed().as_secs_f64()).green()
        );
    }
    println!();

    // Lints and formatting only warn.
    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();
    let clippy_output = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .output()
        .context("Failed to run clippy")?;

    if clippy_output.status.success() {
        println!(
            "{}",
            format!("  ✓ Clippy passed in {:.2}s", clippy_start.elapsed().as_secs_f64()).green()
        );
    } else {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
    }

    println!("{}", "  Checking code formatting...".cyan());
    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if fmt_output.status.success() {
        println!("{}", "  ✓ Formatting check passed".green());
    } else {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    }
    println!();

    println!(
        "{}",
        format!("✓ All checks completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();

    Ok(())
}
