use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const TARGET: &str = "thumbv7em-none-eabihf";

/// One `cargo doc` pass; the first one is the one `--open` shows.
struct DocSet {
    label: &'static str,
    args: &'static [&'static str],
    index: &'static str,
}

const DOC_SETS: &[DocSet] = &[
    DocSet {
        label: "pipeline crates and emulator (host)",
        args: &[
            "doc",
            "--no-deps",
            "--document-private-items",
            "-p",
            "platform",
            "-p",
            "capture",
            "-p",
            "bluetooth",
            "-p",
            "firmware",
            "--features",
            "firmware/emulator",
        ],
        index: "target/doc/capture/index.html",
    },
    // `firmware::hw` only exists for the nRF target.
    DocSet {
        label: "firmware hardware glue (nRF52832)",
        args: &[
            "doc",
            "--no-deps",
            "--document-private-items",
            "-p",
            "firmware",
            "--target",
            TARGET,
            "--features",
            "hardware",
        ],
        index: "target/thumbv7em-none-eabihf/doc/firmware/hw/index.html",
    },
];

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    for (n, set) in DOC_SETS.iter().enumerate() {
        println!("{}", format!("  Documenting {}...", set.label).cyan());
        let mut cmd = Command::new("cargo");
        cmd.args(set.args);
        if open && n == 0 {
            cmd.arg("--open");
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to document {}", set.label))?;
        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} failed", set.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("Documentation build failed");
        }
        println!("   {}", set.index.dimmed());
    }

    println!(
        "{}",
        format!("✓ Documentation built in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    println!();

    Ok(())
}
