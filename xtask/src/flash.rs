//! Build and flash the application image above SoftDevice S132.
//!
//! The app alone is useless on a chip without S132: `Softdevice::enable`
//! faults on the first SVC call. The hex is therefore required before any
//! app flash, and `--softdevice` programs it first.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

const CHIP: &str = "nRF52832_xxAA";
const TARGET: &str = "thumbv7em-none-eabihf";

/// First application address with S132 7.x installed.
const S132_APP_START: u64 = 0x0002_6000;

/// Default location of the Nordic S132 image, overridable with `S132_HEX`.
const S132_HEX_DEFAULT: &str = "softdevice/s132_nrf52_7.3.0_softdevice.hex";

pub fn run(release: bool, softdevice: bool) -> Result<()> {
    let mode = if release { "release" } else { "debug" };

    check_memory_layout(Path::new("memory.x"))?;
    let hex = softdevice_hex()?;
    println!("{}", format!("  S132 image: {}", hex.display()).dimmed());

    if softdevice {
        program_softdevice(&hex)?;
    }

    println!();
    println!("{}", format!("🔨 Building firmware ({mode} mode)...").cyan().bold());

    let build_start = Instant::now();
    let mut build_cmd = Command::new("cargo");
    build_cmd.args(["build", "-p", "firmware", "--target", TARGET, "--features", "hardware"]);
    if release {
        build_cmd.arg("--release");
    }

    let build_output = build_cmd.output().context("Failed to run cargo build")?;
    if !build_output.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&build_output.stderr));
        anyhow::bail!("Build failed");
    }
    println!(
        "{}",
        format!("✓ Build successful in {:.2}s", build_start.elapsed().as_secs_f64()).green()
    );

    let elf = format!("target/{TARGET}/{mode}/firmware");
    show_binary_size(&elf);
    println!();

    // `probe-rs run` erases only the sectors the ELF covers; S132 stays put.
    println!("{}", "📡 Flashing application...".cyan().bold());
    let flash_start = Instant::now();
    let flash_output = Command::new("probe-rs")
        .args(["run", &elf, "--chip", CHIP, "--probe-index", "0"])
        .output()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;

    if !flash_output.status.success() {
        eprintln!("{}", "✗ Flash failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&flash_output.stderr));
        anyhow::bail!("Flash failed - if the chip was erased, rerun with --softdevice");
    }

    println!(
        "{}",
        format!("✓ Flash successful in {:.2}s", flash_start.elapsed().as_secs_f64()).green()
    );
    println!(
        "   {}",
        format!("Use 'probe-rs attach --chip {CHIP} {elf}' to view RTT logs").dimmed()
    );
    println!();

    Ok(())
}

/// `S132_HEX` if set, otherwise the checked-in default path.
fn softdevice_hex() -> Result<PathBuf> {
    let path = std::env::var_os("S132_HEX")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(S132_HEX_DEFAULT));
    if !path.is_file() {
        anyhow::bail!(
            "S132 hex not found at {} (download s132_nrf52_7.3.0 from Nordic or set S132_HEX)",
            path.display()
        );
    }
    Ok(path)
}

fn program_softdevice(hex: &Path) -> Result<()> {
    println!("{}", "📡 Programming SoftDevice S132 (chip erase)...".cyan().bold());
    let start = Instant::now();
    let output = Command::new("probe-rs")
        .args(["download", "--chip", CHIP, "--binary-format", "hex", "--chip-erase"])
        .arg(hex)
        .output()
        .context("Failed to run probe-rs download")?;

    if !output.status.success() {
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("SoftDevice programming failed");
    }
    println!(
        "{}",
        format!("✓ S132 programmed in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    Ok(())
}

/// Refuse to flash an image linked over the SoftDevice.
fn check_memory_layout(memory_x: &Path) -> Result<()> {
    let text = std::fs::read_to_string(memory_x)
        .with_context(|| format!("Failed to read {}", memory_x.display()))?;
    let origin = flash_origin(&text).context("memory.x has no FLASH ORIGIN")?;
    if origin != S132_APP_START {
        anyhow::bail!(
            "memory.x places FLASH at {origin:#x}; S132 7.x needs the app at {S132_APP_START:#x}"
        );
    }
    Ok(())
}

fn flash_origin(memory_x: &str) -> Option<u64> {
    let line = memory_x.lines().find(|l| l.trim_start().starts_with("FLASH"))?;
    let value = line.split("ORIGIN").nth(1)?.trim_start().strip_prefix('=')?;
    let hex = value.split(',').next()?.trim().strip_prefix("0x")?;
    u64::from_str_radix(hex, 16).ok()
}

fn show_binary_size(elf: &str) {
    let output = Command::new("rust-size").args([elf, "-A"]).output();
    if let Ok(out) = output {
        if out.status.success() {
            println!("{}", "📊 Binary size:".cyan());
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                println!("   {}", line.dimmed());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_memory_x_starts_above_s132() {
        let memory_x = include_str!("../../memory.x");
        assert_eq!(flash_origin(memory_x), Some(S132_APP_START));
    }

    #[test]
    fn flash_origin_rejects_missing_region() {
        assert_eq!(flash_origin("RAM : ORIGIN = 0x20003800, LENGTH = 0xC800"), None);
        assert_eq!(
            flash_origin("  FLASH : ORIGIN = 0x00000000, LENGTH = 0x80000"),
            Some(0)
        );
    }
}
