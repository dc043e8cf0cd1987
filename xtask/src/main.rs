// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod doc;
mod emulate;
mod flash;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "SonoProbe development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flash firmware to the nRF52832 via probe-rs (needs the S132 hex)
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
        /// Chip-erase and program S132 before the app
        #[arg(long)]
        softdevice: bool,
    },
    /// Stream synthetic frames through the capture pipeline on the host
    Emulate {
        /// Frames to produce
        #[arg(long, default_value_t = 500)]
        frames: u32,
        /// Busy replies per thousand sends
        #[arg(long, default_value_t = 250)]
        busy: u32,
        /// Simulate a host disconnect after this many frames
        #[arg(long)]
        drop_after: Option<u32>,
        /// Re-run whenever a source file changes
        #[arg(long)]
        watch: bool,
    },
    /// Check firmware builds for both hardware and emulator targets
    Check,
    /// Run the host test stages (unit, scenarios, ring properties, bench build)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
        /// Override PROPTEST_CASES for the ring property tests
        #[arg(long)]
        proptest_cases: Option<u32>,
    },
    /// Build and optionally open documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash {
            release,
            softdevice,
        } => flash::run(release, softdevice),
        Commands::Emulate {
            frames,
            busy,
            drop_after,
            watch,
        } => {
            let options = emulate::Options {
                frames,
                busy_per_mille: busy,
                drop_after,
            };
            if watch {
                emulate::watch(&options)
            } else {
                emulate::run_once(&options)
            }
        }
        Commands::Check => check::run(),
        Commands::Test {
            unit,
            integration,
            proptest_cases,
        } => test::run(unit, integration, proptest_cases),
        Commands::Doc { open } => doc::run(open),
    }
}
