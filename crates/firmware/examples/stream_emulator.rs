//! Probe stream emulator
//!
//! Streams synthetic frames through the real capture pipeline and a lossy
//! link, then prints what the host side received.
//! Run with: cargo run -p firmware --example stream_emulator --features emulator
//!
//! Environment:
//!   EMU_FRAMES=500       frames to produce
//!   EMU_BUSY=250         busy replies per thousand sends
//!   EMU_PERIOD_US=2000   data-ready period
//!   EMU_DROP_AFTER=100   simulate a disconnect after this frame

#![allow(clippy::print_stdout)]

use std::time::Duration;

use firmware::emulator::{self, EmulatorConfig};
use platform::config;
use tracing_subscriber::EnvFilter;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("{} v{} - Stream Emulator", config::APP_NAME, config::APP_VERSION);

    let defaults = EmulatorConfig::default();
    let emu_config = EmulatorConfig {
        frames: env_or("EMU_FRAMES", defaults.frames),
        busy_per_mille: env_or("EMU_BUSY", defaults.busy_per_mille),
        frame_period: Duration::from_micros(env_or("EMU_PERIOD_US", 5_000)),
        disconnect_after: std::env::var("EMU_DROP_AFTER").ok().and_then(|v| v.parse().ok()),
        seed: defaults.seed,
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let report = rt.block_on(emulator::run(emu_config.clone()))?;

    println!();
    println!("frames produced : {}", emu_config.frames);
    println!("frames received : {}", report.frames_received);
    println!("ring overflows  : {}", report.diagnostics.overflows);
    println!("busy retries    : {}", report.drain.busy_retries);
    println!("resets          : {:?}", report.diagnostics.resets);
    println!("sequence gaps   : {}", report.gaps());
    Ok(())
}
