//! Host emulator runner.
//!
//! `cargo xtask emulate` builds and runs the `stream_emulator` example once.
//! With `--watch` it re-runs on every saved `.rs`/`.toml` change in the
//! pipeline crates, which is the quickest loop for tuning the drain logic.

use anyhow::{Context, Result};
use colored::Colorize;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use platform::config;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Emulator knobs, forwarded to the example as `EMU_*` variables.
pub struct Options {
    pub frames: u32,
    pub busy_per_mille: u32,
    pub drop_after: Option<u32>,
}

const WATCH_PATHS: &[&str] = &[
    "crates/platform/src",
    "crates/capture/src",
    "crates/bluetooth/src",
    "crates/firmware/src",
    "crates/firmware/examples",
];

const DEBOUNCE: Duration = Duration::from_millis(500);

pub fn run_once(options: &Options) -> Result<()> {
    print_banner();
    let status = run_emulator(options)?;
    if !status.success() {
        anyhow::bail!("Emulator exited with {status}");
    }
    Ok(())
}

pub fn watch(options: &Options) -> Result<()> {
    print_banner();

    let (tx, rx) = channel();
    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event.paths.iter().any(|p| {
                        p.extension()
                            .is_some_and(|ext| ext == "rs" || ext == "toml")
                    })
                {
                    let _ = tx.send(());
                }
            }
        },
        notify::Config::default(),
    )?;

    for path in WATCH_PATHS.iter().map(Path::new).filter(|p| p.exists()) {
        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch path: {}", path.display()))?;
    }

    report(run_emulator(options));
    println!("{}", "Watching for changes (Ctrl+C to stop)".dimmed());

    let mut last_run = Instant::now();
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(()) => {
                if last_run.elapsed() < DEBOUNCE {
                    continue;
                }
                std::thread::sleep(Duration::from_millis(200));
                while rx.try_recv().is_ok() {}
                last_run = Instant::now();

                println!();
                println!("{}", "Changes detected - re-running...".yellow().bold());
                report(run_emulator(options));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

fn run_emulator(options: &Options) -> Result<ExitStatus> {
    let start = Instant::now();
    let mut cmd = Command::new("cargo");
    cmd.args([
        "run",
        "-p",
        "firmware",
        "--example",
        "stream_emulator",
        "--features",
        "emulator",
    ])
    .env("EMU_FRAMES", options.frames.to_string())
    .env("EMU_BUSY", options.busy_per_mille.to_string());

    if let Some(after) = options.drop_after {
        cmd.env("EMU_DROP_AFTER", after.to_string());
    }
    if std::env::var("RUST_LOG").is_err() {
        cmd.env("RUST_LOG", "info");
    }

    let status = cmd.status().context("Failed to run cargo")?;
    println!(
        "{}",
        format!("Finished in {:.1}s", start.elapsed().as_secs_f64()).dimmed()
    );
    Ok(status)
}

fn report(outcome: Result<ExitStatus>) {
    match outcome {
        Ok(status) if status.success() => println!("{}", "Emulator run complete".green().bold()),
        Ok(status) => eprintln!("{}", format!("Emulator exited with {status}").red().bold()),
        Err(e) => eprintln!("{}", format!("Build failed: {e}").red().bold()),
    }
}

fn print_banner() {
    println!("{}", "═════════════════════════════════════════════".cyan());
    println!("{}", format!("     {} - Stream Emulator", config::APP_NAME).cyan().bold());
    println!("{}", "═════════════════════════════════════════════".cyan());
    println!();
}
