//! SonoProbe Firmware
//!
//! Ultrasound probe firmware for the nRF52832: captures frames from the
//! acquisition companion over SPI and streams them to a host over BLE.
//!
//! # Architecture
//!
//! This firmware follows a layered architecture:
//!
//! ```text
//! Entry point (main.rs) / emulator
//!         ↓
//! Application (app, link, events, indicator)
//!         ↓
//! Pipeline (capture crate: ring, trigger, drain, session)
//!         ↓
//! Hardware glue (hw: PPI sequencer, SPIM companion, SoftDevice)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the nRF52832 + S132 target
//! - `emulator` - Build the desktop emulator (tokio, tracing)
//! - `std` - Enable standard library (for emulator and testing)
//!
//! # Examples
//!
//! ## Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```
//!
//! ## Emulator Target
//!
//! ```bash
//! cargo run --example stream_emulator --features emulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod app;
pub mod boot;
pub mod events;
pub mod exception_handlers;
pub mod indicator;
pub mod link;

#[cfg(feature = "hardware")]
pub mod hw;

#[cfg(feature = "emulator")]
pub mod emulator;

// Re-export key types
pub use app::{Diagnostics, Peripherals, ProbeApp};
pub use events::EventHub;
pub use indicator::{HeartbeatLed, LinkIndicator};
pub use link::{LinkSupervisor, NusTransport, RawNotify};
