//! Hardware Abstraction Layer (HAL) for the SonoProbe wireless probe
//!
//! This crate provides the trait boundary between the capture pipeline and
//! the nRF52832 peripherals, so the pipeline can be developed and tested
//! without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Feature Layers (capture, bluetooth)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (embassy-nrf + SoftDevice)
//! ```
//!
//! # Abstractions
//!
//! - [`TransferSequencer`] - TIMER/PPI/SPIM chain that clocks one frame in
//! - [`SegmentTransport`] - wireless segment send with backpressure status
//! - [`CompanionLink`] - configuration packets to the acquisition front-end
//! - [`PowerManager`] - idle and system-off
//! - [`events`] - bounded handler registries for edge/completion/link events
//! - [`config`] - reference capture configuration and board pins
//! - [`dma_safety`] - EasyDMA placement rules
//!
//! # Features
//!
//! - `std`: Enable standard library support (for testing)
//! - `hardware`: Physical hardware implementations
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! ```no_run
//! use platform::{SegmentTransport, SendStatus};
//!
//! fn push<T: SegmentTransport>(transport: &mut T, segment: &[u8]) -> bool {
//!     matches!(transport.send(segment), SendStatus::Sent)
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod companion;
pub mod config;
pub mod dma_safety;
pub mod events;
pub mod power;
pub mod sequencer;
pub mod transport;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use companion::{CompanionError, CompanionLink};
pub use config::{CaptureConfig, ConfigError};
pub use events::{
    DataReadyHandler, HandlerRegistry, LinkEventHandler, RegistryFull, SequenceCompleteHandler,
};
pub use power::PowerManager;
pub use sequencer::{ArmError, FrameSlot, TransferSequencer};
pub use transport::{SegmentTransport, SendStatus};
