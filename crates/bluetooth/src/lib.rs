//! Bluetooth LE link bookkeeping for the SonoProbe - Nordic UART Service over
//! the S132 SoftDevice.
//!
//! Nothing here touches the SoftDevice. The firmware's `ble` module feeds
//! events in and asks how to treat status codes; this crate owns the numbers.
//!
//! This crate is `no_std` by default; it only uses `core` + `heapless`.

#![cfg_attr(not(test), no_std)]
#![allow(missing_docs)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod gap;
pub mod nus;
pub mod state;

pub use nus::{classify_status, NusStatus};
pub use state::LinkState;
