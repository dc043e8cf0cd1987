//! nRF52832 hardware glue (feature `hardware`).
//!
//! | Module | Peripherals |
//! |--------|-------------|
//! | [`sequencer`] | TIMER3, TIMER4, SPIM0, PPI channels 0-2 |
//! | [`companion`] | SPIM0 transmit buffer |
//! | [`power`] | SoftDevice power API |
//! | [`ble`] | SoftDevice S132, Nordic UART Service |
//!
//! PPI channels 17 and up belong to the SoftDevice. Interrupt priorities 0, 1
//! and 4 are reserved by it as well; everything here runs at P3.

pub mod ble;
pub mod companion;
pub mod power;
pub mod sequencer;

pub use ble::{ble_task, softdevice_config, softdevice_task, NusServer};
pub use companion::SpiCompanion;
pub use power::SoftDevicePower;
pub use sequencer::PpiSequencer;

use platform::config::{FRAME_BYTES, RING_CAPACITY};

use crate::app::ProbeApp;

/// The pipeline as wired on the board.
pub type HardwareApp = ProbeApp<'static, PpiSequencer, SpiCompanion, RING_CAPACITY, FRAME_BYTES>;
