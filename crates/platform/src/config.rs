//! Probe configuration and constants
//!
//! This module defines the reference capture configuration and board wiring.
//! Capture code, BLE setup and the emulator reference these constants rather
//! than hardcoding values.

use crate::dma_safety::EASYDMA_MAX_COUNT;

/// The application name
pub const APP_NAME: &str = "SonoProbe";

/// Name included in the BLE advertising data.
pub const DEVICE_NAME: &str = "SONOPROBE_01";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// SPI transfers clocked in per frame (K).
pub const TRANSFERS_PER_FRAME: usize = 4;

/// Bytes per SPI transfer, which is also the wire segment length.
pub const SEGMENT_LEN: usize = 201;

/// Bytes occupied by one frame slot in the ring.
pub const FRAME_BYTES: usize = TRANSFERS_PER_FRAME * SEGMENT_LEN;

/// Frame slots in the ring (C).
pub const RING_CAPACITY: usize = 35;

/// Period of the interval timer that starts each SPI transfer, in µs.
pub const TRANSFER_INTERVAL_US: u32 = 300;

/// Start-of-frame marker the companion places at the head of segment 0.
///
/// The host uses `segment[0] == FRAME_MARKER && segment.len() == SEGMENT_LEN + 1`
/// to find frame boundaries.
pub const FRAME_MARKER: u8 = 0xFF;

/// Control packet sent to the companion after a disconnect.
pub const RESTART_PACKET: [u8; 1] = [0xFB];

/// Capacity of every handler registry (data-ready, completion, link).
pub const HANDLER_CAPACITY: usize = 5;

/// Board pin assignment (nRF52832 P0.xx numbers).
pub mod pins {
    /// On-board status LED.
    pub const LED: u8 = 17;
    /// The LED is wired active-low.
    pub const LED_ACTIVE_LOW: bool = true;
    /// Output mirrored to the companion: high while a host is connected.
    pub const LINK_INDICATOR: u8 = 18;
    /// Data-ready input from the companion (rising edge).
    pub const DATA_READY: u8 = 13;
    /// SPI chip select.
    pub const SPI_CS: u8 = 7;
    /// SPI clock.
    pub const SPI_SCK: u8 = 8;
    /// SPI MISO.
    pub const SPI_MISO: u8 = 9;
    /// SPI MOSI.
    pub const SPI_MOSI: u8 = 10;
}

/// Shape of one capture pass and of the ring holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureConfig {
    /// Transfers per frame (K).
    pub transfers_per_frame: usize,
    /// Bytes per transfer and per wire segment.
    pub segment_len: usize,
    /// Frame slots in the ring (C).
    pub ring_capacity: usize,
    /// Interval timer period in µs.
    pub transfer_interval_us: u32,
}

impl CaptureConfig {
    /// The reference probe configuration.
    pub const REFERENCE: Self = Self {
        transfers_per_frame: TRANSFERS_PER_FRAME,
        segment_len: SEGMENT_LEN,
        ring_capacity: RING_CAPACITY,
        transfer_interval_us: TRANSFER_INTERVAL_US,
    };

    /// Bytes in one frame slot, or `None` on overflow.
    pub const fn frame_bytes(&self) -> Option<usize> {
        self.transfers_per_frame.checked_mul(self.segment_len)
    }

    /// Check the configuration against the hardware and wire-format limits.
    ///
    /// Segment 0 on the wire is `segment_len + 1` bytes read from offset 1
    /// of the slot, so it only stays inside the frame with at least two
    /// transfers of at least two bytes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transfers_per_frame < 2 {
            return Err(ConfigError::TooFewTransfers {
                transfers: self.transfers_per_frame,
            });
        }
        if self.segment_len < 2 || self.segment_len > EASYDMA_MAX_COUNT {
            return Err(ConfigError::SegmentLength {
                len: self.segment_len,
                max: EASYDMA_MAX_COUNT,
            });
        }
        if self.frame_bytes().is_none() {
            return Err(ConfigError::FrameTooLarge);
        }
        if self.ring_capacity < 2 || self.ring_capacity > usize::from(u16::MAX) {
            return Err(ConfigError::RingCapacity {
                capacity: self.ring_capacity,
            });
        }
        if self.transfer_interval_us == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Rejected capture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Fewer than two transfers per frame.
    TooFewTransfers {
        /// Requested transfer count.
        transfers: usize,
    },
    /// Segment length below 2 or above the EasyDMA transfer limit.
    SegmentLength {
        /// Requested length.
        len: usize,
        /// Largest length one EasyDMA transfer can move.
        max: usize,
    },
    /// `transfers_per_frame * segment_len` does not fit in `usize`.
    FrameTooLarge,
    /// Ring capacity outside `2..=u16::MAX`.
    RingCapacity {
        /// Requested capacity.
        capacity: usize,
    },
    /// The interval timer period is zero.
    ZeroInterval,
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooFewTransfers { transfers } => {
                write!(f, "frame needs at least 2 transfers, got {transfers}")
            }
            Self::SegmentLength { len, max } => {
                write!(f, "segment length {len} outside 2..={max}")
            }
            Self::FrameTooLarge => write!(f, "frame size overflows"),
            Self::RingCapacity { capacity } => {
                write!(f, "ring capacity {capacity} outside 2..=65535")
            }
            Self::ZeroInterval => write!(f, "transfer interval must be non-zero"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_is_valid() {
        assert_eq!(CaptureConfig::REFERENCE.validate(), Ok(()));
        assert_eq!(CaptureConfig::REFERENCE.frame_bytes(), Some(FRAME_BYTES));
        assert_eq!(FRAME_BYTES, 804);
    }

    #[test]
    fn single_transfer_frame_rejected() {
        let config = CaptureConfig {
            transfers_per_frame: 1,
            ..CaptureConfig::REFERENCE
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooFewTransfers { transfers: 1 })
        );
    }

    #[test]
    fn segment_longer_than_easydma_rejected() {
        let config = CaptureConfig {
            segment_len: 256,
            ..CaptureConfig::REFERENCE
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SegmentLength { len: 256, max: 255 })
        );
    }

    #[test]
    fn ring_of_one_rejected() {
        let config = CaptureConfig {
            ring_capacity: 1,
            ..CaptureConfig::REFERENCE
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::RingCapacity { capacity: 1 })
        );
    }

    #[test]
    fn zero_interval_rejected() {
        let config = CaptureConfig {
            transfer_interval_us: 0,
            ..CaptureConfig::REFERENCE
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }
}
