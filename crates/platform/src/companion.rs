//! Companion acquisition device link
//!
//! The companion has no separate command channel: the probe stages a packet
//! in the SPI transmit buffer and it is clocked out at the start of the next
//! capture transfer.

/// Forwards configuration and control packets to the companion.
pub trait CompanionLink {
    /// Stage `packet` for the companion.
    fn send_config(&mut self, packet: &[u8]) -> Result<(), CompanionError>;
}

impl<T: CompanionLink + ?Sized> CompanionLink for &mut T {
    fn send_config(&mut self, packet: &[u8]) -> Result<(), CompanionError> {
        (**self).send_config(packet)
    }
}

/// Companion link errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompanionError {
    /// Packet does not fit in one SPI transfer.
    PacketTooLong {
        /// Packet length
        len: usize,
        /// Transfer length
        max: usize,
    },
}

#[cfg(feature = "std")]
impl std::error::Error for CompanionError {}

impl core::fmt::Display for CompanionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PacketTooLong { len, max } => {
                write!(f, "Companion packet of {len} bytes exceeds {max}")
            }
        }
    }
}
