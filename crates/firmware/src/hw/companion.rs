//! Companion link over the capture SPI bus.
//!
//! SPIM0 clocks the same transmit buffer out on every transfer, so staging a
//! packet is a copy into that buffer. The session controller only calls this
//! after stopping the sequencer, so EasyDMA is not reading it.

use platform::config::SEGMENT_LEN;
use platform::{CompanionError, CompanionLink};

/// Transmit side of the capture SPI bus.
pub struct SpiCompanion {
    tx: &'static mut [u8; SEGMENT_LEN],
}

impl SpiCompanion {
    /// Take ownership of the SPIM0 transmit buffer.
    pub fn new(tx: &'static mut [u8; SEGMENT_LEN]) -> Self {
        tx.fill(0);
        Self { tx }
    }

    /// EasyDMA address of the transmit buffer.
    pub fn tx_address(&self) -> u32 {
        self.tx.as_ptr() as u32
    }
}

impl CompanionLink for SpiCompanion {
    fn send_config(&mut self, packet: &[u8]) -> Result<(), CompanionError> {
        let staged = self
            .tx
            .get_mut(..packet.len())
            .ok_or(CompanionError::PacketTooLong {
                len: packet.len(),
                max: SEGMENT_LEN,
            })?;
        staged.copy_from_slice(packet);
        if let Some(rest) = self.tx.get_mut(packet.len()..) {
            rest.fill(0);
        }
        defmt::debug!("companion packet staged: {=usize} bytes", packet.len());
        Ok(())
    }
}
