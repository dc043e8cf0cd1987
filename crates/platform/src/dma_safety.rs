//! EasyDMA placement rules and buffer sizing constants for nRF52832.
//!
//! ## EasyDMA Accessibility on nRF52832
//!
//! | Memory Region | Base Address | Size   | EasyDMA | Use case |
//! |---------------|-------------|--------|---------|----------|
//! | Data RAM      | 0x2000_0000 | 64 KB  | YES     | Frame ring, SPI TX buffer |
//! | Code RAM      | 0x0080_0000 | 64 KB  | NO      | Alias of data RAM on the I-bus |
//! | Flash         | 0x0000_0000 | 512 KB | NO      | Constants (copy to RAM first) |
//!
//! SPIM0 `RXD.PTR`/`TXD.PTR` must point into data RAM. A pointer into flash
//! does not fault: the transfer silently clocks out or drops bytes.
//!
//! `RXD.MAXCNT` is 8 bits wide on nRF52832, so one transfer moves at most
//! [`EASYDMA_MAX_COUNT`] bytes. The frame is captured as K transfers with
//! `RXD.LIST = ArrayList`, which advances `RXD.PTR` by `MAXCNT` after each
//! END event without CPU involvement.
//!
//! ## Usage
//! ```rust
//! use platform::config::FRAME_BYTES;
//! use platform::dma_safety::{is_easydma_accessible, DATA_RAM_BASE};
//!
//! // Statics without a link_section land in .bss/.data, which is data RAM.
//! assert!(is_easydma_accessible(DATA_RAM_BASE + 0x4000, FRAME_BYTES as u32));
//! assert!(!is_easydma_accessible(0x0002_6000, FRAME_BYTES as u32));
//! ```

// ── Memory region addresses ──────────────────────────────────────────────────

/// Base address of data RAM (EasyDMA accessible).
pub const DATA_RAM_BASE: u32 = 0x2000_0000;

/// Size of data RAM in bytes (64 KB).
pub const DATA_RAM_SIZE_BYTES: u32 = 64 * 1024;

/// RAM reserved by the S132 SoftDevice at the bottom of data RAM.
///
/// Must match `memory.x`. The SoftDevice reports the real requirement at
/// enable time; raise this if it logs a larger value.
pub const SOFTDEVICE_RAM_BYTES: u32 = 0x3800;

/// Largest byte count of one EasyDMA transfer (`MAXCNT` is 8 bits).
pub const EASYDMA_MAX_COUNT: usize = 255;

/// Returns `true` if `[addr, addr + len)` lies entirely in data RAM.
pub const fn is_easydma_accessible(addr: u32, len: u32) -> bool {
    let Some(end) = addr.checked_add(len) else {
        return false;
    };
    #[allow(clippy::arithmetic_side_effects)] // Safety: constants, no overflow
    let ram_end = DATA_RAM_BASE + DATA_RAM_SIZE_BYTES;
    addr >= DATA_RAM_BASE && end <= ram_end
}

// ── Marker traits ────────────────────────────────────────────────────────────

/// Marker trait: memory region EasyDMA can read and write.
///
/// # Safety
/// Only implement for zero-sized types representing memory regions that
/// the nRF52832 EasyDMA master can physically reach. Implementing it for
/// flash or code RAM turns every capture into silent garbage.
pub unsafe trait EasyDmaAccessible: Sized {}

// ── Region zero-sized types ──────────────────────────────────────────────────

/// Zero-sized type representing data RAM.
///
/// Buffers placed here:
/// - Frame ring slots (SPIM0 RX, ArrayList)
/// - SPI TX buffer holding the companion configuration
#[derive(Debug, Clone, Copy)]
pub struct DataRamRegion;

// SAFETY: data RAM at 0x2000_0000 is on the AHB matrix slave port that the
// EasyDMA masters use (nRF52832 PS, Memory chapter).
unsafe impl EasyDmaAccessible for DataRamRegion {}

/// Zero-sized type representing flash.
///
/// `const` tables live here. Copy into a RAM buffer before handing them to
/// SPIM.
#[derive(Debug, Clone, Copy)]
pub struct FlashRegion;
// FlashRegion intentionally does NOT implement EasyDmaAccessible.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_range_accessible() {
        assert!(is_easydma_accessible(0x2000_4000, 804));
    }

    #[test]
    fn flash_range_rejected() {
        assert!(!is_easydma_accessible(0x0002_6000, 16));
    }

    #[test]
    fn range_crossing_ram_end_rejected() {
        assert!(!is_easydma_accessible(0x2000_FFF0, 32));
    }

    #[test]
    fn wrapping_range_rejected() {
        assert!(!is_easydma_accessible(u32::MAX, 2));
    }
}
