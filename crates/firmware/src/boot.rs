//! Hardware boot sequence for the nRF52832 probe.
//!
//! Initialization order (MUST be respected):
//!   1. `embassy_nrf::init` with GPIOTE and RTC1 at P2 (0, 1 and 4 belong to
//!      the SoftDevice)
//!   2. Output pins driven to their idle levels
//!   3. SPIM0 configured: 8 MHz, mode 1, MSB first
//!   4. Capture chain: TIMER3, TIMER4, PPI 0-2, TIMER4 IRQ at P3
//!   5. SoftDevice enabled, NUS registered
//!   6. Event hub filled, then published to the TIMER4 interrupt
//!   7. Tasks spawned: SoftDevice, data-ready, BLE, heartbeat
//!
//! The SoftDevice must be enabled after every peripheral it does not own is
//! configured but before the first task that calls into it is spawned.

/// Ordered list of boot steps, for logs and tests.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. HAL: embassy_nrf::init, GPIOTE + RTC1 at P2",
    "2. GPIO: LED dark, link indicator low, CS held low",
    "3. SPIM0: 8 MHz, mode 1, MSB first",
    "4. Capture chain: TIMER3 interval, TIMER4 counter, PPI 0-2, TIMER4 IRQ at P3",
    "5. SoftDevice: enable S132, register NUS",
    "6. Event hub: register handlers, publish to TIMER4 ISR",
    "7. Executor: spawn softdevice, data-ready, ble, heartbeat tasks",
];

/// Application flash starts right after the S132 7.x image.
pub const FLASH_ORIGIN: u32 = 0x0002_6000;
/// End of nRF52832 flash (512 KB).
pub const FLASH_END: u32 = 0x0008_0000;
/// Application RAM starts above the SoftDevice reservation for one
/// peripheral link at ATT MTU 247.
pub const RAM_ORIGIN: u32 = 0x2000_3800;
/// End of nRF52832 RAM (64 KB).
pub const RAM_END: u32 = 0x2001_0000;

/// Heartbeat period: LED toggle and diagnostics log.
pub const HEARTBEAT_PERIOD_MS: u64 = 1_000;

/// Application flash length.
#[allow(clippy::arithmetic_side_effects)] // Safety: FLASH_END > FLASH_ORIGIN, compile-time
pub const FLASH_LEN: u32 = FLASH_END - FLASH_ORIGIN;

/// Application RAM length.
#[allow(clippy::arithmetic_side_effects)] // Safety: RAM_END > RAM_ORIGIN, compile-time
pub const RAM_LEN: u32 = RAM_END - RAM_ORIGIN;

/// Embassy HAL configuration compatible with the SoftDevice.
#[cfg(feature = "hardware")]
pub fn embassy_config() -> embassy_nrf::config::Config {
    use embassy_nrf::interrupt::Priority;

    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    config
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use platform::config::{FRAME_BYTES, RING_CAPACITY, SEGMENT_LEN};
    use platform::dma_safety::{is_easydma_accessible, DATA_RAM_BASE, SOFTDEVICE_RAM_BYTES};

    const MEMORY_X: &str = include_str!("../../../memory.x");

    fn memory_x_value(region: &str, key: &str) -> u32 {
        let line = MEMORY_X
            .lines()
            .find(|l| l.trim_start().starts_with(region))
            .unwrap();
        let field = line.split(',').find(|f| f.contains(key)).unwrap();
        let hex = field.split("0x").nth(1).unwrap();
        let digits: String = hex.chars().take_while(char::is_ascii_hexdigit).collect();
        u32::from_str_radix(&digits, 16).unwrap()
    }

    #[test]
    fn test_memory_x_matches_constants() {
        assert_eq!(memory_x_value("FLASH", "ORIGIN"), FLASH_ORIGIN);
        assert_eq!(memory_x_value("FLASH", "LENGTH"), FLASH_LEN);
        assert_eq!(memory_x_value("RAM", "ORIGIN"), RAM_ORIGIN);
        assert_eq!(memory_x_value("RAM", "LENGTH"), RAM_LEN);
    }

    #[test]
    fn test_ram_origin_follows_softdevice_reservation() {
        assert_eq!(RAM_ORIGIN, DATA_RAM_BASE + SOFTDEVICE_RAM_BYTES);
    }

    #[test]
    fn test_ring_fits_application_ram() {
        let ring = RING_CAPACITY * FRAME_BYTES;
        // Leave at least 8 KB for stacks, the executor and the event hub.
        assert!(ring + 8 * 1024 < RAM_LEN as usize);
    }

    #[test]
    fn test_application_ram_is_easydma_reachable() {
        assert!(is_easydma_accessible(RAM_ORIGIN, RAM_LEN));
        assert!(!is_easydma_accessible(FLASH_ORIGIN, SEGMENT_LEN as u32));
    }

    #[test]
    fn test_boot_sequence_softdevice_after_peripherals() {
        let position = |needle: &str| {
            BOOT_SEQUENCE_STEPS
                .iter()
                .position(|s| s.contains(needle))
                .unwrap()
        };
        assert!(position("SPIM0") < position("SoftDevice"));
        assert!(position("Capture chain") < position("SoftDevice"));
        assert!(position("SoftDevice") < position("Executor"));
        assert!(position("Event hub") < position("Executor"));
    }

    #[test]
    fn test_boot_sequence_is_numbered() {
        for (i, step) in BOOT_SEQUENCE_STEPS.iter().enumerate() {
            assert!(step.starts_with(&format!("{}.", i + 1)), "step {i}: {step}");
        }
    }
}
