//! Architecture boundary tests: run with `cargo test -p firmware --test arch_boundaries`
// Architecture test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::assertions_on_constants
)]
//!
//! These tests enforce the layering rules:
//!   Rule 1: platform (traits, constants) depends on nothing but heapless/defmt
//!   Rule 2: capture (the pipeline) never touches a HAL or the SoftDevice
//!   Rule 3: bluetooth (GAP/NUS rules) is SoftDevice-free and host-testable
//!   Rule 4: only `firmware::hw` and `main.rs` name embassy-nrf/nrf-softdevice
//!
//! The primary enforcement is the dependency graph in each Cargo.toml; the
//! tests below read those manifests and sources so a violation fails CI with
//! a message instead of a link error on the target.

const PLATFORM_TOML: &str = include_str!("../../platform/Cargo.toml");
const CAPTURE_TOML: &str = include_str!("../../capture/Cargo.toml");
const BLUETOOTH_TOML: &str = include_str!("../../bluetooth/Cargo.toml");
const FIRMWARE_TOML: &str = include_str!("../Cargo.toml");
const WORKSPACE_TOML: &str = include_str!("../../../Cargo.toml");

const HARDWARE_CRATES: &[&str] = &["embassy-nrf", "nrf-softdevice", "cortex-m"];

fn dependency_section(manifest: &str) -> &str {
    let start = manifest.find("[dependencies]").unwrap();
    let rest = &manifest[start..];
    let end = rest.find("\n[dev-dependencies]").or_else(|| rest.find("\n[features]"));
    end.map_or(rest, |end| &rest[..end])
}

#[test]
fn platform_is_independent() {
    let deps = dependency_section(PLATFORM_TOML);
    for krate in HARDWARE_CRATES.iter().chain(&["capture", "firmware", "embassy"]) {
        assert!(!deps.contains(krate), "platform must not depend on {krate}");
    }
    // The seams exist without any firmware code.
    fn _sequencer<T: platform::TransferSequencer>() {}
    fn _companion<T: platform::CompanionLink>() {}
    fn _transport<T: platform::SegmentTransport>() {}
    fn _power<T: platform::PowerManager>() {}
}

#[test]
fn capture_is_hardware_free() {
    let deps = dependency_section(CAPTURE_TOML);
    for krate in HARDWARE_CRATES.iter().chain(&["firmware", "bluetooth"]) {
        assert!(!deps.contains(krate), "capture must not depend on {krate}");
    }
}

#[test]
fn bluetooth_rules_are_softdevice_free() {
    let deps = dependency_section(BLUETOOTH_TOML);
    for krate in HARDWARE_CRATES.iter().chain(&["firmware", "capture"]) {
        assert!(!deps.contains(krate), "bluetooth must not depend on {krate}");
    }
    assert_eq!(bluetooth::nus::ATT_MTU_MAX, 247);
}

#[test]
fn hardware_crates_are_optional_in_firmware() {
    for krate in HARDWARE_CRATES {
        let line = FIRMWARE_TOML
            .lines()
            .find(|l| l.starts_with(krate))
            .unwrap_or_else(|| panic!("firmware must declare {krate}"));
        assert!(line.contains("optional = true"), "{krate} must be optional: {line}");
    }
}

#[test]
fn hw_module_is_gated_behind_hardware() {
    let lib_rs = include_str!("../src/lib.rs");
    assert!(lib_rs.contains("#[cfg(feature = \"hardware\")]\npub mod hw;"));
    for (name, source) in [
        ("app.rs", include_str!("../src/app.rs")),
        ("events.rs", include_str!("../src/events.rs")),
        ("link.rs", include_str!("../src/link.rs")),
        ("indicator.rs", include_str!("../src/indicator.rs")),
    ] {
        assert!(!source.contains("embassy_nrf"), "{name} names embassy_nrf");
        assert!(!source.contains("nrf_softdevice"), "{name} names nrf_softdevice");
    }
}

/// The SoftDevice owns priorities 0, 1 and 4.
#[test]
fn no_interrupt_at_softdevice_priority() {
    for (name, source) in [
        ("main.rs", include_str!("../src/main.rs")),
        ("boot.rs", include_str!("../src/boot.rs")),
        ("hw/sequencer.rs", include_str!("../src/hw/sequencer.rs")),
    ] {
        for reserved in ["Priority::P0", "Priority::P1)", "Priority::P1;", "Priority::P4"] {
            assert!(!source.contains(reserved), "{name} uses {reserved}");
        }
    }
}

/// PPI channels 17 and up are pre-programmed or reserved by the SoftDevice.
#[test]
fn capture_chain_uses_low_ppi_channels() {
    let sequencer = include_str!("../src/hw/sequencer.rs");
    for channel in 3..32 {
        let name = format!("PPI_CH{channel},");
        assert!(!sequencer.contains(&name), "sequencer uses {name}");
    }
}

#[test]
fn main_uses_softdevice_compatible_hal_config() {
    let main_rs = include_str!("../src/main.rs");
    assert!(main_rs.contains("embassy_nrf::init(boot::embassy_config())"));
    assert!(!main_rs.contains("Default::default()"));
}

#[test]
fn hardfault_handler_module_exists() {
    assert!(firmware::exception_handlers::HARDFAULT_DEFINED);
}

#[test]
fn cargo_config_targets_nrf52832() {
    let config = include_str!("../../../.cargo/config.toml");
    assert!(config.contains("thumbv7em-none-eabihf"));
    assert!(config.contains("--chip nRF52832_xxAA"));
    assert!(config.contains("-Tdefmt.x"));
}

#[test]
fn workspace_lints_deny_panicking_patterns() {
    for lint in [
        "arithmetic_side_effects = \"deny\"",
        "indexing_slicing = \"deny\"",
        "unwrap_used = \"deny\"",
        "expect_used = \"deny\"",
        "await_holding_lock = \"deny\"",
    ] {
        assert!(WORKSPACE_TOML.contains(lint), "workspace must set {lint}");
    }
}
