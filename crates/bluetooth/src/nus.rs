//! Nordic UART Service (NUS) constants and SoftDevice status classification.
//!
//! The host writes commands to the RX characteristic and receives the frame
//! stream as notifications on the TX characteristic.
//!
//! Status codes are the S132 `NRF_ERROR_*` values returned by
//! `sd_ble_gatts_hvx`:
//! - `0x0000`: success
//! - `0x0013`: `NRF_ERROR_RESOURCES`, TX queue full, retry later
//! - everything else: the link or the request is broken

use platform::SendStatus;

/// NUS service UUID.
pub const SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";
/// RX characteristic (host → probe, write / write without response).
pub const RX_CHAR_UUID: &str = "6e400002-b5a3-f393-e0a9-e50e24dcca9e";
/// TX characteristic (probe → host, notify).
pub const TX_CHAR_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// Service UUID in over-the-air (little-endian) byte order, for advertising.
pub const SERVICE_UUID_LE: [u8; 16] = [
    0x9E, 0xCA, 0xDC, 0x24, 0x0E, 0xE5, 0xA9, 0xE0, 0x93, 0xF3, 0xA3, 0xB5, 0x01, 0x00, 0x40, 0x6E,
];

/// RX characteristic UUID, little-endian.
pub const RX_CHAR_UUID_LE: [u8; 16] = uuid_with_short(0x0002);
/// TX characteristic UUID, little-endian.
pub const TX_CHAR_UUID_LE: [u8; 16] = uuid_with_short(0x0003);

/// NUS UUIDs share the base and differ in bytes 12..14.
const fn uuid_with_short(short: u16) -> [u8; 16] {
    let mut uuid = SERVICE_UUID_LE;
    let [lo, hi] = short.to_le_bytes();
    uuid[12] = lo;
    uuid[13] = hi;
    uuid
}

/// Default ATT MTU before an exchange.
pub const ATT_MTU_DEFAULT: u16 = 23;
/// ATT MTU the SoftDevice is configured to accept.
pub const ATT_MTU_MAX: u16 = 247;
/// Opcode (1) + attribute handle (2) in every notification.
pub const ATT_HEADER_LEN: u16 = 3;
/// Largest RX write the probe accepts; commands fit one SPI transfer.
pub const RX_MAX_LEN: usize = platform::config::SEGMENT_LEN;

/// `NRF_SUCCESS`
pub const NRF_SUCCESS: u32 = 0x0000;
/// `NRF_ERROR_NOT_FOUND`: notifications not enabled by the host.
pub const NRF_ERROR_NOT_FOUND: u32 = 0x0005;
/// `NRF_ERROR_INVALID_PARAM`: payload larger than the MTU allows.
pub const NRF_ERROR_INVALID_PARAM: u32 = 0x0007;
/// `NRF_ERROR_INVALID_STATE`: CCCD not written or connection closing.
pub const NRF_ERROR_INVALID_STATE: u32 = 0x0008;
/// `NRF_ERROR_RESOURCES`: TX queue full.
pub const NRF_ERROR_RESOURCES: u32 = 0x0013;
/// `BLE_ERROR_INVALID_CONN_HANDLE`
pub const BLE_ERROR_INVALID_CONN_HANDLE: u32 = 0x3001;

/// Named view of a SoftDevice status for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NusStatus {
    Success,
    Resources,
    NotFound,
    InvalidParam,
    InvalidState,
    InvalidConnHandle,
    Other(u32),
}

impl From<u32> for NusStatus {
    fn from(code: u32) -> Self {
        match code {
            NRF_SUCCESS => Self::Success,
            NRF_ERROR_RESOURCES => Self::Resources,
            NRF_ERROR_NOT_FOUND => Self::NotFound,
            NRF_ERROR_INVALID_PARAM => Self::InvalidParam,
            NRF_ERROR_INVALID_STATE => Self::InvalidState,
            BLE_ERROR_INVALID_CONN_HANDLE => Self::InvalidConnHandle,
            other => Self::Other(other),
        }
    }
}

/// Map a notification status code onto the transport contract.
pub const fn classify_status(code: u32) -> SendStatus {
    match code {
        NRF_SUCCESS => SendStatus::Sent,
        NRF_ERROR_RESOURCES => SendStatus::Busy,
        other => SendStatus::Fatal(other),
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_characteristic_uuids_share_service_base() {
        let differing: usize = SERVICE_UUID_LE
            .iter()
            .zip(TX_CHAR_UUID_LE.iter())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(differing, 1);
        assert_eq!(RX_CHAR_UUID_LE[12], 0x02);
        assert_eq!(TX_CHAR_UUID_LE[12], 0x03);
        assert_eq!(RX_CHAR_UUID_LE[13], 0x00);
    }

    #[test]
    fn test_success_is_sent() {
        assert_eq!(classify_status(NRF_SUCCESS), SendStatus::Sent);
    }

    #[test]
    fn test_resources_is_busy() {
        assert_eq!(classify_status(NRF_ERROR_RESOURCES), SendStatus::Busy);
    }

    #[test]
    fn test_uuid_le_matches_string_form() {
        // Last byte of the LE form is the first octet of the string form.
        assert_eq!(SERVICE_UUID_LE[15], 0x6E);
        assert_eq!(SERVICE_UUID_LE[0], 0x9E);
        assert!(SERVICE_UUID.starts_with("6e400001"));
    }
}
