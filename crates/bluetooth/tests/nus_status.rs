//! SoftDevice status classification tests.
//!
//! The drain loop retries only on `Busy`. Anything that would make it retry
//! a status the SoftDevice will never clear (invalid handle, notifications
//! disabled) hangs the main loop, so every known code is pinned here.

use bluetooth::nus::{
    classify_status, NusStatus, BLE_ERROR_INVALID_CONN_HANDLE, NRF_ERROR_INVALID_PARAM,
    NRF_ERROR_INVALID_STATE, NRF_ERROR_NOT_FOUND, NRF_ERROR_RESOURCES, NRF_SUCCESS,
};
use platform::SendStatus;

/// Only NRF_ERROR_RESOURCES is transient.
#[test]
fn only_resources_is_retried() {
    assert_eq!(classify_status(NRF_ERROR_RESOURCES), SendStatus::Busy);
    for code in [
        NRF_ERROR_NOT_FOUND,
        NRF_ERROR_INVALID_PARAM,
        NRF_ERROR_INVALID_STATE,
        BLE_ERROR_INVALID_CONN_HANDLE,
    ] {
        assert_eq!(
            classify_status(code),
            SendStatus::Fatal(code),
            "status {code:#x} must escalate, not retry"
        );
    }
}

/// Unknown codes are fatal and keep their value for the log.
#[test]
fn unknown_status_is_fatal_with_code() {
    assert_eq!(classify_status(0xDEAD), SendStatus::Fatal(0xDEAD));
    assert_eq!(NusStatus::from(0xDEAD), NusStatus::Other(0xDEAD));
}

/// Named statuses round-trip from their codes.
#[test]
fn named_statuses() {
    assert_eq!(NusStatus::from(NRF_SUCCESS), NusStatus::Success);
    assert_eq!(NusStatus::from(NRF_ERROR_RESOURCES), NusStatus::Resources);
    assert_eq!(
        NusStatus::from(BLE_ERROR_INVALID_CONN_HANDLE),
        NusStatus::InvalidConnHandle
    );
}
