//! GAP advertising and connection parameters, and advertising payloads.
//!
//! All values are in the SoftDevice's native units:
//! - advertising interval: 0.625 ms
//! - advertising timeout: 10 ms
//! - connection interval: 1.25 ms
//! - supervision timeout: 10 ms

use heapless::Vec;

use crate::nus::SERVICE_UUID_LE;

/// Legacy advertising payload limit.
pub const ADV_DATA_MAX: usize = 31;

/// Advertising interval: 40 ms.
pub const ADV_INTERVAL: u32 = ms_to_adv_units(40);
/// Advertising stops after 180 s without a connection; the probe then powers
/// off.
pub const ADV_TIMEOUT: u16 = 18_000;
/// Minimum connection interval: 20 ms.
pub const MIN_CONN_INTERVAL: u16 = ms_to_conn_units(20);
/// Maximum connection interval: 75 ms.
pub const MAX_CONN_INTERVAL: u16 = ms_to_conn_units(75);
/// Slave latency.
pub const SLAVE_LATENCY: u16 = 0;
/// Supervision timeout: 4 s.
pub const CONN_SUP_TIMEOUT: u16 = 400;
/// Delay before the first connection parameter update request, in ms.
pub const FIRST_CONN_PARAMS_UPDATE_DELAY_MS: u64 = 5_000;
/// Delay between further update requests, in ms.
pub const NEXT_CONN_PARAMS_UPDATE_DELAY_MS: u64 = 30_000;
/// Update attempts before giving up and disconnecting.
pub const MAX_CONN_PARAMS_UPDATE_COUNT: u8 = 3;

/// HCI reason used when the host refuses our connection parameters.
pub const HCI_CONN_INTERVAL_UNACCEPTABLE: u8 = 0x3B;

/// What to do after a connection parameter update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnParamsAction {
    /// The host accepted; stop negotiating.
    Done,
    /// Ask again after this many milliseconds.
    RetryAfter(u64),
    /// Out of attempts; disconnect with [`HCI_CONN_INTERVAL_UNACCEPTABLE`].
    Disconnect,
}

/// Connection parameter negotiation for one connection.
///
/// The first request goes out [`FIRST_CONN_PARAMS_UPDATE_DELAY_MS`] after
/// connecting, later ones every [`NEXT_CONN_PARAMS_UPDATE_DELAY_MS`], at most
/// [`MAX_CONN_PARAMS_UPDATE_COUNT`] times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnParamsNegotiation {
    attempts: u8,
    done: bool,
}

impl ConnParamsNegotiation {
    /// Fresh negotiation for a new connection.
    pub const fn new() -> Self {
        Self {
            attempts: 0,
            done: false,
        }
    }

    /// Delay before the next request, or `None` once finished.
    pub fn next_delay_ms(&self) -> Option<u64> {
        if self.done || self.attempts >= MAX_CONN_PARAMS_UPDATE_COUNT {
            None
        } else if self.attempts == 0 {
            Some(FIRST_CONN_PARAMS_UPDATE_DELAY_MS)
        } else {
            Some(NEXT_CONN_PARAMS_UPDATE_DELAY_MS)
        }
    }

    /// Record whether the last request was accepted by the host.
    pub fn record(&mut self, accepted: bool) -> ConnParamsAction {
        self.attempts = self.attempts.saturating_add(1);
        if accepted {
            self.done = true;
            return ConnParamsAction::Done;
        }
        match self.next_delay_ms() {
            Some(delay) => ConnParamsAction::RetryAfter(delay),
            None => {
                self.done = true;
                ConnParamsAction::Disconnect
            }
        }
    }

    /// Requests sent so far.
    pub fn attempts(&self) -> u8 {
        self.attempts
    }
}

// AD types (Bluetooth Core Supplement, Part A, 1.x)
const AD_FLAGS: u8 = 0x01;
const AD_COMPLETE_128_UUIDS: u8 = 0x07;
const AD_SHORT_NAME: u8 = 0x08;
const AD_COMPLETE_NAME: u8 = 0x09;
/// LE General Discoverable, BR/EDR not supported.
const FLAGS_GENERAL_DISC_NO_BREDR: u8 = 0x06;

/// Milliseconds to 0.625 ms advertising units.
#[allow(clippy::arithmetic_side_effects)] // Safety: compile-time constants only
pub const fn ms_to_adv_units(ms: u32) -> u32 {
    ms * 1000 / 625
}

/// Milliseconds to 1.25 ms connection-interval units.
#[allow(clippy::arithmetic_side_effects)] // Safety: compile-time constants only
#[allow(clippy::cast_possible_truncation)] // Safety: callers pass ≤ 4 s
pub const fn ms_to_conn_units(ms: u32) -> u16 {
    (ms * 1000 / 1250) as u16
}

/// GAP payload errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GapError {
    /// The payload would exceed 31 bytes.
    PayloadTooLong,
    /// Device name is empty.
    EmptyName,
}

impl core::fmt::Display for GapError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PayloadTooLong => write!(f, "Advertising payload exceeds 31 bytes"),
            Self::EmptyName => write!(f, "Device name is empty"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GapError {}

fn push_ad(buf: &mut Vec<u8, ADV_DATA_MAX>, ad_type: u8, data: &[u8]) -> Result<(), GapError> {
    let len = u8::try_from(data.len().saturating_add(1)).map_err(|_| GapError::PayloadTooLong)?;
    buf.push(len).map_err(|_| GapError::PayloadTooLong)?;
    buf.push(ad_type).map_err(|_| GapError::PayloadTooLong)?;
    buf.extend_from_slice(data)
        .map_err(|_| GapError::PayloadTooLong)
}

/// Advertising data: flags and the device name. A name that does not fit is
/// shortened and marked as such.
pub fn advertising_data(name: &str) -> Result<Vec<u8, ADV_DATA_MAX>, GapError> {
    if name.is_empty() {
        return Err(GapError::EmptyName);
    }
    let mut buf = Vec::new();
    push_ad(&mut buf, AD_FLAGS, &[FLAGS_GENERAL_DISC_NO_BREDR])?;

    // Flags take 3 bytes, the name header 2.
    let room = ADV_DATA_MAX.saturating_sub(buf.len()).saturating_sub(2);
    let bytes = name.as_bytes();
    if bytes.len() <= room {
        push_ad(&mut buf, AD_COMPLETE_NAME, bytes)?;
    } else {
        let short = bytes.get(..room).ok_or(GapError::PayloadTooLong)?;
        push_ad(&mut buf, AD_SHORT_NAME, short)?;
    }
    Ok(buf)
}

/// Scan response: the NUS service UUID, so hosts can filter on it.
pub fn scan_response_data() -> Result<Vec<u8, ADV_DATA_MAX>, GapError> {
    let mut buf = Vec::new();
    push_ad(&mut buf, AD_COMPLETE_128_UUIDS, &SERVICE_UUID_LE)?;
    Ok(buf)
}
