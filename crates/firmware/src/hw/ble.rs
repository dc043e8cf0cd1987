//! SoftDevice S132 peripheral: advertising, the Nordic UART Service and
//! connection parameter negotiation.
//!
//! One connection at a time. While connected three futures run side by side:
//! the GATT event loop (host writes), the drain loop (notifications) and the
//! parameter negotiation. Whichever ends first ends the connection.

use core::mem;

use embassy_futures::select::{select3, Either3};
use embassy_time::Timer;
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, NotifyValueError, RegisterError, WriteOp};
use nrf_softdevice::ble::{peripheral, Connection, HciStatus, Uuid};
use nrf_softdevice::{raw, Softdevice};

use bluetooth::gap::{
    advertising_data, scan_response_data, ConnParamsAction, ConnParamsNegotiation, ADV_INTERVAL,
    ADV_TIMEOUT, CONN_SUP_TIMEOUT, HCI_CONN_INTERVAL_UNACCEPTABLE, MAX_CONN_INTERVAL,
    MIN_CONN_INTERVAL, SLAVE_LATENCY,
};
use bluetooth::nus::{
    ATT_HEADER_LEN, ATT_MTU_MAX, BLE_ERROR_INVALID_CONN_HANDLE, NRF_SUCCESS, RX_CHAR_UUID_LE,
    RX_MAX_LEN, SERVICE_UUID_LE, TX_CHAR_UUID_LE,
};
use capture::{DrainLoop, FrameLayout, RetryPolicy};
use platform::config::DEVICE_NAME;

use super::{HardwareApp, SoftDevicePower};
use crate::events::EventHub;
use crate::link::{LinkSupervisor, NusTransport};

/// Largest notification payload at the configured MTU.
#[allow(clippy::arithmetic_side_effects)] // Safety: 247 - 3, compile-time
const TX_MAX_LEN: u16 = ATT_MTU_MAX - ATT_HEADER_LEN;

/// CCCD bit enabling notifications.
const CCCD_NOTIFY: u8 = 0x01;

/// SoftDevice configuration: one peripheral link, 247-byte ATT MTU.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: ATT_MTU_MAX,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            // SAFETY: all-zero is "no access" for the security mode struct.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Events surfaced by the GATT server.
pub enum NusEvent {
    /// Host wrote a command to RX.
    Command(heapless::Vec<u8, RX_MAX_LEN>),
    /// Host toggled TX notifications.
    Notifications(bool),
}

/// Nordic UART Service attribute handles.
pub struct NusServer {
    rx: u16,
    tx: u16,
    tx_cccd: u16,
}

impl NusServer {
    /// Register the service and its two characteristics.
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let mut service = ServiceBuilder::new(sd, Uuid::new_128(&SERVICE_UUID_LE))?;

        let rx = service
            .add_characteristic(
                Uuid::new_128(&RX_CHAR_UUID_LE),
                Attribute::new([0u8; 1]).variable_len(RX_MAX_LEN as u16),
                Metadata::new(Properties::new().write().write_without_response()),
            )?
            .build();
        let tx = service
            .add_characteristic(
                Uuid::new_128(&TX_CHAR_UUID_LE),
                Attribute::new([0u8; 1]).variable_len(TX_MAX_LEN),
                Metadata::new(Properties::new().notify()),
            )?
            .build();
        let _service = service.build();

        defmt::info!(
            "NUS registered: rx={=u16} tx={=u16} cccd={=u16}",
            rx.value_handle,
            tx.value_handle,
            tx.cccd_handle
        );
        Ok(Self {
            rx: rx.value_handle,
            tx: tx.value_handle,
            tx_cccd: tx.cccd_handle,
        })
    }

    /// Queue one notification on TX and report the raw SoftDevice status.
    fn notify(&self, conn: &Connection, segment: &[u8]) -> u32 {
        match gatt_server::notify_value(conn, self.tx, segment) {
            Ok(()) => NRF_SUCCESS,
            Err(NotifyValueError::Disconnected) => BLE_ERROR_INVALID_CONN_HANDLE,
            Err(NotifyValueError::Raw(error)) => error as u32,
        }
    }
}

impl gatt_server::Server for NusServer {
    type Event = NusEvent;

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        if handle == self.rx {
            match heapless::Vec::from_slice(data) {
                Ok(command) => Some(NusEvent::Command(command)),
                Err(_) => {
                    defmt::warn!("RX write of {=usize} bytes dropped", data.len());
                    None
                }
            }
        } else if handle == self.tx_cccd {
            let enabled = data.first().is_some_and(|bits| bits & CCCD_NOTIFY != 0);
            Some(NusEvent::Notifications(enabled))
        } else {
            None
        }
    }
}

/// Runs the SoftDevice event loop.
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

fn preferred_conn_params() -> raw::ble_gap_conn_params_t {
    raw::ble_gap_conn_params_t {
        min_conn_interval: MIN_CONN_INTERVAL,
        max_conn_interval: MAX_CONN_INTERVAL,
        slave_latency: SLAVE_LATENCY,
        conn_sup_timeout: CONN_SUP_TIMEOUT,
    }
}

/// Ask for the preferred parameters until the host agrees or we give up.
async fn negotiate_conn_params(conn: &Connection) -> ! {
    let mut negotiation = ConnParamsNegotiation::new();
    let mut delay = negotiation.next_delay_ms();
    while let Some(ms) = delay {
        Timer::after_millis(ms).await;
        let accepted = conn.set_conn_params(preferred_conn_params()).is_ok();
        delay = match negotiation.record(accepted) {
            ConnParamsAction::Done => {
                defmt::debug!("connection parameters accepted");
                None
            }
            ConnParamsAction::RetryAfter(next) => {
                defmt::debug!("connection parameter update {=u8} refused", negotiation.attempts());
                Some(next)
            }
            ConnParamsAction::Disconnect => {
                defmt::warn!("host refused connection parameters, disconnecting");
                let _ = conn.disconnect_with_reason(HciStatus::new(HCI_CONN_INTERVAL_UNACCEPTABLE));
                None
            }
        };
    }
    loop {
        core::future::pending::<()>().await;
    }
}

/// Advertise, serve one connection, repeat. Powers off when advertising
/// times out.
#[embassy_executor::task]
pub async fn ble_task(
    sd: &'static Softdevice,
    server: &'static NusServer,
    app: &'static HardwareApp,
    hub: &'static EventHub<'static>,
) {
    let (adv_data, scan_data) = match (advertising_data(DEVICE_NAME), scan_response_data()) {
        (Ok(adv), Ok(scan)) => (adv, scan),
        (Err(error), _) | (_, Err(error)) => {
            defmt::error!("advertising payload: {}", error);
            return;
        }
    };

    let mut supervisor = LinkSupervisor::new(hub);
    let mut drain = DrainLoop::new(FrameLayout::REFERENCE, RetryPolicy::default());
    let mut power = SoftDevicePower;

    loop {
        let advertisement = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv_data,
            scan_data: &scan_data,
        };
        let config = peripheral::Config {
            interval: ADV_INTERVAL,
            timeout: Some(ADV_TIMEOUT),
            ..Default::default()
        };

        defmt::info!("advertising as {=str}", DEVICE_NAME);
        let conn = match peripheral::advertise_connectable(sd, advertisement, &config).await {
            Ok(conn) => conn,
            Err(peripheral::AdvertiseError::Timeout) => {
                supervisor.on_advertising_timeout(&mut power);
                continue;
            }
            Err(error) => {
                defmt::error!("advertising failed: {}", defmt::Debug2Format(&error));
                Timer::after_secs(1).await;
                continue;
            }
        };

        supervisor.on_connected(conn.handle().unwrap_or_default(), conn.peer_address().bytes());

        let mut transport = NusTransport::new(|segment: &[u8]| server.notify(&conn, segment));
        let gatt = gatt_server::run(&conn, server, |event| match event {
            NusEvent::Command(command) => supervisor.on_rx_write(&command),
            NusEvent::Notifications(enabled) => {
                defmt::info!("notifications {=bool}", enabled);
            }
        });

        match select3(
            gatt,
            app.drain_task(&mut drain, &mut transport),
            negotiate_conn_params(&conn),
        )
        .await
        {
            Either3::First(_disconnected) => {}
            Either3::Second(never) | Either3::Third(never) => match never {},
        }

        drain.abandon();
        supervisor.on_disconnected();
        let stats = drain.stats();
        defmt::info!(
            "link closed: {=u32} frames sent, {=u32} busy retries",
            stats.frames_sent,
            stats.busy_retries
        );
    }
}
