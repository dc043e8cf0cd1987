//! BLE link glue that does not need the SoftDevice.
//!
//! The hardware `ble` module turns SoftDevice events into calls on
//! [`LinkSupervisor`] and wraps the raw notify call in a [`NusTransport`].
//! Both are exercised on the host through the same paths.

use bluetooth::{classify_status, LinkState};
use platform::config::SEGMENT_LEN;
use platform::{PowerManager, SegmentTransport, SendStatus};

use crate::events::EventHub;

/// Raw notification on the TX characteristic.
pub trait RawNotify {
    /// Queue `data` as one notification, returning the stack status code.
    fn notify(&mut self, data: &[u8]) -> u32;
}

impl<F: FnMut(&[u8]) -> u32> RawNotify for F {
    fn notify(&mut self, data: &[u8]) -> u32 {
        self(data)
    }
}

/// Segment transport over NUS notifications.
pub struct NusTransport<N> {
    raw: N,
}

impl<N: RawNotify> NusTransport<N> {
    /// Wrap a raw notifier.
    pub const fn new(raw: N) -> Self {
        Self { raw }
    }
}

impl<N: RawNotify> SegmentTransport for NusTransport<N> {
    fn send(&mut self, segment: &[u8]) -> SendStatus {
        classify_status(self.raw.notify(segment))
    }
}

/// Routes link events into the hub and tracks the connection.
pub struct LinkSupervisor<'h, 'a> {
    hub: &'h EventHub<'a>,
    state: LinkState,
}

impl<'h, 'a> LinkSupervisor<'h, 'a> {
    /// Supervisor dispatching into `hub`.
    pub const fn new(hub: &'h EventHub<'a>) -> Self {
        Self {
            hub,
            state: LinkState::new(),
        }
    }

    /// Tracked link state.
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// A host connected.
    pub fn on_connected(&mut self, handle: u16, address: [u8; 6]) {
        self.state.on_connected(handle, address);
        #[cfg(feature = "defmt")]
        defmt::info!("connected: handle={=u16}", handle);
        #[cfg(feature = "emulator")]
        tracing::info!(handle, "connected");
        self.hub.link_state_changed(true);
    }

    /// The host went away. Repeated notifications are ignored.
    pub fn on_disconnected(&mut self) {
        if !self.state.connected() {
            return;
        }
        self.state.on_disconnected();
        #[cfg(feature = "defmt")]
        defmt::info!("disconnected");
        #[cfg(feature = "emulator")]
        tracing::info!("disconnected");
        self.hub.link_state_changed(false);
    }

    /// ATT MTU exchange completed.
    pub fn on_mtu_exchanged(&mut self, effective: u16) {
        self.state.on_mtu_exchanged(effective);
        if !self.state.fits(SEGMENT_LEN.saturating_add(1)) {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "MTU {=u16} too small for {=usize}-byte segments",
                self.state.att_mtu(),
                SEGMENT_LEN.saturating_add(1)
            );
            #[cfg(feature = "emulator")]
            tracing::warn!(mtu = self.state.att_mtu(), "MTU too small for first segment");
        }
    }

    /// Host wrote the RX characteristic.
    pub fn on_rx_write(&self, data: &[u8]) {
        if self.state.connected() {
            self.hub.data_received(data);
        }
    }

    /// Advertising ran out without a connection: power down.
    pub fn on_advertising_timeout<P: PowerManager + ?Sized>(&self, power: &mut P) {
        #[cfg(feature = "defmt")]
        defmt::info!("advertising timed out, entering system off");
        #[cfg(feature = "emulator")]
        tracing::info!("advertising timed out, entering system off");
        power.system_off();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bluetooth::nus::{NRF_ERROR_INVALID_STATE, NRF_ERROR_RESOURCES, NRF_SUCCESS};
    use platform::mocks::MockPower;

    #[test]
    fn transport_classifies_raw_status() {
        let mut codes = [NRF_ERROR_RESOURCES, NRF_SUCCESS, NRF_ERROR_INVALID_STATE].into_iter();
        let mut transport = NusTransport::new(|_: &[u8]| codes.next().unwrap());
        assert_eq!(transport.send(&[1]), SendStatus::Busy);
        assert_eq!(transport.send(&[1]), SendStatus::Sent);
        assert_eq!(transport.send(&[1]), SendStatus::Fatal(NRF_ERROR_INVALID_STATE));
    }

    #[test]
    fn advertising_timeout_powers_off() {
        let hub = EventHub::new();
        let supervisor = LinkSupervisor::new(&hub);
        let mut power = MockPower::new();
        supervisor.on_advertising_timeout(&mut power);
        assert!(power.is_off());
    }

    #[test]
    fn writes_while_disconnected_are_dropped() {
        let hub = EventHub::new();
        let mut supervisor = LinkSupervisor::new(&hub);
        supervisor.on_rx_write(&[1, 2]);
        supervisor.on_connected(1, [0; 6]);
        supervisor.on_mtu_exchanged(247);
        assert_eq!(supervisor.state().max_payload(), 244);
        supervisor.on_disconnected();
        supervisor.on_disconnected();
        assert!(!supervisor.state().connected());
    }
}
