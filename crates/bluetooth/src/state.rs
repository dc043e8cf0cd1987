//! Bluetooth link state tracker.

use crate::nus::{ATT_HEADER_LEN, ATT_MTU_DEFAULT, ATT_MTU_MAX};

/// Tracks the connected host, if any, and the negotiated ATT MTU.
pub struct LinkState {
    conn_handle: Option<u16>,
    peer_address: Option<[u8; 6]>,
    att_mtu: u16,
}

impl LinkState {
    /// Create a new, disconnected state.
    pub const fn new() -> Self {
        LinkState {
            conn_handle: None,
            peer_address: None,
            att_mtu: ATT_MTU_DEFAULT,
        }
    }

    /// Record a connection on `handle` from `address`. The MTU starts at the
    /// default until the exchange completes.
    pub fn on_connected(&mut self, handle: u16, address: [u8; 6]) {
        self.conn_handle = Some(handle);
        self.peer_address = Some(address);
        self.att_mtu = ATT_MTU_DEFAULT;
    }

    /// Record that the host has disconnected.
    pub fn on_disconnected(&mut self) {
        self.conn_handle = None;
        self.peer_address = None;
        self.att_mtu = ATT_MTU_DEFAULT;
    }

    /// Record the effective MTU after an exchange, clamped to what the
    /// SoftDevice is configured for.
    pub fn on_mtu_exchanged(&mut self, effective: u16) {
        self.att_mtu = effective.clamp(ATT_MTU_DEFAULT, ATT_MTU_MAX);
    }

    /// Returns `true` if a host is currently connected.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.conn_handle.is_some()
    }

    /// Connection handle, or `None` when disconnected.
    #[must_use]
    pub fn conn_handle(&self) -> Option<u16> {
        self.conn_handle
    }

    /// Returns the host's 6-byte Bluetooth address, or `None` when disconnected.
    #[must_use]
    pub fn peer_address(&self) -> Option<[u8; 6]> {
        self.peer_address
    }

    /// Effective ATT MTU.
    #[must_use]
    pub fn att_mtu(&self) -> u16 {
        self.att_mtu
    }

    /// Largest notification payload: MTU minus opcode and handle.
    #[must_use]
    pub fn max_payload(&self) -> usize {
        usize::from(self.att_mtu.saturating_sub(ATT_HEADER_LEN))
    }

    /// `true` if a notification of `len` bytes fits the current MTU.
    #[must_use]
    pub fn fits(&self, len: usize) -> bool {
        len <= self.max_payload()
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::LinkState;

    #[test]
    fn test_link_starts_disconnected() {
        let state = LinkState::new();
        assert!(!state.connected());
        assert_eq!(state.conn_handle(), None);
    }

    #[test]
    fn test_link_connect() {
        let mut state = LinkState::new();
        state.on_connected(0, [0x01; 6]);
        assert!(state.connected());
        assert_eq!(state.conn_handle(), Some(0));
    }

    #[test]
    fn test_link_disconnect_resets_mtu() {
        let mut state = LinkState::new();
        state.on_connected(0, [0x01; 6]);
        state.on_mtu_exchanged(247);
        state.on_disconnected();
        assert!(!state.connected());
        assert_eq!(state.att_mtu(), 23);
    }

    #[test]
    fn test_link_peer_address_after_connect() {
        let mut state = LinkState::new();
        let addr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
        state.on_connected(1, addr);
        assert_eq!(state.peer_address(), Some(addr));
    }

    #[test]
    fn test_default_payload_is_20_bytes() {
        let state = LinkState::new();
        assert_eq!(state.max_payload(), 20);
        assert!(!state.fits(202));
    }

    #[test]
    fn test_max_mtu_carries_first_segment() {
        let mut state = LinkState::new();
        state.on_connected(0, [0; 6]);
        state.on_mtu_exchanged(247);
        assert_eq!(state.max_payload(), 244);
        assert!(state.fits(202));
    }

    #[test]
    fn test_mtu_is_clamped() {
        let mut state = LinkState::new();
        state.on_mtu_exchanged(512);
        assert_eq!(state.att_mtu(), 247);
        state.on_mtu_exchanged(10);
        assert_eq!(state.att_mtu(), 23);
    }
}
