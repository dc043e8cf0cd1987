//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests and in the desktop emulator.

#![cfg(any(test, feature = "std"))]

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use crate::*;

/// One recorded sequencer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerCall {
    /// `arm` with the slot's ring index.
    Arm(usize),
    /// `start`
    Start,
    /// `stop`
    Stop,
}

/// Mock transfer sequencer
///
/// Records every call. [`MockSequencer::complete_transfer`] stands in for the
/// EasyDMA writes of one whole capture pass.
#[derive(Debug, Default)]
pub struct MockSequencer {
    calls: Vec<SequencerCall>,
    armed: Option<FrameSlot>,
    running: bool,
    unreachable: Option<usize>,
}

impl MockSequencer {
    /// Create new mock sequencer
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call in order.
    pub fn calls(&self) -> &[SequencerCall] {
        &self.calls
    }

    /// Number of `stop` calls.
    pub fn stop_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == SequencerCall::Stop)
            .count()
    }

    /// Number of `start` calls.
    pub fn start_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == SequencerCall::Start)
            .count()
    }

    /// `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Slot the sequencer currently points at.
    pub fn armed(&self) -> Option<FrameSlot> {
        self.armed
    }

    /// Copy `data` into the armed slot as the hardware would, then stop as
    /// TIMER4's compare short does. Returns the slot index written.
    ///
    /// The caller must not hold a reference into that slot.
    pub fn complete_transfer(&mut self, data: &[u8]) -> Option<usize> {
        if !self.running {
            return None;
        }
        let slot = self.armed?;
        let len = data.len().min(slot.len());
        // SAFETY: FrameSlot guarantees `len()` writable bytes at `as_ptr()`;
        // tests drive producer and consumer from one thread and hold no
        // borrow of the armed slot across this call.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), slot.as_ptr(), len);
        }
        self.running = false;
        Some(slot.index())
    }

    /// Refuse to arm ring slot `index`, as for a buffer outside data RAM.
    pub fn reject_slot(&mut self, index: usize) {
        self.unreachable = Some(index);
    }

    /// Forget recorded calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl TransferSequencer for MockSequencer {
    fn arm(&mut self, slot: FrameSlot) -> Result<(), ArmError> {
        self.calls.push(SequencerCall::Arm(slot.index()));
        if self.unreachable == Some(slot.index()) {
            return Err(ArmError::NotDmaReachable {
                slot: slot.index(),
                address: u32::try_from(slot.as_ptr() as usize).unwrap_or(u32::MAX),
            });
        }
        self.armed = Some(slot);
        Ok(())
    }

    fn start(&mut self) {
        self.calls.push(SequencerCall::Start);
        self.running = true;
    }

    fn stop(&mut self) {
        self.calls.push(SequencerCall::Stop);
        self.running = false;
    }
}

/// Mock wireless transport
///
/// Replies from a script of statuses, then [`SendStatus::Sent`] once the
/// script runs out. Every call is recorded with the bytes it carried.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: VecDeque<SendStatus>,
    calls: Vec<(Vec<u8>, SendStatus)>,
}

impl MockTransport {
    /// Create new mock transport that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport replying with `script` first.
    pub fn with_script(script: impl IntoIterator<Item = SendStatus>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: Vec::new(),
        }
    }

    /// Queue one more scripted status.
    pub fn push_status(&mut self, status: SendStatus) {
        self.script.push_back(status);
    }

    /// Every call with its bytes and the status returned.
    pub fn calls(&self) -> &[(Vec<u8>, SendStatus)] {
        &self.calls
    }

    /// Segments that were accepted, in order.
    pub fn delivered(&self) -> Vec<&[u8]> {
        self.calls
            .iter()
            .filter(|(_, status)| *status == SendStatus::Sent)
            .map(|(bytes, _)| bytes.as_slice())
            .collect()
    }

    /// Number of calls answered with `Busy`.
    pub fn busy_count(&self) -> usize {
        self.calls.iter().filter(|(_, s)| s.is_busy()).count()
    }
}

impl SegmentTransport for MockTransport {
    fn send(&mut self, segment: &[u8]) -> SendStatus {
        let status = self.script.pop_front().unwrap_or(SendStatus::Sent);
        self.calls.push((segment.to_vec(), status));
        status
    }
}

/// Mock companion device
#[derive(Debug)]
pub struct MockCompanion {
    max_len: usize,
    packets: Vec<Vec<u8>>,
}

impl MockCompanion {
    /// Create a companion accepting packets up to one segment.
    pub fn new() -> Self {
        Self::with_max_len(config::SEGMENT_LEN)
    }

    /// Create a companion accepting packets up to `max_len` bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len,
            packets: Vec::new(),
        }
    }

    /// Packets accepted so far.
    pub fn packets(&self) -> &[Vec<u8>] {
        &self.packets
    }
}

impl Default for MockCompanion {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanionLink for MockCompanion {
    fn send_config(&mut self, packet: &[u8]) -> Result<(), CompanionError> {
        if packet.len() > self.max_len {
            return Err(CompanionError::PacketTooLong {
                len: packet.len(),
                max: self.max_len,
            });
        }
        self.packets.push(packet.to_vec());
        Ok(())
    }
}

/// Mock power manager
#[derive(Debug, Default)]
pub struct MockPower {
    idle_count: usize,
    off: bool,
}

impl MockPower {
    /// Create new mock power manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `idle` calls.
    pub fn idle_count(&self) -> usize {
        self.idle_count
    }

    /// `true` once `system_off` was called.
    pub fn is_off(&self) -> bool {
        self.off
    }
}

impl PowerManager for MockPower {
    fn idle(&mut self) {
        self.idle_count = self.idle_count.saturating_add(1);
    }

    fn system_off(&mut self) {
        self.off = true;
    }
}
