//! Desktop emulator: the probe pipeline against simulated hardware.
//!
//! A tokio-driven companion raises data-ready at a fixed frame period and
//! produces synthetic frames carrying an incrementing acquisition number.
//! The emulated sequencer copies each frame into the armed slot, and a lossy
//! transport reports busy at a configurable rate before handing accepted
//! segments to a host-side [`FrameAssembler`]. Everything logs through
//! `tracing`.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p firmware --example stream_emulator --features emulator
//! ```

use std::time::Duration;
use std::vec::Vec;

use embassy_futures::select::{select, Either};

use capture::{CaptureTrigger, DrainLoop, DrainStats, FrameAssembler, FrameLayout, FrameRing, RetryPolicy};
use platform::config::{FRAME_BYTES, FRAME_MARKER, RESTART_PACKET, SEGMENT_LEN};
use platform::{
    ArmError, CompanionError, CompanionLink, FrameSlot, RegistryFull, SegmentTransport, SendStatus,
    TransferSequencer,
};

use crate::app::{Diagnostics, ProbeApp};
use crate::events::EventHub;

/// Emulator ring: the reference slot size with a configurable slot count.
pub const EMULATOR_SLOTS: usize = platform::config::RING_CAPACITY;

/// Run parameters.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Frames the companion produces.
    pub frames: u32,
    /// Time between data-ready edges.
    pub frame_period: Duration,
    /// Busy replies per thousand sends.
    pub busy_per_mille: u16,
    /// Drop the link after this many frames, then reconnect.
    pub disconnect_after: Option<u32>,
    /// Seed for the busy generator.
    pub seed: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            frames: 200,
            frame_period: Duration::from_millis(5),
            busy_per_mille: 100,
            disconnect_after: None,
            seed: 0x5EED,
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct EmulatorReport {
    /// Frames reassembled on the host side.
    pub frames_received: u32,
    /// Acquisition numbers in arrival order.
    pub sequence: Vec<u32>,
    /// Pipeline counters.
    pub diagnostics: Diagnostics,
    /// Drain loop counters.
    pub drain: DrainStats,
    /// Segments the host assembler discarded.
    pub dropped_segments: u32,
}

impl EmulatorReport {
    /// Acquisition numbers that never arrived, within the received range.
    pub fn gaps(&self) -> u32 {
        self.sequence
            .windows(2)
            .filter_map(|pair| match pair {
                [a, b] if b > a => Some(b.saturating_sub(*a).saturating_sub(1)),
                _ => None,
            })
            .sum()
    }
}

/// Sequencer whose "DMA" is a memcpy performed when the companion finishes.
#[derive(Debug, Default)]
pub struct EmulatedSequencer {
    armed: Option<FrameSlot>,
    running: bool,
}

impl EmulatedSequencer {
    /// Copy `frame` into the armed slot and stop. `false` if not running.
    pub fn finish(&mut self, frame: &[u8]) -> bool {
        let Some(slot) = self.armed.filter(|_| self.running) else {
            return false;
        };
        let len = frame.len().min(slot.len());
        // SAFETY: the slot was handed out by the ring for this capture and
        // nothing else references it until the completion is committed.
        #[allow(unsafe_code)]
        unsafe {
            core::ptr::copy_nonoverlapping(frame.as_ptr(), slot.as_ptr(), len);
        }
        self.running = false;
        tracing::trace!(slot = slot.index(), "capture pass finished");
        true
    }
}

impl TransferSequencer for EmulatedSequencer {
    fn arm(&mut self, slot: FrameSlot) -> Result<(), ArmError> {
        self.armed = Some(slot);
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

/// Synthetic acquisition front-end.
#[derive(Debug, Default)]
pub struct SyntheticCompanion {
    acquisition: u32,
    config: Vec<u8>,
}

impl SyntheticCompanion {
    /// Produce the next frame image as the SPI chain would capture it.
    #[allow(clippy::arithmetic_side_effects)] // Safety: modulo by a non-zero constant
    pub fn next_frame(&mut self) -> [u8; FRAME_BYTES] {
        let mut frame = [0u8; FRAME_BYTES];
        // byte 0: SPI turnaround, byte 1: marker, bytes 2..6: acquisition number
        if let Some(marker) = frame.get_mut(1) {
            *marker = FRAME_MARKER;
        }
        if let Some(counter) = frame.get_mut(2..6) {
            counter.copy_from_slice(&self.acquisition.to_le_bytes());
        }
        for (i, byte) in frame.iter_mut().enumerate().skip(6) {
            *byte = (i % 251) as u8;
        }
        self.acquisition = self.acquisition.wrapping_add(1);
        frame
    }

    /// Last configuration packet received.
    pub fn config(&self) -> &[u8] {
        &self.config
    }
}

impl CompanionLink for SyntheticCompanion {
    fn send_config(&mut self, packet: &[u8]) -> Result<(), CompanionError> {
        if packet.len() > SEGMENT_LEN {
            return Err(CompanionError::PacketTooLong {
                len: packet.len(),
                max: SEGMENT_LEN,
            });
        }
        if packet == RESTART_PACKET {
            tracing::info!("companion restarted");
        } else {
            tracing::info!(len = packet.len(), "companion reconfigured");
        }
        self.config = packet.to_vec();
        Ok(())
    }
}

/// Transport that is busy `busy_per_mille` / 1000 of the time.
pub struct LossyTransport {
    busy_per_mille: u16,
    state: u64,
    assembler: FrameAssembler<FRAME_BYTES>,
    sequence: Vec<u32>,
}

impl LossyTransport {
    /// Create a transport for reference-shaped frames.
    pub fn new(busy_per_mille: u16, seed: u64) -> Self {
        Self {
            busy_per_mille,
            state: seed | 1,
            assembler: FrameAssembler::new(FrameLayout::REFERENCE),
            sequence: Vec::new(),
        }
    }

    /// Acquisition numbers received so far.
    pub fn sequence(&self) -> &[u32] {
        &self.sequence
    }

    /// Host-side reassembler.
    pub fn assembler(&self) -> &FrameAssembler<FRAME_BYTES> {
        &self.assembler
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: shifts by constants below 64
    fn next_random(&mut self) -> u64 {
        // xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

impl SegmentTransport for LossyTransport {
    #[allow(clippy::arithmetic_side_effects)] // Safety: modulo by a non-zero constant
    fn send(&mut self, segment: &[u8]) -> SendStatus {
        if self.next_random() % 1000 < u64::from(self.busy_per_mille) {
            return SendStatus::Busy;
        }
        if let Some(payload) = self.assembler.push(segment) {
            let number = payload
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .map_or(0, u32::from_le_bytes);
            tracing::debug!(acquisition = number, "frame received");
            self.sequence.push(number);
        }
        SendStatus::Sent
    }
}

type EmulatorApp<'a> =
    ProbeApp<'a, EmulatedSequencer, SyntheticCompanion, EMULATOR_SLOTS, FRAME_BYTES>;

/// Subscribe the app to every event source, as boot step 6 does on hardware.
fn wire<'h, 'a>(hub: &mut EventHub<'h>, app: &'h EmulatorApp<'a>) -> Result<(), RegistryFull> {
    hub.register_data_ready(app)
        .and_then(|()| hub.register_sequence_complete(app))
        .and_then(|()| hub.register_link(app))
        .map_err(|error| {
            tracing::error!(%error, "event hub wiring failed");
            error
        })
}

/// Run the emulator to completion.
pub async fn run(config: EmulatorConfig) -> Result<EmulatorReport, RegistryFull> {
    let ring: FrameRing<EMULATOR_SLOTS, FRAME_BYTES> = FrameRing::new();
    let trigger = CaptureTrigger::new();
    let app: EmulatorApp<'_> = ProbeApp::new(
        &ring,
        &trigger,
        EmulatedSequencer::default(),
        SyntheticCompanion::default(),
    );

    let mut hub = EventHub::new();
    wire(&mut hub, &app)?;

    let mut drain = DrainLoop::new(FrameLayout::REFERENCE, RetryPolicy::default());
    let mut transport = LossyTransport::new(config.busy_per_mille, config.seed);

    hub.link_state_changed(true);
    let companion = companion_task(&app, &hub, &config);
    if let Either::First(never) = select(app.drain_task(&mut drain, &mut transport), companion).await {
        match never {}
    }

    let report = EmulatorReport {
        frames_received: transport.assembler().frames(),
        sequence: transport.sequence().to_vec(),
        diagnostics: app.diagnostics(),
        drain: drain.stats(),
        dropped_segments: transport.assembler().dropped_segments(),
    };
    tracing::info!(
        received = report.frames_received,
        overflows = report.diagnostics.overflows,
        busy = report.drain.busy_retries,
        gaps = report.gaps(),
        "emulation finished"
    );
    Ok(report)
}

async fn companion_task(app: &EmulatorApp<'_>, hub: &EventHub<'_>, config: &EmulatorConfig) {
    // Four transfers at 300 us each.
    let capture_time = Duration::from_micros(1200);
    for n in 0..config.frames {
        tokio::time::sleep(config.frame_period).await;
        hub.data_ready();
        tokio::time::sleep(capture_time).await;
        let finished = app.with_peripherals(|sequencer, companion| {
            let frame = companion.next_frame();
            sequencer.finish(&frame)
        });
        if finished {
            hub.sequence_complete();
        }
        if config.disconnect_after == Some(n) {
            tracing::info!(frame = n, "simulating link drop");
            hub.link_state_changed(false);
            tokio::time::sleep(config.frame_period).await;
            hub.link_state_changed(true);
        }
    }
    // Let the drain catch up.
    while !app.ring().is_empty() {
        tokio::time::sleep(config.frame_period).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::config::HANDLER_CAPACITY;

    fn quick_config() -> EmulatorConfig {
        EmulatorConfig {
            frames: 20,
            frame_period: Duration::from_millis(2),
            busy_per_mille: 300,
            disconnect_after: None,
            seed: 7,
        }
    }

    #[tokio::test]
    async fn every_frame_arrives_in_order_without_drop() {
        let report = run(quick_config()).await.unwrap();
        assert_eq!(report.frames_received, 20);
        assert_eq!(report.gaps(), 0);
        assert_eq!(report.dropped_segments, 0);
        assert!(report.drain.busy_retries > 0);
        assert!(report.sequence.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn link_drop_resets_once() {
        let config = EmulatorConfig {
            disconnect_after: Some(5),
            ..quick_config()
        };
        let report = run(config).await.unwrap();
        assert_eq!(report.diagnostics.resets.disconnect, 1);
        assert!(report.frames_received > 0);
    }

    #[test]
    fn wiring_a_full_hub_reports_registry_full() {
        let ring: FrameRing<EMULATOR_SLOTS, FRAME_BYTES> = FrameRing::new();
        let trigger = CaptureTrigger::new();
        let app: EmulatorApp<'_> = ProbeApp::new(
            &ring,
            &trigger,
            EmulatedSequencer::default(),
            SyntheticCompanion::default(),
        );
        let mut hub = EventHub::new();
        for _ in 0..HANDLER_CAPACITY {
            hub.register_data_ready(&app).unwrap();
        }
        assert_eq!(
            wire(&mut hub, &app),
            Err(RegistryFull {
                capacity: HANDLER_CAPACITY
            })
        );
    }
}
