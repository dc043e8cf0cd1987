//! Probe application: the capture pipeline bound to its peripherals.
//!
//! [`ProbeApp`] is what the event registries call into. It owns the
//! sequencer and the companion link behind one critical-section mutex (both
//! are touched from interrupt context and from the link task), and wakes the
//! drain task through a [`Signal`] whenever a frame lands in the ring.
//!
//! ```text
//!  GPIOTE edge ──► on_data_ready ─────────┐
//!  TIMER4 IRQ  ──► on_sequence_complete ──┼──► ring / trigger / session
//!  SoftDevice  ──► on_link_state_changed ─┤         │
//!                  on_data_received ──────┘         │ frame_ready
//!                                                   ▼
//!                                   drain_task ──► SegmentTransport
//! ```
//!
//! Nothing in this module touches real hardware, so the whole event flow is
//! driven from host tests and the desktop emulator.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use capture::{
    CaptureTrigger, CompletionOutcome, DrainError, DrainLoop, DrainProgress, FrameRing,
    ResetCounts, ResetReport, SessionController, SessionError, SessionState,
};
use platform::{
    CompanionLink, DataReadyHandler, LinkEventHandler, SegmentTransport, SequenceCompleteHandler,
    TransferSequencer,
};

/// Peripherals the pipeline drives from more than one context.
pub struct Peripherals<S, L> {
    /// TIMER/PPI/SPIM capture chain.
    pub sequencer: S,
    /// Configuration path to the acquisition front-end.
    pub companion: L,
}

/// Counters that never influence behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Completions that overwrote unread frames.
    pub overflows: u32,
    /// Unread frames, `(head - tail) mod C`.
    pub occupancy: usize,
    /// Frames enqueued.
    pub captured: u32,
    /// Captures abandoned by a reset.
    pub aborted: u32,
    /// Data-ready edges that arrived mid-capture.
    pub ignored_edges: u32,
    /// Data-ready edges dropped because the sequencer refused the slot.
    pub rejected_edges: u32,
    /// Resets per cause.
    pub resets: ResetCounts,
}

/// The capture pipeline wired to its peripherals.
pub struct ProbeApp<'a, S, L, const SLOTS: usize, const FRAME_BYTES: usize> {
    ring: &'a FrameRing<SLOTS, FRAME_BYTES>,
    trigger: &'a CaptureTrigger,
    session: SessionController<'a, SLOTS, FRAME_BYTES>,
    peripherals: Mutex<CriticalSectionRawMutex, RefCell<Peripherals<S, L>>>,
    frame_ready: Signal<CriticalSectionRawMutex, ()>,
    connected: AtomicBool,
}

impl<'a, S, L, const SLOTS: usize, const FRAME_BYTES: usize> ProbeApp<'a, S, L, SLOTS, FRAME_BYTES>
where
    S: TransferSequencer,
    L: CompanionLink,
{
    /// Bind `ring` and `trigger` to the peripherals. The link starts down.
    pub const fn new(
        ring: &'a FrameRing<SLOTS, FRAME_BYTES>,
        trigger: &'a CaptureTrigger,
        sequencer: S,
        companion: L,
    ) -> Self {
        Self {
            ring,
            trigger,
            session: SessionController::new(ring, trigger),
            peripherals: Mutex::new(RefCell::new(Peripherals {
                sequencer,
                companion,
            })),
            frame_ready: Signal::new(),
            connected: AtomicBool::new(false),
        }
    }

    /// The frame ring.
    pub fn ring(&self) -> &'a FrameRing<SLOTS, FRAME_BYTES> {
        self.ring
    }

    /// The session controller.
    pub fn session(&self) -> &SessionController<'a, SLOTS, FRAME_BYTES> {
        &self.session
    }

    /// Current pipeline state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// A host is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Run `f` with exclusive access to the peripherals.
    ///
    /// Interrupts are masked for the duration; keep `f` short.
    pub fn with_peripherals<R>(&self, f: impl FnOnce(&mut S, &mut L) -> R) -> R {
        self.peripherals.lock(|cell| {
            let mut peripherals = cell.borrow_mut();
            let Peripherals {
                sequencer,
                companion,
            } = &mut *peripherals;
            f(sequencer, companion)
        })
    }

    /// Snapshot of the diagnostic counters.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            overflows: self.ring.overflow_count(),
            occupancy: self.ring.occupancy(),
            captured: self.trigger.captured(),
            aborted: self.trigger.aborted(),
            ignored_edges: self.trigger.ignored(),
            rejected_edges: self.trigger.rejected(),
            resets: self.session.reset_counts(),
        }
    }

    /// Escalate a drain failure into a session reset.
    pub fn on_transport_fatal(&self, error: DrainError) -> Result<ResetReport, SessionError> {
        let result = self.with_peripherals(|sequencer, companion| {
            self.session.on_transport_fatal(error, sequencer, companion)
        });
        log_reset(&result);
        result
    }

    /// Drain the ring into `transport` for as long as the future is polled.
    ///
    /// Sleeps on the frame-ready signal while the ring is empty or the link
    /// is down, and yields to the executor after every frame and every
    /// backpressure give-up so the link task keeps running.
    pub async fn drain_task<T>(&self, drain: &mut DrainLoop, transport: &mut T) -> !
    where
        T: SegmentTransport + ?Sized,
    {
        loop {
            if !self.is_connected() {
                self.frame_ready.wait().await;
                continue;
            }
            match drain.poll(self.ring, transport) {
                Ok(DrainProgress::Idle) => self.frame_ready.wait().await,
                Ok(_) => yield_now().await,
                Err(error @ DrainError::TransportFatal { .. }) => {
                    drain.abandon();
                    // Logged inside; the reset itself already happened.
                    let _ = self.on_transport_fatal(error);
                    yield_now().await;
                }
                Err(error @ DrainError::LayoutMismatch { .. }) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("drain disabled: {}", error);
                    #[cfg(feature = "emulator")]
                    tracing::error!(%error, "drain disabled");
                    #[cfg(not(any(feature = "defmt", feature = "emulator")))]
                    let _ = error;
                    self.frame_ready.wait().await;
                }
            }
        }
    }
}

fn log_reset(result: &Result<ResetReport, SessionError>) {
    if let Err(error) = result {
        #[cfg(feature = "defmt")]
        defmt::warn!("{}", error);
        #[cfg(feature = "emulator")]
        tracing::warn!(%error, "companion packet not delivered");
        #[cfg(not(any(feature = "defmt", feature = "emulator")))]
        let _ = error;
    }
}

impl<S, L, const SLOTS: usize, const FRAME_BYTES: usize> DataReadyHandler
    for ProbeApp<'_, S, L, SLOTS, FRAME_BYTES>
where
    S: TransferSequencer,
    L: CompanionLink,
{
    fn on_data_ready(&self) {
        self.with_peripherals(|sequencer, _| {
            self.trigger.on_data_ready(self.ring, sequencer);
        });
    }
}

impl<S, L, const SLOTS: usize, const FRAME_BYTES: usize> SequenceCompleteHandler
    for ProbeApp<'_, S, L, SLOTS, FRAME_BYTES>
where
    S: TransferSequencer,
    L: CompanionLink,
{
    fn on_sequence_complete(&self) {
        if let CompletionOutcome::Enqueued { .. } = self.trigger.on_sequence_complete(self.ring) {
            self.frame_ready.signal(());
        }
    }
}

impl<S, L, const SLOTS: usize, const FRAME_BYTES: usize> LinkEventHandler
    for ProbeApp<'_, S, L, SLOTS, FRAME_BYTES>
where
    S: TransferSequencer,
    L: CompanionLink,
{
    fn on_link_state_changed(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        let result = self.with_peripherals(|sequencer, companion| {
            self.session.on_link_state(connected, sequencer, companion)
        });
        if let Some(result) = result {
            log_reset(&result);
        }
        // Wake the drain task so it re-reads the link state.
        self.frame_ready.signal(());
    }

    fn on_data_received(&self, data: &[u8]) {
        let result = self.with_peripherals(|sequencer, companion| {
            self.session.reconfigure(data, sequencer, companion)
        });
        log_reset(&result);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use capture::ResetCause;
    use platform::config::RESTART_PACKET;
    use platform::mocks::{MockCompanion, MockSequencer};

    type TestApp<'a> = ProbeApp<'a, MockSequencer, MockCompanion, 4, 12>;

    #[test]
    fn edge_then_completion_enqueues_one_frame() {
        let ring = FrameRing::new();
        let trigger = CaptureTrigger::new();
        let app: TestApp<'_> = ProbeApp::new(&ring, &trigger, MockSequencer::new(), MockCompanion::new());

        app.on_data_ready();
        assert_eq!(app.state(), SessionState::Capturing);
        app.with_peripherals(|seq, _| seq.complete_transfer(&[7; 12]));
        app.on_sequence_complete();

        assert_eq!(ring.head(), 1);
        assert_eq!(app.diagnostics().captured, 1);
        assert_eq!(app.state(), SessionState::Draining);
    }

    #[test]
    fn refused_slot_leaves_session_idle() {
        let ring = FrameRing::new();
        let trigger = CaptureTrigger::new();
        let app: TestApp<'_> = ProbeApp::new(&ring, &trigger, MockSequencer::new(), MockCompanion::new());
        app.with_peripherals(|seq, _| seq.reject_slot(0));

        app.on_data_ready();
        app.on_sequence_complete();

        assert_eq!(app.state(), SessionState::Idle);
        assert_eq!(app.diagnostics().rejected_edges, 1);
        assert_eq!(app.diagnostics().captured, 0);
        app.with_peripherals(|seq, _| assert_eq!(seq.start_count(), 0));
    }

    #[test]
    fn disconnect_sends_restart_packet() {
        let ring = FrameRing::new();
        let trigger = CaptureTrigger::new();
        let app: TestApp<'_> = ProbeApp::new(&ring, &trigger, MockSequencer::new(), MockCompanion::new());

        app.on_link_state_changed(true);
        assert!(app.is_connected());
        app.on_link_state_changed(false);
        assert!(!app.is_connected());

        app.with_peripherals(|seq, companion| {
            assert_eq!(seq.stop_count(), 1);
            assert_eq!(companion.packets(), &[RESTART_PACKET.to_vec()]);
        });
        assert_eq!(app.session().last_cause(), Some(ResetCause::Disconnect));
    }

    #[test]
    fn command_is_forwarded_to_companion() {
        let ring = FrameRing::new();
        let trigger = CaptureTrigger::new();
        let app: TestApp<'_> = ProbeApp::new(&ring, &trigger, MockSequencer::new(), MockCompanion::new());

        app.on_data_received(&[0x01, 0x20, 0x03]);
        app.with_peripherals(|_, companion| {
            assert_eq!(companion.packets(), &[vec![0x01, 0x20, 0x03]]);
        });
        assert_eq!(app.diagnostics().resets.reconfigure, 1);
    }
}
