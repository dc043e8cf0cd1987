//! Capture trigger: the producer side of the frame ring.
//!
//! Two interrupt-context entry points:
//!
//! - [`CaptureTrigger::on_data_ready`] on the companion's rising edge arms the
//!   sequencer with the slot at `head` and starts it. The ring is not checked
//!   for room; overwriting is decided at completion. A slot the sequencer
//!   refuses is never started into.
//! - [`CaptureTrigger::on_sequence_complete`] when TIMER4 reaches K advances
//!   `head` past that slot.
//!
//! At most one capture is in flight. The in-flight word holds the head cursor
//! the sequencer was armed with, or [`IDLE`] when nothing is armed. An abort
//! clears it, so a completion that raced the abort finds nothing to commit.

use core::sync::atomic::{AtomicU32, Ordering};

use platform::{ArmError, TransferSequencer};

use crate::ring::{Cursor, FrameRing, HeadCommit};

/// No capture in flight. Never a valid cursor word: indices stop at 0xFFFE.
const IDLE: u32 = u32::MAX;

/// Result of a data-ready edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerOutcome {
    /// Sequencer armed on `slot` and started.
    Armed {
        /// Destination slot index.
        slot: usize,
    },
    /// A capture is already running; the edge was ignored.
    AlreadyCapturing,
    /// The sequencer refused the slot and was left stopped.
    Rejected(ArmError),
}

/// Result of a sequence-complete event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompletionOutcome {
    /// Frame enqueued.
    Enqueued {
        /// Slot that now holds the frame.
        slot: usize,
        /// The advance overwrote unread frames.
        overwrote: bool,
    },
    /// The capture was aborted or the ring reset under it; nothing enqueued.
    Aborted,
}

/// Capture trigger state shared between the GPIOTE and TIMER4 handlers.
pub struct CaptureTrigger {
    in_flight: AtomicU32,
    captured: AtomicU32,
    aborted: AtomicU32,
    ignored: AtomicU32,
    rejected: AtomicU32,
}

impl CaptureTrigger {
    /// Create an idle trigger.
    pub const fn new() -> Self {
        Self {
            in_flight: AtomicU32::new(IDLE),
            captured: AtomicU32::new(0),
            aborted: AtomicU32::new(0),
            ignored: AtomicU32::new(0),
            rejected: AtomicU32::new(0),
        }
    }

    /// Companion raised data-ready.
    pub fn on_data_ready<S, const SLOTS: usize, const FRAME_BYTES: usize>(
        &self,
        ring: &FrameRing<SLOTS, FRAME_BYTES>,
        sequencer: &mut S,
    ) -> TriggerOutcome
    where
        S: TransferSequencer + ?Sized,
    {
        let head = ring.head_cursor();
        if self
            .in_flight
            .compare_exchange(IDLE, head.to_word(), Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.ignored.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "defmt")]
            defmt::debug!("data-ready while capturing, ignored");
            #[cfg(feature = "tracing")]
            tracing::debug!("data-ready while capturing, ignored");
            return TriggerOutcome::AlreadyCapturing;
        }

        if let Err(error) = sequencer.arm(ring.slot(head)) {
            // Nothing was started, so no completion can race this release.
            self.in_flight.store(IDLE, Ordering::Release);
            self.rejected.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "defmt")]
            defmt::error!("capture not started: {}", error);
            #[cfg(feature = "tracing")]
            tracing::error!(%error, "capture not started");
            return TriggerOutcome::Rejected(error);
        }
        sequencer.start();
        TriggerOutcome::Armed { slot: head.index() }
    }

    /// Sequencer finished all K transfers.
    pub fn on_sequence_complete<const SLOTS: usize, const FRAME_BYTES: usize>(
        &self,
        ring: &FrameRing<SLOTS, FRAME_BYTES>,
    ) -> CompletionOutcome {
        let word = self.in_flight.swap(IDLE, Ordering::AcqRel);
        if word == IDLE {
            return CompletionOutcome::Aborted;
        }
        let armed = Cursor::from_word(word);
        match ring.commit_head(armed) {
            HeadCommit::Enqueued { overwrote, .. } => {
                self.captured.fetch_add(1, Ordering::Relaxed);
                CompletionOutcome::Enqueued {
                    slot: armed.index(),
                    overwrote,
                }
            }
            HeadCommit::Stale => {
                self.aborted.fetch_add(1, Ordering::Relaxed);
                CompletionOutcome::Aborted
            }
        }
    }

    /// Stop the sequencer and forget the in-flight capture.
    ///
    /// Returns `true` if a capture was in flight. Idempotent.
    pub fn abort<S>(&self, sequencer: &mut S) -> bool
    where
        S: TransferSequencer + ?Sized,
    {
        sequencer.stop();
        let was_capturing = self.in_flight.swap(IDLE, Ordering::AcqRel) != IDLE;
        if was_capturing {
            self.aborted.fetch_add(1, Ordering::Relaxed);
        }
        was_capturing
    }

    /// `true` between arming and completion or abort.
    pub fn is_capturing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) != IDLE
    }

    /// Frames enqueued since boot.
    pub fn captured(&self) -> u32 {
        self.captured.load(Ordering::Relaxed)
    }

    /// Captures abandoned by an abort or reset.
    pub fn aborted(&self) -> u32 {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Edges ignored because a capture was running.
    pub fn ignored(&self) -> u32 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Edges dropped because the sequencer refused the slot.
    pub fn rejected(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl Default for CaptureTrigger {
    fn default() -> Self {
        Self::new()
    }
}
