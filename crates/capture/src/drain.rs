//! Drain loop: the consumer side of the frame ring.
//!
//! Each [`DrainLoop::poll`] forwards at most one frame, segment by segment,
//! and releases its slot only after the last segment was accepted. A busy
//! transport is retried with the same bytes. How long one poll keeps retrying
//! is the [`RetryPolicy`]; when it gives up, the position (frame, segment) is
//! kept and the next poll resumes there, so the executor can service other
//! tasks in between.

use platform::{SegmentTransport, SendStatus};

use crate::error::DrainError;
use crate::frame::FrameLayout;
use crate::ring::{Cursor, FrameRing};

/// Busy replies tolerated inside one poll before yielding.
pub const DEFAULT_BUSY_SPIN: u32 = 4;

/// How a poll handles a busy transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryPolicy {
    /// Retry inside the poll until the segment is accepted or fails.
    UntilSent,
    /// Return [`DrainProgress::Backpressured`] after this many consecutive
    /// busy replies in one poll.
    YieldAfter(u32),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::YieldAfter(DEFAULT_BUSY_SPIN)
    }
}

/// What one poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrainProgress {
    /// Ring empty, nothing sent.
    Idle,
    /// A whole frame went out and its slot was released.
    FrameSent {
        /// Released slot.
        slot: usize,
        /// Busy replies seen while sending this frame.
        busy_retries: u32,
    },
    /// The frame went out but a reset emptied the ring meanwhile; the tail
    /// was left at zero.
    Discarded {
        /// Slot that was being sent.
        slot: usize,
    },
    /// Transport busy; the next poll resumes at `segment`.
    Backpressured {
        /// Slot being sent.
        slot: usize,
        /// Segment waiting for the transport.
        segment: usize,
    },
}

/// Counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrainStats {
    /// Frames whose slot was released.
    pub frames_sent: u32,
    /// Segments accepted by the transport.
    pub segments_sent: u32,
    /// Busy replies.
    pub busy_retries: u32,
    /// Fatal transport statuses.
    pub fatal_errors: u32,
    /// Resumed positions dropped because the ring was reset.
    pub abandoned: u32,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    frame: Cursor,
    segment: usize,
    busy_retries: u32,
}

/// Cooperative consumer of a [`FrameRing`].
pub struct DrainLoop {
    layout: FrameLayout,
    policy: RetryPolicy,
    job: Option<InFlight>,
    stats: DrainStats,
}

impl DrainLoop {
    /// Create a drain loop for frames shaped like `layout`.
    pub const fn new(layout: FrameLayout, policy: RetryPolicy) -> Self {
        Self {
            layout,
            policy,
            job: None,
            stats: DrainStats {
                frames_sent: 0,
                segments_sent: 0,
                busy_retries: 0,
                fatal_errors: 0,
                abandoned: 0,
            },
        }
    }

    /// Counters since boot.
    pub fn stats(&self) -> DrainStats {
        self.stats
    }

    /// Active retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// `(slot, segment)` a previous poll stopped at.
    pub fn pending(&self) -> Option<(usize, usize)> {
        self.job.map(|job| (job.frame.index(), job.segment))
    }

    /// Forget a partially sent frame. Used when the session resets.
    pub fn abandon(&mut self) {
        if self.job.take().is_some() {
            self.stats.abandoned = self.stats.abandoned.saturating_add(1);
        }
    }

    /// Forward at most one frame from `ring` to `transport`.
    ///
    /// On `Err` the partial frame is dropped and the tail stays put; the
    /// session reset that follows clears the ring.
    pub fn poll<T, const SLOTS: usize, const FRAME_BYTES: usize>(
        &mut self,
        ring: &FrameRing<SLOTS, FRAME_BYTES>,
        transport: &mut T,
    ) -> Result<DrainProgress, DrainError>
    where
        T: SegmentTransport + ?Sized,
    {
        if !self.layout.fits(FRAME_BYTES) {
            return Err(DrainError::LayoutMismatch {
                frame_bytes: FRAME_BYTES,
            });
        }

        let mut job = match self.job.take() {
            Some(job) if ring.tail_cursor() == job.frame => job,
            stale => {
                if stale.is_some() {
                    self.stats.abandoned = self.stats.abandoned.saturating_add(1);
                }
                let Some(frame) = ring.peek() else {
                    return Ok(DrainProgress::Idle);
                };
                InFlight {
                    frame,
                    segment: 0,
                    busy_retries: 0,
                }
            }
        };

        let bytes = ring.frame(job.frame);
        let mut spins = 0u32;
        while let Some(segment) = self.layout.segment(bytes, job.segment) {
            match transport.send(segment) {
                SendStatus::Sent => {
                    job.segment = job.segment.saturating_add(1);
                    spins = 0;
                    self.stats.segments_sent = self.stats.segments_sent.saturating_add(1);
                }
                SendStatus::Busy => {
                    job.busy_retries = job.busy_retries.saturating_add(1);
                    self.stats.busy_retries = self.stats.busy_retries.saturating_add(1);
                    spins = spins.saturating_add(1);
                    if let RetryPolicy::YieldAfter(limit) = self.policy {
                        if spins >= limit {
                            self.job = Some(job);
                            return Ok(DrainProgress::Backpressured {
                                slot: job.frame.index(),
                                segment: job.segment,
                            });
                        }
                    }
                }
                SendStatus::Fatal(code) => {
                    self.stats.fatal_errors = self.stats.fatal_errors.saturating_add(1);
                    #[cfg(feature = "defmt")]
                    defmt::error!(
                        "transport status {=u32:#x} on segment {=usize}, aborting drain",
                        code,
                        job.segment
                    );
                    #[cfg(feature = "tracing")]
                    tracing::error!(code, segment = job.segment, "transport failed, aborting drain");
                    return Err(DrainError::TransportFatal {
                        code,
                        segment: job.segment,
                    });
                }
            }
        }

        let slot = job.frame.index();
        if ring.commit_tail(job.frame) {
            self.stats.frames_sent = self.stats.frames_sent.saturating_add(1);
            Ok(DrainProgress::FrameSent {
                slot,
                busy_retries: job.busy_retries,
            })
        } else {
            Ok(DrainProgress::Discarded { slot })
        }
    }
}
