//! Capture-and-stream pipeline for the SonoProbe.
//!
//! ```text
//!  data-ready edge ──► CaptureTrigger ──arm/start──► TransferSequencer (PPI chain)
//!                                                           │ completion
//!                                                           ▼
//!                        SessionController ──reset──► FrameRing (SPSC, C slots)
//!                                                           │ peek / commit_tail
//!                                                           ▼
//!                                                      DrainLoop ──segments──► SegmentTransport
//! ```
//!
//! The producer side ([`CaptureTrigger`]) runs in interrupt context; the
//! consumer side ([`DrainLoop`]) runs in the cooperative main loop. They share
//! nothing but the ring's two index words.
//!
//! This crate is `no_std` and allocation-free.

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::module_name_repetitions)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod drain;
pub mod error;
pub mod frame;
pub mod ring;
pub mod session;
pub mod trigger;

pub use drain::{DrainLoop, DrainProgress, DrainStats, RetryPolicy};
pub use error::{DrainError, SessionError};
pub use frame::{FrameAssembler, FrameLayout};
pub use ring::{Cursor, FrameRing, HeadCommit};
pub use session::{ResetCause, ResetCounts, ResetReport, SessionController, SessionState};
pub use trigger::{CaptureTrigger, CompletionOutcome, TriggerOutcome};

/// Ring sized for the reference probe: 35 slots of 804 bytes.
pub type ProbeRing =
    FrameRing<{ platform::config::RING_CAPACITY }, { platform::config::FRAME_BYTES }>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    /// Frame layout and reassembly tests
    mod frame_tests {
        use crate::frame::{FrameAssembler, FrameLayout};
        use platform::config::{FRAME_MARKER, SEGMENT_LEN};

        #[test]
        fn reference_segments_are_202_then_201() {
            let layout = FrameLayout::REFERENCE;
            let frame = [0u8; 804];
            let lengths: heapless::Vec<usize, 4> =
                layout.segments(&frame).map(<[u8]>::len).collect();
            assert_eq!(lengths.as_slice(), &[202, 201, 201, 201]);
            assert_eq!(layout.wire_bytes(), 805);
        }

        #[test]
        fn first_segment_starts_after_turnaround_byte() {
            let layout = FrameLayout::REFERENCE;
            let mut frame = [0u8; 804];
            frame[0] = 0x00; // SPI turnaround, never sent
            frame[1] = FRAME_MARKER;
            frame[201] = 0xA5;
            let seg0 = layout.segment(&frame, 0).unwrap();
            assert_eq!(seg0[0], FRAME_MARKER);
            assert_eq!(*seg0.last().unwrap(), frame[202]);
            let seg1 = layout.segment(&frame, 1).unwrap();
            assert_eq!(seg1[0], 0xA5);
        }

        #[test]
        fn segment_past_k_is_none() {
            let layout = FrameLayout::REFERENCE;
            let frame = [0u8; 804];
            assert!(layout.segment(&frame, 4).is_none());
        }

        #[test]
        fn short_frame_yields_no_segment() {
            let layout = FrameLayout::REFERENCE;
            let frame = [0u8; 100];
            assert!(layout.segment(&frame, 0).is_none());
        }

        #[test]
        fn assembler_rebuilds_payload_from_segments() {
            let layout = FrameLayout::REFERENCE;
            let mut frame = [0u8; 804];
            for (i, b) in frame.iter_mut().enumerate() {
                *b = (i % 251) as u8;
            }
            frame[1] = FRAME_MARKER;

            let mut assembler: FrameAssembler<1024> = FrameAssembler::new(layout);
            let mut done = None;
            for segment in layout.segments(&frame) {
                if let Some(payload) = assembler.push(segment) {
                    done = Some(payload.len());
                }
            }
            assert_eq!(done, Some(4 * SEGMENT_LEN));
        }

        #[test]
        fn assembler_ignores_segments_before_marker() {
            let mut assembler: FrameAssembler<1024> = FrameAssembler::new(FrameLayout::REFERENCE);
            assert!(assembler.push(&[0u8; 201]).is_none());
            assert_eq!(assembler.dropped_segments(), 1);
        }
    }

    /// Ring index tests (single context)
    mod ring_tests {
        use crate::ring::{FrameRing, HeadCommit};

        #[test]
        fn new_ring_is_empty() {
            let ring: FrameRing<4, 8> = FrameRing::new();
            assert!(ring.is_empty());
            assert_eq!(ring.head(), 0);
            assert_eq!(ring.tail(), 0);
            assert!(ring.peek().is_none());
        }

        #[test]
        fn commit_head_then_peek() {
            let ring: FrameRing<4, 8> = FrameRing::new();
            let cursor = ring.head_cursor();
            assert_eq!(
                ring.commit_head(cursor),
                HeadCommit::Enqueued {
                    head: 1,
                    overwrote: false
                }
            );
            let peeked = ring.peek().unwrap();
            assert_eq!(peeked.index(), 0);
            assert_eq!(ring.occupancy(), 1);
        }

        #[test]
        fn commit_tail_empties_ring() {
            let ring: FrameRing<4, 8> = FrameRing::new();
            ring.commit_head(ring.head_cursor());
            let tail = ring.peek().unwrap();
            assert!(ring.commit_tail(tail));
            assert!(ring.is_empty());
            assert_eq!(ring.tail(), 1);
        }

        #[test]
        fn reset_zeroes_indices_and_bumps_generation() {
            let ring: FrameRing<4, 8> = FrameRing::new();
            ring.commit_head(ring.head_cursor());
            ring.commit_head(ring.head_cursor());
            let before = ring.generation();
            let after = ring.reset();
            assert_eq!(after, before.wrapping_add(1));
            assert_eq!((ring.head(), ring.tail()), (0, 0));
            assert!(ring.is_empty());
        }

        #[test]
        fn stale_head_commit_is_discarded() {
            let ring: FrameRing<4, 8> = FrameRing::new();
            let cursor = ring.head_cursor();
            ring.reset();
            assert_eq!(ring.commit_head(cursor), HeadCommit::Stale);
            assert_eq!(ring.head(), 0);
        }

        #[test]
        fn stale_tail_commit_is_discarded() {
            let ring: FrameRing<4, 8> = FrameRing::new();
            ring.commit_head(ring.head_cursor());
            let tail = ring.peek().unwrap();
            ring.reset();
            assert!(!ring.commit_tail(tail));
            assert_eq!(ring.tail(), 0);
        }

        #[test]
        fn slots_do_not_overlap() {
            let ring: FrameRing<3, 16> = FrameRing::new();
            let a = ring.slot(ring.head_cursor());
            ring.commit_head(ring.head_cursor());
            let b = ring.slot(ring.head_cursor());
            assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 16);
            assert_eq!(a.len(), 16);
        }
    }
}
