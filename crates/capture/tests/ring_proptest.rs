//! Property-based tests for the frame ring and trigger.
//! Arbitrary interleavings of captures, aborts, drains and resets must keep
//! the index invariants, whatever the order.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::unwrap_used)]

use capture::{CaptureTrigger, CompletionOutcome, DrainLoop, FrameLayout, FrameRing, RetryPolicy};
use platform::mocks::{MockSequencer, MockTransport};
use platform::CaptureConfig;
use proptest::prelude::*;

const SLOTS: usize = 5;
const FRAME: usize = 12;

#[derive(Debug, Clone, Copy)]
enum Op {
    Edge,
    Complete,
    Abort,
    Drain,
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Edge),
        3 => Just(Op::Complete),
        1 => Just(Op::Abort),
        3 => Just(Op::Drain),
        1 => Just(Op::Reset),
    ]
}

fn layout() -> FrameLayout {
    FrameLayout::from_config(&CaptureConfig {
        transfers_per_frame: 3,
        segment_len: 4,
        ring_capacity: SLOTS,
        transfer_interval_us: 300,
    })
    .unwrap()
}

proptest! {
    /// Indices stay in range, move only by +1 mod C outside resets, and are
    /// both zero right after a reset.
    #[test]
    fn index_invariants_hold(ops in proptest::collection::vec(op(), 0..200)) {
        let ring: FrameRing<SLOTS, FRAME> = FrameRing::new();
        let trigger = CaptureTrigger::new();
        let mut seq = MockSequencer::new();
        let mut drain = DrainLoop::new(layout(), RetryPolicy::UntilSent);
        let mut transport = MockTransport::new();

        for op in ops {
            let (head, tail) = (ring.head(), ring.tail());
            match op {
                Op::Edge => {
                    trigger.on_data_ready(&ring, &mut seq);
                    prop_assert_eq!((ring.head(), ring.tail()), (head, tail));
                }
                Op::Complete => {
                    let _ = seq.complete_transfer(&[0xFF; FRAME]);
                    match trigger.on_sequence_complete(&ring) {
                        CompletionOutcome::Enqueued { .. } => {
                            prop_assert_eq!(ring.head(), (head + 1) % SLOTS);
                        }
                        CompletionOutcome::Aborted => prop_assert_eq!(ring.head(), head),
                    }
                    prop_assert_eq!(ring.tail(), tail);
                }
                Op::Abort => {
                    trigger.abort(&mut seq);
                    prop_assert!(!trigger.is_capturing());
                    prop_assert_eq!((ring.head(), ring.tail()), (head, tail));
                }
                Op::Drain => {
                    let was_empty = ring.is_empty();
                    drain.poll(&ring, &mut transport).unwrap();
                    prop_assert_eq!(ring.head(), head);
                    if was_empty {
                        prop_assert_eq!(ring.tail(), tail);
                    } else {
                        prop_assert_eq!(ring.tail(), (tail + 1) % SLOTS);
                    }
                }
                Op::Reset => {
                    trigger.abort(&mut seq);
                    ring.reset();
                    prop_assert_eq!((ring.head(), ring.tail()), (0, 0));
                    prop_assert!(ring.is_empty());
                }
            }
            prop_assert!(ring.head() < SLOTS);
            prop_assert!(ring.tail() < SLOTS);
            prop_assert!(ring.occupancy() < SLOTS);
        }
    }

    /// With no draining, overflow warnings equal the number of times the
    /// head wrapped onto the tail.
    #[test]
    fn overflow_count_matches_wraps(captures in 0usize..40) {
        let ring: FrameRing<SLOTS, FRAME> = FrameRing::new();
        let trigger = CaptureTrigger::new();
        let mut seq = MockSequencer::new();
        for _ in 0..captures {
            trigger.on_data_ready(&ring, &mut seq);
            let _ = seq.complete_transfer(&[0u8; FRAME]);
            trigger.on_sequence_complete(&ring);
        }
        prop_assert_eq!(ring.overflow_count() as usize, captures / SLOTS);
        prop_assert_eq!(ring.head(), captures % SLOTS);
        prop_assert_eq!(ring.occupancy(), captures % SLOTS);
    }
}
