//! Criterion benchmarks for the capture hot path.
//!
//! Run: cargo bench -p capture --bench frame_ring
//!
//! Results show:
//!   commit_head         : producer cost inside the TIMER4 interrupt
//!   capture_cycle       : edge + completion through the trigger
//!   drain_frame_*       : one frame through the drain loop to a null transport

#![allow(
    clippy::unwrap_used,              // benchmark helpers use unwrap for brevity
    clippy::expect_used,
    missing_docs,                     // criterion_group! macro generates undocumented items
)]

use std::hint::black_box;

use capture::{CaptureTrigger, DrainLoop, FrameLayout, ProbeRing, RetryPolicy};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use platform::{ArmError, FrameSlot, SegmentTransport, SendStatus, TransferSequencer};

static RING: ProbeRing = ProbeRing::new();

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sequencer whose hardware does nothing.
struct NullSequencer;

impl TransferSequencer for NullSequencer {
    fn arm(&mut self, slot: FrameSlot) -> Result<(), ArmError> {
        black_box(slot);
        Ok(())
    }
    fn start(&mut self) {}
    fn stop(&mut self) {}
}

/// Transport that reports busy every `busy_every`-th call.
struct NullTransport {
    calls: u32,
    busy_every: u32,
}

impl SegmentTransport for NullTransport {
    fn send(&mut self, segment: &[u8]) -> SendStatus {
        black_box(segment);
        self.calls = self.calls.wrapping_add(1);
        if self.busy_every != 0 && self.calls % self.busy_every == 0 {
            SendStatus::Busy
        } else {
            SendStatus::Sent
        }
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_commit_head(c: &mut Criterion) {
    c.bench_function("commit_head", |b| {
        b.iter(|| black_box(RING.commit_head(RING.head_cursor())));
    });
    RING.reset();
}

fn bench_capture_cycle(c: &mut Criterion) {
    let trigger = CaptureTrigger::new();
    let mut seq = NullSequencer;
    c.bench_function("capture_cycle", |b| {
        b.iter(|| {
            trigger.on_data_ready(&RING, &mut seq);
            black_box(trigger.on_sequence_complete(&RING))
        });
    });
    RING.reset();
}

fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_frame");
    for busy_every in [0u32, 4] {
        group.bench_with_input(
            BenchmarkId::from_parameter(busy_every),
            &busy_every,
            |b, &busy_every| {
                let mut drain = DrainLoop::new(FrameLayout::REFERENCE, RetryPolicy::UntilSent);
                let mut transport = NullTransport {
                    calls: 0,
                    busy_every,
                };
                b.iter(|| {
                    RING.commit_head(RING.head_cursor());
                    black_box(drain.poll(&RING, &mut transport).unwrap())
                });
            },
        );
    }
    group.finish();
    RING.reset();
}

criterion_group!(benches, bench_commit_head, bench_capture_cycle, bench_drain);
criterion_main!(benches);
