//! Single-producer / single-consumer ring of frame slots.
//!
//! The producer is the sequence-complete interrupt, the consumer is the drain
//! loop. Each side owns one index word and only reads the other's, so no lock
//! is taken on either path.
//!
//! Every index word also carries a 16-bit reset generation in its upper half.
//! A session reset bumps the generation and zeroes both indices; a commit
//! started under an older generation fails its compare-exchange and is
//! discarded instead of resurrecting the old position.
//!
//! Emptiness is `head == tail`. There is no separate full flag: when the
//! producer advances onto `tail` the ring reads as empty again and the frames
//! it held are lost. [`FrameRing::overflow_count`] records each occurrence.
//!
//! # Constraints
//!
//! - `SLOTS` in `2..=65535`, enforced at compile time.
//! - The ring must live in a `static` in data RAM; the sequencer writes the
//!   slots through EasyDMA.

use core::cell::UnsafeCell;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU32, Ordering};

use platform::FrameSlot;

const INDEX_MASK: u32 = 0xFFFF;

/// Position in the ring tagged with the reset generation it was read under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cursor {
    generation: u16,
    index: u16,
}

impl Cursor {
    #[allow(clippy::cast_possible_truncation)] // Safety: both halves masked to 16 bits
    pub(crate) const fn from_word(word: u32) -> Self {
        Self {
            generation: (word >> 16) as u16,
            index: (word & INDEX_MASK) as u16,
        }
    }

    pub(crate) const fn to_word(self) -> u32 {
        ((self.generation as u32) << 16) | self.index as u32
    }

    /// Slot index in `0..SLOTS`.
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Reset generation the cursor belongs to.
    pub const fn generation(self) -> u16 {
        self.generation
    }
}

/// Result of [`FrameRing::commit_head`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeadCommit {
    /// `head` advanced.
    Enqueued {
        /// New head index.
        head: usize,
        /// The new head landed on `tail`: unread frames were overwritten.
        overwrote: bool,
    },
    /// A reset happened after the cursor was taken; nothing changed.
    Stale,
}

/// Fixed ring of `SLOTS` frame slots of `FRAME_BYTES` each.
pub struct FrameRing<const SLOTS: usize, const FRAME_BYTES: usize> {
    slots: UnsafeCell<[[u8; FRAME_BYTES]; SLOTS]>,
    head: AtomicU32,
    tail: AtomicU32,
    overflows: AtomicU32,
}

// SAFETY: index words are atomics. Slot bytes are written only by the
// sequencer through a FrameSlot for the armed head slot and read only by the
// consumer for the tail slot; the two coincide only after an overflow, which
// is the documented lossy case and involves plain bytes with no invalid
// representations.
unsafe impl<const SLOTS: usize, const FRAME_BYTES: usize> Sync for FrameRing<SLOTS, FRAME_BYTES> {}

impl<const SLOTS: usize, const FRAME_BYTES: usize> FrameRing<SLOTS, FRAME_BYTES> {
    const CAPACITY_OK: () = assert!(SLOTS >= 2 && SLOTS <= INDEX_MASK as usize);

    /// Create an empty ring.
    ///
    /// `const` so the ring can be a `static` without a runtime initialiser.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            slots: UnsafeCell::new([[0u8; FRAME_BYTES]; SLOTS]),
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            overflows: AtomicU32::new(0),
        }
    }

    /// Number of slots (C).
    pub const fn capacity(&self) -> usize {
        SLOTS
    }

    /// Bytes per slot.
    pub const fn frame_bytes(&self) -> usize {
        FRAME_BYTES
    }

    /// Current head, for the producer.
    pub fn head_cursor(&self) -> Cursor {
        Cursor::from_word(self.head.load(Ordering::Acquire))
    }

    /// Current tail, for the consumer.
    pub fn tail_cursor(&self) -> Cursor {
        Cursor::from_word(self.tail.load(Ordering::Acquire))
    }

    /// Head index.
    pub fn head(&self) -> usize {
        self.head_cursor().index()
    }

    /// Tail index.
    pub fn tail(&self) -> usize {
        self.tail_cursor().index()
    }

    /// Current reset generation.
    pub fn generation(&self) -> u16 {
        self.head_cursor().generation()
    }

    /// `head == tail`. Reads as empty while a reset is half applied.
    pub fn is_empty(&self) -> bool {
        let tail = self.tail_cursor();
        let head = self.head_cursor();
        head.generation != tail.generation || head.index == tail.index
    }

    /// `(head − tail) mod C`. Diagnostic only: zero both when empty and
    /// right after an overflow.
    #[allow(clippy::arithmetic_side_effects)] // Safety: both indices < SLOTS, sum < 2·SLOTS
    pub fn occupancy(&self) -> usize {
        let tail = self.tail_cursor();
        let head = self.head_cursor();
        if head.generation != tail.generation {
            return 0;
        }
        (head.index() + SLOTS - tail.index()) % SLOTS
    }

    /// Completions that advanced `head` onto `tail`.
    pub fn overflow_count(&self) -> u32 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Destination handle for the slot at `cursor`.
    pub fn slot(&self, cursor: Cursor) -> FrameSlot {
        // SAFETY: `slot_ptr` derives from the UnsafeCell pointer, which is
        // never null, and cursors only carry indices below SLOTS.
        unsafe {
            FrameSlot::from_raw_parts(
                NonNull::new_unchecked(self.slot_ptr(cursor.index())),
                FRAME_BYTES,
                cursor.index(),
            )
        }
    }

    /// Oldest unread frame, or `None` when empty.
    pub fn peek(&self) -> Option<Cursor> {
        if self.is_empty() {
            None
        } else {
            Some(self.tail_cursor())
        }
    }

    /// Bytes of the slot at `cursor`, without copying.
    pub fn frame(&self, cursor: Cursor) -> &[u8; FRAME_BYTES] {
        // SAFETY: index < SLOTS, so the pointer is in bounds and aligned for
        // a u8 array. The consumer reads the tail slot, which the producer
        // does not arm unless the ring has overflowed onto it.
        unsafe { &*self.slot_ptr(cursor.index()).cast::<[u8; FRAME_BYTES]>() }
    }

    /// Producer: advance `head` past the slot at `cursor`.
    ///
    /// The advance is unconditional. Landing on `tail` logs a warning and
    /// counts an overflow.
    #[allow(clippy::arithmetic_side_effects)] // Safety: index < SLOTS ≤ u16::MAX, +1 wraps via % SLOTS
    pub fn commit_head(&self, cursor: Cursor) -> HeadCommit {
        let next = Cursor {
            generation: cursor.generation,
            index: ((cursor.index() + 1) % SLOTS) as u16,
        };
        if self
            .head
            .compare_exchange(
                cursor.to_word(),
                next.to_word(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return HeadCommit::Stale;
        }

        let overwrote = self.tail_cursor() == next;
        if overwrote {
            let total = self.overflows.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("frame ring overflow at slot {=u16} ({=u32} total)", next.index, total);
            #[cfg(feature = "tracing")]
            tracing::warn!(slot = next.index, total, "frame ring overflow");
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = total;
        }
        HeadCommit::Enqueued {
            head: next.index(),
            overwrote,
        }
    }

    /// Consumer: release the slot at `cursor` after all its segments went out.
    ///
    /// Returns `false` if a reset intervened; the tail is left alone.
    #[allow(clippy::arithmetic_side_effects)] // Safety: index < SLOTS ≤ u16::MAX, +1 wraps via % SLOTS
    pub fn commit_tail(&self, cursor: Cursor) -> bool {
        let next = Cursor {
            generation: cursor.generation,
            index: ((cursor.index() + 1) % SLOTS) as u16,
        };
        self.tail
            .compare_exchange(
                cursor.to_word(),
                next.to_word(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Drop every unread frame: `head = tail = 0` under a new generation.
    ///
    /// Returns the new generation. The caller stops the sequencer first.
    pub fn reset(&self) -> u16 {
        let generation = self.generation().wrapping_add(1);
        let zero = Cursor {
            generation,
            index: 0,
        }
        .to_word();
        // Tail first: between the two stores the generations differ and the
        // ring reads as empty.
        self.tail.store(zero, Ordering::Release);
        self.head.store(zero, Ordering::Release);
        generation
    }

    fn slot_ptr(&self, index: usize) -> *mut u8 {
        self.slots
            .get()
            .cast::<u8>()
            .wrapping_add(index.wrapping_mul(FRAME_BYTES))
    }
}

impl<const SLOTS: usize, const FRAME_BYTES: usize> Default for FrameRing<SLOTS, FRAME_BYTES> {
    fn default() -> Self {
        Self::new()
    }
}
