//! Transfer sequencer abstraction
//!
//! On the probe the sequencer is pure hardware: TIMER3 fires every transfer
//! interval and starts SPIM0 through a PPI channel, SPIM0's END event counts
//! TIMER4 through a second channel, and TIMER4's compare at K stops the chain
//! and raises the single completion interrupt. Firmware only points it at a
//! destination, starts it and, when a session resets, stops it.

use core::ptr::NonNull;

/// Destination of one capture pass: a frame slot in the ring.
///
/// Carries a raw pointer because the bytes are written by EasyDMA, outside
/// the borrow checker's view. Only the ring hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    ptr: NonNull<u8>,
    len: usize,
    index: usize,
}

impl FrameSlot {
    /// Wrap a slot's storage.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `len` bytes for as long as the slot
    /// is armed, and must not be aliased by a live `&` or `&mut` while the
    /// sequencer writes it.
    pub const unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize, index: usize) -> Self {
        Self { ptr, len, index }
    }

    /// Start of the slot.
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Slot size in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false` for slots handed out by the ring.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Ring position of the slot.
    pub const fn index(&self) -> usize {
        self.index
    }
}

// SAFETY: a FrameSlot is only an address. Moving it between the GPIOTE
// handler and the thread-mode task does not create a reference to the bytes.
unsafe impl Send for FrameSlot {}

/// The sequencer refused a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArmError {
    /// EasyDMA cannot write `len` bytes at `address`.
    NotDmaReachable {
        /// Ring position of the rejected slot.
        slot: usize,
        /// Slot start address.
        address: u32,
    },
}

impl core::fmt::Display for ArmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotDmaReachable { slot, address } => {
                write!(f, "slot {slot} at {address:#x} is not EasyDMA reachable")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArmError {}

/// Hardware-chained capture of K fixed-size transfers.
///
/// `start`, `stop` and a successful `arm` are idempotent. A failed `arm`
/// leaves the previous destination in place and the caller must not
/// `start`. `stop` followed by `start` without a new `arm` restarts into
/// the previous destination.
pub trait TransferSequencer {
    /// Point the chain at `slot`. Called only while stopped.
    fn arm(&mut self, slot: FrameSlot) -> Result<(), ArmError>;

    /// Clear both timers and start the chain. Completion is reported through
    /// the sequence-complete event, never through this call.
    fn start(&mut self);

    /// Stop the chain. Any partial frame is abandoned.
    fn stop(&mut self);
}

impl<T: TransferSequencer + ?Sized> TransferSequencer for &mut T {
    fn arm(&mut self, slot: FrameSlot) -> Result<(), ArmError> {
        (**self).arm(slot)
    }

    fn start(&mut self) {
        (**self).start();
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}
