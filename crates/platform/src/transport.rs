//! Wireless segment transport
//!
//! One call moves one segment into the link's outgoing queue. The call never
//! blocks; congestion is reported as [`SendStatus::Busy`] and the caller
//! decides when to try again.

/// Outcome of one [`SegmentTransport::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendStatus {
    /// Segment queued for transmission.
    Sent,
    /// No free TX buffers right now. Retry with the same bytes.
    Busy,
    /// Any other status from the stack, carrying its raw code.
    Fatal(u32),
}

impl SendStatus {
    /// `true` for [`SendStatus::Busy`].
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Busy)
    }
}

/// Non-blocking wireless send primitive.
pub trait SegmentTransport {
    /// Queue `segment` as one notification.
    fn send(&mut self, segment: &[u8]) -> SendStatus;
}

impl<T: SegmentTransport + ?Sized> SegmentTransport for &mut T {
    fn send(&mut self, segment: &[u8]) -> SendStatus {
        (**self).send(segment)
    }
}
