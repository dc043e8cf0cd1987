//! Frame layout and wire segmentation.
//!
//! A frame slot holds K back-to-back SPI transfers of `L` bytes. Byte 0 of
//! the slot is the bus turnaround byte clocked in while the companion
//! decodes the command and is never transmitted. The companion puts the
//! start-of-frame marker at byte 1.
//!
//! On the wire:
//!
//! ```text
//! segment 0      slot[1 .. L+2]        L+1 bytes, marker first
//! segment i≥1    slot[i·L .. (i+1)·L]  L bytes
//! ```
//!
//! Segment 0 and segment 1 share `slot[L .. L+2]`; the host decoder expects
//! exactly these offsets.

use core::ops::Range;

use platform::config::{CaptureConfig, ConfigError, FRAME_MARKER, SEGMENT_LEN, TRANSFERS_PER_FRAME};

/// Geometry of one frame: K transfers of `segment_len` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameLayout {
    transfers: usize,
    segment_len: usize,
}

impl FrameLayout {
    /// Reference probe layout: 4 × 201 bytes.
    pub const REFERENCE: Self = Self {
        transfers: TRANSFERS_PER_FRAME,
        segment_len: SEGMENT_LEN,
    };

    /// Layout for a validated capture configuration.
    pub fn from_config(config: &CaptureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transfers: config.transfers_per_frame,
            segment_len: config.segment_len,
        })
    }

    /// Segments per frame (K).
    pub const fn segment_count(&self) -> usize {
        self.transfers
    }

    /// Nominal segment length (L). Segment 0 is one byte longer.
    pub const fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Slot size: `K · L`.
    pub const fn frame_bytes(&self) -> usize {
        self.transfers.saturating_mul(self.segment_len)
    }

    /// Bytes one frame puts on the wire: `K · L + 1`.
    pub const fn wire_bytes(&self) -> usize {
        self.frame_bytes().saturating_add(1)
    }

    /// Byte range of segment `index` inside a slot.
    pub fn segment_range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.transfers {
            return None;
        }
        if index == 0 {
            return Some(1..self.segment_len.checked_add(2)?);
        }
        let start = index.checked_mul(self.segment_len)?;
        Some(start..start.checked_add(self.segment_len)?)
    }

    /// Bytes of segment `index`, borrowed from `frame`.
    ///
    /// `None` if the index is past K or `frame` is shorter than the layout.
    pub fn segment<'f>(&self, frame: &'f [u8], index: usize) -> Option<&'f [u8]> {
        frame.get(self.segment_range(index)?)
    }

    /// All segments of `frame` in wire order.
    pub fn segments<'f>(&self, frame: &'f [u8]) -> impl Iterator<Item = &'f [u8]> + 'f {
        let layout = *self;
        (0..self.transfers).filter_map(move |i| layout.segment(frame, i))
    }

    /// `true` if a slot of `frame_bytes` holds every segment.
    pub const fn fits(&self, frame_bytes: usize) -> bool {
        self.transfers >= 2 && self.segment_len >= 2 && self.frame_bytes() <= frame_bytes
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Host-side reassembly of frames from received segments.
///
/// A frame starts with a segment that is `L + 1` bytes long and begins with
/// the marker. The marker is stripped; the next K−1 segments are appended.
/// Anything else is counted and dropped until the next marker.
pub struct FrameAssembler<const N: usize> {
    layout: FrameLayout,
    payload: heapless::Vec<u8, N>,
    received: usize,
    frames: u32,
    dropped: u32,
}

impl<const N: usize> FrameAssembler<N> {
    /// Create an assembler expecting `layout`.
    pub const fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            payload: heapless::Vec::new(),
            received: 0,
            frames: 0,
            dropped: 0,
        }
    }

    /// Feed one received segment. Returns the payload when a frame completes.
    pub fn push(&mut self, segment: &[u8]) -> Option<&[u8]> {
        let first_len = self.layout.segment_len().saturating_add(1);
        if segment.len() == first_len && segment.first() == Some(&FRAME_MARKER) {
            self.payload.clear();
            if self.payload.extend_from_slice(segment.get(1..)?).is_err() {
                self.received = 0;
                self.dropped = self.dropped.saturating_add(1);
                return None;
            }
            self.received = 1;
        } else if self.received > 0 && self.received < self.layout.segment_count() {
            if self.payload.extend_from_slice(segment).is_err() {
                self.received = 0;
                self.dropped = self.dropped.saturating_add(1);
                return None;
            }
            self.received = self.received.saturating_add(1);
        } else {
            self.dropped = self.dropped.saturating_add(1);
            return None;
        }

        if self.received == self.layout.segment_count() {
            self.received = 0;
            self.frames = self.frames.saturating_add(1);
            return Some(&self.payload);
        }
        None
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Segments discarded for arriving outside a frame.
    pub fn dropped_segments(&self) -> u32 {
        self.dropped
    }
}
