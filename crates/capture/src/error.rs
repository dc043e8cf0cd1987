//! Pipeline error types.
//!
//! Failure conditions and where each one surfaces:
//!
//! | Condition | Where it shows up | Handling |
//! |-----------|-------------------|----------|
//! | Transport busy | [`DrainProgress::Backpressured`](crate::DrainProgress) | retried with the same bytes |
//! | Transport fatal | [`DrainError::TransportFatal`] | session reset |
//! | Ring overflow | `overwrote` flag, [`FrameRing::overflow_count`](crate::FrameRing::overflow_count) | logged, data lost |
//! | Sequence abort | [`CompletionOutcome::Aborted`](crate::CompletionOutcome) | expected, nothing enqueued |
//! | Companion rejects packet | [`SessionError::Companion`] | logged, reset already applied |

use platform::CompanionError;

use crate::session::ResetCause;

/// Drain loop errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrainError {
    /// The transport returned a status other than sent or busy.
    TransportFatal {
        /// Raw status code from the stack.
        code: u32,
        /// Segment that was being sent.
        segment: usize,
    },
    /// The frame layout does not fit the ring's slot size.
    LayoutMismatch {
        /// Slot size of the ring.
        frame_bytes: usize,
    },
}

#[cfg(feature = "std")]
impl std::error::Error for DrainError {}

impl core::fmt::Display for DrainError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TransportFatal { code, segment } => write!(
                f,
                "Transport failed with status {code:#x} on segment {segment}"
            ),
            Self::LayoutMismatch { frame_bytes } => {
                write!(f, "Frame layout does not fit {frame_bytes}-byte slots")
            }
        }
    }
}

/// Session controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// The reset was applied but the companion packet was not delivered.
    Companion {
        /// Reset that produced the packet.
        cause: ResetCause,
        /// Companion link error.
        error: CompanionError,
    },
}

#[cfg(feature = "std")]
impl std::error::Error for SessionError {}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Companion { cause, error } => {
                write!(f, "Session reset ({cause}) applied, companion packet failed: {error}")
            }
        }
    }
}
