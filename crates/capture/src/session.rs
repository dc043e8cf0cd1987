//! Session controller: the only path that moves `head` and `tail` together.
//!
//! A reset stops the sequencer, forgets the in-flight capture, zeroes the
//! ring under a new generation and then primes the companion:
//!
//! | Cause | Companion packet |
//! |-------|------------------|
//! | Host reconfiguration command | the command bytes |
//! | Link disconnect | [`RESTART_PACKET`] |
//! | Fatal transport status | [`RESTART_PACKET`] |
//!
//! None of this waits for in-flight work; DMA and notification queues are
//! simply abandoned.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use platform::config::RESTART_PACKET;
use platform::{CompanionLink, TransferSequencer};

use crate::error::{DrainError, SessionError};
use crate::ring::FrameRing;
use crate::trigger::CaptureTrigger;

/// Why the session was reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResetCause {
    /// The host sent a new acquisition configuration.
    Reconfigure = 0,
    /// The host disconnected.
    Disconnect = 1,
    /// The transport failed while draining.
    TransportFatal = 2,
}

impl ResetCause {
    const NONE: u8 = u8::MAX;

    const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Reconfigure),
            1 => Some(Self::Disconnect),
            2 => Some(Self::TransportFatal),
            _ => None,
        }
    }
}

impl core::fmt::Display for ResetCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Reconfigure => write!(f, "reconfigure"),
            Self::Disconnect => write!(f, "disconnect"),
            Self::TransportFatal => write!(f, "transport fatal"),
        }
    }
}

/// Pipeline state derived from the trigger and the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Nothing armed, ring empty.
    Idle,
    /// Sequencer armed, ring empty.
    Capturing,
    /// Ring holds unread frames, nothing armed.
    Draining,
    /// Next capture armed while earlier frames drain.
    CapturingAndDraining,
}

impl SessionState {
    /// A capture is armed.
    pub const fn is_capturing(self) -> bool {
        matches!(self, Self::Capturing | Self::CapturingAndDraining)
    }

    /// Unread frames are queued.
    pub const fn is_draining(self) -> bool {
        matches!(self, Self::Draining | Self::CapturingAndDraining)
    }
}

/// What a reset did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetReport {
    /// Why.
    pub cause: ResetCause,
    /// A capture was in flight and was abandoned.
    pub aborted_capture: bool,
    /// Unread frames dropped by the reset (diagnostic occupancy).
    pub discarded_frames: usize,
    /// Ring generation after the reset.
    pub generation: u16,
}

/// Resets per cause since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetCounts {
    /// Host reconfigurations.
    pub reconfigure: u32,
    /// Disconnects.
    pub disconnect: u32,
    /// Fatal transport statuses.
    pub transport_fatal: u32,
}

/// Owner of the reset transitions.
pub struct SessionController<'a, const SLOTS: usize, const FRAME_BYTES: usize> {
    ring: &'a FrameRing<SLOTS, FRAME_BYTES>,
    trigger: &'a CaptureTrigger,
    resets: [AtomicU32; 3],
    last_cause: AtomicU8,
}

impl<'a, const SLOTS: usize, const FRAME_BYTES: usize> SessionController<'a, SLOTS, FRAME_BYTES> {
    /// Create a controller over `ring` and `trigger`.
    pub const fn new(ring: &'a FrameRing<SLOTS, FRAME_BYTES>, trigger: &'a CaptureTrigger) -> Self {
        Self {
            ring,
            trigger,
            resets: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
            last_cause: AtomicU8::new(ResetCause::NONE),
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> SessionState {
        match (self.trigger.is_capturing(), !self.ring.is_empty()) {
            (false, false) => SessionState::Idle,
            (true, false) => SessionState::Capturing,
            (false, true) => SessionState::Draining,
            (true, true) => SessionState::CapturingAndDraining,
        }
    }

    /// Host sent `command`: drop everything and hand it to the companion.
    pub fn reconfigure<S, L>(
        &self,
        command: &[u8],
        sequencer: &mut S,
        companion: &mut L,
    ) -> Result<ResetReport, SessionError>
    where
        S: TransferSequencer + ?Sized,
        L: CompanionLink + ?Sized,
    {
        self.reset(ResetCause::Reconfigure, command, sequencer, companion)
    }

    /// Link state changed. Only a disconnect resets; returns `None` on connect.
    pub fn on_link_state<S, L>(
        &self,
        connected: bool,
        sequencer: &mut S,
        companion: &mut L,
    ) -> Option<Result<ResetReport, SessionError>>
    where
        S: TransferSequencer + ?Sized,
        L: CompanionLink + ?Sized,
    {
        if connected {
            #[cfg(feature = "defmt")]
            defmt::info!("host connected");
            #[cfg(feature = "tracing")]
            tracing::info!("host connected");
            return None;
        }
        Some(self.reset(ResetCause::Disconnect, &RESTART_PACKET, sequencer, companion))
    }

    /// The drain loop hit a fatal transport status.
    pub fn on_transport_fatal<S, L>(
        &self,
        error: DrainError,
        sequencer: &mut S,
        companion: &mut L,
    ) -> Result<ResetReport, SessionError>
    where
        S: TransferSequencer + ?Sized,
        L: CompanionLink + ?Sized,
    {
        #[cfg(feature = "defmt")]
        defmt::error!("drain failed: {}", error);
        #[cfg(feature = "tracing")]
        tracing::error!(%error, "drain failed");
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        let _ = error;
        self.reset(ResetCause::TransportFatal, &RESTART_PACKET, sequencer, companion)
    }

    /// Resets of `cause` since boot.
    pub fn reset_count(&self, cause: ResetCause) -> u32 {
        self.counter(cause).load(Ordering::Relaxed)
    }

    /// Resets per cause since boot.
    pub fn reset_counts(&self) -> ResetCounts {
        ResetCounts {
            reconfigure: self.reset_count(ResetCause::Reconfigure),
            disconnect: self.reset_count(ResetCause::Disconnect),
            transport_fatal: self.reset_count(ResetCause::TransportFatal),
        }
    }

    /// Cause of the most recent reset.
    pub fn last_cause(&self) -> Option<ResetCause> {
        ResetCause::from_u8(self.last_cause.load(Ordering::Relaxed))
    }

    fn counter(&self, cause: ResetCause) -> &AtomicU32 {
        match cause {
            ResetCause::Reconfigure => &self.resets[0],
            ResetCause::Disconnect => &self.resets[1],
            ResetCause::TransportFatal => &self.resets[2],
        }
    }

    fn reset<S, L>(
        &self,
        cause: ResetCause,
        packet: &[u8],
        sequencer: &mut S,
        companion: &mut L,
    ) -> Result<ResetReport, SessionError>
    where
        S: TransferSequencer + ?Sized,
        L: CompanionLink + ?Sized,
    {
        let aborted_capture = self.trigger.abort(sequencer);
        let discarded_frames = self.ring.occupancy();
        let generation = self.ring.reset();
        self.counter(cause).fetch_add(1, Ordering::Relaxed);
        self.last_cause.store(cause as u8, Ordering::Relaxed);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "session reset ({}): aborted={}, discarded={=usize}, generation={=u16}",
            cause,
            aborted_capture,
            discarded_frames,
            generation
        );
        #[cfg(feature = "tracing")]
        tracing::info!(
            %cause,
            aborted_capture,
            discarded_frames,
            generation,
            "session reset"
        );

        companion
            .send_config(packet)
            .map_err(|error| SessionError::Companion { cause, error })?;

        Ok(ResetReport {
            cause,
            aborted_capture,
            discarded_frames,
            generation,
        })
    }
}
