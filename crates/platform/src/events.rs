//! Event handler traits and bounded registries
//!
//! Each event source (data-ready edge, sequence completion, link events) owns
//! a [`HandlerRegistry`] filled once at boot. Dispatch walks the handlers in
//! registration order. Handlers take `&self` because they run from interrupt
//! context; anything they mutate must be atomic or behind a critical section.

use heapless::Vec;

/// Companion raised data-ready.
pub trait DataReadyHandler {
    /// Called once per rising edge.
    fn on_data_ready(&self);
}

/// The sequencer finished all K transfers.
pub trait SequenceCompleteHandler {
    /// Called once per completed frame.
    fn on_sequence_complete(&self);
}

/// Link state and inbound data from the host.
pub trait LinkEventHandler {
    /// Host connected (`true`) or disconnected (`false`).
    fn on_link_state_changed(&self, connected: bool);

    /// Host wrote `data` to the RX characteristic.
    fn on_data_received(&self, data: &[u8]) {
        let _ = data;
    }
}

/// `register` was called on a full registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull {
    /// Registry capacity.
    pub capacity: usize,
}

#[cfg(feature = "std")]
impl std::error::Error for RegistryFull {}

impl core::fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Handler registry full ({} handlers)", self.capacity)
    }
}

/// Fixed-capacity list of handlers, filled at init.
///
/// ```
/// use platform::events::{DataReadyHandler, HandlerRegistry};
///
/// struct Noop;
/// impl DataReadyHandler for Noop {
///     fn on_data_ready(&self) {}
/// }
///
/// let noop = Noop;
/// let mut registry: HandlerRegistry<'_, dyn DataReadyHandler, 2> = HandlerRegistry::new();
/// registry.register(&noop).unwrap();
/// registry.for_each(|h| h.on_data_ready());
/// ```
pub struct HandlerRegistry<'a, H: ?Sized, const N: usize> {
    handlers: Vec<&'a H, N>,
}

impl<'a, H: ?Sized, const N: usize> HandlerRegistry<'a, H, N> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append `handler`.
    pub fn register(&mut self, handler: &'a H) -> Result<(), RegistryFull> {
        self.handlers
            .push(handler)
            .map_err(|_| RegistryFull { capacity: N })
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Call `f` for every handler in registration order.
    pub fn for_each(&self, mut f: impl FnMut(&'a H)) {
        for handler in &self.handlers {
            f(handler);
        }
    }
}

impl<'a, H: ?Sized, const N: usize> Default for HandlerRegistry<'a, H, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, H: DataReadyHandler + ?Sized, const N: usize> HandlerRegistry<'a, H, N> {
    /// Fan a data-ready edge out to every handler.
    pub fn dispatch_data_ready(&self) {
        self.for_each(|h| h.on_data_ready());
    }
}

impl<'a, H: SequenceCompleteHandler + ?Sized, const N: usize> HandlerRegistry<'a, H, N> {
    /// Fan a completion out to every handler.
    pub fn dispatch_sequence_complete(&self) {
        self.for_each(|h| h.on_sequence_complete());
    }
}

impl<'a, H: LinkEventHandler + ?Sized, const N: usize> HandlerRegistry<'a, H, N> {
    /// Fan a link state change out to every handler.
    pub fn dispatch_link_state(&self, connected: bool) {
        self.for_each(|h| h.on_link_state_changed(connected));
    }

    /// Fan received bytes out to every handler.
    pub fn dispatch_data(&self, data: &[u8]) {
        self.for_each(|h| h.on_data_received(data));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Counter(Cell<u32>);

    impl SequenceCompleteHandler for Counter {
        fn on_sequence_complete(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn dispatch_reaches_every_handler() {
        let a = Counter(Cell::new(0));
        let b = Counter(Cell::new(0));
        let mut registry: HandlerRegistry<'_, dyn SequenceCompleteHandler, 2> =
            HandlerRegistry::new();
        registry.register(&a).unwrap();
        registry.register(&b).unwrap();
        registry.dispatch_sequence_complete();
        registry.dispatch_sequence_complete();
        assert_eq!(a.0.get(), 2);
        assert_eq!(b.0.get(), 2);
    }

    #[test]
    fn register_past_capacity_fails() {
        let a = Counter(Cell::new(0));
        let mut registry: HandlerRegistry<'_, dyn SequenceCompleteHandler, 1> =
            HandlerRegistry::new();
        assert!(registry.register(&a).is_ok());
        assert_eq!(registry.register(&a), Err(RegistryFull { capacity: 1 }));
        assert_eq!(registry.len(), 1);
    }
}
