//! Event hub: one bounded registry per event source.
//!
//! Filled once during boot, then shared read-only with the interrupt
//! handlers. Handlers are `Sync` because the GPIOTE task, the TIMER4
//! interrupt and the SoftDevice event loop all dispatch through the same hub.

use platform::config::HANDLER_CAPACITY;
use platform::{
    DataReadyHandler, HandlerRegistry, LinkEventHandler, RegistryFull, SequenceCompleteHandler,
};

/// Registries for the three event sources.
pub struct EventHub<'a> {
    data_ready: HandlerRegistry<'a, dyn DataReadyHandler + Sync + 'a, HANDLER_CAPACITY>,
    sequence_complete: HandlerRegistry<'a, dyn SequenceCompleteHandler + Sync + 'a, HANDLER_CAPACITY>,
    link: HandlerRegistry<'a, dyn LinkEventHandler + Sync + 'a, HANDLER_CAPACITY>,
}

impl<'a> EventHub<'a> {
    /// Create a hub with empty registries.
    pub const fn new() -> Self {
        Self {
            data_ready: HandlerRegistry::new(),
            sequence_complete: HandlerRegistry::new(),
            link: HandlerRegistry::new(),
        }
    }

    /// Subscribe to companion data-ready edges.
    pub fn register_data_ready(
        &mut self,
        handler: &'a (dyn DataReadyHandler + Sync),
    ) -> Result<(), RegistryFull> {
        self.data_ready.register(handler)?;
        log_registered("data-ready", self.data_ready.len());
        Ok(())
    }

    /// Subscribe to sequence completions.
    pub fn register_sequence_complete(
        &mut self,
        handler: &'a (dyn SequenceCompleteHandler + Sync),
    ) -> Result<(), RegistryFull> {
        self.sequence_complete.register(handler)?;
        log_registered("sequence-complete", self.sequence_complete.len());
        Ok(())
    }

    /// Subscribe to link state changes and host writes.
    pub fn register_link(
        &mut self,
        handler: &'a (dyn LinkEventHandler + Sync),
    ) -> Result<(), RegistryFull> {
        self.link.register(handler)?;
        log_registered("link", self.link.len());
        Ok(())
    }

    /// Companion raised data-ready.
    pub fn data_ready(&self) {
        self.data_ready.dispatch_data_ready();
    }

    /// Sequencer reached K transfers.
    pub fn sequence_complete(&self) {
        self.sequence_complete.dispatch_sequence_complete();
    }

    /// Host connected or disconnected.
    pub fn link_state_changed(&self, connected: bool) {
        self.link.dispatch_link_state(connected);
    }

    /// Host wrote to the RX characteristic.
    pub fn data_received(&self, data: &[u8]) {
        self.link.dispatch_data(data);
    }
}

impl Default for EventHub<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn log_registered(source: &str, count: usize) {
    #[cfg(feature = "defmt")]
    defmt::debug!("{=str} handler registered ({=usize} total)", source, count);
    #[cfg(feature = "emulator")]
    tracing::debug!(source, count, "handler registered");
    #[cfg(not(any(feature = "defmt", feature = "emulator")))]
    let _ = (source, count);
}
