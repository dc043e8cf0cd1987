//! Handler registry behaviour: bounded, init-time registration with an
//! explicit error when full, dispatch in registration order.

// Test files legitimately use expect() for readable assertions.
#![allow(clippy::expect_used)]
#![allow(clippy::arithmetic_side_effects)]

use core::cell::{Cell, RefCell};

use platform::config::HANDLER_CAPACITY;
use platform::events::{
    DataReadyHandler, HandlerRegistry, LinkEventHandler, RegistryFull, SequenceCompleteHandler,
};

struct Recorder<'a> {
    id: u8,
    log: &'a RefCell<Vec<u8>>,
}

impl DataReadyHandler for Recorder<'_> {
    fn on_data_ready(&self) {
        self.log.borrow_mut().push(self.id);
    }
}

impl SequenceCompleteHandler for Recorder<'_> {
    fn on_sequence_complete(&self) {
        self.log.borrow_mut().push(self.id);
    }
}

#[derive(Default)]
struct LinkRecorder {
    connected: Cell<Option<bool>>,
    bytes: RefCell<Vec<u8>>,
}

impl LinkEventHandler for LinkRecorder {
    fn on_link_state_changed(&self, connected: bool) {
        self.connected.set(Some(connected));
    }

    fn on_data_received(&self, data: &[u8]) {
        self.bytes.borrow_mut().extend_from_slice(data);
    }
}

/// Only tracks connectivity; relies on the default `on_data_received`.
struct StateOnly(Cell<u32>);

impl LinkEventHandler for StateOnly {
    fn on_link_state_changed(&self, _connected: bool) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn data_ready_dispatch_is_in_registration_order() {
    let log = RefCell::new(Vec::new());
    let first = Recorder { id: 1, log: &log };
    let second = Recorder { id: 2, log: &log };
    let third = Recorder { id: 3, log: &log };

    let mut registry: HandlerRegistry<'_, dyn DataReadyHandler, HANDLER_CAPACITY> =
        HandlerRegistry::new();
    registry.register(&first).expect("room for 5");
    registry.register(&second).expect("room for 5");
    registry.register(&third).expect("room for 5");
    registry.dispatch_data_ready();

    assert_eq!(*log.borrow(), vec![1, 2, 3]);
}

#[test]
fn sixth_handler_is_rejected_with_capacity() {
    let log = RefCell::new(Vec::new());
    let handler = Recorder { id: 0, log: &log };
    let mut registry: HandlerRegistry<'_, dyn SequenceCompleteHandler, HANDLER_CAPACITY> =
        HandlerRegistry::new();
    for _ in 0..HANDLER_CAPACITY {
        registry.register(&handler).expect("below capacity");
    }
    assert_eq!(
        registry.register(&handler),
        Err(RegistryFull {
            capacity: HANDLER_CAPACITY
        })
    );

    // The rejected registration did not displace anything.
    registry.dispatch_sequence_complete();
    assert_eq!(log.borrow().len(), HANDLER_CAPACITY);
}

#[test]
fn link_registry_fans_out_state_and_data() {
    let recorder = LinkRecorder::default();
    let state_only = StateOnly(Cell::new(0));
    let mut registry: HandlerRegistry<'_, dyn LinkEventHandler, HANDLER_CAPACITY> =
        HandlerRegistry::new();
    registry.register(&recorder).expect("room");
    registry.register(&state_only).expect("room");

    registry.dispatch_link_state(true);
    registry.dispatch_data(&[0x10, 0x20]);
    registry.dispatch_link_state(false);

    assert_eq!(recorder.connected.get(), Some(false));
    assert_eq!(*recorder.bytes.borrow(), vec![0x10, 0x20]);
    assert_eq!(state_only.0.get(), 2);
}

#[test]
fn registry_full_displays_capacity() {
    let err = RegistryFull { capacity: 5 };
    assert_eq!(err.to_string(), "Handler registry full (5 handlers)");
}
