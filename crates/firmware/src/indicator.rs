//! Board outputs: the link-indicator line and the heartbeat LED.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::digital::OutputPin;

use platform::LinkEventHandler;

/// Drives an output high while a host is connected.
///
/// Registered as a link handler next to the app, so the line follows every
/// connect and disconnect.
pub struct LinkIndicator<P> {
    pin: Mutex<CriticalSectionRawMutex, RefCell<P>>,
}

impl<P: OutputPin> LinkIndicator<P> {
    /// Take `pin`, which should already be low.
    pub const fn new(pin: P) -> Self {
        Self {
            pin: Mutex::new(RefCell::new(pin)),
        }
    }

    /// Give the pin back.
    pub fn into_inner(self) -> P {
        self.pin.into_inner().into_inner()
    }
}

impl<P: OutputPin> LinkEventHandler for LinkIndicator<P> {
    fn on_link_state_changed(&self, connected: bool) {
        let result = self.pin.lock(|pin| {
            let mut pin = pin.borrow_mut();
            if connected {
                pin.set_high()
            } else {
                pin.set_low()
            }
        });
        if result.is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("link indicator write failed");
            #[cfg(feature = "emulator")]
            tracing::warn!("link indicator write failed");
        }
    }
}

/// Status LED toggled by the heartbeat.
pub struct HeartbeatLed<P> {
    pin: P,
    active_low: bool,
    lit: bool,
}

impl<P: OutputPin> HeartbeatLed<P> {
    /// Wrap `pin`; the LED starts dark.
    pub fn new(pin: P, active_low: bool) -> Result<Self, P::Error> {
        let mut led = Self {
            pin,
            active_low,
            lit: false,
        };
        led.apply()?;
        Ok(led)
    }

    /// Flip the LED.
    pub fn toggle(&mut self) -> Result<(), P::Error> {
        self.lit = !self.lit;
        self.apply()
    }

    /// Give the pin back.
    pub fn into_inner(self) -> P {
        self.pin
    }

    /// LED is currently on.
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn apply(&mut self) -> Result<(), P::Error> {
        // Active-low boards light the LED by pulling the line down.
        if self.lit != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}
