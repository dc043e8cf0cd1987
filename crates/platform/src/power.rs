//! Power management abstraction
//!
//! The cooperative loop idles between events; the capture chain keeps running
//! while the CPU sleeps.

/// Power management interface
pub trait PowerManager {
    /// Sleep until the next event (WFE, or `sd_app_evt_wait` with the
    /// SoftDevice enabled).
    fn idle(&mut self);

    /// Enter system-off. Wake-up is a reset, so this does not return on
    /// hardware.
    fn system_off(&mut self);
}
