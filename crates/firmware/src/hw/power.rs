//! Power management through the SoftDevice.

use platform::PowerManager;

/// Sleep and system-off via the SoftDevice SoC API.
pub struct SoftDevicePower;

impl PowerManager for SoftDevicePower {
    fn idle(&mut self) {
        // SAFETY: plain SVC call; the SoftDevice is enabled before any
        // PowerManager is constructed.
        let _ = unsafe { nrf_softdevice::raw::sd_app_evt_wait() };
    }

    fn system_off(&mut self) {
        defmt::info!("system off");
        // SAFETY: as above. Wake-up from system-off is a reset.
        let ret = unsafe { nrf_softdevice::raw::sd_power_system_off() };
        // Only returns under a debugger (emulated system-off).
        defmt::warn!("system off returned {=u32}", ret);
        loop {
            cortex_m::asm::wfe();
        }
    }
}
