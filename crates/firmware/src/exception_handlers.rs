//! Cortex-M4F exception handlers.
//!
//! - **HardFault**: bus faults, illegal instructions, unaligned access with
//!   CCR.UNALIGN_TRP set.
//!
//! The SoftDevice installs its own handlers through the MBR and forwards
//! everything it does not own to the application vector table, so these
//! are the handlers that actually run for application faults.
//!
//! The `#[cortex_m_rt::exception]` attribute needs the ARM target and is
//! gated behind `hardware`. `HARDFAULT_DEFINED` compiles everywhere so host
//! tests can check the module is linked in.

#![allow(clippy::doc_markdown)]

/// Marker constant, checked by the architecture tests.
pub const HARDFAULT_DEFINED: bool = true;

/// HardFault exception handler (hardware target only).
///
/// Logs the stacked PC and LR over RTT, then halts. Returning from a
/// HardFault is undefined behaviour on Cortex-M.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::error!(
        "HardFault: pc={=u32:#010x} lr={=u32:#010x} xpsr={=u32:#010x}",
        ef.pc(),
        ef.lr(),
        ef.xpsr()
    );
    loop {
        cortex_m::asm::bkpt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardfault_handler_module_compiles() {
        assert!(HARDFAULT_DEFINED);
    }
}
