//! TIMER/PPI/SPIM capture chain.
//!
//! ```text
//!  TIMER3 (1 MHz, CC0 = interval, clear on compare)
//!     │ COMPARE0 ──PPI ch0──► SPIM0.START          one transfer per interval
//!  SPIM0
//!     │ END ─────PPI ch1──► TIMER4.COUNT            counts finished transfers
//!  TIMER4 (counter, CC0 = K, stop on compare)
//!     │ COMPARE0 ──PPI ch2──► TIMER3.STOP           chain halts itself
//!     └─ IRQ ──► sequence-complete handlers
//! ```
//!
//! SPIM0 receives with RXD.LIST = ArrayList, so transfer `i` lands at
//! `slot + i * L`. The CPU is only involved at arm/start/stop and in the
//! single TIMER4 interrupt per frame.

use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::pac;
use embassy_nrf::peripherals::{PPI_CH0, PPI_CH1, PPI_CH2, TIMER3, TIMER4};
use embassy_nrf::ppi::{Event, Ppi, Task};
use embassy_nrf::timer::{Frequency, Timer};

use platform::config::{SEGMENT_LEN, TRANSFERS_PER_FRAME, TRANSFER_INTERVAL_US};
use platform::dma_safety::is_easydma_accessible;
use platform::{ArmError, FrameSlot, TransferSequencer};

/// Hardware transfer sequencer.
pub struct PpiSequencer {
    interval: Timer<'static, TIMER3>,
    counter: Timer<'static, TIMER4>,
    _start_spi: Ppi<'static, PPI_CH0, 1, 1>,
    _count_end: Ppi<'static, PPI_CH1, 1, 1>,
    _halt: Ppi<'static, PPI_CH2, 1, 1>,
}

fn spim0() -> &'static pac::spim0::RegisterBlock {
    // SAFETY: SPIM0 is owned by this module after init; only plain
    // register writes happen through this reference.
    unsafe { &*pac::SPIM0::ptr() }
}

fn timer4() -> &'static pac::timer3::RegisterBlock {
    // SAFETY: as above, for the TIMER4 event and interrupt registers.
    unsafe { &*pac::TIMER4::ptr() }
}

impl PpiSequencer {
    /// Build the chain. SPIM0 must already be configured (pins, 8 MHz,
    /// mode 1) and its transmit buffer must stay put at `tx_address`.
    pub fn new(
        timer3: TIMER3,
        timer4: TIMER4,
        ch0: PPI_CH0,
        ch1: PPI_CH1,
        ch2: PPI_CH2,
        tx_address: u32,
    ) -> Self {
        let interval = Timer::new(timer3);
        interval.set_frequency(Frequency::F1MHz);
        interval.cc(0).write(TRANSFER_INTERVAL_US);
        interval.cc(0).short_compare_clear();

        let counter = Timer::new_counter(timer4);
        counter.cc(0).write(TRANSFERS_PER_FRAME as u32);
        counter.cc(0).short_compare_clear();
        counter.cc(0).short_compare_stop();

        let spim = spim0();
        let mut start_spi = Ppi::new_one_to_one(
            ch0,
            interval.cc(0).event_compare(),
            Task::from_reg(&spim.tasks_start),
        );
        let mut count_end = Ppi::new_one_to_one(ch1, Event::from_reg(&spim.events_end), counter.task_count());
        let mut halt = Ppi::new_one_to_one(ch2, counter.cc(0).event_compare(), interval.task_stop());

        // SAFETY: plain register writes to a buffer address that outlives the
        // sequencer; MAXCNT fits the 8-bit field on nRF52832.
        unsafe {
            spim.txd.ptr.write(|w| w.ptr().bits(tx_address));
            spim.txd.maxcnt.write(|w| w.maxcnt().bits(SEGMENT_LEN as u8));
            spim.txd.list.write(|w| w.list().disabled());
            spim.rxd.maxcnt.write(|w| w.maxcnt().bits(SEGMENT_LEN as u8));
            spim.rxd.list.write(|w| w.list().array_list());
        }

        timer4().intenset.write(|w| w.compare0().set());
        interrupt::TIMER4.set_priority(Priority::P3);
        // SAFETY: the handler only dispatches through the event hub.
        unsafe { interrupt::TIMER4.enable() };

        start_spi.enable();
        count_end.enable();
        halt.enable();

        defmt::info!(
            "capture chain ready: {=usize} x {=usize} bytes every {=u32} us",
            TRANSFERS_PER_FRAME,
            SEGMENT_LEN,
            TRANSFER_INTERVAL_US
        );

        Self {
            interval,
            counter,
            _start_spi: start_spi,
            _count_end: count_end,
            _halt: halt,
        }
    }

    /// Acknowledge the TIMER4 compare event. Called from the interrupt.
    pub fn acknowledge_completion() -> bool {
        let timer = timer4();
        let fired = timer.events_compare[0].read().bits() != 0;
        timer.events_compare[0].reset();
        fired
    }
}

impl TransferSequencer for PpiSequencer {
    fn arm(&mut self, slot: FrameSlot) -> Result<(), ArmError> {
        let address = slot.as_ptr() as u32;
        let len = u32::try_from(slot.len()).unwrap_or(u32::MAX);
        if !is_easydma_accessible(address, len) {
            // RXD.PTR keeps its post-ArrayList value; the trigger will not START.
            return Err(ArmError::NotDmaReachable {
                slot: slot.index(),
                address,
            });
        }
        // SAFETY: the ring guarantees the slot stays valid and unaliased
        // while armed; RXD.PTR is only read by EasyDMA at the next START.
        unsafe { spim0().rxd.ptr.write(|w| w.ptr().bits(address)) };
        Ok(())
    }

    fn start(&mut self) {
        self.interval.clear();
        self.counter.clear();
        self.counter.start();
        self.interval.start();
    }

    fn stop(&mut self) {
        self.interval.stop();
        self.counter.stop();
    }
}
